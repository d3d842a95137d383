//! Core types for required-action orchestration
//!
//! The continuation token is an opaque, server-issued payload describing the
//! next client-side step of a payment. Decoding and classification are pure:
//! no I/O happens here, so the dispatcher can be tested in isolation.

use crate::{ActionError, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

/// Classified purpose of a continuation token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionIntent {
    /// Hand the user to an external page, then poll for completion
    Redirect,
    /// Run the 3DS challenge SDK and resume with its result
    ThreeDsChallenge,
    /// Display voucher details; settlement happens out-of-band
    Voucher,
    /// Display a QR code, then poll for completion
    QrCode,
    /// No client-side step required
    NoAction,
    /// Forward-compatibility escape hatch; resolves through a failing handler
    Unknown(String),
}

impl ActionIntent {
    /// Classify a raw intent string from the token payload.
    ///
    /// The server vocabulary: redirect intents end in `_REDIRECTION` (a QR
    /// payload on the same token means the "redirect" is scanned rather than
    /// opened), `3DS_AUTHENTICATION` requests a challenge,
    /// `PAYMENT_METHOD_VOUCHER` carries voucher details, and a missing or
    /// `CHECKOUT` intent needs nothing from the client. Anything else is
    /// preserved as [`ActionIntent::Unknown`] rather than rejected.
    pub fn classify(intent: Option<&str>, has_qr_payload: bool) -> Self {
        match intent {
            None => Self::NoAction,
            Some("CHECKOUT") => Self::NoAction,
            Some("3DS_AUTHENTICATION") => Self::ThreeDsChallenge,
            Some("PAYMENT_METHOD_VOUCHER") => Self::Voucher,
            Some(other) if other.ends_with("_REDIRECTION") => {
                if has_qr_payload {
                    Self::QrCode
                } else {
                    Self::Redirect
                }
            }
            Some(other) => Self::Unknown(other.to_string()),
        }
    }

    /// Whether this intent awaits external confirmation before resuming
    pub fn awaits_confirmation(&self) -> bool {
        matches!(self, Self::Redirect | Self::QrCode | Self::ThreeDsChallenge)
    }
}

impl std::fmt::Display for ActionIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect => write!(f, "REDIRECT"),
            Self::ThreeDsChallenge => write!(f, "3DS_AUTHENTICATION"),
            Self::Voucher => write!(f, "PAYMENT_METHOD_VOUCHER"),
            Self::QrCode => write!(f, "QR_CODE"),
            Self::NoAction => write!(f, "NO_ACTION"),
            Self::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Voucher details carried by a `PAYMENT_METHOD_VOUCHER` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherPayload {
    /// Issuing entity shown to the user (e.g. a bank identifier)
    pub entity: Option<String>,
    /// Payment reference the user quotes when settling out-of-band
    pub reference: Option<String>,
}

/// Parameters handed verbatim to the external 3DS challenge SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParameters {
    /// Server-side transaction identifier for the challenge
    pub transaction_id: String,
    /// ACS reference number, when the protocol version requires one
    pub acs_reference_number: Option<String>,
    /// Signed ACS content for the challenge flow
    pub acs_signed_content: Option<String>,
}

/// Decoded, read-only view of a continuation token
#[derive(Debug, Clone)]
pub struct ContinuationToken {
    intent: ActionIntent,
    redirect_url: Option<Url>,
    status_url: Option<Url>,
    voucher: Option<VoucherPayload>,
    qr_payload: Option<String>,
    challenge: Option<ChallengeParameters>,
    expires_at: Option<DateTime<Utc>>,
}

/// Raw claims as they appear in the token payload; unknown fields ignored
#[derive(Debug, Deserialize)]
struct TokenClaims {
    intent: Option<String>,
    #[serde(rename = "redirectUrl")]
    redirect_url: Option<String>,
    #[serde(rename = "statusUrl")]
    status_url: Option<String>,
    #[serde(rename = "qrCode")]
    qr_code: Option<String>,
    entity: Option<String>,
    reference: Option<String>,
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    #[serde(rename = "acsReferenceNumber")]
    acs_reference_number: Option<String>,
    #[serde(rename = "acsSignedContent")]
    acs_signed_content: Option<String>,
    /// Expiry as epoch seconds, standard JWT claim name
    exp: Option<i64>,
}

impl ContinuationToken {
    /// Decode and validate a raw continuation token.
    ///
    /// Accepts either a bare base64 JSON payload or a three-segment
    /// JWT-style string, in which case the middle segment is decoded.
    /// Structural problems (bad base64, bad JSON, a confirmation-requiring
    /// intent missing its URLs or challenge data) fail with
    /// [`ActionError::MalformedToken`]; a token already past its expiry
    /// fails with [`ActionError::ExpiredToken`]. Pure, no I/O.
    pub fn decode(raw: &str) -> Result<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        let payload = match segments.as_slice() {
            [_, payload, _] => *payload,
            _ => raw,
        };

        let bytes = decode_base64(payload.trim())?;
        let claims: TokenClaims = serde_json::from_slice(&bytes)
            .map_err(|e| ActionError::malformed_token(format!("invalid JSON payload: {}", e)))?;

        let token = Self::from_claims(claims)?;

        if token.is_expired(Utc::now()) {
            return Err(ActionError::ExpiredToken);
        }

        Ok(token)
    }

    fn from_claims(claims: TokenClaims) -> Result<Self> {
        let intent = ActionIntent::classify(claims.intent.as_deref(), claims.qr_code.is_some());

        let redirect_url = claims
            .redirect_url
            .as_deref()
            .map(parse_url("redirectUrl"))
            .transpose()?;
        let status_url = claims
            .status_url
            .as_deref()
            .map(parse_url("statusUrl"))
            .transpose()?;

        let expires_at = match claims.exp {
            Some(seconds) => Some(
                DateTime::from_timestamp(seconds, 0)
                    .ok_or_else(|| ActionError::malformed_token("exp is out of range"))?,
            ),
            None => None,
        };

        let challenge = claims
            .transaction_id
            .map(|transaction_id| ChallengeParameters {
                transaction_id,
                acs_reference_number: claims.acs_reference_number,
                acs_signed_content: claims.acs_signed_content,
            });

        let voucher = if claims.entity.is_some() || claims.reference.is_some() {
            Some(VoucherPayload {
                entity: claims.entity,
                reference: claims.reference,
            })
        } else {
            None
        };

        // Confirmation-requiring intents must carry their fields up front;
        // a handler never discovers a hole at execution time.
        match intent {
            ActionIntent::Redirect => {
                if redirect_url.is_none() {
                    return Err(ActionError::malformed_token(
                        "redirect intent without redirectUrl",
                    ));
                }
                if status_url.is_none() {
                    return Err(ActionError::malformed_token(
                        "redirect intent without statusUrl",
                    ));
                }
            }
            ActionIntent::QrCode => {
                if status_url.is_none() {
                    return Err(ActionError::malformed_token("QR intent without statusUrl"));
                }
            }
            ActionIntent::ThreeDsChallenge => {
                if challenge.is_none() {
                    return Err(ActionError::malformed_token(
                        "challenge intent without transactionId",
                    ));
                }
            }
            _ => {}
        }

        Ok(Self {
            intent,
            redirect_url,
            status_url,
            voucher,
            qr_payload: claims.qr_code,
            challenge,
            expires_at,
        })
    }

    /// The classified intent
    pub fn intent(&self) -> &ActionIntent {
        &self.intent
    }

    /// External page the user is sent to, for redirect intents
    pub fn redirect_url(&self) -> Option<&Url> {
        self.redirect_url.as_ref()
    }

    /// Status endpoint polled for completion, for confirmation intents
    pub fn status_url(&self) -> Option<&Url> {
        self.status_url.as_ref()
    }

    /// Voucher details, for voucher intents
    pub fn voucher(&self) -> Option<&VoucherPayload> {
        self.voucher.as_ref()
    }

    /// Raw QR payload: either an image URL or base64 image data
    pub fn qr_payload(&self) -> Option<&str> {
        self.qr_payload.as_deref()
    }

    /// 3DS challenge parameters, for challenge intents
    pub fn challenge(&self) -> Option<&ChallengeParameters> {
        self.challenge.as_ref()
    }

    /// Client-side deadline for the whole orchestration run
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token's deadline has passed at the given instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Expiry formatted for user-facing additional-info payloads
    pub fn expires_at_display(&self) -> Option<String> {
        self.expires_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    // Tokens in the wild use both padded standard and unpadded url-safe
    // alphabets.
    URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD.decode(payload))
        .map_err(|e| ActionError::malformed_token(format!("invalid base64 payload: {}", e)))
}

fn parse_url(field: &'static str) -> impl Fn(&str) -> Result<Url> {
    move |raw| {
        Url::parse(raw)
            .map_err(|e| ActionError::malformed_token(format!("invalid {}: {}", field, e)))
    }
}

/// Informational result emitted by fire-and-forget handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdditionalInfoPayload {
    /// Voucher details the user needs to settle out-of-band
    Voucher {
        entity: Option<String>,
        reference: Option<String>,
        expires_at: Option<String>,
    },
    /// QR content for external rendering
    QrCode {
        /// Set when the QR payload is a fetchable image URL
        qr_code_url: Option<String>,
        /// Set when the QR payload is inline base64 image data
        qr_code_base64: Option<String>,
        expires_at: Option<String>,
    },
}

impl AdditionalInfoPayload {
    /// Build the QR variant, splitting URL payloads from inline data
    pub fn qr_code(payload: &str, expires_at: Option<String>) -> Self {
        let is_url = Url::parse(payload)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);

        if is_url {
            Self::QrCode {
                qr_code_url: Some(payload.to_string()),
                qr_code_base64: None,
                expires_at,
            }
        } else {
            Self::QrCode {
                qr_code_url: None,
                qr_code_base64: Some(payload.to_string()),
                expires_at,
            }
        }
    }
}

/// Single result type threaded back to the caller of an orchestration run
#[derive(Debug)]
pub enum Outcome {
    /// The required action completed; pass the resume token to the payment
    /// API. `None` means the token carried no action to resume from.
    Resumed { resume_token: Option<String> },
    /// Informational result with no resume token expected; settlement
    /// happens outside the app
    AdditionalInfo(AdditionalInfoPayload),
    /// The run reached a terminal error
    Failed(ActionError),
    /// The run was cancelled before reaching a terminal state
    Cancelled,
}
