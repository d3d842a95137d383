//! Error types for required-action orchestration

use thiserror::Error;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, ActionError>;

/// Main error type for required-action orchestration
#[derive(Error, Debug)]
pub enum ActionError {
    /// Continuation token could not be decoded or is structurally incomplete
    #[error("Malformed continuation token: {message}")]
    MalformedToken { message: String },

    /// Continuation token expired before it was acted on
    #[error("Continuation token expired")]
    ExpiredToken,

    /// The token's intent has no handler
    #[error("Unsupported action: {intent}")]
    UnsupportedAction { intent: String },

    /// No client credential was available for the status endpoint
    #[error("Invalid client credential")]
    InvalidCredential,

    /// HTTP transport error while querying the status endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the status endpoint
    #[error("Status endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The payment reached a terminal failure on the server side
    #[error("Payment failed: {reason}")]
    BusinessFailure { reason: String },

    /// The user abandoned the required action
    #[error("Cancelled by user")]
    UserCancelled,

    /// The required action expired before completion
    #[error("Required action expired before completion")]
    Expired,

    /// The external presenter could not show the required content
    #[error("Presentation failed: {message}")]
    Presentation { message: String },

    /// The 3DS challenge SDK reported a failure
    #[error("Challenge failed: {message}")]
    Challenge { message: String },
}

impl ActionError {
    /// Create a malformed token error
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Create an unsupported action error
    pub fn unsupported_action(intent: impl Into<String>) -> Self {
        Self::UnsupportedAction {
            intent: intent.into(),
        }
    }

    /// Create a business failure error
    pub fn business_failure(reason: impl Into<String>) -> Self {
        Self::BusinessFailure {
            reason: reason.into(),
        }
    }

    /// Create a presentation error
    pub fn presentation(message: impl Into<String>) -> Self {
        Self::Presentation {
            message: message.into(),
        }
    }

    /// Create a challenge error
    pub fn challenge(message: impl Into<String>) -> Self {
        Self::Challenge {
            message: message.into(),
        }
    }

    /// Whether the polling loop may retry after this error.
    ///
    /// Transport-level failures are always transient; 5xx responses are
    /// transient only when `retry_500_errors` is set. Everything else is
    /// terminal for the session.
    pub fn is_transient(&self, retry_500_errors: bool) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => retry_500_errors && (500..600).contains(status),
            _ => false,
        }
    }
}
