//! Intent-to-handler dispatch
//!
//! A single pure mapping from a decoded token to the strategy that executes
//! it. No I/O and no state here, so routing is testable without any of the
//! collaborators doing real work.

use crate::credential::CredentialProvider;
use crate::handlers::{
    ActionHandler, ChallengeHandler, ChallengeSdk, NoActionHandler, Presenter, QrCodeHandler,
    RedirectHandler, UnsupportedHandler, VoucherHandler,
};
use crate::polling::RetryConfig;
use crate::status::StatusApi;
use crate::types::{ActionIntent, ContinuationToken};
use std::sync::Arc;

/// External collaborators an orchestration run executes against
#[derive(Clone)]
pub struct Services {
    /// UI seam for redirects, QR codes, and vouchers
    pub presenter: Arc<dyn Presenter>,
    /// External 3DS challenge SDK
    pub challenge_sdk: Arc<dyn ChallengeSdk>,
    /// Status endpoint client
    pub status_api: Arc<dyn StatusApi>,
    /// Current-credential source for status queries
    pub credentials: Arc<dyn CredentialProvider>,
    /// Retry policy handed to every polling session
    pub retry: RetryConfig,
}

impl Services {
    /// Bundle collaborators with the default retry policy
    pub fn new(
        presenter: Arc<dyn Presenter>,
        challenge_sdk: Arc<dyn ChallengeSdk>,
        status_api: Arc<dyn StatusApi>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            presenter,
            challenge_sdk,
            status_api,
            credentials,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Select the handler for a decoded token.
///
/// Unknown intents, and tokens that somehow lost an invariant-required
/// field after decoding, route to [`UnsupportedHandler`] rather than to any
/// happy-path strategy.
pub fn dispatch(token: &ContinuationToken, services: &Services) -> Box<dyn ActionHandler> {
    match token.intent() {
        ActionIntent::Redirect => {
            if token.redirect_url().is_none() || token.status_url().is_none() {
                return Box::new(UnsupportedHandler::new(token.intent().to_string()));
            }
            Box::new(RedirectHandler::new(
                Arc::clone(&services.presenter),
                Arc::clone(&services.status_api),
                Arc::clone(&services.credentials),
                services.retry.clone(),
            ))
        }
        ActionIntent::QrCode => {
            if token.qr_payload().is_none() || token.status_url().is_none() {
                return Box::new(UnsupportedHandler::new(token.intent().to_string()));
            }
            Box::new(QrCodeHandler::new(
                Arc::clone(&services.presenter),
                Arc::clone(&services.status_api),
                Arc::clone(&services.credentials),
                services.retry.clone(),
            ))
        }
        ActionIntent::ThreeDsChallenge => {
            if token.challenge().is_none() {
                return Box::new(UnsupportedHandler::new(token.intent().to_string()));
            }
            Box::new(ChallengeHandler::new(Arc::clone(&services.challenge_sdk)))
        }
        ActionIntent::Voucher => Box::new(VoucherHandler::new(Arc::clone(&services.presenter))),
        ActionIntent::NoAction => Box::new(NoActionHandler::new()),
        ActionIntent::Unknown(raw) => Box::new(UnsupportedHandler::new(raw.clone())),
    }
}
