//! Challenge-and-resume (3DS) strategy
//!
//! The external cryptographic SDK reports completion itself, so this
//! strategy never touches the polling engine: one SDK invocation, one
//! outcome.

use super::ActionHandler;
use crate::polling::CancelHandle;
use crate::types::{ChallengeParameters, ContinuationToken, Outcome};
use crate::{ActionError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// External 3DS challenge SDK seam, invoked once per challenge run
#[async_trait]
pub trait ChallengeSdk: Send + Sync {
    /// Run the challenge UI/crypto flow and return the resume token
    async fn perform_challenge(&self, params: &ChallengeParameters) -> Result<String>;
}

/// Handler for 3DS challenge intents
pub struct ChallengeHandler {
    sdk: Arc<dyn ChallengeSdk>,
    cancel: Arc<CancelHandle>,
}

impl ChallengeHandler {
    /// Create a challenge handler over the given SDK
    pub fn new(sdk: Arc<dyn ChallengeSdk>) -> Self {
        Self {
            sdk,
            cancel: CancelHandle::new(),
        }
    }
}

#[async_trait]
impl ActionHandler for ChallengeHandler {
    async fn execute(&self, token: &ContinuationToken) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let Some(params) = token.challenge() else {
            return Outcome::Failed(ActionError::malformed_token(
                "challenge intent without challenge parameters",
            ));
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Outcome::Cancelled,
            result = self.sdk.perform_challenge(params) => result,
        };

        // An SDK result racing a cancellation is discarded.
        if let Err(reason) = self.cancel.try_resolve() {
            debug!("discarding challenge result after cancellation");
            return match reason {
                ActionError::UserCancelled => Outcome::Cancelled,
                other => Outcome::Failed(other),
            };
        }

        match result {
            Ok(resume_token) => Outcome::Resumed {
                resume_token: Some(resume_token),
            },
            Err(err) => Outcome::Failed(err),
        }
    }

    fn cancel(&self) {
        debug!("challenge handler cancelled");
        self.cancel.cancel(ActionError::UserCancelled);
    }
}
