//! QR-code-and-poll strategy
//!
//! Emits the QR payload for external rendering, then waits on the status
//! endpoint exactly like the redirect strategy: the user completes the
//! payment in another app, and the server reports completion.

use super::redirect::confirm_after_presentation;
use super::{ActionHandler, PresentationContent, Presenter};
use crate::credential::CredentialProvider;
use crate::polling::{CancelHandle, RetryConfig};
use crate::status::StatusApi;
use crate::types::{AdditionalInfoPayload, ContinuationToken, Outcome};
use crate::ActionError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Handler for QR-code intents
pub struct QrCodeHandler {
    presenter: Arc<dyn Presenter>,
    api: Arc<dyn StatusApi>,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryConfig,
    cancel: Arc<CancelHandle>,
}

impl QrCodeHandler {
    /// Create a QR handler over the given collaborators
    pub fn new(
        presenter: Arc<dyn Presenter>,
        api: Arc<dyn StatusApi>,
        credentials: Arc<dyn CredentialProvider>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            presenter,
            api,
            credentials,
            retry,
            cancel: CancelHandle::new(),
        }
    }
}

#[async_trait]
impl ActionHandler for QrCodeHandler {
    async fn execute(&self, token: &ContinuationToken) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let (Some(qr_payload), Some(status_url)) = (token.qr_payload(), token.status_url()) else {
            return Outcome::Failed(ActionError::malformed_token(
                "QR intent without qrCode/statusUrl",
            ));
        };

        let info = AdditionalInfoPayload::qr_code(qr_payload, token.expires_at_display());
        let events = match self.presenter.present(PresentationContent::QrCode(info)).await {
            Ok(events) => events,
            Err(err) => return Outcome::Failed(err),
        };

        confirm_after_presentation(
            events,
            status_url.clone(),
            Arc::clone(&self.api),
            Arc::clone(&self.credentials),
            self.retry.clone(),
            Arc::clone(&self.cancel),
        )
        .await
    }

    fn cancel(&self) {
        debug!("QR handler cancelled");
        self.cancel.cancel(ActionError::UserCancelled);
    }
}
