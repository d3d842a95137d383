//! Redirect-and-poll strategy
//!
//! Hands the redirect URL to the presenter, waits for the page to be on
//! screen, then polls the status endpoint until the server confirms the
//! payment. Dismissing the presenter cancels the polling session rather
//! than leaving it running.

use super::{outcome_from_poll, ActionHandler, PresentationContent, Presenter, PresenterEvent};
use crate::credential::CredentialProvider;
use crate::polling::{CancelHandle, PollingEngine, RetryConfig};
use crate::status::StatusApi;
use crate::types::{ContinuationToken, Outcome};
use crate::ActionError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Handler for plain web-redirect intents
pub struct RedirectHandler {
    presenter: Arc<dyn Presenter>,
    api: Arc<dyn StatusApi>,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryConfig,
    cancel: Arc<CancelHandle>,
}

impl RedirectHandler {
    /// Create a redirect handler over the given collaborators
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
impl ActionHandler for RedirectHandler {
    async fn execute(&self, token: &ContinuationToken) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let (Some(redirect_url), Some(status_url)) = (token.redirect_url(), token.status_url())
        else {
            return Outcome::Failed(ActionError::malformed_token(
                "redirect intent without redirectUrl/statusUrl",
            ));
        };

        let content = PresentationContent::Redirect {
            url: redirect_url.clone(),
        };
        let events = match self.presenter.present(content).await {
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
        debug!("redirect handler cancelled");
        self.cancel.cancel(ActionError::UserCancelled);
    }
}

/// Await presenter readiness, then poll while listening for dismissal.
///
/// Shared between the redirect and QR strategies, whose confirmation
/// semantics are identical.
pub(super) async fn confirm_after_presentation(
    mut events: tokio::sync::mpsc::Receiver<PresenterEvent>,
    status_url: url::Url,
    api: Arc<dyn StatusApi>,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryConfig,
    cancel: Arc<CancelHandle>,
) -> Outcome {
    let first = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Outcome::Cancelled,
        event = events.recv() => event,
    };
    match first {
        Some(PresenterEvent::Ready) => {}
        Some(PresenterEvent::Dismissed) => {
            cancel.cancel(ActionError::UserCancelled);
            return Outcome::Cancelled;
        }
        None => {
            return Outcome::Failed(ActionError::presentation(
                "presenter closed before signalling ready",
            ));
        }
    }

    let engine = PollingEngine::new(status_url, api, credentials)
        .with_retry_config(retry)
        .with_cancel_handle(Arc::clone(&cancel));

    let poll = engine.start();
    tokio::pin!(poll);

    let mut events_open = true;
    loop {
        tokio::select! {
            result = &mut poll => return outcome_from_poll(result),
            event = events.recv(), if events_open => match event {
                Some(PresenterEvent::Dismissed) => {
                    // The session resolves through the shared handle; the
                    // in-flight attempt's result is discarded.
                    cancel.cancel(ActionError::UserCancelled);
                }
                Some(PresenterEvent::Ready) => {}
                None => events_open = false,
            },
        }
    }
}
