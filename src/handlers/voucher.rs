//! Voucher (fire-and-forget) strategy
//!
//! The user settles the voucher outside the app, so there is nothing to
//! wait for: emit the details for display and resolve immediately. Callers
//! must not expect a resume token from this variant.

use super::{ActionHandler, PresentationContent, Presenter};
use crate::polling::CancelHandle;
use crate::types::{AdditionalInfoPayload, ContinuationToken, Outcome};
use crate::ActionError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Handler for voucher intents
pub struct VoucherHandler {
    presenter: Arc<dyn Presenter>,
    cancel: Arc<CancelHandle>,
}

impl VoucherHandler {
    /// Create a voucher handler over the given presenter
    pub fn new(presenter: Arc<dyn Presenter>) -> Self {
        Self {
            presenter,
            cancel: CancelHandle::new(),
        }
    }
}

#[async_trait]
impl ActionHandler for VoucherHandler {
    async fn execute(&self, token: &ContinuationToken) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let voucher = token.voucher();
        let info = AdditionalInfoPayload::Voucher {
            entity: voucher.and_then(|v| v.entity.clone()),
            reference: voucher.and_then(|v| v.reference.clone()),
            expires_at: token.expires_at_display(),
        };

        if let Err(err) = self
            .presenter
            .present(PresentationContent::Voucher(info.clone()))
            .await
        {
            return Outcome::Failed(err);
        }

        Outcome::AdditionalInfo(info)
    }

    fn cancel(&self) {
        debug!("voucher handler cancelled");
        self.cancel.cancel(ActionError::UserCancelled);
    }
}
