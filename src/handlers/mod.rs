//! Action handlers, one strategy per intent family
//!
//! Every handler implements the same contract: perform its side effect,
//! converge on exactly one [`Outcome`], and stay cancellable the whole way.
//! Retry policy never lives here — a presentation or SDK failure resolves
//! `Failed` immediately; only the polling engine retries.

mod challenge;
mod no_action;
mod qr_code;
mod redirect;
mod voucher;

pub use challenge::{ChallengeHandler, ChallengeSdk};
pub use no_action::{NoActionHandler, UnsupportedHandler};
pub use qr_code::QrCodeHandler;
pub use redirect::RedirectHandler;
pub use voucher::VoucherHandler;

use crate::types::{AdditionalInfoPayload, ContinuationToken, Outcome};
use crate::{ActionError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// Content handed to the external presenter
#[derive(Debug, Clone)]
pub enum PresentationContent {
    /// Open an external page (browser, bank app) at this URL
    Redirect { url: Url },
    /// Render a QR code from the given payload
    QrCode(AdditionalInfoPayload),
    /// Show voucher details
    Voucher(AdditionalInfoPayload),
}

/// Signals from the external presenter back to the orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterEvent {
    /// The content is on screen; confirmation waiting may begin
    Ready,
    /// The user dismissed the content (e.g. closed the browser)
    Dismissed,
}

/// External UI seam; how content is rendered is not this crate's concern
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Show the content and return the channel on which presentation events
    /// arrive. A send failure at presentation time resolves the run as
    /// `Failed`; closing the channel after `Ready` is not a dismissal.
    async fn present(
        &self,
        content: PresentationContent,
    ) -> Result<mpsc::Receiver<PresenterEvent>>;
}

/// The single contract every intent strategy implements
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Perform the side effect and converge on exactly one outcome
    async fn execute(&self, token: &ContinuationToken) -> Outcome;

    /// Request cancellation. Safe to call at any point: before `execute`
    /// starts, concurrently with it, or after resolution (no-op).
    fn cancel(&self);
}

/// Map a polling-engine resolution onto the handler outcome
pub(crate) fn outcome_from_poll(result: Result<String>) -> Outcome {
    match result {
        Ok(resume_token) => Outcome::Resumed {
            resume_token: Some(resume_token),
        },
        Err(ActionError::UserCancelled) => Outcome::Cancelled,
        Err(err) => Outcome::Failed(err),
    }
}
