//! Outcome aggregation and run-level cancellation
//!
//! One orchestration run is one logical task: dispatch the token, execute
//! the handler, surface exactly one [`Outcome`]. The orchestrator is also
//! where an external cancellation (the user dismisses the checkout
//! entirely) attaches: it forwards to whichever handler is active,
//! whatever its variant.

use crate::dispatch::{dispatch, Services};
use crate::handlers::ActionHandler;
use crate::types::{ContinuationToken, Outcome};
use crate::ActionError;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Runs decoded continuation tokens to their single outcome
pub struct Orchestrator {
    services: Services,
    active: Mutex<Option<Arc<dyn ActionHandler>>>,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(services: Services) -> Self {
        Self {
            services,
            active: Mutex::new(None),
        }
    }

    /// Execute the required action described by the token.
    ///
    /// Resolves exactly once. A token already past its expiry fails as
    /// `ExpiredToken` before any handler or polling session starts; a token
    /// that expires mid-run is self-cancelled and fails as `Expired`.
    /// Independent calls share collaborators but no session state.
    pub async fn orchestrate(&self, token: &ContinuationToken) -> Outcome {
        if token.is_expired(Utc::now()) {
            return Outcome::Failed(ActionError::ExpiredToken);
        }

        debug!(intent = %token.intent(), "dispatching required action");
        let handler: Arc<dyn ActionHandler> = Arc::from(dispatch(token, &self.services));
        *self.lock_active() = Some(Arc::clone(&handler));

        let outcome = match token.expires_at() {
            Some(expires_at) => {
                let remaining = (expires_at - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                match tokio::time::timeout(remaining, handler.execute(token)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // Deadline passed with the handler still waiting;
                        // its future is already dropped, the cancel keeps
                        // any shared session state consistent.
                        handler.cancel();
                        Outcome::Failed(ActionError::Expired)
                    }
                }
            }
            None => handler.execute(token).await,
        };

        *self.lock_active() = None;
        info!(intent = %token.intent(), outcome = ?outcome_kind(&outcome), "orchestration resolved");
        outcome
    }

    /// Cancel whichever handler is currently active; no-op otherwise.
    /// Idempotent, and harmless after resolution.
    pub fn cancel(&self) {
        if let Some(handler) = self.lock_active().as_ref() {
            debug!("forwarding external cancellation to active handler");
            handler.cancel();
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn ActionHandler>>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn outcome_kind(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Resumed { .. } => "resumed",
        Outcome::AdditionalInfo(_) => "additional-info",
        Outcome::Failed(_) => "failed",
        Outcome::Cancelled => "cancelled",
    }
}
