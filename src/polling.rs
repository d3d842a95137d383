//! Polling engine for required-action confirmation
//!
//! A handler that must wait on external confirmation starts one
//! [`PollingEngine`] against the token's status URL. The engine issues
//! strictly sequential status queries until the payment completes, fails
//! hard, is cancelled, or exhausts its transient-failure budget. A session
//! resolves at most once: cancellation and completion race through a single
//! sealed state, and whichever arrives second is discarded.

use crate::credential::CredentialProvider;
use crate::status::{PollStatus, StatusApi};
use crate::{ActionError, Result};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Retry and pacing policy for one polling session.
///
/// Transient failures (transport errors, and 5xx when `retry_500_errors` is
/// set) are retried up to `max_retries` consecutive times with exponential
/// backoff from `initial_delay`, capped at `max_delay`, plus up to 25%
/// jitter. The consecutive counter resets on any successful response.
/// `PENDING` rounds are not failures; they re-poll at the flat
/// `poll_interval` until a terminal state, cancellation, or expiry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Whether transient failures are retried at all
    pub enabled: bool,
    /// Consecutive transient failures tolerated before giving up
    pub max_retries: u32,
    /// First backoff delay after a transient failure
    pub initial_delay: Duration,
    /// Upper bound for the exponential backoff
    pub max_delay: Duration,
    /// Delay between rounds while the action is still pending
    pub poll_interval: Duration,
    /// Whether HTTP 5xx responses count as transient
    pub retry_500_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 8,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            retry_500_errors: true,
        }
    }
}

impl RetryConfig {
    /// Policy with the default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the consecutive transient-failure budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Set the backoff cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the flat delay between pending rounds
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Control whether HTTP 5xx responses are retried
    pub fn with_retry_500_errors(mut self, retry_500_errors: bool) -> Self {
        self.retry_500_errors = retry_500_errors;
        self
    }

    /// Backoff delay before the nth consecutive transient failure retry
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay);
        let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.25));
        base + jitter
    }
}

#[derive(Debug)]
enum CancelState {
    Active,
    Cancelled(Option<ActionError>),
    Resolved,
}

/// One-shot cancellation guard shared between a handler and its session.
///
/// The first `cancel` seals a reason; later calls, and calls after the
/// session has resolved, are no-ops. A session result that arrives after
/// cancellation is discarded, so a caller observes exactly one resolution.
#[derive(Debug)]
pub struct CancelHandle {
    state: Mutex<CancelState>,
    notify: Notify,
}

impl CancelHandle {
    /// Create an active, uncancelled handle
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CancelState::Active),
            notify: Notify::new(),
        })
    }

    /// Request cancellation with the given reason; idempotent
    pub fn cancel(&self, reason: ActionError) {
        let mut state = self.lock_state();
        if matches!(*state, CancelState::Active) {
            *state = CancelState::Cancelled(Some(reason));
            drop(state);
            self.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested and not superseded
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.lock_state(), CancelState::Cancelled(_))
    }

    /// Resolves once cancellation is requested; pends forever otherwise
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Seal the session as resolved, unless cancellation won the race, in
    /// which case the sealed reason is returned and the result must be
    /// discarded.
    pub(crate) fn try_resolve(&self) -> std::result::Result<(), ActionError> {
        let mut state = self.lock_state();
        match &mut *state {
            CancelState::Active => {
                *state = CancelState::Resolved;
                Ok(())
            }
            CancelState::Cancelled(reason) => {
                Err(reason.take().unwrap_or(ActionError::UserCancelled))
            }
            CancelState::Resolved => Ok(()),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Mutable state owned by exactly one engine invocation
#[derive(Debug)]
pub struct PollingSession {
    id: Uuid,
    status_url: Url,
    attempt_count: u32,
}

impl PollingSession {
    /// Session identifier used for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The endpoint this session queries
    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    /// Attempts issued so far
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}

/// Drives one polling session to its single terminal result
pub struct PollingEngine {
    session: PollingSession,
    api: Arc<dyn StatusApi>,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryConfig,
    cancel: Arc<CancelHandle>,
}

impl PollingEngine {
    /// Create an engine for one status URL with the default retry policy
    pub fn new(
        status_url: Url,
        api: Arc<dyn StatusApi>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            session: PollingSession {
                id: Uuid::new_v4(),
                status_url,
                attempt_count: 0,
            },
            api,
            credentials,
            retry: RetryConfig::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Share an externally owned cancel handle with this engine
    pub fn with_cancel_handle(mut self, cancel: Arc<CancelHandle>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle through which this session can be cancelled
    pub fn cancel_handle(&self) -> Arc<CancelHandle> {
        Arc::clone(&self.cancel)
    }

    /// The session driven by this engine
    pub fn session(&self) -> &PollingSession {
        &self.session
    }

    /// Run the session to completion, returning the resume token id.
    ///
    /// Consumes the engine: the session cannot outlive its resolution.
    /// Resolution happens at most once even when cancellation races a
    /// completing attempt.
    pub async fn start(mut self) -> Result<String> {
        let result = self.run().await;
        match self.cancel.try_resolve() {
            Ok(()) => result,
            Err(reason) => {
                debug!(
                    session = %self.session.id,
                    "discarding poll result arriving after cancellation"
                );
                Err(reason)
            }
        }
    }

    async fn run(&mut self) -> Result<String> {
        // The credential precondition is checked before any network attempt.
        if self.credentials.current().is_none() {
            return Err(ActionError::InvalidCredential);
        }

        let mut consecutive_failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ActionError::UserCancelled);
            }

            // Re-read the credential every round so external rotation is
            // picked up within one attempt.
            let Some(credential) = self.credentials.current() else {
                return Err(ActionError::InvalidCredential);
            };

            self.session.attempt_count += 1;
            debug!(
                session = %self.session.id,
                attempt = self.session.attempt_count,
                url = %self.session.status_url,
                "querying status endpoint"
            );

            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ActionError::UserCancelled),
                result = self.api.poll(&self.session.status_url, &credential) => result,
            };

            match attempt {
                Ok(response) => match response.status {
                    PollStatus::Complete => {
                        debug!(
                            session = %self.session.id,
                            attempts = self.session.attempt_count,
                            "required action confirmed"
                        );
                        return Ok(response.id);
                    }
                    PollStatus::Pending => {
                        consecutive_failures = 0;
                        self.wait(self.retry.poll_interval).await?;
                    }
                    PollStatus::Failed => {
                        let reason = response
                            .failure_reason
                            .unwrap_or_else(|| "payment failed".to_string());
                        return Err(ActionError::business_failure(reason));
                    }
                },
                Err(err) if self.retry.enabled && err.is_transient(self.retry.retry_500_errors) => {
                    consecutive_failures += 1;
                    if consecutive_failures > self.retry.max_retries {
                        warn!(
                            session = %self.session.id,
                            failures = consecutive_failures,
                            "transient-failure budget exhausted"
                        );
                        return Err(err);
                    }
                    let delay = self.retry.backoff_delay(consecutive_failures);
                    warn!(
                        session = %self.session.id,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "transient polling failure, will retry"
                    );
                    self.wait(delay).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Sleep between rounds, waking early on cancellation
    async fn wait(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ActionError::UserCancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
