//! # required-actions - checkout continuation orchestration
//!
//! When a payment needs a step the server cannot perform — a web redirect,
//! a 3DS challenge, a voucher, a QR code — the server answers with an
//! opaque continuation token. This library decodes that token, dispatches
//! it to the strategy for its intent, drives a resilient, cancellable
//! polling loop where external confirmation is required, and converges on
//! a single [`Outcome`] carrying the resume token for the next
//! payment-API call.

pub mod credential;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod polling;
pub mod status;
pub mod types;

// Re-exports for convenience
pub use credential::{Credential, CredentialProvider, SharedCredentialProvider, StaticCredentialProvider};
pub use dispatch::{dispatch, Services};
pub use error::{ActionError, Result};
pub use orchestrator::Orchestrator;
pub use polling::{CancelHandle, PollingEngine, PollingSession, RetryConfig};
pub use status::{HttpStatusClient, PollStatus, PollingResponse, StatusApi};
pub use types::*;

/// Current version of the required-actions library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
