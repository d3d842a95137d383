//! Trivial strategies: nothing to do, and nothing we know how to do

use super::ActionHandler;
use crate::types::{ContinuationToken, Outcome};
use crate::ActionError;
use async_trait::async_trait;

/// Handler for tokens that carry no required action; a pass-through
#[derive(Debug, Default)]
pub struct NoActionHandler;

impl NoActionHandler {
    /// Create the pass-through handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for NoActionHandler {
    async fn execute(&self, _token: &ContinuationToken) -> Outcome {
        Outcome::Resumed { resume_token: None }
    }

    fn cancel(&self) {}
}

/// Handler for unknown intents and structurally incomplete tokens;
/// resolves `Failed(UnsupportedAction)` without any I/O
#[derive(Debug)]
pub struct UnsupportedHandler {
    intent: String,
}

impl UnsupportedHandler {
    /// Create a failing handler naming the unsupported intent
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
        }
    }
}

#[async_trait]
impl ActionHandler for UnsupportedHandler {
    async fn execute(&self, _token: &ContinuationToken) -> Outcome {
        Outcome::Failed(ActionError::unsupported_action(self.intent.clone()))
    }

    fn cancel(&self) {}
}
