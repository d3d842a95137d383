//! Shared in-process fakes for orchestration and polling tests
#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use required_actions::handlers::{ChallengeSdk, PresentationContent, Presenter, PresenterEvent};
use required_actions::{
    ActionError, ChallengeParameters, ContinuationToken, Credential, CredentialProvider,
    PollStatus, PollingResponse, Result, StatusApi,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use url::Url;

/// Install a log subscriber for test debugging; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Decode a continuation token built from raw claims
pub fn token(claims: serde_json::Value) -> ContinuationToken {
    let raw = URL_SAFE_NO_PAD.encode(claims.to_string());
    ContinuationToken::decode(&raw).expect("test token must decode")
}

pub fn pending() -> Result<PollingResponse> {
    Ok(PollingResponse {
        status: PollStatus::Pending,
        id: String::new(),
        source: "webhook".to_string(),
        failure_reason: None,
    })
}

pub fn complete(id: &str) -> Result<PollingResponse> {
    Ok(PollingResponse {
        status: PollStatus::Complete,
        id: id.to_string(),
        source: "webhook".to_string(),
        failure_reason: None,
    })
}

pub fn failed(reason: &str) -> Result<PollingResponse> {
    Ok(PollingResponse {
        status: PollStatus::Failed,
        id: String::new(),
        source: "webhook".to_string(),
        failure_reason: Some(reason.to_string()),
    })
}

pub fn transport_error() -> Result<PollingResponse> {
    Err(ActionError::Status {
        status: 503,
        message: "upstream unavailable".to_string(),
    })
}

/// Status API replaying a scripted result sequence; reports pending once
/// the script is exhausted so cancellation paths have something to wait on
pub struct ScriptedStatusApi {
    script: Mutex<VecDeque<Result<PollingResponse>>>,
    calls: AtomicUsize,
    seen_tokens: Mutex<Vec<String>>,
}

impl ScriptedStatusApi {
    pub fn new(script: Vec<Result<PollingResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    /// Pending forever, for cancellation and expiry scenarios
    pub fn never_completing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Credentials observed per attempt, in order
    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusApi for ScriptedStatusApi {
    async fn poll(&self, _url: &Url, credential: &Credential) -> Result<PollingResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(credential.token().to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(pending)
    }
}

/// Presenter that records content and exposes the event channel to the test
pub struct TestPresenter {
    auto_ready: bool,
    presented: Mutex<Vec<PresentationContent>>,
    events_tx: Mutex<Option<mpsc::Sender<PresenterEvent>>>,
}

impl TestPresenter {
    /// Signals `Ready` as soon as content is presented
    pub fn ready() -> Self {
        Self {
            auto_ready: true,
            presented: Mutex::new(Vec::new()),
            events_tx: Mutex::new(None),
        }
    }

    /// Presents without signalling; the test drives events itself
    pub fn silent() -> Self {
        Self {
            auto_ready: false,
            presented: Mutex::new(Vec::new()),
            events_tx: Mutex::new(None),
        }
    }

    pub fn presented(&self) -> Vec<PresentationContent> {
        self.presented.lock().unwrap().clone()
    }

    pub fn presented_count(&self) -> usize {
        self.presented.lock().unwrap().len()
    }

    pub async fn signal_ready(&self) {
        self.send(PresenterEvent::Ready).await;
    }

    pub async fn dismiss(&self) {
        self.send(PresenterEvent::Dismissed).await;
    }

    async fn send(&self, event: PresenterEvent) {
        let tx = self.events_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl Presenter for TestPresenter {
    async fn present(
        &self,
        content: PresentationContent,
    ) -> Result<mpsc::Receiver<PresenterEvent>> {
        self.presented.lock().unwrap().push(content);
        let (tx, rx) = mpsc::channel(8);
        if self.auto_ready {
            let _ = tx.send(PresenterEvent::Ready).await;
        }
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

/// Presenter that cannot show anything
pub struct FailingPresenter;

#[async_trait]
impl Presenter for FailingPresenter {
    async fn present(
        &self,
        _content: PresentationContent,
    ) -> Result<mpsc::Receiver<PresenterEvent>> {
        Err(ActionError::presentation("no window to present in"))
    }
}

/// Challenge SDK with a scripted single result
pub struct StubChallengeSdk {
    result: Mutex<Option<Result<String>>>,
    hang: bool,
    calls: AtomicUsize,
}

impl StubChallengeSdk {
    pub fn succeeding(resume_token: &str) -> Self {
        Self {
            result: Mutex::new(Some(Ok(resume_token.to_string()))),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Mutex::new(Some(Err(ActionError::challenge(message)))),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never completes, for cancellation scenarios
    pub fn hanging() -> Self {
        Self {
            result: Mutex::new(None),
            hang: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChallengeSdk for StubChallengeSdk {
    async fn perform_challenge(&self, _params: &ChallengeParameters) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.result
            .lock()
            .unwrap()
            .take()
            .expect("challenge SDK invoked more than once")
    }
}

/// Provider that serves a fixed token sequence, one entry per lookup
pub struct RotatingCredentialProvider {
    tokens: Mutex<VecDeque<Credential>>,
    last: Mutex<Option<Credential>>,
}

impl RotatingCredentialProvider {
    pub fn new(tokens: Vec<&str>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into_iter().map(Credential::new).collect()),
            last: Mutex::new(None),
        }
    }
}

impl CredentialProvider for RotatingCredentialProvider {
    fn current(&self) -> Option<Credential> {
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(next) = tokens.pop_front() {
            *self.last.lock().unwrap() = Some(next.clone());
            return Some(next);
        }
        self.last.lock().unwrap().clone()
    }
}

/// Provider whose credential disappears after a fixed number of lookups
pub struct ExpiringCredentialProvider {
    remaining: AtomicUsize,
}

impl ExpiringCredentialProvider {
    pub fn new(lookups: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(lookups),
        }
    }
}

impl CredentialProvider for ExpiringCredentialProvider {
    fn current(&self) -> Option<Credential> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| Credential::new("expiring-token"))
    }
}
