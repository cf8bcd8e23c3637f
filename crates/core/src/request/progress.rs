//! One-way progress reporting for certificate requests.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::CertificateRequestResult;

/// Coarse state of a request in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Running,
    Succeeded,
    Failed,
}

/// An observation emitted while a request runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestProgressState {
    pub state: RequestState,
    pub message: String,
    /// Terminal result, attached to the final observation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<CertificateRequestResult>>,
}

impl RequestProgressState {
    pub fn running(message: impl Into<String>) -> Self {
        Self {
            state: RequestState::Running,
            message: message.into(),
            result: None,
        }
    }

    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            state: RequestState::Succeeded,
            message: message.into(),
            result: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: RequestState::Failed,
            message: message.into(),
            result: None,
        }
    }

    /// Terminal observation carrying the request's result.
    pub fn finished(result: &CertificateRequestResult) -> Self {
        let state = if result.success {
            RequestState::Succeeded
        } else {
            RequestState::Failed
        };
        Self {
            state,
            message: result.message.clone(),
            result: Some(Box::new(result.clone())),
        }
    }
}

/// Consumer of progress observations.
///
/// Implementations must return promptly; the engine never waits on, retries
/// or inspects delivery.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: RequestProgressState);
}

impl ProgressSink for mpsc::Sender<RequestProgressState> {
    fn report(&self, progress: RequestProgressState) {
        if let Err(e) = self.try_send(progress) {
            debug!("Dropped progress update: {}", e);
        }
    }
}

impl ProgressSink for mpsc::UnboundedSender<RequestProgressState> {
    fn report(&self, progress: RequestProgressState) {
        if let Err(e) = self.send(progress) {
            debug!("Dropped progress update: {}", e);
        }
    }
}

/// Sink that forwards observations to a closure.
pub struct FnProgressSink<F>(F);

impl<F> ProgressSink for FnProgressSink<F>
where
    F: Fn(RequestProgressState) + Send + Sync,
{
    fn report(&self, progress: RequestProgressState) {
        (self.0)(progress)
    }
}

/// Wrap a closure as a progress sink.
pub fn progress_fn<F>(f: F) -> FnProgressSink<F>
where
    F: Fn(RequestProgressState) + Send + Sync,
{
    FnProgressSink(f)
}

/// Report to an optional sink.
pub(crate) fn emit(sink: Option<&dyn ProgressSink>, progress: RequestProgressState) {
    if let Some(sink) = sink {
        sink.report(progress);
    }
}
