use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::error::Error;
use crate::request::ServiceRequest;
use crate::retry::RetryState;

/// Wall-clock and monotonic timing of one `execute` call.
#[derive(Clone, Copy, Debug)]
pub struct TimingInfo {
    started_at: SystemTime,
    started: Instant,
    elapsed: Duration,
}

impl TimingInfo {
    pub(crate) fn start() -> (SystemTime, Instant) {
        (SystemTime::now(), Instant::now())
    }

    pub(crate) fn finish(started_at: SystemTime, started: Instant) -> Self {
        Self {
            started_at,
            started,
            elapsed: started.elapsed(),
        }
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Hooks that run once the retry loop has fully resolved.
///
/// `after_response` receives the decoded result type-erased; observers
/// interested in a specific result type downcast it and ignore the rest.
pub trait RequestObserver: Send + Sync {
    fn after_response(&self, _request: &ServiceRequest, _result: &dyn Any, _timing: &TimingInfo) {}

    fn after_error(&self, _request: &ServiceRequest, _error: &Error) {}

    fn on_retry_scheduled(&self, _request: &ServiceRequest, _state: &RetryState, _delay: Duration) {}
}

/// Per-call context. Its observers run after the client's own observers.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn observers(&self) -> &[Arc<dyn RequestObserver>] {
        &self.observers
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExecutionContext")
            .field("observers", &self.observers.len())
            .finish()
    }
}
