use std::sync::Arc;

use http::HeaderMap;

use crate::config::ClientConfig;
use crate::metadata_cache::ResponseMetadataCache;
use crate::metrics::ClientMetrics;
use crate::observe::RequestObserver;
use crate::retry::RetryPolicy;

mod builder;
mod execute;
mod transport;

#[cfg(feature = "ureq-transport")]
pub use transport::UreqTransport;
pub use transport::{Sleeper, ThreadSleeper, Transport};

pub struct ServiceClientBuilder {
    config: ClientConfig,
    retry_policy: Option<RetryPolicy>,
    default_headers: HeaderMap,
    transport: Option<Arc<dyn Transport>>,
    sleeper: Arc<dyn Sleeper>,
    observers: Vec<Arc<dyn RequestObserver>>,
}

/// Executes service requests: adapts them to wire requests, dispatches them
/// through the transport, retries retryable failures, and hands responses to
/// the caller's handlers.
///
/// Safe to share across threads; the only state mutated by calls is the
/// response metadata cache and the metrics counters.
pub struct ServiceClient {
    config: ClientConfig,
    retry_policy: RetryPolicy,
    default_headers: HeaderMap,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    observers: Vec<Arc<dyn RequestObserver>>,
    metadata_cache: ResponseMetadataCache,
    metrics: ClientMetrics,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ServiceClient")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .field("default_headers", &self.default_headers)
            .field("observers", &self.observers.len())
            .field("metadata_cache", &self.metadata_cache)
            .finish_non_exhaustive()
    }
}
