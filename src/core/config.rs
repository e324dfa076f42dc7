use std::time::Duration;

use serde::Deserialize;

use crate::metadata_cache::DEFAULT_METADATA_CACHE_CAPACITY;
use crate::retry::DEFAULT_MAX_RETRIES;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 50_000;
const DEFAULT_USER_AGENT: &str = concat!("sdk-exec/", env!("CARGO_PKG_VERSION"));

/// Client-wide settings. Deserializable so SDKs can read it from their own
/// configuration files; durations are given in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub max_retries: usize,
    pub metadata_cache_capacity: usize,
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            metadata_cache_capacity: DEFAULT_METADATA_CACHE_CAPACITY,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl ClientConfig {
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_metadata_cache_capacity(mut self, capacity: usize) -> Self {
        self.metadata_cache_capacity = capacity;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout_ms = request_timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}
