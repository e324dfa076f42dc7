use std::sync::Arc;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue, USER_AGENT};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::metadata_cache::ResponseMetadataCache;
use crate::metrics::ClientMetrics;
use crate::observe::RequestObserver;
use crate::retry::RetryPolicy;
use crate::util::{parse_header_name, parse_header_value};

use super::{ServiceClient, ServiceClientBuilder, Sleeper, ThreadSleeper, Transport};

impl ServiceClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            retry_policy: None,
            default_headers: HeaderMap::new(),
            transport: None,
            sleeper: Arc::new(ThreadSleeper),
            observers: Vec::new(),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        if let Some(retry_policy) = self.retry_policy.take() {
            self.retry_policy = Some(retry_policy.max_retries(config.max_retries));
        }
        self.config = config;
        self
    }

    /// Replaces the retry policy. The policy's ceiling becomes the client's
    /// `max_retries`.
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.config.max_retries = retry_policy.configured_max_retries();
        self.retry_policy = Some(retry_policy);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.config.max_retries = max_retries;
        if let Some(retry_policy) = self.retry_policy.take() {
            self.retry_policy = Some(retry_policy.max_retries(max_retries));
        }
        self
    }

    pub fn metadata_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.metadata_cache_capacity = capacity;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Sent with every request unless the request sets the same header.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.append(name, value);
        self
    }

    pub fn try_default_header(self, name: &str, value: &str) -> Result<Self, Error> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.default_header(name, value))
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Result<ServiceClient, Error> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.config)?,
        };

        let mut default_headers = self.default_headers;
        if !default_headers.contains_key(USER_AGENT) && !self.config.user_agent.is_empty() {
            let user_agent = parse_header_value(USER_AGENT.as_str(), &self.config.user_agent)?;
            default_headers.insert(USER_AGENT, user_agent);
        }

        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::standard().max_retries(self.config.max_retries));

        Ok(ServiceClient {
            metadata_cache: ResponseMetadataCache::new(self.config.metadata_cache_capacity),
            config: self.config,
            retry_policy,
            default_headers,
            transport,
            sleeper: self.sleeper,
            observers: self.observers,
            metrics: ClientMetrics::default(),
        })
    }
}

impl Default for ServiceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "ureq-transport")]
fn default_transport(config: &ClientConfig) -> Result<Arc<dyn Transport>, Error> {
    Ok(Arc::new(super::UreqTransport::new(config.request_timeout())))
}

#[cfg(not(feature = "ureq-transport"))]
fn default_transport(_config: &ClientConfig) -> Result<Arc<dyn Transport>, Error> {
    Err(Error::MissingTransport)
}
