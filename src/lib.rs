//! `sdk-exec` is the request execution engine for service SDKs: it turns an
//! abstract service request into a wire request, dispatches it through a
//! pluggable blocking transport, retries with bounded exponential backoff,
//! and hands responses to caller-supplied handlers.
//!
//! # Quick Start
//!
//! ```no_run
//! use sdk_exec::prelude::{
//!     BoxError, HttpMethodName, JsonErrorResponseHandler, ServiceClient, ServiceRequest,
//!     ServiceResponse, WireResponse,
//! };
//!
//! fn describe(response: &WireResponse) -> Result<ServiceResponse<String>, BoxError> {
//!     Ok(ServiceResponse::without_metadata(response.text_lossy()))
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ServiceClient::builder().max_retries(3).build()?;
//!
//!     let mut request = ServiceRequest::new(
//!         "AmazonEC2",
//!         HttpMethodName::Post,
//!         "https://ec2.us-east-1.amazonaws.com",
//!     )
//!     .parameter("Action", "DescribeInstances")
//!     .parameter("Version", "2016-11-15");
//!
//!     let body = client.execute(&mut request, &describe, &JsonErrorResponseHandler)?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```
//!
//! # Retry Defaults
//!
//! - Up to 3 retries, so at most 4 attempts per call.
//! - Retries 500, 503, `Throttling` service errors, and connect/read/timeout
//!   transport failures. Everything else fails on first occurrence.
//! - Backoff is `2^retries * 300ms`, capped at 20s; throttled retries use a
//!   randomized 500-599ms scale.

mod core;

pub mod adaptor;
mod blocking_client;
mod handler;
mod metadata_cache;
mod method;
mod request;
mod response;

pub(crate) use crate::core::{config, error, metrics, observe, retry, util};

#[cfg(feature = "ureq-transport")]
pub use crate::blocking_client::UreqTransport;
pub use crate::blocking_client::{
    ServiceClient, ServiceClientBuilder, Sleeper, ThreadSleeper, Transport,
};
pub use crate::config::ClientConfig;
pub use crate::error::{
    BoxError, Error, ErrorCode, ServiceError, ServiceErrorType, TransportError,
    TransportErrorKind,
};
pub use crate::handler::{ErrorResponseHandler, JsonErrorResponseHandler, ResponseHandler};
pub use crate::metadata_cache::{DEFAULT_METADATA_CACHE_CAPACITY, ResponseMetadataCache};
pub use crate::method::{HttpMethodName, ParameterPlacement};
pub use crate::metrics::ClientMetricsSnapshot;
pub use crate::observe::{ExecutionContext, RequestObserver, TimingInfo};
pub use crate::request::{RequestContent, RequestKey, ServiceRequest, WireRequest};
pub use crate::response::{ResponseMetadata, ServiceResponse, WireResponse};
pub use crate::retry::{DEFAULT_MAX_RETRIES, RetryFailure, RetryPolicy, RetryState};

pub type SdkResult<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        BoxError, ClientConfig, ClientMetricsSnapshot, Error, ErrorCode, ErrorResponseHandler,
        ExecutionContext, HttpMethodName, JsonErrorResponseHandler, RequestKey, RequestObserver,
        ResponseHandler, ResponseMetadata, RetryPolicy, SdkResult, ServiceClient, ServiceError,
        ServiceRequest, ServiceResponse, TransportErrorKind, WireResponse,
    };
}
