use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::error::Error;
use crate::method::HttpMethodName;
use crate::util::{parse_header_name, parse_header_value};

static NEXT_REQUEST_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of the caller-level request a [`ServiceRequest`] was built from.
///
/// Used only to look up response metadata after the call. Several service
/// requests may share one key when they belong to the same logical operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(u64);

impl RequestKey {
    pub fn next() -> Self {
        Self(NEXT_REQUEST_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Explicit request content. A reader is drained once when the request is
/// adapted and then kept as bytes so retries resend the same payload.
pub enum RequestContent {
    Buffered(Bytes),
    Reader(Box<dyn Read + Send + Sync>),
}

impl std::fmt::Debug for RequestContent {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(bytes) => formatter
                .debug_tuple("Buffered")
                .field(&bytes.len())
                .finish(),
            Self::Reader(_) => formatter.write_str("Reader(..)"),
        }
    }
}

impl RequestContent {
    pub(crate) fn buffer(&mut self) -> Result<Bytes, Error> {
        match self {
            Self::Buffered(bytes) => Ok(bytes.clone()),
            Self::Reader(reader) => {
                let mut collected = Vec::new();
                reader
                    .read_to_end(&mut collected)
                    .map_err(|source| Error::ReadContent { source })?;
                let bytes = Bytes::from(collected);
                *self = Self::Buffered(bytes.clone());
                Ok(bytes)
            }
        }
    }
}

/// Transport-agnostic description of a service call, as produced by an
/// operation marshaller.
#[derive(Debug)]
pub struct ServiceRequest {
    service_name: String,
    endpoint: String,
    resource_path: Option<String>,
    method: HttpMethodName,
    parameters: BTreeMap<String, String>,
    headers: HeaderMap,
    content: Option<RequestContent>,
    original_request: RequestKey,
}

impl ServiceRequest {
    pub fn new(
        service_name: impl Into<String>,
        method: HttpMethodName,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            endpoint: endpoint.into(),
            resource_path: None,
            method,
            parameters: BTreeMap::new(),
            headers: HeaderMap::new(),
            content: None,
            original_request: RequestKey::next(),
        }
    }

    /// Builds a request from a method name such as `"GET"`. Names outside the
    /// supported set fail with [`Error::UnsupportedMethod`].
    pub fn try_new(
        service_name: impl Into<String>,
        method: &str,
        endpoint: impl Into<String>,
    ) -> Result<Self, Error> {
        let method = method.parse()?;
        Ok(Self::new(service_name, method, endpoint))
    }

    pub fn resource_path(mut self, resource_path: impl Into<String>) -> Self {
        self.resource_path = Some(resource_path.into());
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameters<K, V, I>(mut self, parameters: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.parameters.extend(
            parameters
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    /// Adds a header, keeping any earlier values under the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn try_header(self, name: &str, value: &str) -> Result<Self, Error> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = Some(RequestContent::Buffered(content.into()));
        self
    }

    pub fn content_reader<R>(mut self, reader: R) -> Self
    where
        R: Read + Send + Sync + 'static,
    {
        self.content = Some(RequestContent::Reader(Box::new(reader)));
        self
    }

    pub fn original_request(mut self, key: RequestKey) -> Self {
        self.original_request = key;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn path(&self) -> Option<&str> {
        self.resource_path.as_deref()
    }

    pub fn method(&self) -> HttpMethodName {
        self.method
    }

    pub fn parameter_map(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn original_request_key(&self) -> RequestKey {
        self.original_request
    }

    pub(crate) fn buffer_content(&mut self) -> Result<Option<Bytes>, Error> {
        self.content.as_mut().map(RequestContent::buffer).transpose()
    }
}

/// A fully resolved request ready for a [`Transport`](crate::Transport).
#[derive(Clone, Debug)]
pub struct WireRequest {
    method: HttpMethodName,
    url: String,
    headers: HeaderMap,
    payload: Option<Bytes>,
}

impl WireRequest {
    pub(crate) fn new(
        method: HttpMethodName,
        url: String,
        headers: HeaderMap,
        payload: Option<Bytes>,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            payload,
        }
    }

    pub fn method(&self) -> HttpMethodName {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }
}
