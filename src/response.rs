use std::collections::BTreeMap;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

pub(crate) const REQUEST_ID_KEY: &str = "request_id";
const REQUEST_ID_HEADERS: [&str; 2] = ["x-amzn-requestid", "x-amz-request-id"];

/// A raw response as returned by a transport. Immutable once built.
#[derive(Clone, Debug)]
pub struct WireResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl WireResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The service request id, when the response carries one in a header.
    pub fn request_id(&self) -> Option<&str> {
        REQUEST_ID_HEADERS
            .iter()
            .find_map(|name| self.header_str(name))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(&self.body)
    }
}

/// Diagnostic values a service returns alongside a result, such as its
/// request id. Kept for post-call troubleshooting only.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResponseMetadata {
    values: BTreeMap<String, String>,
}

impl ResponseMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.insert(REQUEST_ID_KEY, request_id);
        metadata
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.get(REQUEST_ID_KEY)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// What a [`ResponseHandler`](crate::ResponseHandler) produces: the typed
/// result plus the response metadata, if the body carried any.
#[derive(Clone, Debug)]
pub struct ServiceResponse<T> {
    pub result: T,
    pub metadata: Option<ResponseMetadata>,
}

impl<T> ServiceResponse<T> {
    pub fn new(result: T, metadata: ResponseMetadata) -> Self {
        Self {
            result,
            metadata: Some(metadata),
        }
    }

    pub fn without_metadata(result: T) -> Self {
        Self {
            result,
            metadata: None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(ResponseMetadata::request_id)
    }
}
