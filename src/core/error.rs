use http::Method;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Read,
    Timeout,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Read => "read",
            Self::Timeout => "timeout",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

/// Failure reported by a [`Transport`](crate::Transport) before any response
/// was received.
#[derive(Debug, Error)]
#[error("{kind} transport failure: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(
        kind: TransportErrorKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub(crate) fn into_source(self) -> BoxError {
        self.source
    }
}

impl From<std::io::Error> for TransportError {
    fn from(source: std::io::Error) -> Self {
        Self::new(classify_io_error_kind(source.kind()), source)
    }
}

pub(crate) fn classify_io_error_kind(kind: std::io::ErrorKind) -> TransportErrorKind {
    match kind {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            TransportErrorKind::Timeout
        }
        std::io::ErrorKind::NotFound => TransportErrorKind::Dns,
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::AddrNotAvailable => TransportErrorKind::Connect,
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::UnexpectedEof => TransportErrorKind::Read,
        _ => TransportErrorKind::Other,
    }
}

/// Which side of the exchange a service blames for an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ServiceErrorType {
    Client,
    Service,
    #[default]
    Unknown,
}

/// A non-2xx response decoded by an
/// [`ErrorResponseHandler`](crate::ErrorResponseHandler).
///
/// The engine stamps `status_code` and `service_name` after decoding, so
/// handlers only need to fill in what the body tells them.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceError {
    pub status_code: u16,
    pub error_code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
    pub service_name: String,
    pub error_type: ServiceErrorType,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_error_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_error_type(mut self, error_type: ServiceErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} (service: {}; status code: {}; error code: {}; request id: {})",
            self.message,
            self.service_name,
            self.status_code,
            self.error_code.as_deref().unwrap_or("-"),
            self.request_id.as_deref().unwrap_or("-"),
        )
    }
}

impl std::error::Error for ServiceError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    InvalidUri,
    UnsupportedMethod,
    InvalidHeaderName,
    InvalidHeaderValue,
    ReadContent,
    MissingTransport,
    Transport,
    Service,
    Unmarshall,
    UnmarshallError,
    Interrupted,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUri => "invalid_uri",
            Self::UnsupportedMethod => "unsupported_method",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::ReadContent => "read_content",
            Self::MissingTransport => "missing_transport",
            Self::Transport => "transport",
            Self::Service => "service",
            Self::Unmarshall => "unmarshall",
            Self::UnmarshallError => "unmarshall_error",
            Self::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid request uri: {uri}")]
    InvalidUri { uri: String },
    #[error("unknown http method name: {method}")]
    UnsupportedMethod { method: String },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("failed to read request content: {source}")]
    ReadContent {
        #[source]
        source: std::io::Error,
    },
    #[error("no transport configured and the default transport feature is disabled")]
    MissingTransport,
    #[error("unable to execute http request ({kind}) for {method} {uri} after {attempts} attempt(s): {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        attempts: usize,
        #[source]
        source: BoxError,
    },
    #[error("{0}")]
    Service(Box<ServiceError>),
    #[error("unable to unmarshall response ({source}): {body}")]
    Unmarshall {
        status: u16,
        #[source]
        source: BoxError,
        body: String,
    },
    #[error("unable to unmarshall error response ({source}): {body}")]
    UnmarshallError {
        status: u16,
        #[source]
        source: BoxError,
        body: String,
    },
    #[error("backoff sleep of {delay_ms}ms was interrupted: {source}")]
    Interrupted {
        delay_ms: u128,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUri { .. } => ErrorCode::InvalidUri,
            Self::UnsupportedMethod { .. } => ErrorCode::UnsupportedMethod,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::ReadContent { .. } => ErrorCode::ReadContent,
            Self::MissingTransport => ErrorCode::MissingTransport,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::Service(_) => ErrorCode::Service,
            Self::Unmarshall { .. } => ErrorCode::Unmarshall,
            Self::UnmarshallError { .. } => ErrorCode::UnmarshallError,
            Self::Interrupted { .. } => ErrorCode::Interrupted,
        }
    }

    /// True for failures raised while building the wire request. These never
    /// reach the transport and are never retried.
    pub const fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::InvalidUri { .. }
                | Self::UnsupportedMethod { .. }
                | Self::InvalidHeaderName { .. }
                | Self::InvalidHeaderValue { .. }
                | Self::ReadContent { .. }
                | Self::MissingTransport
        )
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(error) => Some(error),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Service(error) => Some(error.status_code),
            Self::Unmarshall { status, .. } | Self::UnmarshallError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ServiceError> for Error {
    fn from(error: ServiceError) -> Self {
        Self::Service(Box::new(error))
    }
}
