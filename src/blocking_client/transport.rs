use std::time::Duration;

use crate::error::{BoxError, TransportError};
use crate::request::WireRequest;
use crate::response::WireResponse;

/// Sends one wire request and returns the raw response.
///
/// Any status code is a response, not an error: classification happens in
/// the client. Errors are reserved for failures that produced no response.
pub trait Transport: Send + Sync {
    fn dispatch(&self, request: &WireRequest) -> Result<WireResponse, TransportError>;
}

/// Blocks the calling thread between attempts. An error aborts the call.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> Result<(), BoxError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) -> Result<(), BoxError> {
        std::thread::sleep(delay);
        Ok(())
    }
}

#[cfg(feature = "ureq-transport")]
pub use ureq_transport::UreqTransport;

#[cfg(feature = "ureq-transport")]
mod ureq_transport {
    use std::io::Read;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::error::{TransportError, TransportErrorKind, classify_io_error_kind};
    use crate::request::WireRequest;
    use crate::response::WireResponse;

    use super::Transport;

    /// Blocking transport backed by a `ureq` agent. Redirects are followed by
    /// the agent; non-2xx statuses are returned as responses.
    #[derive(Clone, Debug)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new(request_timeout: Duration) -> Self {
            let config = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(Some(request_timeout))
                .build();
            Self {
                agent: config.new_agent(),
            }
        }

        pub fn from_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }

        fn run<B>(
            &self,
            http_request: Result<ureq::http::Request<B>, ureq::http::Error>,
        ) -> Result<ureq::http::Response<ureq::Body>, TransportError>
        where
            B: ureq::AsSendBody,
        {
            let http_request = http_request
                .map_err(|source| TransportError::new(TransportErrorKind::Other, source))?;
            self.agent
                .run(http_request)
                .map_err(|source| TransportError::new(classify_ureq_error(&source), source))
        }
    }

    impl Transport for UreqTransport {
        fn dispatch(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
            let mut builder = ureq::http::Request::builder()
                .method(request.method().to_http())
                .uri(request.url());
            for (name, value) in request.headers() {
                builder = builder.header(name, value);
            }
            let mut response = match request.payload() {
                Some(payload) => self.run(builder.body(&payload[..])),
                None => self.run(builder.body(())),
            }?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = read_body(&mut response)?;
            Ok(WireResponse::new(status, headers, body))
        }
    }

    fn read_body(
        response: &mut ureq::http::Response<ureq::Body>,
    ) -> Result<Bytes, TransportError> {
        let mut reader = response.body_mut().as_reader();
        let mut collected = Vec::new();
        reader.read_to_end(&mut collected).map_err(|source| {
            let kind = wrapped_ureq_error(&source)
                .map(classify_ureq_error)
                .unwrap_or(TransportErrorKind::Read);
            TransportError::new(kind, source)
        })?;
        Ok(Bytes::from(collected))
    }

    fn wrapped_ureq_error(io_error: &std::io::Error) -> Option<&ureq::Error> {
        io_error
            .get_ref()
            .and_then(|source| source.downcast_ref::<ureq::Error>())
    }

    fn classify_ureq_error(error: &ureq::Error) -> TransportErrorKind {
        match error {
            ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
            ureq::Error::HostNotFound => TransportErrorKind::Dns,
            ureq::Error::Tls(_) => TransportErrorKind::Tls,
            ureq::Error::ConnectProxyFailed(_) | ureq::Error::ConnectionFailed => {
                TransportErrorKind::Connect
            }
            ureq::Error::Io(source) => classify_io_error_kind(source.kind()),
            _ => TransportErrorKind::Other,
        }
    }

}
