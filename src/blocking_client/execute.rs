use std::any::Any;
use std::sync::Arc;

use http::header::HOST;
use tracing::{debug, error, info, info_span, warn};

use crate::adaptor::adapt;
use crate::config::ClientConfig;
use crate::error::{Error, ServiceError};
use crate::handler::{ErrorResponseHandler, ResponseHandler};
use crate::metrics::ClientMetricsSnapshot;
use crate::observe::{ExecutionContext, RequestObserver, TimingInfo};
use crate::request::{RequestKey, ServiceRequest, WireRequest};
use crate::response::{ResponseMetadata, ServiceResponse, WireResponse};
use crate::retry::{RetryFailure, RetryPolicy, RetryState};
use crate::util::{
    ensure_content_type, host_header_value, merge_headers, parse_endpoint, parse_header_value,
    redact_uri_for_logs, truncate_body,
};

use super::{ServiceClient, ServiceClientBuilder};

impl ServiceClient {
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Diagnostic metadata of the most recent successful call made with this
    /// original request key, while it is still cached.
    pub fn response_metadata_for(&self, key: RequestKey) -> Option<ResponseMetadata> {
        self.metadata_cache.get(&key)
    }

    pub fn metrics_snapshot(&self) -> ClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Executes `request` until it succeeds, fails terminally, or exhausts the
    /// retry ceiling.
    ///
    /// Reader-backed content is buffered on the first call, so the same
    /// request can be executed again afterwards.
    pub fn execute<T, H, E>(
        &self,
        request: &mut ServiceRequest,
        handler: &H,
        error_handler: &E,
    ) -> Result<T, Error>
    where
        T: 'static,
        H: ResponseHandler<T> + ?Sized,
        E: ErrorResponseHandler + ?Sized,
    {
        self.execute_with_context(request, handler, error_handler, &ExecutionContext::default())
    }

    pub fn execute_with_context<T, H, E>(
        &self,
        request: &mut ServiceRequest,
        handler: &H,
        error_handler: &E,
        context: &ExecutionContext,
    ) -> Result<T, Error>
    where
        T: 'static,
        H: ResponseHandler<T> + ?Sized,
        E: ErrorResponseHandler + ?Sized,
    {
        let (started_at, started) = TimingInfo::start();
        self.metrics.record_request_started();
        let _in_flight = self.metrics.enter_in_flight();

        let span = info_span!(
            "sdk_exec.request",
            service = %request.service_name(),
            method = %request.method(),
            endpoint = %redact_uri_for_logs(request.endpoint()),
        );
        let _enter = span.enter();

        let result = self.run_with_retries(request, handler, error_handler, context);
        let timing = TimingInfo::finish(started_at, started);
        self.metrics.record_request_completed(&result, timing.elapsed());

        match &result {
            Ok(value) => {
                for observer in self.observers_with(context) {
                    observer.after_response(request, value as &dyn Any, &timing);
                }
            }
            Err(error) => {
                for observer in self.observers_with(context) {
                    observer.after_error(request, error);
                }
            }
        }
        result
    }

    fn observers_with<'a>(
        &'a self,
        context: &'a ExecutionContext,
    ) -> impl Iterator<Item = &'a Arc<dyn RequestObserver>> {
        self.observers.iter().chain(context.observers())
    }

    fn run_with_retries<T, H, E>(
        &self,
        request: &mut ServiceRequest,
        handler: &H,
        error_handler: &E,
        context: &ExecutionContext,
    ) -> Result<T, Error>
    where
        H: ResponseHandler<T> + ?Sized,
        E: ErrorResponseHandler + ?Sized,
    {
        let wire_request = self.prepare_wire_request(request)?;
        let redacted_uri = redact_uri_for_logs(wire_request.url());
        let mut state = RetryState::initial();

        loop {
            if !state.is_first_attempt() {
                let delay = self
                    .retry_policy
                    .backoff_delay(state.attempts(), state.last_error());
                warn!(
                    attempt = state.attempts() + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                );
                for observer in self.observers_with(context) {
                    observer.on_retry_scheduled(request, &state, delay);
                }
                self.metrics.record_retry();
                self.sleeper
                    .sleep(delay)
                    .map_err(|source| Error::Interrupted {
                        delay_ms: delay.as_millis(),
                        source,
                    })?;
            }

            let attempts = state.attempts() + 1;
            debug!(attempt = attempts, "sending request");
            let response = match self.transport.dispatch(&wire_request) {
                Ok(response) => response,
                Err(error) => {
                    let kind = error.kind();
                    warn!(attempt = attempts, error = %error, "transport failure");
                    if self
                        .retry_policy
                        .should_retry(RetryFailure::Transport(kind), attempts)
                    {
                        state = state.next(None);
                        continue;
                    }
                    return Err(Error::Transport {
                        kind,
                        method: request.method().to_http(),
                        uri: redacted_uri,
                        attempts,
                        source: error.into_source(),
                    });
                }
            };

            let status = response.status();
            self.metrics.record_response_status(status.as_u16());
            debug!(attempt = attempts, status = status.as_u16(), "response received");

            if response.is_success() {
                return self.handle_response(request, &response, handler);
            }

            let service_error = self.handle_error_response(request, &response, error_handler)?;
            info!(
                status = service_error.status_code,
                error_code = service_error.error_code().unwrap_or("-"),
                request_id = service_error.request_id.as_deref().unwrap_or("-"),
                "service returned an error"
            );
            if self
                .retry_policy
                .should_retry(RetryFailure::Service(&service_error), attempts)
            {
                state = state.next(Some(service_error));
                continue;
            }
            return Err(service_error.into());
        }
    }

    fn prepare_wire_request(&self, request: &mut ServiceRequest) -> Result<WireRequest, Error> {
        let mut wire_request = adapt(request)?;
        let headers = wire_request.headers_mut();
        merge_headers(&self.default_headers, headers);
        if ensure_content_type(headers) {
            debug!("defaulted content-type to form encoding");
        }

        let endpoint = parse_endpoint(request.endpoint())?;
        if let Some(host) = host_header_value(&endpoint) {
            let host = parse_header_value(HOST.as_str(), &host)?;
            headers.insert(HOST, host);
        }
        Ok(wire_request)
    }

    fn handle_response<T, H>(
        &self,
        request: &ServiceRequest,
        response: &WireResponse,
        handler: &H,
    ) -> Result<T, Error>
    where
        H: ResponseHandler<T> + ?Sized,
    {
        let ServiceResponse { result, metadata } =
            handler.handle(response).map_err(|source| {
                error!(
                    status = response.status().as_u16(),
                    error = %source,
                    "unable to unmarshall response"
                );
                Error::Unmarshall {
                    status: response.status().as_u16(),
                    source,
                    body: truncate_body(response.body()),
                }
            })?;

        let metadata =
            metadata.or_else(|| response.request_id().map(ResponseMetadata::with_request_id));
        if let Some(metadata) = metadata {
            debug!(
                request_id = metadata.request_id().unwrap_or("-"),
                "caching response metadata"
            );
            self.metadata_cache
                .put(request.original_request_key(), metadata);
        }
        Ok(result)
    }

    fn handle_error_response<E>(
        &self,
        request: &ServiceRequest,
        response: &WireResponse,
        error_handler: &E,
    ) -> Result<ServiceError, Error>
    where
        E: ErrorResponseHandler + ?Sized,
    {
        let mut service_error = error_handler.handle(response).map_err(|source| {
            error!(
                status = response.status().as_u16(),
                error = %source,
                "unable to unmarshall error response"
            );
            Error::UnmarshallError {
                status: response.status().as_u16(),
                source,
                body: truncate_body(response.body()),
            }
        })?;

        service_error.status_code = response.status().as_u16();
        service_error.service_name = request.service_name().to_owned();
        if service_error.request_id.is_none()
            && let Some(request_id) = response.request_id()
        {
            service_error.request_id = Some(request_id.to_owned());
        }
        Ok(service_error)
    }
}
