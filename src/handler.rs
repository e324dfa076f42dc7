use crate::error::{BoxError, ServiceError};
use crate::response::{ServiceResponse, WireResponse};

/// Interprets a 2xx response into a typed result.
///
/// Any error returned here is fatal for the call and surfaces as
/// [`Error::Unmarshall`](crate::Error::Unmarshall) with a body excerpt.
pub trait ResponseHandler<T>: Send + Sync {
    fn handle(&self, response: &WireResponse) -> Result<ServiceResponse<T>, BoxError>;
}

impl<T, F> ResponseHandler<T> for F
where
    F: Fn(&WireResponse) -> Result<ServiceResponse<T>, BoxError> + Send + Sync,
{
    fn handle(&self, response: &WireResponse) -> Result<ServiceResponse<T>, BoxError> {
        self(response)
    }
}

/// Turns a non-2xx response into a classified [`ServiceError`].
pub trait ErrorResponseHandler: Send + Sync {
    fn handle(&self, response: &WireResponse) -> Result<ServiceError, BoxError>;
}

impl<F> ErrorResponseHandler for F
where
    F: Fn(&WireResponse) -> Result<ServiceError, BoxError> + Send + Sync,
{
    fn handle(&self, response: &WireResponse) -> Result<ServiceError, BoxError> {
        self(response)
    }
}

/// Decodes JSON error bodies shaped like `{"__type": "...", "message": "..."}`
/// or `{"code": "...", "message": "..."}`. Bodies that are not JSON become a
/// generic service error carrying the status line text.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonErrorResponseHandler;

#[derive(serde::Deserialize)]
struct JsonErrorBody {
    #[serde(rename = "__type")]
    type_name: Option<String>,
    #[serde(alias = "Code")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

impl ErrorResponseHandler for JsonErrorResponseHandler {
    fn handle(&self, response: &WireResponse) -> Result<ServiceError, BoxError> {
        let status = response.status();
        let fallback = status
            .canonical_reason()
            .unwrap_or("service error")
            .to_owned();
        let Ok(body) = response.json::<JsonErrorBody>() else {
            return Ok(ServiceError::new(fallback));
        };

        let mut error = ServiceError::new(body.message.unwrap_or(fallback));
        if let Some(code) = body.type_name.or(body.code) {
            // `__type` may be namespaced, e.g. "com.amazon.coral#Throttling".
            let code = code.rsplit('#').next().unwrap_or(&code).to_owned();
            error = error.with_error_code(code);
        }
        error.error_type = if status.is_server_error() {
            crate::error::ServiceErrorType::Service
        } else {
            crate::error::ServiceErrorType::Client
        };
        Ok(error)
    }
}
