use std::str::FromStr;

use http::Method;

use crate::error::Error;

/// The HTTP methods a service request may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethodName {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

/// Where the parameter set of a request is written on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterPlacement {
    /// Appended to the URL as `?k=v&...`.
    QueryString,
    /// Form-encoded into the request body; the URL carries no query string.
    FormBody,
}

impl HttpMethodName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    pub fn to_http(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
            Self::Head => Method::HEAD,
        }
    }

    /// Parameter placement given whether the request carries explicit content.
    pub const fn parameter_placement(self, has_content: bool) -> ParameterPlacement {
        match self {
            Self::Post if !has_content => ParameterPlacement::FormBody,
            Self::Get | Self::Post | Self::Put | Self::Delete | Self::Head => {
                ParameterPlacement::QueryString
            }
        }
    }

    /// Whether explicit request content is sent as the payload.
    pub const fn sends_content(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl std::fmt::Display for HttpMethodName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for HttpMethodName {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            other => Err(Error::UnsupportedMethod {
                method: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<&Method> for HttpMethodName {
    type Error = Error;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<HttpMethodName> for Method {
    fn from(method: HttpMethodName) -> Self {
        method.to_http()
    }
}
