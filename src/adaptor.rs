//! Converts a [`ServiceRequest`] into a [`WireRequest`].
//!
//! Adaptation is pure apart from draining reader-backed content, which is
//! buffered back into the request so a second adaptation yields the same
//! payload.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::Error;
use crate::method::ParameterPlacement;
use crate::request::{ServiceRequest, WireRequest};
use crate::util::parse_endpoint;

pub fn adapt(request: &mut ServiceRequest) -> Result<WireRequest, Error> {
    parse_endpoint(request.endpoint())?;
    let base = concatenate_path(request.endpoint(), request.path());

    let method = request.method();
    let content = if method.sends_content() {
        request.buffer_content()?
    } else {
        None
    };

    let (url, payload) = match method.parameter_placement(content.is_some()) {
        ParameterPlacement::QueryString => {
            let url = format!("{base}{}", to_query_string(request.parameter_map()));
            (url, content)
        }
        ParameterPlacement::FormBody => {
            let form = encode_parameters(request.parameter_map());
            let payload = (!form.is_empty()).then(|| Bytes::from(form));
            (base, payload)
        }
    };

    let url = normalize_url(url)?;

    Ok(WireRequest::new(
        method,
        url,
        request.headers().clone(),
        payload,
    ))
}

/// Percent-encodes characters the raw joined URL may carry (spaces,
/// non-ASCII path segments) and checks the result is a valid request target.
fn normalize_url(raw: String) -> Result<String, Error> {
    let parsed = url::Url::parse(&raw).map_err(|_| Error::InvalidUri { uri: raw.clone() })?;
    let normalized = String::from(parsed);
    if normalized.parse::<http::Uri>().is_err() {
        return Err(Error::InvalidUri { uri: raw });
    }
    Ok(normalized)
}

/// Joins endpoint and resource path with exactly one slash at the seam.
/// An empty path still yields a trailing slash.
pub fn concatenate_path(endpoint: &str, path: Option<&str>) -> String {
    let path = path.unwrap_or_default();
    if path.is_empty() {
        return if endpoint.ends_with('/') {
            endpoint.to_owned()
        } else {
            format!("{endpoint}/")
        };
    }

    match (endpoint.ends_with('/'), path.strip_prefix('/')) {
        (true, Some(stripped)) => format!("{endpoint}{stripped}"),
        (false, Some(_)) | (true, None) => format!("{endpoint}{path}"),
        (false, None) => format!("{endpoint}/{path}"),
    }
}

/// `k1=v1&k2=v2` in `application/x-www-form-urlencoded` form, keys in order.
pub fn encode_parameters(parameters: &BTreeMap<String, String>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in parameters {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

/// The encoded parameters prefixed with `?`, or an empty string when there
/// are none.
pub fn to_query_string(parameters: &BTreeMap<String, String>) -> String {
    let encoded = encode_parameters(parameters);
    if encoded.is_empty() {
        return encoded;
    }
    format!("?{encoded}")
}
