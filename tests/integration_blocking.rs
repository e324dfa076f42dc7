#![cfg(feature = "ureq-transport")]

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sdk_exec::prelude::{
    BoxError, Error, HttpMethodName, JsonErrorResponseHandler, RetryPolicy, ServiceClient,
    ServiceRequest, ServiceResponse, TransportErrorKind, WireResponse,
};
use serde_json::Value;

#[derive(Clone)]
struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MockResponse {
    fn new(
        status: u16,
        headers: Vec<(impl Into<String>, impl Into<String>)>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            body: body.into(),
        }
    }
}

#[derive(Clone, Debug)]
struct CapturedRequest {
    method: String,
    target: String,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

struct MockServer {
    endpoint: String,
    address: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    join: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Answers one connection per scripted response, in order, then stops.
    fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let address = listener.local_addr().expect("read local address");
        listener
            .set_nonblocking(true)
            .expect("set listener nonblocking");

        let captured = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&captured);
        let join = thread::spawn(move || serve(listener, responses, &log));

        Self {
            endpoint: format!("http://{address}"),
            address: address.to_string(),
            captured,
            join: Some(join),
        }
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.captured
            .lock()
            .expect("lock captured requests")
            .clone()
    }
}

fn serve(
    listener: TcpListener,
    responses: Vec<MockResponse>,
    log: &Mutex<Vec<CapturedRequest>>,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut script = responses.iter();
    let mut next = script.next();

    while let Some(response) = next {
        if Instant::now() >= deadline {
            break;
        }
        match listener.accept() {
            Ok((mut stream, _)) => {
                let _ = stream.set_nonblocking(false);
                if let Ok(request) = read_request(&mut stream) {
                    log.lock().expect("lock captured requests").push(request);
                }
                let _ = write_response(&mut stream, response);
                next = script.next();
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(_) => break,
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(1)))?;

    let mut raw = Vec::new();
    loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
        if find_header_end(&raw).is_some() {
            break;
        }
    }

    let header_end = find_header_end(&raw).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "malformed request without header terminator",
        )
    })?;

    let header_text = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "missing request line")
    })?;
    let mut request_line_parts = request_line.split_whitespace();
    let method = request_line_parts.next().unwrap_or_default().to_owned();
    let target = request_line_parts.next().unwrap_or_default().to_owned();

    let mut headers = BTreeMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = raw[header_end + 4..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn write_response(stream: &mut TcpStream, response: &MockResponse) -> std::io::Result<()> {
    let body = &response.body;
    let mut raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        status_text(response.status),
        body.len()
    );
    for (name, value) in &response.headers {
        raw.push_str(name);
        raw.push_str(": ");
        raw.push_str(value);
        raw.push_str("\r\n");
    }
    raw.push_str("\r\n");

    stream.write_all(raw.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn json_body(response: &WireResponse) -> Result<ServiceResponse<Value>, BoxError> {
    Ok(ServiceResponse::without_metadata(response.json()?))
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy::standard()
        .max_retries(2)
        .base_scale(Duration::from_millis(1))
        .max_backoff(Duration::from_millis(10))
}

fn client() -> ServiceClient {
    ServiceClient::builder()
        .retry_policy(fast_retries())
        .build()
        .expect("client should build")
}

#[test]
fn post_without_content_sends_form_encoded_parameters() {
    let server = MockServer::start(vec![MockResponse::new(
        200,
        vec![("Content-Type", "application/json")],
        br#"{"reservations":[]}"#.to_vec(),
    )]);

    let mut request = ServiceRequest::new("AmazonEC2", HttpMethodName::Post, &server.endpoint)
        .parameter("Action", "DescribeInstances")
        .parameter("Filter.1.Name", "instance state");
    let body = client()
        .execute(&mut request, &json_body, &JsonErrorResponseHandler)
        .expect("post should succeed");

    assert_eq!(body["reservations"], Value::Array(Vec::new()));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/");
    assert_eq!(
        requests[0].body,
        b"Action=DescribeInstances&Filter.1.Name=instance+state".to_vec()
    );
    assert_eq!(
        requests[0].headers.get("content-type").map(String::as_str),
        Some("application/x-www-form-urlencoded; charset=utf-8")
    );
    assert_eq!(
        requests[0].headers.get("host").map(String::as_str),
        Some(server.address.as_str())
    );
    assert!(
        requests[0]
            .headers
            .get("user-agent")
            .is_some_and(|value| value.starts_with("sdk-exec/"))
    );
}

#[test]
fn get_sends_parameters_in_the_query_string() {
    let server = MockServer::start(vec![MockResponse::new(
        200,
        vec![("Content-Type", "application/json")],
        br#"{"ok":true}"#.to_vec(),
    )]);

    let mut request = ServiceRequest::new("AmazonS3", HttpMethodName::Get, &server.endpoint)
        .resource_path("/bucket")
        .parameter("prefix", "logs/2024")
        .parameter("max-keys", "10");
    let body = client()
        .execute(&mut request, &json_body, &JsonErrorResponseHandler)
        .expect("get should succeed");

    assert_eq!(body["ok"], true);
    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/bucket?max-keys=10&prefix=logs%2F2024");
    assert!(requests[0].body.is_empty());
}

#[test]
fn put_sends_content_with_parameters_in_the_query() {
    let server = MockServer::start(vec![MockResponse::new(
        200,
        vec![("Content-Type", "application/json")],
        br#"{"etag":"abc"}"#.to_vec(),
    )]);

    let mut request = ServiceRequest::new("AmazonS3", HttpMethodName::Put, &server.endpoint)
        .resource_path("bucket/key.txt")
        .parameter("versionId", "3")
        .try_header("content-type", "text/plain")
        .expect("valid header")
        .content("hello object");
    client()
        .execute(&mut request, &json_body, &JsonErrorResponseHandler)
        .expect("put should succeed");

    let requests = server.requests();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].target, "/bucket/key.txt?versionId=3");
    assert_eq!(requests[0].body, b"hello object".to_vec());
    assert_eq!(
        requests[0].headers.get("content-type").map(String::as_str),
        Some("text/plain")
    );
}

#[test]
fn unavailable_service_is_retried_and_request_id_is_cached() {
    let server = MockServer::start(vec![
        MockResponse::new(
            503,
            vec![("Content-Type", "application/json")],
            br#"{"message":"try later"}"#.to_vec(),
        ),
        MockResponse::new(
            200,
            vec![
                ("Content-Type", "application/json"),
                ("x-amzn-RequestId", "req-2"),
            ],
            br#"{"ok":true}"#.to_vec(),
        ),
    ]);

    let client = client();
    let mut request = ServiceRequest::new("AmazonEC2", HttpMethodName::Post, &server.endpoint)
        .parameter("Action", "RunInstances");
    client
        .execute(&mut request, &json_body, &JsonErrorResponseHandler)
        .expect("second attempt should succeed");

    assert_eq!(server.requests().len(), 2);
    let metadata = client
        .response_metadata_for(request.original_request_key())
        .expect("metadata should be cached");
    assert_eq!(metadata.request_id(), Some("req-2"));
    assert_eq!(client.metrics_snapshot().retries, 1);
}

#[test]
fn error_documents_are_decoded_into_service_errors() {
    let server = MockServer::start(vec![MockResponse::new(
        400,
        vec![
            ("Content-Type", "application/json"),
            ("x-amz-request-id", "req-400"),
        ],
        br#"{"__type":"com.amazon.coral#ValidationException","message":"name is required"}"#
            .to_vec(),
    )]);

    let mut request = ServiceRequest::new("AmazonSQS", HttpMethodName::Post, &server.endpoint)
        .parameter("Action", "CreateQueue");
    let error = client()
        .execute(&mut request, &json_body, &JsonErrorResponseHandler)
        .expect_err("400 should fail");

    match error {
        Error::Service(service_error) => {
            assert_eq!(service_error.status_code, 400);
            assert_eq!(service_error.service_name, "AmazonSQS");
            assert_eq!(service_error.error_code(), Some("ValidationException"));
            assert_eq!(service_error.message, "name is required");
            assert_eq!(service_error.request_id.as_deref(), Some("req-400"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn refused_connections_are_retried_then_reported() {
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind throwaway listener");
        listener.local_addr().expect("read throwaway address")
    };

    let mut request = ServiceRequest::new(
        "AmazonEC2",
        HttpMethodName::Get,
        format!("http://{address}"),
    )
    .parameter("token", "secret");
    let error = client()
        .execute(&mut request, &json_body, &JsonErrorResponseHandler)
        .expect_err("nothing is listening");

    match error {
        Error::Transport {
            kind,
            attempts,
            uri,
            ..
        } => {
            assert_eq!(kind, TransportErrorKind::Connect);
            assert_eq!(attempts, 3);
            assert!(!uri.contains("secret"), "uri should be redacted: {uri}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
