//! End-to-end tests for `wirepact serve`.
//!
//! Each test starts a stand-in Pact mock service (an axum app on an
//! ephemeral port, in a background thread) and the proxy as a child
//! process in front of it, then talks raw HTTP to the proxy.

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use wirepact_core::fixtures::person_schema_set;
use wirepact_core::{binary_to_json, json_to_binary, resolve};

/// Atomic port counter to avoid port conflicts between parallel tests.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 30000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

const JOE: &str = r#"{"name":"Joe Bloggs","email":"joe.bloggs@foobarmail.com"}"#;
const PLAIN: &str = r#"{"users":[{"name":"Joe Bloggs"}],"total":1}"#;

// ──────────────────────────────────────────────
// Stand-in mock service
// ──────────────────────────────────────────────

fn json_response(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

/// Answers with the request body as JSON and reports the content type it
/// was sent with.
async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let received = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("none"));
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response_headers.insert("x-received-content-type", received);
    (response_headers, body)
}

async fn cookies() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, HeaderValue::from_static("session=abc"));
    headers.append(header::SET_COOKIE, HeaderValue::from_static("theme=dark"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    (headers, "{}")
}

fn core_contract() -> Value {
    json!({
        "consumer": {"name": "consumer"},
        "provider": {"name": "provider"},
        "interactions": [
            {
                "description": "a request for a user",
                "request": {"method": "get", "path": "/users", "query": "type=verified"},
                "response": {"status": 200, "body": {"name": "Joe Bloggs"}}
            },
            {
                "description": "a request for users as JSON",
                "request": {"method": "get", "path": "/users-json-endpoint", "query": "type=verified"},
                "response": {"status": 200}
            }
        ],
        "metadata": {"pactSpecification": {"version": "2.0.0"}}
    })
}

fn mock_service() -> Router {
    Router::new()
        .route(
            "/interactions",
            post(|| async { "Registered interactions" })
                .delete(|| async { "Cleared interactions" }),
        )
        .route(
            "/interactions/verification",
            get(|| async { "Interactions matched" }),
        )
        .route(
            "/users",
            get(|| async { json_response(JOE.to_string()) }).post(echo),
        )
        .route(
            "/users-json-endpoint",
            get(|| async { json_response(PLAIN.to_string()) }),
        )
        .route("/cookies", get(cookies))
        .route(
            "/pact",
            post(|| async { json_response(core_contract().to_string()) }),
        )
}

/// Start the stand-in mock service and return its port.
fn start_upstream() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind upstream");
    listener.set_nonblocking(true).unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("upstream runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, mock_service()).await.unwrap();
        });
    });
    port
}

// ──────────────────────────────────────────────
// Proxy process and raw HTTP helpers
// ──────────────────────────────────────────────

/// Start `wirepact serve` in front of `upstream_port` and wait for it to
/// accept connections.
fn start_proxy(port: u16, upstream_port: u16, extra_args: &[&OsStr]) -> Child {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wirepact"));
    cmd.arg("serve")
        .arg("--upstream-url")
        .arg(format!("http://127.0.0.1:{}", upstream_port))
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .args(extra_args)
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = cmd.spawn().expect("failed to start wirepact serve");
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return child;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

fn stop(mut child: Child) {
    child.kill().ok();
    child.wait().ok();
}

struct RawResponse {
    status: u16,
    headers: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn header(&self, name: &str) -> Vec<&str> {
        self.headers
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
            .collect()
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("valid JSON body")
    }
}

fn http_request(
    port: u16,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> RawResponse {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Length: {}\r\nConnection: close\r\n",
        method,
        path,
        port,
        body.len()
    );
    for (name, value) in headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).expect("failed to write");
    stream.write_all(body).expect("failed to write body");

    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw);

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap_or(raw.len());
    let headers = String::from_utf8_lossy(&raw[..split]).to_string();
    let body = raw.get(split + 4..).unwrap_or(&[]).to_vec();
    let status = headers
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    RawResponse {
        status,
        headers,
        body,
    }
}

fn person_encoding() -> Value {
    json!({
        "type": "protobuf",
        "description": {"messageName": "Person", "fileDescriptorSet": person_schema_set()}
    })
}

fn register(port: u16, interaction: &Value) -> RawResponse {
    http_request(
        port,
        "POST",
        "/interactions",
        &[("Content-Type", "application/json")],
        interaction.to_string().as_bytes(),
    )
}

fn users_interaction() -> Value {
    json!({
        "description": "a request for a user",
        "providerState": "a user exists",
        "request": {"method": "GET", "path": "/users", "query": "type=verified"},
        "response": {"status": 200, "encoding": person_encoding(), "body": serde_json::from_str::<Value>(JOE).unwrap()}
    })
}

fn plain_interaction() -> Value {
    json!({
        "description": "a request for users as JSON",
        "request": {"method": "GET", "path": "/users-json-endpoint", "query": "type=verified"},
        "response": {"status": 200}
    })
}

// ──────────────────────────────────────────────
// Recording mode
// ──────────────────────────────────────────────

#[test]
fn registered_binary_response_is_encoded() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    let registered = register(port, &users_interaction());
    let response = http_request(port, "GET", "/users?type=verified", &[], b"");
    stop(child);

    assert_eq!(registered.status, 200);
    assert_eq!(registered.body, b"Registered interactions");
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), vec!["application/octet-stream"]);
    assert_eq!(
        response.header("content-length"),
        vec![response.body.len().to_string().as_str()]
    );

    let schema = resolve(&person_schema_set(), "Person").unwrap();
    let decoded: Value =
        serde_json::from_slice(&binary_to_json(&response.body, &schema).unwrap()).unwrap();
    assert_eq!(decoded, serde_json::from_str::<Value>(JOE).unwrap());
}

#[test]
fn plain_json_is_passed_through_unchanged() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    register(port, &plain_interaction());
    let response = http_request(port, "GET", "/users-json-endpoint?type=verified", &[], b"");
    stop(child);

    assert_eq!(response.status, 200);
    assert_eq!(response.body, PLAIN.as_bytes());
    assert_eq!(response.header("content-type"), vec!["application/json"]);
}

#[test]
fn unregistered_route_is_a_json_server_error() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    let response = http_request(port, "GET", "/never/registered", &[], b"");
    stop(child);

    assert_eq!(response.status, 500);
    assert_eq!(
        response.json()["error"],
        "no interaction registered for GET /never/registered"
    );
}

#[test]
fn invalid_registration_is_a_client_error() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    let response = http_request(port, "POST", "/interactions", &[], b"not json");
    stop(child);

    assert_eq!(response.status, 400);
    assert!(response.json()["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid interaction registration"));
}

#[test]
fn duplicate_registration_is_a_server_error() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    let first = register(port, &plain_interaction());
    let second = register(port, &plain_interaction());
    let cleared = http_request(port, "DELETE", "/interactions", &[], b"");
    let third = register(port, &plain_interaction());
    stop(child);

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 500);
    assert_eq!(cleared.body, b"Cleared interactions");
    assert_eq!(third.status, 200);
}

#[test]
fn multi_value_headers_are_not_merged() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    register(
        port,
        &json!({
            "description": "cookies",
            "request": {"method": "GET", "path": "/cookies"},
            "response": {"status": 200}
        }),
    );
    let response = http_request(port, "GET", "/cookies", &[], b"");
    stop(child);

    assert_eq!(response.status, 200);
    assert_eq!(response.header("set-cookie"), vec!["session=abc", "theme=dark"]);
}

#[test]
fn verification_probe_is_forwarded() {
    let upstream = start_upstream();
    let port = next_port();
    let child = start_proxy(port, upstream, &[]);

    let response = http_request(port, "GET", "/interactions/verification", &[], b"");
    stop(child);

    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"Interactions matched");
}

#[test]
fn contract_is_written_with_encodings() {
    let upstream = start_upstream();
    let port = next_port();
    let dir = TempDir::new().unwrap();
    let pacts = dir.path().join("pacts");
    let logs = dir.path().join("logs");
    let child = start_proxy(
        port,
        upstream,
        &[
            OsStr::new("--pact-dir"),
            pacts.as_os_str(),
            OsStr::new("--log-dir"),
            logs.as_os_str(),
        ],
    );

    register(port, &users_interaction());
    register(port, &plain_interaction());
    let response = http_request(port, "POST", "/pact", &[], b"");
    stop(child);

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), vec!["application/json"]);

    let written = std::fs::read(pacts.join("consumer.proto.json")).expect("contract written");
    assert_eq!(written, response.body);
    let document: Value = serde_json::from_slice(&written).unwrap();
    assert_eq!(
        document["interactions"][0]["response"]["encoding"],
        person_encoding()
    );
    assert!(document["interactions"][1]["response"]
        .get("encoding")
        .is_none());

    let log = std::fs::read_to_string(logs.join("wirepact.log")).unwrap();
    assert!(log.contains("registered interaction"), "log was: {}", log);
    assert!(log.contains("wrote contract"), "log was: {}", log);
}

// ──────────────────────────────────────────────
// Verification mode
// ──────────────────────────────────────────────

fn write_contract(dir: &Path) -> std::path::PathBuf {
    let contract = json!({
        "consumer": {"name": "consumer"},
        "provider": {"name": "provider"},
        "interactions": [{
            "description": "create a user",
            "request": {"method": "POST", "path": "/users", "encoding": person_encoding()},
            "response": {"status": 200}
        }]
    });
    let path = dir.join("consumer.proto.json");
    std::fs::write(&path, contract.to_string()).unwrap();
    path
}

#[test]
fn preloaded_contract_decodes_binary_requests() {
    let upstream = start_upstream();
    let port = next_port();
    let dir = TempDir::new().unwrap();
    let contract = write_contract(dir.path());
    let child = start_proxy(
        port,
        upstream,
        &[
            OsStr::new("--verification"),
            OsStr::new("--cache-schemas"),
            OsStr::new("--contract"),
            contract.as_os_str(),
        ],
    );

    let schema = resolve(&person_schema_set(), "Person").unwrap();
    let binary = json_to_binary(JOE.as_bytes(), &schema).unwrap();
    let response = http_request(
        port,
        "POST",
        "/users",
        &[("Content-Type", "application/octet-stream")],
        &binary,
    );
    stop(child);

    assert_eq!(response.status, 200);
    assert_eq!(
        response.header("x-received-content-type"),
        vec!["application/json"]
    );
    assert_eq!(response.json(), serde_json::from_str::<Value>(JOE).unwrap());
}
