//! Integration tests for the `chefmarket serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port with a
//! static-token config, makes HTTP requests, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Kills the server when the test ends, pass or fail.
struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("chefmarket.toml");
    std::fs::write(
        &path,
        r#"
reconcile_interval_secs = 0

[identity.tokens]
"admin-token" = "root@x.com"
"alice-token" = "a@x.com"
"#,
    )
    .expect("write config");
    path
}

fn start_server(port: u16, config: &Path) -> Server {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chefmarket"));
    cmd.arg("serve")
        .arg("--port")
        .arg(port.to_string())
        .arg("--config")
        .arg(config);
    cmd.env_remove("CHEFMARKET_IDENTITY_URL")
        .env_remove("CHEFMARKET_PAYMENT_SECRET_KEY");
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());

    let child = cmd.spawn().expect("failed to start chefmarket serve");
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server(child)
}

/// Send a raw HTTP/1.1 request and return (status, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let auth = token
        .map(|t| format!("Authorization: Bearer {}\r\n", t))
        .unwrap_or_default();
    let body = body.unwrap_or("");
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        method,
        path,
        port,
        auth,
        body.len(),
        body
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    parse_http_response(&response)
}

/// Parse an HTTP response into (status_code, body). Handles chunked bodies
/// by stripping chunk-size lines.
fn parse_http_response(response: &str) -> (u16, String) {
    let status = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let (headers, body) = response.split_once("\r\n\r\n").unwrap_or((response, ""));
    let chunked = headers
        .to_lowercase()
        .contains("transfer-encoding: chunked");
    let body = if chunked {
        body.split("\r\n")
            .enumerate()
            .filter(|(i, _)| i % 2 == 1)
            .map(|(_, chunk)| chunk)
            .collect::<String>()
    } else {
        body.to_string()
    };
    (status, body)
}

#[test]
fn health_is_public() {
    let dir = tempfile::TempDir::new().unwrap();
    let port = next_port();
    let _server = start_server(port, &write_config(dir.path()));

    let (status, body) = http_request(port, "GET", "/health", None, None);
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[test]
fn protected_routes_require_a_known_token() {
    let dir = tempfile::TempDir::new().unwrap();
    let port = next_port();
    let _server = start_server(port, &write_config(dir.path()));

    let (status, _) = http_request(port, "GET", "/orders/mine", None, None);
    assert_eq!(status, 401);
    let (status, _) = http_request(port, "GET", "/orders/mine", Some("forged"), None);
    assert_eq!(status, 401);
    let (status, _) = http_request(port, "GET", "/orders/mine", Some("alice-token"), None);
    assert_eq!(status, 200);
}

#[test]
fn profile_sync_round_trips_through_the_server() {
    let dir = tempfile::TempDir::new().unwrap();
    let port = next_port();
    let _server = start_server(port, &write_config(dir.path()));

    let (status, body) = http_request(
        port,
        "PUT",
        "/users",
        Some("alice-token"),
        Some(r#"{"email":"a@x.com","name":"Alice"}"#),
    );
    assert_eq!(status, 200, "{body}");

    let (status, body) = http_request(port, "GET", "/user/role/a@x.com", Some("alice-token"), None);
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["role"], "user");
}
