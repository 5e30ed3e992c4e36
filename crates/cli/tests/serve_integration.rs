//! Integration tests for the `docket serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port, talks
//! plain HTTP/1.1 over a TCP socket, and verifies the responses.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

/// Ports are handed out sequentially from a per-process base, so parallel
/// test binaries do not collide.
fn next_port() -> u16 {
    static BASE: OnceLock<u16> = OnceLock::new();
    static OFFSET: AtomicU16 = AtomicU16::new(0);
    let base = *BASE.get_or_init(|| 20000 + (std::process::id() as u16 % 20000));
    base + OFFSET.fetch_add(1, Ordering::SeqCst)
}

/// Start `docket serve` on `port` with extra environment variables, and
/// wait until the port accepts connections.
fn start_server(port: u16, envs: &[(&str, &str)]) -> Child {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docket"));
    cmd.arg("serve").arg("--port").arg(port.to_string());
    for (key, value) in envs {
        cmd.env(key, value);
    }
    // Keep server logs out of the test output
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let child = cmd.spawn().expect("failed to start docket serve");

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }
    child
}

/// A parsed HTTP/1.1 response.
struct HttpResponse {
    status: u16,
    head: String,
    body: String,
}

/// Send one request over a fresh connection and read the full response.
fn send_request(
    port: u16,
    method: &str,
    path: &str,
    extra_headers: &[(&str, &str)],
    body: Option<&str>,
) -> HttpResponse {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set_read_timeout");

    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: 127.0.0.1:{}\r\n",
        method, path, port
    );
    for (name, value) in extra_headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    if let Some(body) = body {
        request.push_str("Content-Type: application/json\r\n");
        request.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    request.push_str("Connection: close\r\n\r\n");
    request.push_str(body.unwrap_or(""));
    stream
        .write_all(request.as_bytes())
        .expect("failed to write request");

    let mut raw = String::new();
    let _ = stream.read_to_string(&mut raw);
    parse_response(&raw)
}

fn http_get(port: u16, path: &str) -> (u16, String) {
    let response = send_request(port, "GET", path, &[], None);
    (response.status, response.body)
}

fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    let response = send_request(port, "POST", path, &[], Some(body));
    (response.status, response.body)
}

fn http_get_with_headers(
    port: u16,
    path: &str,
    extra_headers: &[(&str, &str)],
) -> (u16, String, String) {
    let response = send_request(port, "GET", path, extra_headers, None);
    (response.status, response.head, response.body)
}

/// Value of a response header, case-insensitive.
fn extract_header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

fn parse_response(raw: &str) -> HttpResponse {
    let (head, tail) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let body = match extract_header(head, "transfer-encoding") {
        Some(value) if value.eq_ignore_ascii_case("chunked") => unchunk(tail),
        _ => tail.to_string(),
    };
    HttpResponse {
        status,
        head: head.to_string(),
        body,
    }
}

/// Reassemble a chunked transfer-encoded body.
fn unchunk(data: &str) -> String {
    let mut body = String::new();
    let mut rest = data;
    loop {
        let (size_line, tail) = match rest.split_once("\r\n") {
            Some(parts) => parts,
            None => break,
        };
        let size = match usize::from_str_radix(size_line.trim(), 16) {
            Ok(0) | Err(_) => break,
            Ok(size) => size,
        };
        if tail.len() < size {
            body.push_str(tail);
            break;
        }
        body.push_str(&tail[..size]);
        rest = tail.get(size + 2..).unwrap_or("");
    }
    body
}

/// Helper: register a document via POST /documents.
fn create_doc(port: u16, kind: &str, id: &str) -> (u16, String) {
    let body = serde_json::json!({"kind": kind, "id": id, "created_by": "clerk-1"}).to_string();
    http_post(port, "/documents", &body)
}

/// Helper: build a POST /transitions body.
fn transition_body(kind: &str, id: &str, from: &str, to: &str, actor_id: &str, role: &str) -> String {
    serde_json::json!({
        "doc": {"kind": kind, "id": id},
        "from_status": from,
        "to_status": to,
        "actor": {"id": actor_id, "role": role},
    })
    .to_string()
}

/// Helper: drive a document along a path of edges as an admin, asserting
/// every hop applies.
fn walk(port: u16, kind: &str, id: &str, path: &[(&str, &str)]) {
    for (from, to) in path {
        let (status, body) = http_post(
            port,
            "/transitions",
            &transition_body(kind, id, from, to, "admin-1", "admin"),
        );
        assert_eq!(status, 200, "walk {} -> {} failed: {}", from, to, body);
    }
}

const PATH_TO_FOR_VOTING: [(&str, &str); 4] = [
    ("draft", "pending"),
    ("pending", "under_review"),
    ("under_review", "committee_review"),
    ("committee_review", "for_voting"),
];

#[test]
fn health_returns_200_with_version() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = http_get(port, "/health");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["status"], "ok");
    assert!(
        json.get("version").is_some(),
        "version field must be present"
    );
}

#[test]
fn graph_returns_the_lifecycle() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = http_get(port, "/graph");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(12));
    assert_eq!(json["edges"].as_array().map(Vec::len), Some(24));
    assert_eq!(json["terminal"], serde_json::json!(["archived"]));

    // Spot-check one edge
    let edges = json["edges"].as_array().expect("edges array");
    assert!(
        edges
            .iter()
            .any(|e| e["from"] == "for_voting" && e["to"] == "approved"),
        "for_voting -> approved must be listed"
    );
}

#[test]
fn graph_etag_conditional_requests() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    // First request: 200 with ETag header
    let (status1, headers1, body1) = http_get_with_headers(port, "/graph", &[]);
    assert_eq!(status1, 200, "first request should be 200, body: {}", body1);

    let etag_header = extract_header(&headers1, "etag").expect("response must have ETag header");
    assert!(!etag_header.is_empty(), "ETag header must not be empty");

    // Second request: If-None-Match with correct ETag -> 304
    let (status2, _headers2, body2) =
        http_get_with_headers(port, "/graph", &[("If-None-Match", etag_header)]);
    assert_eq!(
        status2, 304,
        "matching If-None-Match should return 304, got body: {}",
        body2
    );
    assert!(
        body2.is_empty(),
        "304 response must have empty body, got: {}",
        body2
    );

    // Third request: If-None-Match with wrong ETag -> 200
    let (status3, _headers3, body3) =
        http_get_with_headers(port, "/graph", &[("If-None-Match", "\"wrong\"")]);

    child.kill().ok();
    child.wait().ok();

    assert_eq!(
        status3, 200,
        "mismatched If-None-Match should return 200, body: {}",
        body3
    );
}

#[test]
fn create_then_get_document() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = create_doc(port, "ordinance", "2025-001");
    assert_eq!(status, 201, "create should return 201, body: {}", body);
    let created: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(created["doc"]["kind"], "ordinance");
    assert_eq!(created["doc"]["id"], "2025-001");
    assert_eq!(created["status"], "draft");
    assert_eq!(created["version"], 0);
    assert_eq!(created["created_by"], "clerk-1");
    assert_eq!(created["approved_by"], serde_json::Value::Null);

    let (get_status, get_body) = http_get(port, "/documents/ordinance/2025-001");
    assert_eq!(get_status, 200);
    let fetched: serde_json::Value = serde_json::from_str(&get_body).expect("valid JSON");
    assert_eq!(fetched["status"], "draft");
    assert_eq!(fetched["version"], 0);

    // Same (kind, id) again -> 409
    let (dup_status, dup_body) = create_doc(port, "ordinance", "2025-001");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(dup_status, 409, "duplicate create should 409: {}", dup_body);
    let dup: serde_json::Value = serde_json::from_str(&dup_body).expect("valid JSON");
    assert!(dup.get("error").is_some());
}

#[test]
fn unknown_document_returns_404() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = http_get(port, "/documents/ordinance/nope");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert!(json.get("error").is_some());
}

#[test]
fn unknown_kind_in_path_returns_400() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = http_get(port, "/documents/motion/2025-001");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 400);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "unknown document kind 'motion'");
}

#[test]
fn list_documents_filters_by_kind_and_status() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "o-1");
    create_doc(port, "ordinance", "o-2");
    create_doc(port, "resolution", "r-1");
    walk(port, "ordinance", "o-1", &[("draft", "pending")]);

    let (status, body) = http_get(port, "/documents");
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["documents"].as_array().map(Vec::len), Some(3));

    let (_, drafts) = http_get(port, "/documents?status=draft");
    let drafts: serde_json::Value = serde_json::from_str(&drafts).expect("valid JSON");
    assert_eq!(drafts["documents"].as_array().map(Vec::len), Some(2));

    let (_, resolutions) = http_get(port, "/documents?kind=resolution");
    child.kill().ok();
    child.wait().ok();

    let resolutions: serde_json::Value = serde_json::from_str(&resolutions).expect("valid JSON");
    let docs = resolutions["documents"].as_array().expect("documents array");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["doc"]["id"], "r-1");
}

#[test]
fn applied_transition_moves_the_document() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "2025-002");
    let (status, body) = http_post(
        port,
        "/transitions",
        &transition_body("ordinance", "2025-002", "draft", "pending", "staff-1", "staff"),
    );
    assert_eq!(status, 200, "transition should apply, body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["outcome"], "applied");
    assert_eq!(json["record"]["from_status"], "draft");
    assert_eq!(json["record"]["to_status"], "pending");
    assert_eq!(json["record"]["changed_by"], "staff-1");
    assert_eq!(json["record"]["from_version"], 0);
    assert_eq!(json["record"]["to_version"], 1);

    let (_, doc_body) = http_get(port, "/documents/ordinance/2025-002");
    child.kill().ok();
    child.wait().ok();

    let doc: serde_json::Value = serde_json::from_str(&doc_body).expect("valid JSON");
    assert_eq!(doc["status"], "pending");
    assert_eq!(doc["version"], 1);
}

#[test]
fn off_graph_transition_returns_422() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "2025-003");
    let (status, body) = http_post(
        port,
        "/transitions",
        &transition_body(
            "ordinance",
            "2025-003",
            "draft",
            "implemented",
            "root-1",
            "super_admin",
        ),
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 422, "off-graph move should 422, body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["outcome"], "denied");
    assert_eq!(json["reason"]["type"], "InvalidTransition");
    assert_eq!(json["reason"]["from"], "draft");
    assert_eq!(json["reason"]["to"], "implemented");
}

#[test]
fn role_gated_destination_returns_422_until_an_admin_acts() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "resolution", "2025-010");
    walk(port, "resolution", "2025-010", &PATH_TO_FOR_VOTING);

    // A councilor may not approve
    let (status, body) = http_post(
        port,
        "/transitions",
        &transition_body(
            "resolution",
            "2025-010",
            "for_voting",
            "approved",
            "councilor-5",
            "councilor",
        ),
    );
    assert_eq!(status, 422, "councilor approve should 422, body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["outcome"], "denied");
    assert_eq!(json["reason"]["type"], "RoleNotPermitted");
    assert_eq!(json["reason"]["role"], "councilor");

    // The denial left the document untouched
    let (_, doc_body) = http_get(port, "/documents/resolution/2025-010");
    let doc: serde_json::Value = serde_json::from_str(&doc_body).expect("valid JSON");
    assert_eq!(doc["status"], "for_voting");

    // An admin may, and the approver is recorded
    let (admin_status, admin_body) = http_post(
        port,
        "/transitions",
        &transition_body(
            "resolution",
            "2025-010",
            "for_voting",
            "approved",
            "admin-1",
            "admin",
        ),
    );
    assert_eq!(admin_status, 200, "admin approve failed: {}", admin_body);

    let (_, doc_body) = http_get(port, "/documents/resolution/2025-010");
    child.kill().ok();
    child.wait().ok();

    let doc: serde_json::Value = serde_json::from_str(&doc_body).expect("valid JSON");
    assert_eq!(doc["status"], "approved");
    assert_eq!(doc["approved_by"], "admin-1");
}

#[test]
fn stale_from_status_returns_409() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "2025-004");
    walk(port, "ordinance", "2025-004", &[("draft", "pending")]);

    // Caller still believes the document is at draft
    let (status, body) = http_post(
        port,
        "/transitions",
        &transition_body(
            "ordinance",
            "2025-004",
            "draft",
            "cancelled",
            "staff-1",
            "staff",
        ),
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 409, "stale request should 409, body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["outcome"], "conflict");
    assert_eq!(json["current_status"], "pending");
}

#[test]
fn transition_for_unknown_document_returns_404() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = http_post(
        port,
        "/transitions",
        &transition_body("ordinance", "ghost", "draft", "pending", "staff-1", "staff"),
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert!(json.get("error").is_some());
}

#[test]
fn available_transitions_respect_the_role() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "2025-005");

    let (status, body) = http_get(port, "/documents/ordinance/2025-005/transitions?role=staff");
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["current_status"], "draft");
    assert_eq!(json["targets"], serde_json::json!(["pending", "cancelled"]));

    walk(port, "ordinance", "2025-005", &PATH_TO_FOR_VOTING);

    let (_, councilor) = http_get(
        port,
        "/documents/ordinance/2025-005/transitions?role=councilor",
    );
    let councilor: serde_json::Value = serde_json::from_str(&councilor).expect("valid JSON");
    assert_eq!(
        councilor["targets"],
        serde_json::json!(["rejected", "postponed"]),
        "approved must be hidden from a councilor"
    );

    let (_, admin) = http_get(port, "/documents/ordinance/2025-005/transitions?role=admin");
    child.kill().ok();
    child.wait().ok();

    let admin: serde_json::Value = serde_json::from_str(&admin).expect("valid JSON");
    assert_eq!(
        admin["targets"],
        serde_json::json!(["approved", "rejected", "postponed"])
    );
}

#[test]
fn bulk_transition_reports_partial_success() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "b-1");
    create_doc(port, "ordinance", "b-2");

    let body = serde_json::json!({
        "refs": [
            {"kind": "ordinance", "id": "b-1"},
            {"kind": "ordinance", "id": "b-2"},
            {"kind": "ordinance", "id": "missing"},
        ],
        "to_status": "cancelled",
        "actor": {"id": "admin-1", "role": "admin"},
        "notes": "batch close",
    })
    .to_string();

    let (status, resp) = http_post(port, "/transitions/bulk", &body);
    assert_eq!(status, 200, "bulk must not error on partial: {}", resp);
    let json: serde_json::Value = serde_json::from_str(&resp).expect("valid JSON");
    assert_eq!(json["requested"], 3);
    assert_eq!(json["applied"], 2);

    let items = json["items"].as_array().expect("items array");
    assert_eq!(items.len(), 3);
    let missing = items
        .iter()
        .find(|item| item["doc"]["id"] == "missing")
        .expect("missing item reported");
    assert_eq!(missing["outcome"]["type"], "SkippedNotFound");

    // The applied documents really moved
    let (_, b1) = http_get(port, "/documents/ordinance/b-1");
    child.kill().ok();
    child.wait().ok();

    let b1: serde_json::Value = serde_json::from_str(&b1).expect("valid JSON");
    assert_eq!(b1["status"], "cancelled");
}

#[test]
fn bulk_to_privileged_destination_skips_for_unprivileged_role() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "ordinance", "b-3");
    walk(port, "ordinance", "b-3", &[("draft", "cancelled")]);

    let body = serde_json::json!({
        "refs": [{"kind": "ordinance", "id": "b-3"}],
        "to_status": "archived",
        "actor": {"id": "councilor-5", "role": "councilor"},
    })
    .to_string();

    let (status, resp) = http_post(port, "/transitions/bulk", &body);
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200, "denial is not an HTTP error: {}", resp);
    let json: serde_json::Value = serde_json::from_str(&resp).expect("valid JSON");
    assert_eq!(json["applied"], 0);
    let outcome = &json["items"][0]["outcome"];
    assert_eq!(outcome["type"], "SkippedInvalidTransition");
    assert_eq!(outcome["reason"]["type"], "RoleNotPermitted");
}

#[test]
fn history_is_newest_first() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    create_doc(port, "resolution", "h-1");
    walk(
        port,
        "resolution",
        "h-1",
        &[("draft", "pending"), ("pending", "under_review")],
    );

    let (status, body) = http_get(port, "/documents/resolution/h-1/history");
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    let history = json["history"].as_array().expect("history array");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["to_status"], "under_review");
    assert_eq!(history[1]["to_status"], "pending");
    assert!(history[0].get("changed_at").is_some());

    // History of an unknown document is a 404, not an empty list
    let (missing_status, _) = http_get(port, "/documents/resolution/ghost/history");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(missing_status, 404);
}

#[test]
fn rate_limit_returns_429_with_retry_after() {
    let port = next_port();
    let mut child = start_server(port, &[("DOCKET_RATE_LIMIT", "3")]);

    for _ in 0..3 {
        let (status, _) = http_get(port, "/health");
        assert_eq!(status, 200);
    }
    let (status, body) = http_get(port, "/health");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 429, "fourth request should be limited: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "rate limit exceeded");
    assert!(json.get("retry_after").is_some());
}

#[test]
fn api_key_guards_everything_but_health() {
    let port = next_port();
    let mut child = start_server(port, &[("DOCKET_API_KEY", "sekrit")]);

    // /health is exempt
    let (health_status, _) = http_get(port, "/health");
    assert_eq!(health_status, 200, "/health must stay open");

    // No credentials -> 401
    let (status, _) = http_get(port, "/graph");
    assert_eq!(status, 401);

    // Wrong key -> 403
    let (status, _, _) =
        http_get_with_headers(port, "/graph", &[("Authorization", "Bearer wrong")]);
    assert_eq!(status, 403);

    // Bearer with the right key -> 200
    let (status, _, _) =
        http_get_with_headers(port, "/graph", &[("Authorization", "Bearer sekrit")]);
    assert_eq!(status, 200);

    // X-API-Key with the right key -> 200
    let (status, _, _) = http_get_with_headers(port, "/graph", &[("X-API-Key", "sekrit")]);
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
}

#[test]
fn not_found_returns_404() {
    let port = next_port();
    let mut child = start_server(port, &[]);

    let (status, body) = http_get(port, "/nonexistent");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["error"], "not found");
}
