//! Lifecycle graph rendering shared by `docket graph` and the `/graph`
//! endpoint.

use sha2::{Digest, Sha256};

use docket_core::graph::{edges, is_terminal, successors_of};
use docket_core::Status;

/// JSON description of the lifecycle graph: every status, every edge, and
/// the terminal statuses. Stable for a given build of the binary.
pub(crate) fn graph_value() -> serde_json::Value {
    let nodes: Vec<&str> = Status::ALL.iter().map(Status::as_str).collect();
    let edge_list: Vec<serde_json::Value> = edges()
        .map(|(from, to)| serde_json::json!({"from": from, "to": to}))
        .collect();
    let terminal: Vec<&str> = Status::ALL
        .iter()
        .filter(|s| is_terminal(**s))
        .map(|s| s.as_str())
        .collect();
    serde_json::json!({
        "nodes": nodes,
        "edges": edge_list,
        "terminal": terminal,
    })
}

/// Text rendering: one `from -> to` line per edge, terminal statuses
/// flagged on a line of their own.
pub(crate) fn graph_text() -> String {
    let mut out = String::new();
    for from in Status::ALL {
        if is_terminal(from) {
            out.push_str(&format!("{} (terminal)\n", from));
            continue;
        }
        for &to in successors_of(from) {
            out.push_str(&format!("{} -> {}\n", from, to));
        }
    }
    out
}

/// SHA-256 over the canonical JSON serialization, used as the `/graph`
/// ETag.
pub(crate) fn compute_etag(value: &serde_json::Value) -> String {
    let canonical = serde_json::to_string(value).unwrap_or_default();
    let hash = Sha256::digest(canonical.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_value_lists_every_status_and_edge() {
        let value = graph_value();
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(12));
        assert_eq!(value["edges"].as_array().map(Vec::len), Some(24));
        assert_eq!(value["terminal"], serde_json::json!(["archived"]));
    }

    #[test]
    fn graph_text_renders_edges_and_terminals() {
        let text = graph_text();
        assert!(text.contains("draft -> pending"));
        assert!(text.contains("rejected -> draft"));
        assert!(text.contains("archived (terminal)"));
        assert_eq!(text.lines().count(), 25); // 24 edges plus the archived line
    }

    #[test]
    fn etag_is_hex_and_stable() {
        let etag = compute_etag(&graph_value());
        assert_eq!(etag.len(), 64);
        assert!(etag.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(etag, compute_etag(&graph_value()));
    }
}
