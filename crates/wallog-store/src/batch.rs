//! The independent-operation batch protocol.
//!
//! A batch is one `multipart/mixed` POST carrying many HTTP operations.
//! There is no changeset wrapper, so operations are NOT transactional:
//! with continue-on-error set, a failed operation never rolls back or
//! aborts its siblings. Each part carries a content id; the store echoes
//! it on the matching sub-response. Sub-responses for no-content
//! successes may be omitted entirely.

use serde_json::Value;

/// HTTP method of one batched operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMethod {
    Patch,
    Post,
}

impl std::fmt::Display for BatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchMethod::Patch => write!(f, "PATCH"),
            BatchMethod::Post => write!(f, "POST"),
        }
    }
}

/// One operation inside a batch.
#[derive(Debug, Clone)]
pub struct BatchOperation {
    pub method: BatchMethod,
    /// Path relative to the service root, e.g. `/alphacases(42)`.
    pub path: String,
    /// JSON payload; `None` for bodyless operations.
    pub body: Option<Value>,
    /// Correlation id, unique within the batch.
    pub content_id: u32,
}

impl BatchOperation {
    pub fn patch(path: impl Into<String>, body: Value, content_id: u32) -> Self {
        Self {
            method: BatchMethod::Patch,
            path: path.into(),
            body: Some(body),
            content_id,
        }
    }

    pub fn post(path: impl Into<String>, body: Value, content_id: u32) -> Self {
        Self {
            method: BatchMethod::Post,
            path: path.into(),
            body: Some(body),
            content_id,
        }
    }
}

/// One sub-response of a batch, correlated back by content id.
#[derive(Debug, Clone)]
pub struct OperationResponse {
    pub content_id: String,
    pub status: u16,
    pub status_text: String,
    pub body: Option<Value>,
}

impl OperationResponse {
    /// 2xx sub-response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Remote error message, falling back to the status line.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", self.status, self.status_text))
    }

    /// Nested remote error code, when the body carries one.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Outcome of one batch submission.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Whether the batch request itself succeeded.
    pub ok: bool,
    /// HTTP status of the batch request.
    pub status: u16,
    /// Parsed sub-responses. May be empty even on success: the store
    /// omits parts for 204 sub-responses.
    pub responses: Vec<OperationResponse>,
}

/// Render the multipart request body for a batch.
///
/// Operation paths are absolute-ized against `service_root` so each part
/// is a complete HTTP request line.
#[must_use]
pub fn build_batch_body(boundary: &str, service_root: &str, operations: &[BatchOperation]) -> String {
    let mut body = String::new();

    for op in operations {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str("Content-Transfer-Encoding: binary\r\n");
        body.push_str(&format!("Content-ID: {}\r\n\r\n", op.content_id));

        body.push_str(&format!("{} {}{} HTTP/1.1\r\n", op.method, service_root, op.path));
        body.push_str("Content-Type: application/json\r\n");
        body.push_str("Accept: application/json\r\n");

        match &op.body {
            Some(payload) => {
                let json = payload.to_string();
                body.push_str(&format!("Content-Length: {}\r\n\r\n", json.len()));
                body.push_str(&json);
            }
            None => body.push_str("\r\n"),
        }

        body.push_str("\r\n");
    }

    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

/// Parse the multipart response of a batch.
///
/// Each part is an independent HTTP response separated by the boundary
/// the store chose. Parts without a recognizable status line are
/// skipped; parts without a Content-ID header get sequential ids, in
/// order of appearance.
#[must_use]
pub fn parse_batch_response(text: &str) -> Vec<OperationResponse> {
    let mut results = Vec::new();

    let Some(boundary) = response_boundary(text) else {
        return results;
    };

    let marker = format!("--{boundary}");
    let mut fallback_id = 1u32;

    for part in text.split(marker.as_str()) {
        let part = part.trim();
        if part.is_empty() || part == "--" {
            continue;
        }

        let Some((status, status_text)) = parse_status_line(part) else {
            continue;
        };

        let content_id = parse_content_id(part).unwrap_or_else(|| fallback_id.to_string());

        let body = extract_json_body(part);

        results.push(OperationResponse {
            content_id,
            status,
            status_text,
            body,
        });
        fallback_id += 1;
    }

    results
}

fn response_boundary(text: &str) -> Option<String> {
    let rest = text.strip_prefix("--")?;
    let line = rest.lines().next()?;
    let boundary = line.trim();
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

fn parse_status_line(part: &str) -> Option<(u16, String)> {
    let idx = part.find("HTTP/1.1")?;
    let after = part[idx + "HTTP/1.1".len()..].trim_start_matches([' ', '\t']);
    let line = after.lines().next()?.trim_end_matches('\r');
    let mut pieces = line.splitn(2, ' ');
    let status: u16 = pieces.next()?.parse().ok()?;
    let status_text = pieces.next().unwrap_or("").trim().to_string();
    Some((status, status_text))
}

fn parse_content_id(part: &str) -> Option<String> {
    for line in part.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = strip_prefix_ignore_case(line, "content-id:") {
            let id = rest.trim();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn extract_json_body(part: &str) -> Option<Value> {
    let start = part.find('{')?;
    let end = part.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&part[start..=end]).ok()
}
