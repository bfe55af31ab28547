use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Default request body limit, shared with the `DefaultBodyLimit` layer in main.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Rejects requests whose URI tries to walk out of a path, and oversized
/// POST/PUT bodies before they are read.
pub async fn validate_request_middleware(req: Request, next: Next) -> Response {
    let uri_path = req.uri().path();
    if contains_path_traversal(uri_path) {
        tracing::warn!("Path traversal in request URI: {}", sanitize_for_logging(uri_path));
        return reject(StatusCode::BAD_REQUEST, "INVALID_PATH", "Path traversal detected in request".to_string());
    }

    if matches!(req.method(), &Method::POST | &Method::PUT) {
        let length = req
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if let Some(length) = length {
            if length > MAX_BODY_SIZE {
                return reject(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PAYLOAD_TOO_LARGE",
                    format!("Request body exceeds maximum size of {} bytes", MAX_BODY_SIZE),
                );
            }
        }
    }

    next.run(req).await
}

fn reject(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(json!({
            "error": { "code": code, "message": message },
            "status": status.as_u16(),
        })),
    )
        .into_response()
}

/// `..`, `/./`, null bytes and their URL-encoded forms.
pub fn contains_path_traversal(path: &str) -> bool {
    let lower = path.to_lowercase();

    if path.contains("/..") || path.contains("\\..") || path.starts_with("..") {
        return true;
    }
    if path.contains("/./") || path.contains("\\.\\") {
        return true;
    }

    // single and double encoded
    let encoded_patterns = ["%2e%2e", "%252e%252e", "%2e/", "%2f%2e", "/%2e", "%5c%2e", "%00"];
    if encoded_patterns.iter().any(|p| lower.contains(p)) {
        return true;
    }

    path.contains('\0')
}

/// Strips control characters and caps the length, for user input in log lines.
pub fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .take(200)
        .collect::<String>()
        .replace('"', "\\\"")
}
