use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error {0}: {1}")]
    ServerError(u16, String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid product: {0}")]
    Validation(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorPayload {
    detail: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Keep the backend's `detail` message whole; other bodies are truncated
    fn summarize_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        match Self::parse_detail(body) {
            Some(detail) => serde_json::json!({ "detail": detail }).to_string(),
            None => Self::truncate_body(body),
        }
    }

    fn parse_detail(body: &str) -> Option<String> {
        let payload: ErrorPayload = serde_json::from_str(body).ok()?;
        payload.detail.filter(|d| !d.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::summarize_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(truncated),
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError(code, truncated),
            code => ApiError::Http {
                status: code,
                body: truncated,
            },
        }
    }

    /// HTTP status carried by the error, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::ServerError(status, _) => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) | ApiError::Validation(_) => None,
        }
    }

    fn body(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::ServerError(_, body)
            | ApiError::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The human-readable `detail` field of a backend error payload
    pub fn detail(&self) -> Option<String> {
        Self::parse_detail(self.body()?)
    }

    /// Whether the backend rejected the request, as opposed to the
    /// request never completing
    pub fn is_rejection(&self) -> bool {
        self.body().is_some() || matches!(self, ApiError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "{}"),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(502, _)
        ));

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "bad");
        assert_eq!(err.status(), Some(400));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_detail_extraction() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"No active account found with the given credentials"}"#,
        );
        assert_eq!(
            err.detail().as_deref(),
            Some("No active account found with the given credentials")
        );

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"username":["required"]}"#);
        assert_eq!(err.detail(), None);

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert_eq!(err.detail(), None);

        assert_eq!(ApiError::InvalidResponse("x".into()).detail(), None);
    }

    #[test]
    fn test_long_detail_survives_truncation() {
        let detail = "x".repeat(MAX_ERROR_BODY_LENGTH + 100);
        let body = serde_json::json!({ "detail": detail, "code": "token_not_valid" }).to_string();

        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, &body);
        assert_eq!(err.detail().as_deref(), Some(detail.as_str()));

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, &"y".repeat(800));
        assert_eq!(err.detail(), None);
        assert!(err.to_string().contains("truncated, 800 total bytes"));
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
