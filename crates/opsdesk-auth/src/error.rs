//! Error types for token operations.

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Token endpoint error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token endpoint answered with a non-success status.
    #[error("Token endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// Endpoint rejected the request inside a successful response envelope.
    #[error("Token request rejected: {0}")]
    Rejected(String),

    /// Response body did not have the expected shape.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Returns true if the endpoint refused our credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    /// Builds a status error, keeping at most 512 bytes of the body.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        let mut end = body.len().min(512);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        Self::Status {
            status,
            body: body[..end].to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_truncates_body() {
        let body = "x".repeat(2000);
        let Error::Status { status, body } = Error::status(500, &body) else {
            panic!("expected status error");
        };
        assert_eq!(status, 500);
        assert_eq!(body.len(), 512);
    }

    #[test]
    fn test_status_truncation_respects_char_boundary() {
        let body = format!("{}é", "a".repeat(511));
        let Error::Status { body, .. } = Error::status(400, &body) else {
            panic!("expected status error");
        };
        assert_eq!(body.len(), 511);
    }

    #[test]
    fn test_unauthorized() {
        assert!(Error::status(401, "").is_unauthorized());
        assert!(Error::status(403, "").is_unauthorized());
        assert!(!Error::status(500, "").is_unauthorized());
        assert!(!Error::InvalidResponse("x".into()).is_unauthorized());
    }
}
