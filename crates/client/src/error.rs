/// Errors from the workflow REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend refused the call. Some endpoints signal this with a
    /// non-2xx status, others with a 200 and an `error` field.
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The `error`/`message` field of the body, or the raw body.
        message: String,
        /// Raw response body for debugging.
        body: String,
    },

    /// A success response whose body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Text suitable for a notification body.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Prefers the JSON `error` field, then `message`; falls back to the raw
/// text, or the status line when the body is empty.
pub(crate) fn extract_message(status: u16, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(text) = map.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
            // plone.restapi nests {"error": {"type", "message"}}
            if let Some(text) = map
                .get(key)
                .and_then(|v| v.get("message"))
                .and_then(|v| v.as_str())
            {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_field() {
        let body = r#"{"error": "State with id 'review' already exists.", "message": "x"}"#;
        assert_eq!(extract_message(409, body), "State with id 'review' already exists.");
    }

    #[test]
    fn falls_back_to_message_field() {
        assert_eq!(extract_message(400, r#"{"message": "bad"}"#), "bad");
    }

    #[test]
    fn nested_error_object() {
        let body = r#"{"error": {"type": "NotFound", "message": "Resource not found"}}"#;
        assert_eq!(extract_message(404, body), "Resource not found");
    }

    #[test]
    fn raw_text_and_empty_body() {
        assert_eq!(extract_message(502, "Bad Gateway\n"), "Bad Gateway");
        assert_eq!(extract_message(500, ""), "HTTP 500");
    }

    #[test]
    fn user_message_uses_backend_text() {
        let err = ApiError::Api {
            status: 400,
            message: "A 'title' for the new state is required.".into(),
            body: String::new(),
        };
        assert_eq!(err.user_message(), "A 'title' for the new state is required.");
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_not_found());
    }
}
