//! Error types for the pet-care API client.
//!
//! # Design
//! Every non-2xx response lands in `ApiError::Http` with the raw status, the
//! body for debugging, and the server-supplied `message` when the body had
//! one. The state machines only ever look at [`ApiError::server_message`];
//! the status is kept for the 401 hook and for logs.

use thiserror::Error;

use crate::http::HttpResponse;
use crate::token::StorageError;

/// Errors returned by `PetcareClient` parse methods and `ApiClient` calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport could not complete the round-trip.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        message: Option<String>,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub(crate) fn from_response(response: &HttpResponse) -> Self {
        ApiError::Http {
            status: response.status,
            message: server_message(&response.body),
            body: response.body.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The human-readable message the server put in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Http {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Pull `message` out of a JSON error body. Validation errors sometimes
/// arrive as an array of strings; those are joined.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = match value.get("message")? {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!message.trim().is_empty()).then_some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_string_message() {
        let err = ApiError::from_response(&HttpResponse::new(
            401,
            r#"{"message":"Credenciales inválidas."}"#,
        ));
        assert_eq!(err.server_message(), Some("Credenciales inválidas."));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn joins_array_message() {
        let err = ApiError::from_response(&HttpResponse::new(
            400,
            r#"{"message":["email must be an email","password is too short"]}"#,
        ));
        assert_eq!(
            err.server_message(),
            Some("email must be an email, password is too short")
        );
    }

    #[test]
    fn missing_or_blank_message_is_none() {
        for body in ["", "internal error", r#"{"error":"x"}"#, r#"{"message":"  "}"#, r#"{"message":3}"#] {
            let err = ApiError::from_response(&HttpResponse::new(500, body));
            assert_eq!(err.server_message(), None, "body: {body}");
            assert_eq!(err.status(), Some(500));
        }
    }

    #[test]
    fn non_http_errors_carry_no_server_message() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.server_message(), None);
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "transport failed: connection refused");
    }
}
