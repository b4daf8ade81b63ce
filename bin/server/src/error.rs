//! Domain error types for admin actions.
//!
//! Action failures are rendered as a fixed JSON shape,
//! `{"error": true, "message": "..."}`, and never escape as raw faults.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Errors raised while running an admin action.
#[derive(Debug)]
pub enum ActionError {
    /// The request path or query string could not be parsed.
    BadRequest { details: String },
    /// No action is registered for the dispatched target.
    NotFound { action: String },
    /// The session's permissions do not cover the action's resource.
    Forbidden { resource: String },
    /// The session store failed.
    Storage { details: String },
    /// Gating or dispatch failed before an action could run.
    Internal { details: String },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { details } => write!(f, "malformed request: {details}"),
            Self::NotFound { action } => write!(f, "action '{action}' not found"),
            Self::Forbidden { resource } => {
                write!(f, "access to resource '{resource}' denied")
            }
            Self::Storage { details } => write!(f, "session storage error: {details}"),
            Self::Internal { details } => write!(f, "dispatch error: {details}"),
        }
    }
}

impl std::error::Error for ActionError {}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub error: bool,
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest { details } => {
                tracing::debug!("Rejected request: {}", details);
                (StatusCode::BAD_REQUEST, "Invalid request.")
            }
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "Page not found."),
            Self::Forbidden { .. } => (
                StatusCode::FORBIDDEN,
                "Sorry, you need permissions to view this content.",
            ),
            Self::Storage { details } => {
                tracing::error!("Session storage failed: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Sessions could not be updated. Please try again later.",
                )
            }
            Self::Internal { details } => {
                tracing::error!("Dispatch failed: {}", details);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(ErrorPayload::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let not_found = ActionError::NotFound {
            action: "adminhtml/sales/view".to_string(),
        };
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let forbidden = ActionError::Forbidden {
            resource: "system".to_string(),
        };
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);

        let storage = ActionError::Storage {
            details: "pool timed out".to_string(),
        };
        assert_eq!(
            storage.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn bad_request_hides_parser_details() {
        let response = ActionError::BadRequest {
            details: "Failed to deserialize query string: invalid percent-encoding".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(
            value,
            serde_json::json!({ "error": true, "message": "Invalid request." })
        );
    }

    #[test]
    fn payload_shape() {
        let value = serde_json::to_value(ErrorPayload::new("Page not found.")).expect("json");
        assert_eq!(
            value,
            serde_json::json!({ "error": true, "message": "Page not found." })
        );
    }

    #[test]
    fn display_keeps_details() {
        let err = ActionError::Storage {
            details: "pool timed out".to_string(),
        };
        assert!(err.to_string().contains("pool timed out"));
    }
}
