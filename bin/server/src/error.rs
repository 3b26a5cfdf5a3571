//! Request-boundary error mapping.
//!
//! Store and authentication errors are turned into JSON responses here and
//! nowhere else. Not-found and not-owned collapse into the same 404 body so
//! a caller cannot tell another user's project from a missing one.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flowcanvas_platform_access::AuthenticationError;
use flowcanvas_store::GraphStoreError;
use flowcanvas_workflow::Violation;
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    Authentication(AuthenticationError),
    Store(GraphStoreError),
    /// The request was well-formed but contradicts itself, e.g. a path id
    /// that differs from the payload id.
    BadRequest { reason: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<Report<GraphStoreError>> for ApiError {
    fn from(report: Report<GraphStoreError>) -> Self {
        Self::Store(report.current_context().clone())
    }
}

impl From<Report<AuthenticationError>> for ApiError {
    fn from(report: Report<AuthenticationError>) -> Self {
        Self::Authentication(report.current_context().clone())
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl ErrorBody {
    fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            violations: Vec::new(),
        }
    }
}

impl ApiError {
    /// Status code and body for this error.
    pub fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            Self::Authentication(err) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("unauthenticated", err.to_string()),
            ),
            Self::BadRequest { reason } => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("invalidArgument", reason.clone()),
            ),
            Self::Store(err) if err.is_not_visible() => (
                StatusCode::NOT_FOUND,
                ErrorBody::new("notFound", "resource not found"),
            ),
            Self::Store(err) => match err {
                GraphStoreError::UnknownNodeType { .. } => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new("unknownNodeType", err.to_string()),
                ),
                GraphStoreError::InvalidConfiguration { violations } => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        violations: violations.clone(),
                        ..ErrorBody::new("invalidConfiguration", err.to_string())
                    },
                ),
                GraphStoreError::MalformedConfiguration { .. } => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new("malformedConfiguration", err.to_string()),
                ),
                GraphStoreError::InvalidConnection { .. } => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new("invalidConnection", err.to_string()),
                ),
                GraphStoreError::InvalidArgument { .. } => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new("invalidArgument", err.to_string()),
                ),
                // Storage details stay in the logs.
                GraphStoreError::Storage { .. }
                | GraphStoreError::NotFound { .. }
                | GraphStoreError::Unauthorized { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("internal", "internal server error"),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        debug!(status = %status, error = %self, "request failed");
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcanvas_store::EntityKind;

    fn status_of(err: GraphStoreError) -> StatusCode {
        ApiError::Store(err).parts().0
    }

    #[test]
    fn not_found_and_unauthorized_share_one_response() {
        let (missing_status, missing_body) = ApiError::Store(GraphStoreError::NotFound {
            entity: EntityKind::Project,
            id: "prj_1".to_string(),
        })
        .parts();
        let (foreign_status, foreign_body) = ApiError::Store(GraphStoreError::Unauthorized {
            entity: EntityKind::Project,
            id: "prj_2".to_string(),
        })
        .parts();

        assert_eq!(missing_status, StatusCode::NOT_FOUND);
        assert_eq!(foreign_status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&missing_body).expect("serialize"),
            serde_json::to_value(&foreign_body).expect("serialize")
        );
    }

    #[test]
    fn request_errors_are_bad_request() {
        for err in [
            GraphStoreError::UnknownNodeType {
                node_type_id: "does-not-exist".to_string(),
            },
            GraphStoreError::MalformedConfiguration {
                reason: "EOF".to_string(),
            },
            GraphStoreError::InvalidConnection {
                reason: "port missing".to_string(),
            },
            GraphStoreError::InvalidArgument {
                reason: "blank".to_string(),
            },
        ] {
            assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn invalid_configuration_carries_every_violation() {
        let (status, body) = ApiError::Store(GraphStoreError::InvalidConfiguration {
            violations: vec![
                Violation::new("/url", "expected string, found number"),
                Violation::new("/method", "value is not one of the allowed values"),
            ],
        })
        .parts();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["error"], "invalidConfiguration");
        assert_eq!(json["violations"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["violations"][0]["path"], "/url");
    }

    #[test]
    fn storage_failure_hides_details() {
        let (status, body) = ApiError::Store(GraphStoreError::Storage {
            details: "connection refused".to_string(),
        })
        .parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("connection refused"));
    }

    #[test]
    fn authentication_failure_is_unauthorized() {
        let (status, _) = ApiError::Authentication(AuthenticationError::MissingPrincipal).parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
