pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod directory;
pub mod health;
pub mod import_export;
pub mod metrics;
pub mod references;
pub mod repair_types;
pub mod works;

// Common response types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::errors::{ApiError, AuthError, DatabaseError, ValidationError};
use common::models::UserClaims;
use serde::Serialize;
use uuid::Uuid;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub trace_id: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        let response = ErrorResponse::new(err.code, err.message);
        match err.details {
            Some(details) => response.with_details(details),
            None => response,
        }
    }
}

impl From<DatabaseError> for ErrorResponse {
    fn from(err: DatabaseError) -> Self {
        if !matches!(
            err,
            DatabaseError::NotFound(_)
                | DatabaseError::DuplicateKey(_)
                | DatabaseError::StillReferenced(_)
                | DatabaseError::ForeignKeyViolation(_)
        ) {
            tracing::error!(error = %err, "Database operation failed");
        }
        ApiError::from(err).into()
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        ApiError::from(err).into()
    }
}

impl From<ValidationError> for ErrorResponse {
    fn from(err: ValidationError) -> Self {
        ApiError::from(err).into()
    }
}

/// Standard API success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Owner id of the authenticated principal
pub fn current_user_id(claims: &UserClaims) -> Result<Uuid, ErrorResponse> {
    claims
        .user_id()
        .ok_or_else(|| ErrorResponse::new("unauthorized", "Token subject is not a user id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_select_status() {
        assert_eq!(
            ErrorResponse::new("not_found", "x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorResponse::new("conflict", "x").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorResponse::new("database_error", "x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_still_referenced_becomes_conflict() {
        let response: ErrorResponse =
            DatabaseError::StillReferenced("repair type".to_string()).into();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_current_user_id_rejects_foreign_subject() {
        let claims = UserClaims {
            sub: "service-account".to_string(),
            username: "svc".to_string(),
            permissions: vec![],
            exp: 0,
            iat: 0,
        };
        assert!(current_user_id(&claims).is_err());
    }
}
