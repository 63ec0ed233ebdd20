use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use common::auth::DatabaseAuthService;
use common::db::repositories::user::UserRepository;
use common::errors::AuthError;
use common::models::User;
use serde::{Deserialize, Serialize};

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: Option<String>,
    pub is_superuser: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

fn auth_service(state: &AppState) -> DatabaseAuthService {
    DatabaseAuthService::new(
        state.jwt_service.clone(),
        UserRepository::new(state.db_pool.clone()),
    )
}

fn token_response(state: &AppState, token: String) -> LoginResponse {
    let hours = state.config.auth.jwt_expiration_hours as i64;
    LoginResponse {
        token,
        expires_at: (Utc::now() + Duration::hours(hours)).timestamp(),
    }
}

/// Register a regular user account
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SuccessResponse<UserResponse>>, ErrorResponse> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ErrorResponse::new(
            "validation_error",
            "Username is required",
        ));
    }

    if req.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ErrorResponse::new(
            "validation_error",
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    let email = req
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    let user = auth_service(&state)
        .create_user(username, &req.password, email, false)
        .await
        .map_err(|e| match e {
            AuthError::UsernameTaken(_) => {
                ErrorResponse::new("conflict", "Username already exists")
            }
            _ => ErrorResponse::new("internal_error", "Failed to create user"),
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(Json(SuccessResponse::new(UserResponse::from(user))))
}

/// Login endpoint
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SuccessResponse<LoginResponse>>, ErrorResponse> {
    if req.username.is_empty() {
        return Err(ErrorResponse::new(
            "validation_error",
            "Username is required",
        ));
    }

    if req.password.is_empty() {
        return Err(ErrorResponse::new(
            "validation_error",
            "Password is required",
        ));
    }

    let token = auth_service(&state)
        .login(&req.username, &req.password)
        .await
        .map_err(|e| {
            tracing::warn!(username = %req.username, error = %e, "Login failed");
            match e {
                AuthError::InvalidCredentials => {
                    ErrorResponse::new("unauthorized", "Invalid username or password")
                }
                AuthError::AuthenticationFailed(msg) => ErrorResponse::new("unauthorized", msg),
                _ => ErrorResponse::new("internal_error", "Authentication failed"),
            }
        })?;

    Ok(Json(SuccessResponse::new(token_response(&state, token))))
}

/// Exchange a valid token for a fresh one
#[tracing::instrument(skip(state, req))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<SuccessResponse<LoginResponse>>, ErrorResponse> {
    if req.token.is_empty() {
        return Err(ErrorResponse::new("validation_error", "Token is required"));
    }

    let token = auth_service(&state)
        .refresh(&req.token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Token refresh failed");
            match e {
                AuthError::TokenExpired => ErrorResponse::new("unauthorized", "Token has expired"),
                AuthError::InvalidToken(msg) => ErrorResponse::new("unauthorized", msg),
                _ => ErrorResponse::new("unauthorized", "Invalid token"),
            }
        })?;

    Ok(Json(SuccessResponse::new(token_response(&state, token))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{"username": "mechanic", "password": "secret-pass"}"#;
        let req: LoginRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.username, "mechanic");
        assert_eq!(req.password, "secret-pass");
    }

    #[test]
    fn test_login_response_serialization() {
        let response = LoginResponse {
            token: "test-token".to_string(),
            expires_at: 1234567890,
        };
        let json = serde_json::to_string(&response).expect("Failed to serialize");
        assert!(json.contains("test-token"));
        assert!(json.contains("1234567890"));
    }

    #[test]
    fn test_register_request_email_is_optional() {
        let json = r#"{"username": "mechanic", "password": "secret-pass"}"#;
        let req: RegisterRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert!(req.email.is_none());
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        use uuid::Uuid;

        let user = User {
            id: Uuid::new_v4(),
            username: "mechanic".to_string(),
            password_hash: "hashed".to_string(),
            email: Some("shop@example.com".to_string()),
            is_superuser: false,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();
        assert_eq!(json["username"], "mechanic");
        assert!(json.get("password_hash").is_none());
    }
}
