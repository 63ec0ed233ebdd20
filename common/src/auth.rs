// Authentication and JWT token handling

use crate::db::repositories::user::UserRepository;
use crate::errors::{AuthError, DatabaseError};
use crate::models::{User, UserClaims};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// Permission names carried in JWT claims
pub mod permissions {
    pub const WORK_READ: &str = "work:read";
    pub const WORK_WRITE: &str = "work:write";
    pub const WORK_IMPORT: &str = "work:import";
    pub const WORK_EXPORT: &str = "work:export";
    pub const REPAIR_TYPE_READ: &str = "repair_type:read";
    pub const REPAIR_TYPE_WRITE: &str = "repair_type:write";
    pub const REFERENCE_READ: &str = "reference:read";
    /// Creating brands, models and categories
    pub const REFERENCE_WRITE: &str = "reference:write";
}

/// Permissions granted to an account
///
/// Every user manages their own works and repair types; shared reference
/// data is writable by superusers only.
pub fn permissions_for(is_superuser: bool) -> Vec<String> {
    let mut granted = vec![
        permissions::WORK_READ,
        permissions::WORK_WRITE,
        permissions::WORK_IMPORT,
        permissions::WORK_EXPORT,
        permissions::REPAIR_TYPE_READ,
        permissions::REPAIR_TYPE_WRITE,
        permissions::REFERENCE_READ,
    ];
    if is_superuser {
        granted.push(permissions::REFERENCE_WRITE);
    }
    granted.into_iter().map(String::from).collect()
}

/// JWT token service for encoding and decoding tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    expiration_hours: i64,
}

impl JwtService {
    /// Create a new JWT service with the given secret and expiration
    #[instrument(skip(secret))]
    pub fn new(secret: &str, expiration_hours: u64) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            expiration_hours: expiration_hours as i64,
        }
    }

    /// Encode user claims into a JWT token
    #[instrument(skip(self))]
    pub fn encode_token(
        &self,
        user_id: &str,
        username: &str,
        permissions: Vec<String>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiration_hours)).timestamp();
        let iat = now.timestamp();

        let claims = UserClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            permissions,
            exp,
            iat,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to encode JWT token");
            AuthError::AuthenticationFailed(format!("Failed to encode token: {}", e))
        })
    }

    /// Decode and validate a JWT token
    #[instrument(skip(self, token))]
    pub fn decode_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data =
            decode::<UserClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "Failed to decode JWT token");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(format!("Token validation failed: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Validate a token and return claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        self.decode_token(token)
    }
}

/// Database authentication service for validating credentials and managing users
#[derive(Clone)]
pub struct DatabaseAuthService {
    jwt_service: JwtService,
    user_repository: Arc<UserRepository>,
}

impl DatabaseAuthService {
    /// Create a new database authentication service
    pub fn new(jwt_service: JwtService, user_repository: UserRepository) -> Self {
        Self {
            jwt_service,
            user_repository: Arc::new(user_repository),
        }
    }

    fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        self.jwt_service.encode_token(
            &user.id.to_string(),
            &user.username,
            permissions_for(user.is_superuser),
        )
    }

    /// Authenticate a user with username and password, returning a JWT
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .user_repository
            .find_by_username(username)
            .await
            .map_err(|e| {
                error!(error = %e, username = %username, "Database error during login");
                AuthError::AuthenticationFailed(format!("Database error: {}", e))
            })?
            .ok_or_else(|| {
                tracing::warn!(username = %username, "Login for unknown user");
                AuthError::InvalidCredentials
            })?;

        if !user.enabled {
            tracing::warn!(username = %username, "User account is disabled");
            return Err(AuthError::AuthenticationFailed(
                "User account is disabled".to_string(),
            ));
        }

        let password_valid = bcrypt::verify(password, &user.password_hash).map_err(|e| {
            error!(error = %e, "Failed to verify password");
            AuthError::AuthenticationFailed(format!("Password verification failed: {}", e))
        })?;

        if !password_valid {
            tracing::warn!(username = %username, "Invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            "User logged in successfully"
        );

        Ok(token)
    }

    /// Exchange a still-valid token for a fresh one
    ///
    /// The account is re-read so a disabled user cannot keep refreshing.
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.jwt_service.validate_token(token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthError::InvalidToken("Subject is not a user id".to_string()))?;

        let user = self
            .user_repository
            .find_by_id(user_id)
            .await
            .map_err(|e| AuthError::AuthenticationFailed(format!("Database error: {}", e)))?
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;

        if !user.enabled {
            return Err(AuthError::AuthenticationFailed(
                "User account is disabled".to_string(),
            ));
        }

        self.issue_token(&user)
    }

    /// Create a new user with a bcrypt-hashed password
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: Option<String>,
        is_superuser: bool,
    ) -> Result<User, AuthError> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::AuthenticationFailed(format!("Password hashing failed: {}", e))
        })?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            email,
            is_superuser,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        self.user_repository.create(&user).await.map_err(|e| {
            error!(error = %e, username = %username, "Failed to create user");
            match e {
                DatabaseError::DuplicateKey(_) => AuthError::UsernameTaken(username.to_string()),
                _ => AuthError::AuthenticationFailed(format!("Failed to create user: {}", e)),
            }
        })?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_service_encode_decode() {
        let service = JwtService::new("test-secret", 24);
        let granted = permissions_for(false);

        let token = service
            .encode_token("user-123", "mechanic", granted.clone())
            .expect("Failed to encode token");

        let claims = service
            .decode_token(&token)
            .expect("Failed to decode token");

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.username, "mechanic");
        assert_eq!(claims.permissions, granted);
    }

    #[test]
    fn test_jwt_service_expired_token() {
        let service = JwtService::new("test-secret", 1);

        let now = Utc::now();
        let claims = UserClaims {
            sub: "user-123".to_string(),
            username: "mechanic".to_string(),
            permissions: permissions_for(false),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };

        let encoding_key = EncodingKey::from_secret("test-secret".as_bytes());
        let token = encode(&Header::default(), &claims, &encoding_key)
            .expect("Failed to encode token");

        let result = service.decode_token(&token);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_jwt_service_invalid_token() {
        let service = JwtService::new("test-secret", 24);
        let result = service.decode_token("invalid.token.here");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtService::new("secret-a", 24);
        let verifier = JwtService::new("secret-b", 24);
        let token = issuer
            .encode_token("user-123", "mechanic", Vec::new())
            .unwrap();
        assert!(matches!(
            verifier.decode_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_only_superusers_write_reference_data() {
        let regular = permissions_for(false);
        let superuser = permissions_for(true);

        assert!(regular.contains(&permissions::WORK_IMPORT.to_string()));
        assert!(regular.contains(&permissions::REFERENCE_READ.to_string()));
        assert!(!regular.contains(&permissions::REFERENCE_WRITE.to_string()));
        assert!(superuser.contains(&permissions::REFERENCE_WRITE.to_string()));
    }
}
