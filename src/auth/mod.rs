use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::client::TokenVerifier;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // user_id
    pub exp: i64,         // expiration timestamp
    pub iat: i64,         // issued at
    pub kind: TokenKind,
}

pub struct AuthService {
    jwt_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: String, refresh_secret: String) -> Self {
        Self {
            jwt_secret,
            refresh_secret,
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::days(30),
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Hash a password using bcrypt
    pub fn hash_password(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(password, 10)
    }

    /// Verify a password against a bcrypt hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(password, hash)
    }

    /// Generate a short-lived access token for a user
    pub fn generate_token(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign(user_id, TokenKind::Access)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign(user_id, TokenKind::Refresh)
    }

    /// Validate an access token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.verify(token, TokenKind::Access)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.verify(token, TokenKind::Refresh)
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.jwt_secret.as_bytes(),
            TokenKind::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    fn sign(&self, user_id: &str, kind: TokenKind) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            kind,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &Validation::default(),
        )?;
        if token_data.claims.kind != kind {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(token_data.claims)
    }
}

impl TokenVerifier for AuthService {
    fn verify_token(&self, token: &str) -> Option<String> {
        self.validate_token(token).ok().map(|claims| claims.sub)
    }
}

/// Authenticated principal extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Optional principal for public routes that still compute per-viewer flags.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.user_id.as_str())
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Extract auth info from request
fn extract_auth(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let token = bearer_token(req).ok_or_else(AppError::login_required)?;
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Server("Auth service not configured".to_string()))?;

    let claims = state
        .auth_service
        .validate_token(token)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    Ok(AuthUser {
        user_id: claims.sub,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract_auth(req))
    }
}

impl FromRequest for MaybeAuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(MaybeAuthUser(extract_auth(req).ok())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_auth_service() -> AuthService {
        AuthService::new("test_secret".to_string(), "test_refresh_secret".to_string())
    }

    #[test]
    fn test_password_hashing() {
        let auth = create_test_auth_service();
        let password = "my_secure_password";

        let hash = auth.hash_password(password).unwrap();
        assert!(auth.verify_password(password, &hash).unwrap());
        assert!(!auth.verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_jwt_token() {
        let auth = create_test_auth_service();
        let user_id = "user_123";

        let token = auth.generate_token(user_id).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let auth = create_test_auth_service();

        let access = auth.generate_token("user_1").unwrap();
        let refresh = auth.generate_refresh_token("user_1").unwrap();

        assert!(auth.validate_refresh_token(&access).is_err());
        assert!(auth.validate_token(&refresh).is_err());
        assert_eq!(auth.validate_refresh_token(&refresh).unwrap().sub, "user_1");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = create_test_auth_service()
            .with_ttls(Duration::minutes(-10), Duration::days(30));
        let token = auth.generate_token("user_1").unwrap();
        assert!(auth.validate_token(&token).is_err());
    }

    #[test]
    fn test_token_verifier() {
        let auth = create_test_auth_service();
        let token = auth.generate_token("user_9").unwrap();
        assert_eq!(auth.verify_token(&token), Some("user_9".to_string()));
        assert_eq!(auth.verify_token("garbage"), None);
    }
}
