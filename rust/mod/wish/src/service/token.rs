//! JWT issue/verify for wall sessions.
//!
//! Used by register/login (issue) and the request middleware (verify).

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::model::Claims;
use crate::service::WishError;

/// HMAC-signed access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expire_secs: i64,
}

impl JwtService {
    /// Create a new JwtService with an HMAC secret.
    pub fn new(secret: &str, expire_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            expire_secs,
        }
    }

    pub fn expire_secs(&self) -> i64 {
        self.expire_secs
    }

    /// Issue a signed JWT for a user.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, WishError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            name: username.to_string(),
            iat: now,
            exp: now + self.expire_secs,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| WishError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify a JWT and extract claims.
    /// Returns Err if the token is invalid, expired, or tampered with.
    pub fn verify(&self, token: &str) -> Result<Claims, WishError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| WishError::Unauthorized(format!("invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify() {
        let svc = JwtService::new("test-secret", 3600);
        let token = svc.issue("u1", "alice").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn verify_garbage_rejected() {
        let svc = JwtService::new("test-secret", 3600);
        assert!(matches!(
            svc.verify("invalid.token.here"),
            Err(WishError::Unauthorized(_))
        ));
    }

    #[test]
    fn verify_wrong_secret_rejected() {
        let issuer = JwtService::new("secret-a", 3600);
        let verifier = JwtService::new("secret-b", 3600);
        let token = issuer.issue("u1", "alice").unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn verify_expired_token_rejected() {
        // Expired 2 minutes ago, past the default 60s leeway.
        let svc = JwtService::new("test-secret", -120);
        let token = svc.issue("u1", "alice").unwrap();
        assert!(svc.verify(&token).is_err());
    }
}
