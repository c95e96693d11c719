use crate::types::{AppError, Claims, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Verifies session tokens issued by the identity provider.
///
/// Elytra does not own user credentials. The session provider signs HS256
/// tokens with a shared secret and this service checks them; `issue_token`
/// exists for operators and tests.
pub struct AuthService {
    jwt_secret: String,
    access_expiry: i64,
}

impl AuthService {
    /// Creates a new AuthService with the given configuration.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key shared with the session provider (should be at least 32 chars)
    /// * `access_expiry` - Validity of issued tokens in seconds
    pub fn new(jwt_secret: String, access_expiry: i64) -> Self {
        Self {
            jwt_secret,
            access_expiry,
        }
    }

    /// Issues a signed token for the given identity.
    pub fn issue_token(&self, user_id: &str, email: &str, role: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: (now + Duration::seconds(self.access_expiry)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a JWT token and returns the claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ROLE_ADMIN, ROLE_STUDENT};

    fn create_test_service() -> AuthService {
        AuthService::new("test-secret-key-that-is-at-least-32-chars".to_string(), 900)
    }

    #[test]
    fn test_token_roundtrip_keeps_identity() {
        let service = create_test_service();

        let token = service
            .issue_token("user-456", "user@test.com", ROLE_STUDENT)
            .expect("should issue token");
        let claims = service.verify_token(&token).expect("should verify token");

        assert_eq!(claims.sub, "user-456", "subject should match user_id");
        assert_eq!(claims.email, "user@test.com", "email should match");
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_admin_role_is_carried() {
        let service = create_test_service();
        let token = service
            .issue_token("admin-1", "admin@elytra.app", ROLE_ADMIN)
            .unwrap();

        assert!(service.verify_token(&token).unwrap().is_admin());
    }

    #[test]
    fn test_token_verification_invalid_token() {
        let service = create_test_service();

        let result = service.verify_token("invalid.token.here");

        assert!(result.is_err(), "invalid token should fail verification");
    }

    #[test]
    fn test_token_verification_wrong_secret() {
        let service1 = AuthService::new("secret-one-that-is-32-chars-long".to_string(), 900);
        let service2 = AuthService::new("secret-two-that-is-32-chars-long".to_string(), 900);

        let token = service1
            .issue_token("user-789", "test@example.com", ROLE_STUDENT)
            .expect("should generate");
        let result = service2.verify_token(&token);

        assert!(result.is_err(), "token from different secret should fail");
    }

    #[test]
    fn test_claims_expiration() {
        let service = create_test_service();
        let token = service
            .issue_token("user", "user@example.com", ROLE_STUDENT)
            .expect("should generate");
        let claims = service.verify_token(&token).expect("should verify");

        let now = chrono::Utc::now().timestamp() as usize;

        assert!(
            claims.iat <= now && claims.iat >= now - 5,
            "iat should be current timestamp"
        );

        let expected_exp = claims.iat + 900;
        assert!(
            claims.exp >= expected_exp - 5 && claims.exp <= expected_exp + 5,
            "exp should be iat + 900 seconds"
        );
    }

    #[test]
    fn test_missing_role_defaults_to_student() {
        let json = r#"{"sub":"u1","email":"a@b.c","exp":1,"iat":0}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.role, ROLE_STUDENT);
    }
}
