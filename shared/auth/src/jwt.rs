use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rizqtutor_common::{AppError, JwtConfig, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: UserRole,
    pub locale: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(user_id: Uuid, role: UserRole, locale: String, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours as i64);

        Self {
            sub: user_id.to_string(),
            role,
            locale,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }
}

/// The identity the lifecycle engine trusts as ground truth for
/// tutor-actor authorization checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub locale: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    pub fn generate_token(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to generate token: {}", e)))
    }

    /// Resolves an opaque credential to the session identity, or fails
    /// with a single generic authentication error.
    pub fn verify(&self, token: &str) -> Result<SessionUser, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AppError::Authentication(format!("Invalid user ID in token: {}", e)))?;

        Ok(SessionUser {
            user_id,
            role: claims.role,
            locale: claims.locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret".to_string(),
            expiration_hours: 1,
            issuer: "rizqtutor".to_string(),
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let config = test_config();
        let service = JwtService::new(&config.secret);
        let user_id = Uuid::new_v4();

        let claims = Claims::new(user_id, UserRole::Tutor, "en".to_string(), &config);
        let token = service.generate_token(&claims).unwrap();

        let session = service.verify(&token).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.role, UserRole::Tutor);
        assert_eq!(session.locale, "en");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let issuing = JwtService::new("a-different-secret");
        let verifying = JwtService::new(&config.secret);

        let claims = Claims::new(Uuid::new_v4(), UserRole::Tutor, "en".to_string(), &config);
        let token = issuing.generate_token(&claims).unwrap();

        assert!(verifying.verify(&token).is_err());
    }

    #[test]
    fn garbage_credential_is_rejected() {
        let service = JwtService::new("unit-test-secret");
        assert!(service.verify("not-a-jwt").is_err());
    }
}
