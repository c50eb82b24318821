use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;

/// Access tokens authorize a single API call and expire quickly; refresh
/// tokens live twice as long and are signed with a separate secret.
pub const ACCESS_TOKEN_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub customer_id: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login request")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::InvalidToken => AppError::Unauthorized,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue the access/refresh pair for a customer. Signing failures collapse
/// into the same opaque error a bad password produces.
pub fn issue_token_pair(customer_id: i64, config: &Config) -> Result<TokenPair, AuthError> {
    let access_token = sign(
        customer_id,
        ACCESS_TOKEN_MINUTES,
        &config.access_token_secret,
    )?;
    let refresh_token = sign(
        customer_id,
        REFRESH_TOKEN_MINUTES,
        &config.refresh_token_secret,
    )?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn sign(customer_id: i64, minutes: i64, secret: &str) -> Result<String, AuthError> {
    let claims = Claims {
        customer_id,
        exp: (Utc::now() + Duration::minutes(minutes)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidCredentials)
}

/// Decode and verify an access token. `Validation::new(Algorithm::HS256)`
/// rejects any token whose header names a different algorithm before the
/// signature is even checked; expiry is enforced through the `exp` claim.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            host: "127.0.0.1".to_string(),
            port: 0,
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
        }
    }

    #[test]
    fn access_token_roundtrip_carries_customer_id() {
        let config = test_config();
        let pair = issue_token_pair(42, &config).expect("issue failed");

        let claims = validate_access_token(&pair.access_token, &config.access_token_secret)
            .expect("validate failed");

        assert_eq!(claims.customer_id, 42);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn refresh_token_is_not_a_valid_access_token() {
        let config = test_config();
        let pair = issue_token_pair(42, &config).expect("issue failed");

        let result = validate_access_token(&pair.refresh_token, &config.access_token_secret);

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let claims = Claims {
            customer_id: 42,
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_token_secret.as_bytes()),
        )
        .expect("encode failed");

        let result = validate_access_token(&token, &config.access_token_secret);

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_other_algorithm_is_rejected() {
        let config = test_config();
        let claims = Claims {
            customer_id: 42,
            exp: (Utc::now() + Duration::minutes(15)).timestamp(),
        };
        // Correct secret, correct claims, wrong algorithm in the header.
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(config.access_token_secret.as_bytes()),
        )
        .expect("encode failed");

        let result = validate_access_token(&token, &config.access_token_secret);

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_wrong_secret_is_rejected() {
        let config = test_config();
        let claims = Claims {
            customer_id: 42,
            exp: (Utc::now() + Duration::minutes(15)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .expect("encode failed");

        let result = validate_access_token(&token, &config.access_token_secret);

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = test_config();
        let result = validate_access_token("not-a-jwt", &config.access_token_secret);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
