use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

/// JWT claims carried by access tokens from the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID as a UUID string.
    pub sub: String,
    /// User role: `"user"` or `"admin"`.
    pub role: String,
    /// Token type: only `"access"` tokens are accepted here.
    pub token_type: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued-at time (Unix timestamp).
    pub iat: i64,
    /// Unique JWT identifier.
    pub jti: String,
}

/// Issue an access token for `user_id`.
///
/// Token issuance belongs to the identity service; this mirrors its format so
/// that service and the test suite can mint tokens this API accepts.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn create_access_token(
    user_id: Uuid,
    role: &str,
    config: &Config,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    #[allow(clippy::cast_possible_wrap)]
    let exp = now.timestamp() + config.jwt_access_expiration_secs as i64;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        token_type: "access".to_string(),
        exp,
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| anyhow::anyhow!("Failed to encode access token: {e}"))
}

/// Validate an access token and return its claims.
///
/// # Errors
///
/// Returns an error if the token is invalid, expired, or not an access token.
pub fn validate_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid access token: {e}"))?;

    if token_data.claims.token_type != "access" {
        return Err(anyhow::anyhow!("Token is not an access token"));
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn config() -> Config {
        Config {
            database_url: String::new(),
            server_host: std::net::IpAddr::from([127, 0, 0, 1]),
            server_port: 0,
            environment: Environment::Development,
            log_level: "warn".to_string(),
            jwt_secret: "test-secret-key-for-testing-only-32chars".to_string(),
            jwt_access_expiration_secs: 900,
            frontend_url: String::new(),
        }
    }

    #[test]
    fn test_round_trip_claims() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "user", &config, Utc::now()).unwrap_or_default();

        let claims = validate_access_token(&token, &config.jwt_secret);
        assert!(claims.is_ok());
        if let Ok(claims) = claims {
            assert_eq!(claims.sub, user_id.to_string());
            assert_eq!(claims.role, "user");
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = config();
        let token =
            create_access_token(Uuid::new_v4(), "user", &config, Utc::now()).unwrap_or_default();
        assert!(validate_access_token(&token, "another-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = config();
        let issued = Utc::now() - chrono::Duration::hours(2);
        let token = create_access_token(Uuid::new_v4(), "user", &config, issued).unwrap_or_default();
        assert!(validate_access_token(&token, &config.jwt_secret).is_err());
    }
}
