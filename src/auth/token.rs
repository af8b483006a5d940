use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
}

/// Bounds applied to the token lifetime, in hours.
const MIN_TTL_HOURS: i64 = 1;
const MAX_TTL_HOURS: i64 = 24 * 365;

/// HS256 signing and verification keys, built once from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenKeys {
    /// Builds keys for `secret`; issued tokens are valid for `ttl_hours`, clamped to
    /// between one hour and one year.
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::hours(ttl_hours.clamp(MIN_TTL_HOURS, MAX_TTL_HOURS)),
        }
    }

    /// Signs a token whose subject is `user_id`.
    ///
    /// # Returns
    /// The encoded JWT, or `AppError::TokenIssuance` if the expiry overflows or
    /// encoding fails.
    pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::TokenIssuance("token expiry out of range".into()))?;

        let claims = Claims {
            sub: user_id,
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::TokenIssuance(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a JWT string and decodes its claims.
    ///
    /// Signature and expiration are checked. Any failure is `AppError::Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {:?}", e.kind())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_verification() {
        let keys = TokenKeys::new("test_secret_for_gen_verify", 2);
        let token = keys.issue(1).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 1);
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 2 * 60 * 60);
    }

    #[test]
    fn test_token_expiration() {
        let keys = TokenKeys::new("test_secret_for_expiration", 2);

        let issued = chrono::Utc::now() - chrono::Duration::hours(4);
        let expired = chrono::Utc::now() - chrono::Duration::hours(2);
        let claims_expired = Claims {
            sub: 2,
            exp: expired.timestamp() as usize,
            iat: issued.timestamp() as usize,
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
        )
        .unwrap();

        match keys.verify(&expired_token) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("ExpiredSignature")),
            Ok(_) => panic!("Token should have been invalid due to expiration"),
            Err(e) => panic!("Unexpected error type for expired token: {:?}", e),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = TokenKeys::new("one_secret", 2).issue(3).unwrap();

        match TokenKeys::new("a_completely_different_secret", 2).verify(&token) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("InvalidSignature")),
            Ok(_) => panic!("Token should have been invalid due to signature mismatch"),
            Err(e) => panic!("Unexpected error type for invalid signature: {:?}", e),
        }
    }

    #[test]
    fn test_out_of_range_lifetimes_are_clamped() {
        let keys = TokenKeys::new("clamp_secret", -1);
        let claims = keys.verify(&keys.issue(4).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 60 * 60);

        let keys = TokenKeys::new("clamp_secret", i64::MAX);
        let claims = keys.verify(&keys.issue(5).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 24 * 365 * 60 * 60);
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        let keys = TokenKeys::new("secret", 2);
        assert!(matches!(
            keys.verify("not-a-jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
