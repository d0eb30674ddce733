//! JWT verification and identity resolution
//!
//! The validator is constructed once at startup from injected configuration
//! and shared via `AppState`; handlers never read the secret themselves.
//! Verification is stateless and runs from scratch on every request.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::LandgateError;

/// Claims carried by a landgate token
///
/// `userId` is the owner key. Tokens in the wild carry it as either a JSON
/// string or a number; both deserialize to the canonical `String` here, so
/// nothing past the gate ever re-coerces the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Owner identity, canonical string form
    #[serde(rename = "userId", deserialize_with = "deserialize_user_id")]
    pub user_id: String,

    /// Expiry as Unix timestamp (validated by the library)
    pub exp: u64,

    /// Issued-at as Unix timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

fn deserialize_user_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    match RawUserId::deserialize(deserializer)? {
        RawUserId::Text(s) => Ok(s),
        RawUserId::Int(n) => Ok(n.to_string()),
        RawUserId::Float(n) => Ok(n.to_string()),
    }
}

/// HS256 token validator with the secret injected at construction
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator from the shared secret
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            expiry_seconds,
        }
    }

    /// Verify a token and resolve the acting identity
    ///
    /// Signature, expiry, and shape failures all collapse to `Unauthorized`;
    /// the library diagnostic rides along for logging only and is never part
    /// of a trust decision or a response body.
    pub fn verify_token(&self, token: &str) -> Result<Claims, LandgateError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| LandgateError::Unauthorized(e.to_string()))
    }

    /// Mint a token for the given identity
    ///
    /// The service itself never issues tokens to clients (that is the
    /// login service's job); this exists for operator tooling and tests.
    pub fn generate_token(&self, user_id: &str) -> Result<String, LandgateError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| LandgateError::Unauthorized(e.to_string()))?
            .as_secs();

        let claims = Claims {
            user_id: user_id.to_string(),
            exp: now + self.expiry_seconds,
            iat: Some(now),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| LandgateError::Unauthorized(e.to_string()))
    }
}

/// Extract the bearer token from an Authorization header value
///
/// Returns None for a missing header, a non-Bearer scheme, or a blank token.
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret", 3600)
    }

    #[test]
    fn test_generate_and_verify_roundtrip() {
        let jwt = validator();
        let token = jwt.generate_token("user-1").unwrap();
        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert!(claims.exp > claims.iat.unwrap());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = validator().generate_token("user-1").unwrap();
        let other = JwtValidator::new("different-secret", 3600);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validator().verify_token("not-a-jwt").is_err());
        assert!(validator().verify_token("").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Mint a token that expired an hour ago by building claims directly
        let jwt = validator();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            user_id: "user-1".to_string(),
            exp: now - 3600,
            iat: Some(now - 7200),
        };
        let token = encode(&Header::default(), &claims, &jwt.encoding_key).unwrap();
        assert!(jwt.verify_token(&token).is_err());
    }

    #[test]
    fn test_numeric_user_id_coerced_to_string() {
        // Tokens minted by the legacy login service carry userId as a number
        let jwt = validator();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let raw = serde_json::json!({ "userId": 42, "exp": now + 3600 });
        let token = encode(&Header::default(), &raw, &jwt.encoding_key).unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, "42");
    }

    #[test]
    fn test_string_and_numeric_user_id_resolve_identically() {
        let jwt = validator();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let as_number = serde_json::json!({ "userId": 7, "exp": now + 3600 });
        let as_string = serde_json::json!({ "userId": "7", "exp": now + 3600 });

        let t1 = encode(&Header::default(), &as_number, &jwt.encoding_key).unwrap();
        let t2 = encode(&Header::default(), &as_string, &jwt.encoding_key).unwrap();

        assert_eq!(
            jwt.verify_token(&t1).unwrap().user_id,
            jwt.verify_token(&t2).unwrap().user_id
        );
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(
            extract_token_from_header(Some("bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Bearer   ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
