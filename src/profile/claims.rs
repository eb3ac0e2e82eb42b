//! Verified auth token claims.
//!
//! Tokens are verified once, at the auth exchange, and only the resulting
//! claims are kept on the session. Claims feed form pre-fill; they are never
//! an authorization decision.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ClaimsError;

/// Claims the enrollment client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration timestamp (Unix).
    pub exp: i64,
}

impl TokenClaims {
    pub fn is_student(&self) -> bool {
        self.role.as_deref() == Some(super::model::STUDENT_ROLE)
    }
}

/// HS256 token verifier.
pub struct ClaimsVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ClaimsVerifier {
    pub fn with_hs256(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 30; // clock skew tolerance, seconds

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify the signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, ClaimsError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ClaimsError::Expired,
                _ => ClaimsError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn secret() -> SecretString {
        SecretString::from("test-secret-for-claims".to_string())
    }

    fn sign(claims: &TokenClaims, key: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key.as_bytes()),
        )
        .unwrap()
    }

    fn student_claims(exp: i64) -> TokenClaims {
        TokenClaims {
            sub: Some("u-1".into()),
            name: Some("Asha".into()),
            email: Some("asha@example.com".into()),
            role: Some("student".into()),
            exp,
        }
    }

    #[test]
    fn valid_token_yields_claims() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = sign(&student_claims(exp), "test-secret-for-claims");

        let claims = ClaimsVerifier::with_hs256(&secret()).verify(&token).unwrap();
        assert!(claims.is_student());
        assert_eq!(claims.email.as_deref(), Some("asha@example.com"));
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = sign(&student_claims(exp), "some-other-secret");

        let err = ClaimsVerifier::with_hs256(&secret()).verify(&token).unwrap_err();
        assert!(matches!(err, ClaimsError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = sign(&student_claims(exp), "test-secret-for-claims");

        let err = ClaimsVerifier::with_hs256(&secret()).verify(&token).unwrap_err();
        assert!(matches!(err, ClaimsError::Expired));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = ClaimsVerifier::with_hs256(&secret())
            .verify("not.a.token")
            .unwrap_err();
        assert!(matches!(err, ClaimsError::Invalid(_)));
    }
}
