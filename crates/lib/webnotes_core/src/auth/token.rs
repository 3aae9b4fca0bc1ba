//! Signed, expiring session tokens (HS256).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token issuer claim.
pub const ISSUER: &str = "webnotes";
/// Token audience claim.
pub const AUDIENCE: &str = "webnotes_client";
/// Minimum signing key length in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Token failures. Collapsed to a single unauthorized outcome at the HTTP
/// boundary, kept apart here for logging.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token signature does not match")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed")]
    Malformed,

    #[error("Token was issued for '{actual}', expected '{expected}'")]
    WrongPurpose { expected: Purpose, actual: Purpose },

    #[error("Signing key error: {0}")]
    Key(String),

    #[error("Token encoding failed: {0}")]
    Encode(String),
}

impl TokenError {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired",
            TokenError::Malformed => "malformed",
            TokenError::WrongPurpose { .. } => "wrong_purpose",
            TokenError::Key(_) => "key",
            TokenError::Encode(_) => "encode",
        }
    }
}

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// A full session, browser or agent.
    Session,
    /// A short-lived code that can only be exchanged for a session.
    AuthCode,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Session => "session",
            Purpose::AuthCode => "auth_code",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub purpose: Purpose,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The subject as an account id.
    pub fn subject(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}

/// Symmetric signing key held only by the server process.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Decode a hex-encoded key of at least [`MIN_KEY_LEN`] bytes.
    pub fn from_hex(hex_key: &str) -> Result<Self, TokenError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| TokenError::Key(format!("signing key is not valid hex: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TokenError> {
        if bytes.len() < MIN_KEY_LEN {
            return Err(TokenError::Key(format!(
                "signing key must be at least {MIN_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }
}

impl FromStr for SigningKey {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Issues and verifies tokens under one key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(key: &SigningKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(&key.0),
            decoding: DecodingKey::from_secret(&key.0),
            validation,
        }
    }

    /// Issue a token valid for `ttl` from now.
    pub fn issue(&self, subject: Uuid, purpose: Purpose, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, purpose, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: Uuid,
        purpose: Purpose,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            purpose,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }

    /// Verify and require a specific purpose.
    pub fn verify_purpose(&self, token: &str, purpose: Purpose) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.purpose != purpose {
            return Err(TokenError::WrongPurpose {
                expected: purpose,
                actual: claims.purpose,
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SigningKey {
        SigningKey::from_bytes(vec![byte; MIN_KEY_LEN]).unwrap()
    }

    #[test]
    fn issued_token_verifies_with_same_subject_and_purpose() {
        let codec = TokenCodec::new(&key(1));
        let subject = Uuid::new_v4();
        for purpose in [Purpose::Session, Purpose::AuthCode] {
            let token = codec.issue(subject, purpose, Duration::minutes(10)).unwrap();
            let claims = codec.verify(&token).unwrap();
            assert_eq!(claims.subject().unwrap(), subject);
            assert_eq!(claims.purpose, purpose);
            assert_eq!(claims.iss, ISSUER);
            assert_eq!(claims.aud, AUDIENCE);
            assert_eq!(claims.exp - claims.iat, 600);
        }
    }

    #[test]
    fn expired_token_reports_expired_not_malformed() {
        let codec = TokenCodec::new(&key(1));
        let issued = Utc::now() - Duration::hours(2);
        let token = codec
            .issue_at(Uuid::new_v4(), Purpose::Session, Duration::hours(1), issued)
            .unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_another_key_has_invalid_signature() {
        let ours = TokenCodec::new(&key(1));
        let theirs = TokenCodec::new(&key(2));
        let token = theirs
            .issue(Uuid::new_v4(), Purpose::Session, Duration::days(7))
            .unwrap();
        assert_eq!(ours.verify(&token), Err(TokenError::InvalidSignature));

        // Even when the foreign token is also expired.
        let stale = theirs
            .issue_at(
                Uuid::new_v4(),
                Purpose::Session,
                Duration::seconds(1),
                Utc::now() - Duration::days(1),
            )
            .unwrap();
        assert_eq!(ours.verify(&stale), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = TokenCodec::new(&key(1));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
        assert_eq!(codec.verify("not.a.token"), Err(TokenError::Malformed));
        assert_eq!(codec.verify("abc"), Err(TokenError::Malformed));
    }

    #[test]
    fn wrong_audience_is_malformed() {
        let k = key(1);
        let codec = TokenCodec::new(&k);
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            purpose: Purpose::Session,
            iss: ISSUER.into(),
            aud: "someone_else".into(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&k.0),
        )
        .unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn auth_code_cannot_pass_as_session() {
        let codec = TokenCodec::new(&key(1));
        let code = codec
            .issue(Uuid::new_v4(), Purpose::AuthCode, Duration::minutes(10))
            .unwrap();
        assert_eq!(
            codec.verify_purpose(&code, Purpose::Session),
            Err(TokenError::WrongPurpose {
                expected: Purpose::Session,
                actual: Purpose::AuthCode,
            })
        );
        assert!(codec.verify_purpose(&code, Purpose::AuthCode).is_ok());
    }

    #[test]
    fn signing_key_requires_hex_of_sufficient_length() {
        assert!(matches!(
            SigningKey::from_hex("zz"),
            Err(TokenError::Key(_))
        ));
        assert!(matches!(
            SigningKey::from_hex(&"ab".repeat(16)),
            Err(TokenError::Key(_))
        ));
        assert!(SigningKey::from_hex(&"ab".repeat(32)).is_ok());
    }

    #[test]
    fn signing_key_debug_hides_material() {
        assert_eq!(format!("{:?}", key(7)), "SigningKey(..)");
    }
}
