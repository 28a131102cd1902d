//! Signed, time-limited bearer tokens (HS256 JWT).
//!
//! Tokens are stateless: there is no revocation list, expiry is the only way
//! a token stops being valid.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use blog_types::api::Claims;

/// Lifetime used when a caller does not ask for one.
pub const DEFAULT_TTL_MINUTES: i64 = 15;

#[derive(Debug, thiserror::Error)]
#[error("invalid token: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    /// `lifetime` is what the login flows request and what the session
    /// cookie's max-age mirrors.
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> anyhow::Result<String> {
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(DEFAULT_TTL_MINUTES));
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Token for the login flows, valid for the configured lifetime.
    pub fn issue_session(&self, subject: &str) -> anyhow::Result<String> {
        self.issue(subject, Some(self.lifetime))
    }

    /// Returns the subject when signature, encoding and expiry all check out.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::minutes(30))
    }

    #[test]
    fn issue_then_validate() {
        let tokens = service();
        let token = tokens.issue_session("alice").unwrap();
        assert_eq!(tokens.validate(&token).unwrap(), "alice");
    }

    #[test]
    fn default_lifetime_is_fifteen_minutes() {
        let tokens = service();
        let token = tokens.issue("alice", None).unwrap();

        let claims = decode::<Claims>(&token, &tokens.decoding, &tokens.validation)
            .unwrap()
            .claims;
        let remaining = claims.exp as i64 - Utc::now().timestamp();
        assert!((14 * 60..=15 * 60).contains(&remaining));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let token = tokens.issue("alice", Some(Duration::seconds(-5))).unwrap();
        assert!(tokens.validate(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = service().issue_session("alice").unwrap();
        let other = TokenService::new("another-secret", Duration::minutes(30));
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        let tokens = service();
        assert!(tokens.validate("not-a-token").is_err());
        assert!(tokens.validate("").is_err());

        let mut token = tokens.issue_session("alice").unwrap();
        token.push('x');
        assert!(tokens.validate(&token).is_err());
    }
}
