use std::{fmt, sync::Arc};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

/// Tokens are valid for a fixed window and cannot be renewed.
pub const TOKEN_TTL: Duration = Duration::hours(24);

/// Source of "now" shared by issuance and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// JWT payload identifying the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub username: String,
    pub iat: u64, // issued at (unix timestamp)
    pub exp: u64, // expires at (unix timestamp)
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("invalid or expired token")]
    Invalid,
}

/// Issues and verifies HS256 identity tokens.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        // Expiry is checked against `clock` in `verify`, not by jsonwebtoken,
        // so issuance and verification read the same time source.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }

    pub fn from_secret(secret: &[u8]) -> Result<Self, TokenError> {
        Self::new(secret, Arc::new(SystemClock))
    }

    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = Claims {
            username: username.to_owned(),
            iat: unix_seconds(now)?,
            exp: unix_seconds(now + TOKEN_TTL)?,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(username = %username, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Returns the `username` claim of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_claims(token).map(|claims| claims.username)
    }

    pub fn verify_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            TokenError::Invalid
        })?;

        let exp = i64::try_from(data.claims.exp).map_err(|_| TokenError::Invalid)?;
        if exp < self.clock.now().unix_timestamp() {
            debug!(username = %data.claims.username, "jwt expired");
            return Err(TokenError::Invalid);
        }

        debug!(username = %data.claims.username, "jwt verified");
        Ok(data.claims)
    }
}

/// Clock that only moves when told to. Shared by token and store tests.
#[cfg(test)]
pub(crate) struct ManualClock(std::sync::Mutex<OffsetDateTime>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn starting_now() -> Arc<Self> {
        Arc::new(Self(std::sync::Mutex::new(OffsetDateTime::now_utc())))
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

fn unix_seconds(at: OffsetDateTime) -> Result<u64, TokenError> {
    u64::try_from(at.unix_timestamp())
        .map_err(|_| TokenError::Signing("clock is before the unix epoch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    fn authority_at(at: OffsetDateTime) -> TokenAuthority {
        TokenAuthority::new(b"dev-secret", Arc::new(FixedClock(at))).expect("secret is set")
    }

    #[test]
    fn issue_then_verify_yields_username() {
        let keys = TokenAuthority::from_secret(b"dev-secret").unwrap();
        let token = keys.issue("alice").expect("sign");
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(keys.verify(&token).expect("verify"), "alice");
    }

    #[test]
    fn claims_carry_a_24_hour_window() {
        let issued_at = OffsetDateTime::now_utc();
        let keys = authority_at(issued_at);
        let token = keys.issue("alice").unwrap();

        let data = decode::<Claims>(&token, &keys.decoding, &keys.validation).unwrap();
        assert_eq!(data.claims.username, "alice");
        assert_eq!(data.claims.exp - data.claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_with_past_expiry_is_rejected() {
        let issued = OffsetDateTime::now_utc() - Duration::hours(25);
        let token = authority_at(issued).issue("alice").unwrap();

        let keys = TokenAuthority::from_secret(b"dev-secret").unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn expiry_boundary_follows_the_injected_clock() {
        let issued = OffsetDateTime::now_utc();
        let token = authority_at(issued).issue("alice").unwrap();

        let at_expiry = authority_at(issued + TOKEN_TTL);
        assert_eq!(at_expiry.verify(&token).unwrap(), "alice");

        let after_expiry = authority_at(issued + TOKEN_TTL + Duration::seconds(1));
        assert!(matches!(after_expiry.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn verify_claims_exposes_issue_time() {
        let clock = ManualClock::starting_now();
        let keys = TokenAuthority::new(b"dev-secret", clock.clone()).unwrap();
        let issued = clock.now().unix_timestamp() as u64;
        let token = keys.issue("alice").unwrap();

        clock.advance(Duration::hours(1));
        let claims = keys.verify_claims(&token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iat, issued);
        assert_eq!(claims.exp, issued + 24 * 60 * 60);
    }

    #[test]
    fn any_single_character_tamper_is_rejected() {
        let keys = TokenAuthority::from_secret(b"dev-secret").unwrap();
        let token = keys.issue("alice").unwrap();

        for (i, c) in token.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + c.len_utf8(), &replacement.to_string());
            assert!(
                keys.verify(&tampered).is_err(),
                "tamper at position {i} was accepted"
            );
        }
    }

    #[test]
    fn verify_rejects_foreign_secret_and_garbage() {
        let keys = TokenAuthority::from_secret(b"dev-secret").unwrap();
        let other = TokenAuthority::from_secret(b"other-secret").unwrap();
        let token = other.issue("alice").unwrap();

        assert!(matches!(keys.verify(&token), Err(TokenError::Invalid)));
        assert!(matches!(keys.verify(""), Err(TokenError::Invalid)));
        assert!(matches!(keys.verify("not.a.token"), Err(TokenError::Invalid)));
    }

    #[test]
    fn verify_rejects_other_algorithms_and_missing_expiry() {
        let keys = TokenAuthority::from_secret(b"dev-secret").unwrap();
        let encoding = EncodingKey::from_secret(b"dev-secret");

        let claims = Claims {
            username: "alice".into(),
            iat: 0,
            exp: u64::MAX / 2,
        };
        let hs512 = encode(&Header::new(Algorithm::HS512), &claims, &encoding).unwrap();
        assert!(matches!(keys.verify(&hs512), Err(TokenError::Invalid)));

        #[derive(Serialize)]
        struct NoExpiry<'a> {
            username: &'a str,
        }
        let no_exp = encode(
            &Header::new(Algorithm::HS256),
            &NoExpiry { username: "alice" },
            &encoding,
        )
        .unwrap();
        assert!(matches!(keys.verify(&no_exp), Err(TokenError::Invalid)));
    }

    #[test]
    fn empty_secret_fails_construction() {
        assert!(matches!(
            TokenAuthority::from_secret(b""),
            Err(TokenError::MissingSecret)
        ));
    }
}
