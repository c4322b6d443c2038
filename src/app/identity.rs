use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

const ISSUER: &str = "pawprint";

/// Verifies the bearer tokens minted by the identity provider. The provider
/// and this service share one v4.local key; `sub` carries the caller id.
#[derive(Clone)]
pub struct AccessTokens {
    key: [u8; 32],
}

impl AccessTokens {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// `Ok(None)` for anything that does not decrypt, validate, or carry a
    /// UUID subject.
    pub fn verify(&self, token: &str) -> Result<Option<Uuid>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(ISSUER);
        rules.validate_audience_with(ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let Some(claims) = trusted.payload_claims() else {
            return Ok(None);
        };
        Ok(claim_uuid(claims, "sub"))
    }

    /// Mints a token the way the identity provider does. Used by tooling and
    /// the test suite.
    pub fn issue(&self, user_id: Uuid, ttl: std::time::Duration) -> Result<String> {
        let mut claims = Claims::new_expires_in(&ttl)?;
        claims.issuer(ISSUER)?;
        claims.audience(ISSUER)?;
        claims.subject(&user_id.to_string())?;
        let key = SymmetricKey::<V4>::from(&self.key)?;
        local::encrypt(&key, &claims, None, None).map_err(|err| anyhow!("failed to mint token: {}", err))
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Option<Uuid> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .and_then(|value| Uuid::parse_str(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn issued_token_verifies() {
        let tokens = AccessTokens::new([3u8; 32]);
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id, Duration::from_secs(60)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), Some(user_id));
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let issuer = AccessTokens::new([3u8; 32]);
        let verifier = AccessTokens::new([4u8; 32]);
        let token = issuer.issue(Uuid::new_v4(), Duration::from_secs(60)).unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), None);
        assert_eq!(verifier.verify("garbage").unwrap(), None);
    }
}
