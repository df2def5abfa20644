//! Signed session tokens (HS256 compact JWS).
//!
//! Access and refresh tokens are signed with separate secrets and carry a
//! `typ` claim, so a token of one kind never verifies as the other even if the
//! secrets were misconfigured to match.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use thiserror::Error;
use ulid::Ulid;
use uuid::Uuid;

use super::{
    account::{Account, Role},
    config::AuthConfig,
};

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";
const TYP: &str = "JWT";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token kind")]
    WrongKind,
    #[error("failed to encode token")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

trait Claims {
    fn kind(&self) -> TokenKind;
    fn expires_at(&self) -> i64;
}

impl Claims for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl Claims for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.access_secret().clone(),
            refresh_secret: config.refresh_secret().clone(),
            access_ttl_seconds: config.access_ttl_seconds(),
            refresh_ttl_seconds: config.refresh_ttl_seconds(),
        }
    }

    /// # Errors
    /// Returns [`TokenError::Encode`] if the claims cannot be serialized.
    pub fn issue_access(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = AccessClaims {
            sub: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            typ: TokenKind::Access,
            iat,
            exp: iat + self.access_ttl_seconds,
            jti: Ulid::new().to_string(),
        };
        sign(&claims, &self.access_secret)
    }

    /// # Errors
    /// Returns [`TokenError::Encode`] if the claims cannot be serialized.
    pub fn issue_refresh(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = RefreshClaims {
            sub: account_id,
            typ: TokenKind::Refresh,
            iat,
            exp: iat + self.refresh_ttl_seconds,
            jti: Ulid::new().to_string(),
        };
        sign(&claims, &self.refresh_secret)
    }

    /// # Errors
    /// Returns a [`TokenError`] for malformed, forged, expired, or refresh tokens.
    pub fn verify_access(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access_secret, TokenKind::Access, now)
    }

    /// # Errors
    /// Returns a [`TokenError`] for malformed, forged, expired, or access tokens.
    pub fn verify_refresh(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh_secret, TokenKind::Refresh, now)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish_non_exhaustive()
    }
}

fn mac(secret: &SecretString) -> HmacSha256 {
    // HMAC accepts keys of any length, so this never fails.
    <HmacSha256 as Mac>::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(segment).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

fn sign<C: Serialize>(claims: &C, secret: &SecretString) -> Result<String, TokenError> {
    let header = Header {
        alg: ALG.to_string(),
        typ: TYP.to_string(),
    };
    let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(claims)?);

    let mut mac = mac(secret);
    mac.update(signing_input.as_bytes());
    let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

fn verify<C>(
    token: &str,
    secret: &SecretString,
    expected: TokenKind,
    now: DateTime<Utc>,
) -> Result<C, TokenError>
where
    C: Claims + DeserializeOwned,
{
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let header: Header = b64d_json(header_b64)?;
    if header.alg != ALG {
        return Err(TokenError::Malformed);
    }

    let signature =
        Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| TokenError::Malformed)?;
    let mut mac = mac(secret);
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: C = b64d_json(claims_b64)?;
    if claims.kind() != expected {
        return Err(TokenError::WrongKind);
    }
    if claims.expires_at() <= now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::account::fixtures;
    use anyhow::Result;
    use chrono::Duration;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        ))
    }

    #[test]
    fn access_token_carries_identity() -> Result<()> {
        let issuer = issuer();
        let account = fixtures::account("ada", "ada@example.com");
        let now = Utc::now();
        let token = issuer.issue_access(&account, now)?;
        assert_eq!(token.split('.').count(), 3);

        let claims = issuer.verify_access(&token, now)?;
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, Role::Employee);
        assert_eq!(claims.exp - claims.iat, 900);
        Ok(())
    }

    #[test]
    fn refresh_tokens_are_unique_within_a_second() -> Result<()> {
        let issuer = issuer();
        let id = Uuid::now_v7();
        let now = Utc::now();
        let first = issuer.issue_refresh(id, now)?;
        let second = issuer.issue_refresh(id, now)?;
        assert_ne!(first, second);
        assert_eq!(issuer.verify_refresh(&second, now)?.sub, id);
        Ok(())
    }

    #[test]
    fn kinds_do_not_cross_verify() -> Result<()> {
        let issuer = issuer();
        let account = fixtures::account("ada", "ada@example.com");
        let now = Utc::now();
        let access = issuer.issue_access(&account, now)?;
        let refresh = issuer.issue_refresh(account.id, now)?;

        assert!(matches!(
            issuer.verify_refresh(&access, now),
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(
            issuer.verify_access(&refresh, now),
            Err(TokenError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn typ_claim_guards_shared_secrets() -> Result<()> {
        let issuer = TokenIssuer::new(&AuthConfig::new(
            SecretString::from("same".to_string()),
            SecretString::from("same".to_string()),
        ));
        let refresh = issuer.issue_refresh(Uuid::now_v7(), Utc::now())?;
        assert!(matches!(
            issuer.verify_access(&refresh, Utc::now()),
            Err(TokenError::Malformed | TokenError::WrongKind)
        ));
        Ok(())
    }

    #[test]
    fn expired_tokens_are_rejected() -> Result<()> {
        let issuer = issuer();
        let account = fixtures::account("ada", "ada@example.com");
        let issued = Utc::now();
        let token = issuer.issue_access(&account, issued)?;
        let later = issued + Duration::minutes(16);
        assert!(matches!(
            issuer.verify_access(&token, later),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn tampered_tokens_are_rejected() -> Result<()> {
        let issuer = issuer();
        let account = fixtures::account("ada", "ada@example.com");
        let now = Utc::now();
        let token = issuer.issue_access(&account, now)?;

        let mut forged = account.clone();
        forged.role = Role::Admin;
        let forged_claims = issuer.issue_access(&forged, now)?;
        let forged_payload = forged_claims.split('.').nth(1).unwrap_or_default();
        let parts: Vec<&str> = token.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(
            issuer.verify_access(&spliced, now),
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(
            issuer.verify_access("not-a-token", now),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            issuer.verify_access("a.b.c.d", now),
            Err(TokenError::Malformed)
        ));
        Ok(())
    }
}
