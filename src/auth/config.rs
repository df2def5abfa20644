//! Authentication configuration: signing secrets, TTLs, lockout and hashing costs.

use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_MAX_FAILED_LOGINS: u32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 10 * 60;
const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 5;

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    max_failed_logins: u32,
    lockout_seconds: i64,
    hash_cost: HashCost,
    store_timeout: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            hash_cost: HashCost::default(),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_failed_logins(mut self, attempts: u32) -> Self {
        self.max_failed_logins = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: i64) -> Self {
        self.lockout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub(crate) fn access_secret(&self) -> &SecretString {
        &self.access_secret
    }

    pub(crate) fn refresh_secret(&self) -> &SecretString {
        &self.refresh_secret
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn max_failed_logins(&self) -> u32 {
        self.max_failed_logins
    }

    #[must_use]
    pub fn lockout_seconds(&self) -> i64 {
        self.lockout_seconds
    }

    #[must_use]
    pub fn hash_cost(&self) -> HashCost {
        self.hash_cost
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Reject configurations that would weaken key separation or disable expiry.
    ///
    /// # Errors
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let access = self.access_secret.expose_secret();
        let refresh = self.refresh_secret.expose_secret();
        if access.is_empty() || refresh.is_empty() {
            bail!("access and refresh token secrets must not be empty");
        }
        if access == refresh {
            bail!("access and refresh token secrets must differ");
        }
        if self.access_ttl_seconds <= 0 || self.refresh_ttl_seconds <= 0 {
            bail!("token TTLs must be positive");
        }
        if self.max_failed_logins == 0 {
            bail!("max failed logins must be at least 1");
        }
        if self.lockout_seconds <= 0 {
            bail!("lockout duration must be positive");
        }
        if self.store_timeout.is_zero() {
            bail!("store timeout must be positive");
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("max_failed_logins", &self.max_failed_logins)
            .field("lockout_seconds", &self.lockout_seconds)
            .field("hash_cost", &self.hash_cost)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret"),
            SecretString::from("refresh-secret"),
        )
    }

    #[test]
    fn defaults_and_overrides() {
        let config = config();
        assert_eq!(config.access_ttl_seconds(), 900);
        assert_eq!(config.refresh_ttl_seconds(), 604_800);
        assert_eq!(config.max_failed_logins(), 5);
        assert_eq!(config.lockout_seconds(), 600);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());

        let config = config
            .with_access_ttl_seconds(60)
            .with_refresh_ttl_seconds(120)
            .with_max_failed_logins(3)
            .with_lockout_seconds(30)
            .with_store_timeout(Duration::from_millis(250));
        assert_eq!(config.access_ttl_seconds(), 60);
        assert_eq!(config.refresh_ttl_seconds(), 120);
        assert_eq!(config.max_failed_logins(), 3);
        assert_eq!(config.lockout_seconds(), 30);
        assert_eq!(config.store_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_shared_or_empty_secrets() {
        let shared = AuthConfig::new(SecretString::from("same"), SecretString::from("same"));
        assert!(shared.validate().is_err());

        let empty = AuthConfig::new(SecretString::from(""), SecretString::from("refresh"));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_ttls() {
        assert!(config().with_access_ttl_seconds(0).validate().is_err());
        assert!(config().with_max_failed_logins(0).validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!("{:?}", config());
        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("refresh-secret"));
    }
}
