use crate::auth::{AuthConfig, HashCost};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_ACCESS_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_SECRET: &str = "refresh-token-secret";
pub const ARG_ACCESS_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TTL: &str = "refresh-token-ttl-seconds";
pub const ARG_MAX_FAILED_LOGINS: &str = "max-failed-logins";
pub const ARG_LOCKOUT_SECONDS: &str = "lockout-seconds";
pub const ARG_HASH_MEMORY_KIB: &str = "hash-memory-kib";
pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_HASH_PARALLELISM: &str = "hash-parallelism";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_lockout_args(command);
    with_hash_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long(ARG_ACCESS_SECRET)
                .help("Secret used to sign access tokens")
                .env("OFFICEPASS_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long(ARG_REFRESH_SECRET)
                .help("Secret used to sign refresh tokens, must differ from the access secret")
                .env("OFFICEPASS_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL)
                .long(ARG_ACCESS_TTL)
                .help("Access token lifetime in seconds")
                .env("OFFICEPASS_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL)
                .long(ARG_REFRESH_TTL)
                .help("Refresh token lifetime in seconds")
                .env("OFFICEPASS_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}

fn with_lockout_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAX_FAILED_LOGINS)
                .long(ARG_MAX_FAILED_LOGINS)
                .help("Consecutive failed logins before the account is locked")
                .env("OFFICEPASS_MAX_FAILED_LOGINS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_SECONDS)
                .long(ARG_LOCKOUT_SECONDS)
                .help("Lockout duration in seconds")
                .env("OFFICEPASS_LOCKOUT_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Upper bound for a single account store operation in milliseconds")
                .env("OFFICEPASS_STORE_TIMEOUT_MS")
                .default_value("5000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn with_hash_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_MEMORY_KIB)
                .long(ARG_HASH_MEMORY_KIB)
                .help("Argon2id memory cost in KiB")
                .env("OFFICEPASS_HASH_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long(ARG_HASH_ITERATIONS)
                .help("Argon2id iteration count")
                .env("OFFICEPASS_HASH_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_HASH_PARALLELISM)
                .long(ARG_HASH_PARALLELISM)
                .help("Argon2id lanes")
                .env("OFFICEPASS_HASH_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}

/// Authentication settings gathered from the command line.
pub struct Options {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub max_failed_logins: u32,
    pub lockout_seconds: i64,
    pub hash_cost: HashCost,
    pub store_timeout: Duration,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = |name: &str| -> Result<SecretString> {
            matches
                .get_one::<String>(name)
                .map(|value| SecretString::from(value.clone()))
                .with_context(|| format!("missing required argument: --{name}"))
        };

        Ok(Self {
            access_secret: secret(ARG_ACCESS_SECRET)?,
            refresh_secret: secret(ARG_REFRESH_SECRET)?,
            access_ttl_seconds: matches.get_one::<i64>(ARG_ACCESS_TTL).copied().unwrap_or(900),
            refresh_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TTL)
                .copied()
                .unwrap_or(604_800),
            max_failed_logins: matches
                .get_one::<u32>(ARG_MAX_FAILED_LOGINS)
                .copied()
                .unwrap_or(5),
            lockout_seconds: matches
                .get_one::<i64>(ARG_LOCKOUT_SECONDS)
                .copied()
                .unwrap_or(600),
            hash_cost: parse_hash_cost(matches),
            store_timeout: Duration::from_millis(
                matches
                    .get_one::<u64>(ARG_STORE_TIMEOUT_MS)
                    .copied()
                    .unwrap_or(5000),
            ),
        })
    }

    #[must_use]
    pub fn into_config(self) -> AuthConfig {
        AuthConfig::new(self.access_secret, self.refresh_secret)
            .with_access_ttl_seconds(self.access_ttl_seconds)
            .with_refresh_ttl_seconds(self.refresh_ttl_seconds)
            .with_max_failed_logins(self.max_failed_logins)
            .with_lockout_seconds(self.lockout_seconds)
            .with_hash_cost(self.hash_cost)
            .with_store_timeout(self.store_timeout)
    }
}

fn parse_hash_cost(matches: &ArgMatches) -> HashCost {
    let defaults = HashCost::default();
    HashCost {
        memory_kib: matches
            .get_one::<u32>(ARG_HASH_MEMORY_KIB)
            .copied()
            .unwrap_or(defaults.memory_kib),
        iterations: matches
            .get_one::<u32>(ARG_HASH_ITERATIONS)
            .copied()
            .unwrap_or(defaults.iterations),
        parallelism: matches
            .get_one::<u32>(ARG_HASH_PARALLELISM)
            .copied()
            .unwrap_or(defaults.parallelism),
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
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
