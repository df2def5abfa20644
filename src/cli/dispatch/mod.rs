//! Maps parsed CLI arguments to the action the binary executes.

use crate::api::Environment;
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_ENVIRONMENT, ARG_PORT, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;
    let environment = matches
        .get_one::<String>(ARG_ENVIRONMENT)
        .map_or(Ok(Environment::default()), |value| value.parse::<Environment>())?;

    let auth_config = auth::Options::parse(matches)?.into_config();
    auth_config
        .validate()
        .context("invalid authentication settings")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        environment,
        auth_config,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_vars(refresh_secret: &'static str) -> [(&'static str, Option<&'static str>); 4] {
        [
            (
                "OFFICEPASS_DSN",
                Some("postgres://user@localhost:5432/officepass"),
            ),
            ("OFFICEPASS_ACCESS_TOKEN_SECRET", Some("access-secret")),
            ("OFFICEPASS_REFRESH_TOKEN_SECRET", Some(refresh_secret)),
            ("OFFICEPASS_ENVIRONMENT", Some("development")),
        ]
    }

    #[test]
    fn builds_server_action() {
        temp_env::with_vars(env_vars("refresh-secret"), || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["officepass"]);
            let result = handler(&matches);
            assert!(result.is_ok());
            if let Ok(Action::Server(args)) = result {
                assert_eq!(args.port, 8080);
                assert_eq!(args.environment, Environment::Development);
                assert_eq!(args.auth_config.max_failed_logins(), 5);
            }
        });
    }

    #[test]
    fn shared_secrets_rejected() {
        temp_env::with_vars(env_vars("access-secret"), || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["officepass"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("invalid authentication settings"));
            }
        });
    }
}
