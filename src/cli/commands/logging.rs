use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("OFFICEPASS_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_levels_are_capped() {
        temp_env::with_var("OFFICEPASS_LOG_LEVEL", None::<&str>, || {
            let result = with_args(Command::new("officepass")).try_get_matches_from(["officepass"]);
            assert!(result.is_ok());
        });
        temp_env::with_var("OFFICEPASS_LOG_LEVEL", Some("9"), || {
            let result = with_args(Command::new("officepass")).try_get_matches_from(["officepass"]);
            assert!(result.is_err());
        });
        temp_env::with_var("OFFICEPASS_LOG_LEVEL", Some("3"), || {
            let matches =
                with_args(Command::new("officepass")).try_get_matches_from(["officepass"]);
            assert_eq!(
                matches.ok().and_then(|m| m.get_one::<u8>(ARG_VERBOSITY).copied()),
                Some(3)
            );
        });
    }
}
