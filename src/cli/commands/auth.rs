use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_TOKEN_ALGORITHM: &str = "token-algorithm";
pub const ARG_ACCESS_TTL_MINUTES: &str = "access-ttl-minutes";
pub const ARG_REFRESH_TTL_DAYS: &str = "refresh-ttl-days";
pub const ARG_RESET_TTL_MINUTES: &str = "reset-ttl-minutes";
pub const ARG_VERIFICATION_TTL_HOURS: &str = "verification-ttl-hours";

/// Token-signing configuration parsed from the CLI.
#[derive(Debug, Clone)]
pub struct Options {
    pub secret: SecretString,
    pub algorithm: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
    pub verification_ttl_hours: i64,
}

impl Options {
    /// Parse token arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret key is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret = matches.get_one::<String>(ARG_SECRET_KEY).cloned();
        let secret = match secret {
            Some(value) if !value.trim().is_empty() => SecretString::from(value),
            _ => anyhow::bail!("missing required argument: --{ARG_SECRET_KEY}"),
        };

        let get_i64 = |id: &str, default: i64| {
            matches.get_one::<i64>(id).copied().unwrap_or(default)
        };

        Ok(Self {
            secret,
            algorithm: matches
                .get_one::<String>(ARG_TOKEN_ALGORITHM)
                .cloned()
                .unwrap_or_else(|| "HS256".to_string()),
            access_ttl_minutes: get_i64(ARG_ACCESS_TTL_MINUTES, 30),
            refresh_ttl_days: get_i64(ARG_REFRESH_TTL_DAYS, 7),
            reset_ttl_minutes: get_i64(ARG_RESET_TTL_MINUTES, 60),
            verification_ttl_hours: get_i64(ARG_VERIFICATION_TTL_HOURS, 24),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Token signing secret")
                .long_help(
                    "Token signing secret. Every instance sharing this secret can verify tokens issued by any other instance.",
                )
                .env("SPENDAHEAD_SECRET_KEY")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_ALGORITHM)
                .long(ARG_TOKEN_ALGORITHM)
                .help("Token signing algorithm: HS256, HS384 or HS512")
                .env("SPENDAHEAD_TOKEN_ALGORITHM")
                .default_value("HS256"),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_MINUTES)
                .long(ARG_ACCESS_TTL_MINUTES)
                .help("Access token lifetime in minutes")
                .env("SPENDAHEAD_ACCESS_TTL_MINUTES")
                .default_value("30")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_DAYS)
                .long(ARG_REFRESH_TTL_DAYS)
                .help("Refresh token lifetime in days")
                .env("SPENDAHEAD_REFRESH_TTL_DAYS")
                .default_value("7")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_TTL_MINUTES)
                .long(ARG_RESET_TTL_MINUTES)
                .help("Password reset token lifetime in minutes")
                .env("SPENDAHEAD_RESET_TTL_MINUTES")
                .default_value("60")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_VERIFICATION_TTL_HOURS)
                .long(ARG_VERIFICATION_TTL_HOURS)
                .help("Email verification token lifetime in hours")
                .env("SPENDAHEAD_VERIFICATION_TTL_HOURS")
                .default_value("24")
                .value_parser(clap::value_parser!(i64)),
        )
}
