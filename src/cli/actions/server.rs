use crate::api;
use crate::auth::token::{TokenConfig, parse_algorithm};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub secret: SecretString,
    pub algorithm: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
    pub verification_ttl_hours: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN or algorithm is invalid or the server fails
/// to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = Url::parse(&args.dsn).context("Invalid database connection string")?;
    if dsn.scheme() != "postgres" && dsn.scheme() != "postgresql" {
        return Err(anyhow!(
            "Unsupported database scheme: {}, expected postgres://",
            dsn.scheme()
        ));
    }

    let algorithm = parse_algorithm(&args.algorithm)?;
    let token_config = TokenConfig::new()
        .with_algorithm(algorithm)
        .with_access_ttl_minutes(args.access_ttl_minutes)
        .with_refresh_ttl_days(args.refresh_ttl_days)
        .with_reset_ttl_minutes(args.reset_ttl_minutes)
        .with_verification_ttl_hours(args.verification_ttl_hours);

    api::new(args.port, args.dsn, &args.secret, token_config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dsn: &str, algorithm: &str) -> Args {
        Args {
            port: 8080,
            dsn: dsn.to_string(),
            secret: SecretString::from("test-secret".to_string()),
            algorithm: algorithm.to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
            reset_ttl_minutes: 60,
            verification_ttl_hours: 24,
        }
    }

    #[tokio::test]
    async fn rejects_non_postgres_dsn() {
        let result = execute(args("mysql://localhost/db", "HS256")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_algorithm() {
        let result = execute(args("postgres://localhost/db", "RS256")).await;
        assert!(result.is_err());
    }
}
