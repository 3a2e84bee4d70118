//! Command-line argument dispatch and server initialization.
//!
//! This module maps validated CLI arguments to the appropriate action,
//! such as starting the API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        secret: auth_opts.secret,
        algorithm: auth_opts.algorithm,
        access_ttl_minutes: auth_opts.access_ttl_minutes,
        refresh_ttl_days: auth_opts.refresh_ttl_days,
        reset_ttl_minutes: auth_opts.reset_ttl_minutes,
        verification_ttl_hours: auth_opts.verification_ttl_hours,
    }))
}
