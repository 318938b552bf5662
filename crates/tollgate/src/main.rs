//! # Tollgate CLI
//!
//! Issue and check CAPTCHA tokens from the command line, using the same
//! configuration a service embedding the library would.
//!
//! ## Usage
//! ```bash
//! # Issue a token bound to a session id
//! TOLLGATE_PASSWORD=secret tollgate issue --solution X7KQ2 --salt session-42
//!
//! # Check an answer (exit code 0 = valid, 1 = invalid)
//! TOLLGATE_PASSWORD=secret tollgate check --answer X7KQ2 --salt session-42 --token '...'
//! ```
//!
//! Expiring tokens use a different layout, so `check` must run with the same
//! `--expires-in-ms` (or config) that `issue` used.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tollgate::config::{AppConfig, ConfigOverrides};

/// Tollgate - stateless CAPTCHA proof-of-solution tokens
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/tollgate.toml")]
    config: String,

    /// Token password (overrides config)
    #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Embed an expiry this many milliseconds after issuance (overrides config)
    #[arg(long)]
    expires_in_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a token for a known solution
    Issue {
        /// The CAPTCHA solution text
        #[arg(short, long)]
        solution: String,

        /// Salt binding the token to a context (session id, client address)
        #[arg(long)]
        salt: String,

        /// Handler to issue with (overrides config)
        #[arg(long)]
        handler: Option<String>,

        /// Do not append the encrypted handler reference
        #[arg(long)]
        no_capability: bool,
    },

    /// Check a user answer against a token
    Check {
        /// The answer submitted by the user
        #[arg(short, long)]
        answer: String,

        /// Token returned by `issue`
        #[arg(short, long)]
        token: String,

        /// Salt used when the token was issued
        #[arg(long)]
        salt: String,
    },
}

fn main() -> Result<ExitCode> {
    // .env must be loaded before clap reads TOLLGATE_PASSWORD
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.json_logs)?;

    let overrides = ConfigOverrides {
        password: args.password,
        expiration_offset_millis: args.expires_in_ms,
    };
    let mut config = AppConfig::load(&args.config, &overrides)?;
    tracing::info!(config = ?config, "Configuration loaded from {}", args.config);

    match args.command {
        Command::Issue {
            solution,
            salt,
            handler,
            no_capability,
        } => {
            if no_capability {
                config.attach_capability = false;
            }
            let generator = config.generator(handler.as_deref())?;
            let token = generator
                .generate(&solution, salt.as_str())
                .context("Failed to issue token")?;
            println!("{token}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            answer,
            token,
            salt,
        } => {
            let validator = config.validator()?;
            if validator.validate(&answer, &token, salt.as_str()) {
                println!("valid");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("invalid");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Initialize structured logging with tracing, on stderr so stdout stays
/// machine-readable
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
