mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use keymill_core::config::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment variable overrides. Every setting has a usable default,
    // so the tool also runs with no config file and no environment at all.
    if let Ok(v) = std::env::var("TARGET_HOME_URL") {
        config.target.home_url = v;
    }
    if let Ok(v) = std::env::var("TARGET_SIGNUP_URL") {
        config.target.signup_url = v;
    }
    if let Ok(v) = std::env::var("KEY_PREFIX") {
        config.target.key_prefix = v;
    }
    if let Ok(v) = std::env::var("EMAIL_CHECK_URL") {
        config.email.check_url = v;
    }
    if let Ok(v) = std::env::var("EMAIL_DOMAIN") {
        config.email.domain = v;
    }
    if let Ok(v) = std::env::var("EMAIL_PREFIX") {
        config.email.default_prefix = v;
    }
    if let Ok(v) = std::env::var("DEFAULT_PASSWORD") {
        config.register.default_password = v;
    }
    if let Ok(v) = std::env::var("HEADLESS") {
        config.browser.headless = v != "0" && v.to_lowercase() != "false";
    }
    if let Ok(v) = std::env::var("SELECTOR_TIMEOUT_MS") {
        if let Some(n) = v.parse::<u64>().ok().filter(|&n| n > 0) {
            config.browser.selector_timeout_ms = n;
        }
    }
    if let Ok(v) = std::env::var("EMAIL_CHECK_INTERVAL") {
        if let Some(n) = v.parse::<u64>().ok().filter(|&n| n > 0) {
            config.inbox.poll_interval_secs = n;
        }
    }
    if let Ok(v) = std::env::var("MAX_EMAIL_CHECKS") {
        if let Some(n) = v.parse::<u32>().ok().filter(|&n| n > 0) {
            config.inbox.max_checks = n;
        }
    }
    if let Ok(v) = std::env::var("MAX_ATTEMPTS") {
        if let Some(n) = v.parse::<u32>().ok().filter(|&n| n > 0) {
            config.register.max_attempts = n;
        }
    }
    if let Ok(v) = std::env::var("CREDENTIALS_FILE") {
        config.files.credentials_file = v;
    }
    if let Ok(v) = std::env::var("COOKIES_FILE") {
        config.files.cookies_file = v;
    }

    match cli.command {
        Commands::Run { count, headless } => {
            if let Some(headless) = headless {
                config.browser.headless = headless;
            }
            commands::run::run(config, count).await?;
        }
        Commands::SetupCookies => {
            commands::cookies::run(config).await?;
        }
    }

    Ok(())
}
