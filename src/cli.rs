use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "keymill", about = "Account sign-up automation & API key retrieval")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register accounts and collect their API keys
    Run {
        /// Number of accounts to register sequentially
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Override the configured headless setting (true/false)
        #[arg(long)]
        headless: Option<bool>,
    },
    /// Log into the webmail by hand and save the session cookies
    SetupCookies,
}
