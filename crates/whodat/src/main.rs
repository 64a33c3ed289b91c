//! The `whodat` bot binary.
//!
//! # Usage
//!
//! ```bash
//! WHODATBOT_API_TOKEN=123:abc whodat --port 8080 --secret s3cret \
//!     --set-webhook https://bot.example.com/hooks/
//! ```
//!
//! Each flag falls back to its environment variable; every other setting
//! comes from `whodat.toml` or `WHODAT_*` variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use whodat::runtime::{RuntimeBuilder, WhoDatRuntime};

/// Tells you who is behind every user mentioned in a message.
#[derive(Debug, Parser)]
#[command(name = "whodat", version, about)]
struct Cli {
    /// Bot API token.
    #[arg(long, env = "WHODATBOT_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Port to listen on for webhook requests.
    #[arg(long, env = "WHODATBOT_HTTP_PORT")]
    port: Option<u16>,

    /// Webhook path secret; requests to any other path are rejected.
    #[arg(long, env = "WHODATBOT_WEBHOOK_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Register `URL` joined with the secret as the webhook before serving.
    #[arg(long = "set-webhook", value_name = "URL")]
    set_webhook: Option<String>,

    /// Configuration file to load instead of searching for `whodat.toml`.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layers the command-line values over the other configuration sources.
    fn runtime_builder(self) -> RuntimeBuilder {
        let mut builder = WhoDatRuntime::builder();
        if let Some(path) = &self.config {
            builder = builder.config_file(path);
        }
        if self.verbose {
            builder = builder.set("logging.level", "debug");
        }

        builder
            .set_opt("bot.token", self.token)
            .set_opt("webhook.port", self.port)
            .set_opt("webhook.secret", self.secret)
            .set_opt("webhook.base_url", self.set_webhook)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = cli
        .runtime_builder()
        .build()
        .context("failed to start whodat")?;
    runtime.run().await.context("whodat stopped with an error")?;

    Ok(())
}
