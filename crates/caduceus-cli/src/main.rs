mod cli;
mod config;
mod context;
mod health;
mod ingest;
mod records;
mod report;
mod token;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the gateway and the local tenant state.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Token { subject, role, ttl_secs } => {
            token::run(&subject, role, ttl_secs, &config)?
        }
        cli::Command::Whoami => records::whoami(cli.token, &config)?,
        cli::Command::Ingest(cmd) => ingest::run(cmd, cli.token, &config).await?,
        cli::Command::Search { text, limit } => {
            records::search(&text, limit, cli.token, &config).await?
        }
        cli::Command::List => records::list(cli.token, &config).await?,
        cli::Command::Fetch { case_id, decrypt } => {
            records::fetch(&case_id, decrypt, cli.token, &config).await?
        }
        cli::Command::Audit(cmd) => report::run(cmd, &config)?,
        cli::Command::Health => health::run(&config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
