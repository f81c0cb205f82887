use anyhow::Context;
use clap::Parser;
use colored::*;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;
use wrtpilot::cancel::CancelToken;
use wrtpilot::config::Config;
use wrtpilot::ui::Renderer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);
    tracing::debug!(provider = %config.provider, dry_run = config.dry_run, "configuration loaded");

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    if cli.interactive {
        commands::run_interactive(config, Renderer::new(cli.json), &cancel).await?;
        return Ok(0);
    }
    Ok(commands::run_once(&cli, config, &cancel).await?)
}

/// 진단 로그는 stderr. 기본 warn, --debug면 debug, RUST_LOG가 있으면 우선
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
