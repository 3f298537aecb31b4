use std::process::ExitCode;

use clap::Parser;

mod commands;
mod config;
mod error;
mod prompt;
mod render;

#[derive(Debug, Parser)]
#[command(name = "trackwise", about = "Track expenses and income from the terminal")]
struct Cli {
    #[command(flatten)]
    config: config::ConfigArgs,
    /// Answer yes to every confirmation.
    #[arg(long, short, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match config::load(cli.config) {
        Ok(settings) => settings,
        Err(err) => {
            render::error(&err);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "trackwise={level},ledger={level}",
            level = settings.log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    match commands::run(cli.command, &settings, cli.yes).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{err:?}");
            render::error(&err);
            ExitCode::FAILURE
        }
    }
}
