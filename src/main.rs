use std::io::IsTerminal;

use clap::Parser;
use oddsmith::adapter::inbound::cli::command::{Cli, ColorChoice, Commands, ConfigCommand};
use oddsmith::adapter::inbound::cli::output::{self, OutputConfig};
use oddsmith::adapter::inbound::cli::{config, quote, resolve};
use oddsmith::infrastructure::config::logging::LoggingConfig;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => !cli.json && std::io::stdout().is_terminal(),
    };
    output::configure(OutputConfig::new(cli.json, cli.quiet, color));

    if cli.verbose > 0 {
        LoggingConfig {
            level: if cli.verbose == 1 { "info" } else { "debug" }.to_string(),
            format: if cli.json { "json" } else { "pretty" }.to_string(),
        }
        .init();
    }

    if let Err(e) = run(cli).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Quote(args) => quote::execute(&args)?,
        Commands::Resolve(args) => resolve::execute(&args).await?,
        Commands::Config(ConfigCommand::Check(args)) => config::execute_check(&args.path)?,
        Commands::Config(ConfigCommand::Show(args)) => config::execute_show(&args.path)?,
    }
    Ok(())
}
