//! Command-line interface definitions.
//!
//! Every command works on a JSON scenario file holding one contract with
//! its bets and liquidity provisions, so markets can be priced and settled
//! offline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Market-maker pricing and resolution settlement
#[derive(Parser, Debug)]
#[command(name = "oddsmith")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity (logs to stderr)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Price a hypothetical bet
    Quote(QuoteArgs),

    /// Resolve a scenario's contract and print the payouts
    Resolve(ResolveArgs),

    /// Inspect configuration files
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `oddsmith config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Load and validate a configuration file
    Check(ConfigPathArg),
    /// Display the effective configuration with defaults applied
    Show(ConfigPathArg),
}

/// Positional configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file
    pub path: PathBuf,
}

/// Arguments for `oddsmith quote`.
#[derive(Parser, Debug)]
pub struct QuoteArgs {
    /// Scenario file (JSON: contract, bets, liquidity)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Outcome to bet on (YES, NO or an answer id)
    #[arg(long)]
    pub outcome: String,

    /// Amount to bet
    #[arg(long)]
    pub amount: Decimal,

    /// Configuration file for fee rates
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for `oddsmith resolve`.
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Scenario file (JSON: contract, bets, liquidity)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Resolution: YES, NO, MKT, CANCEL or an answer id
    #[arg(long)]
    pub outcome: String,

    /// Binary MKT probability as a percentage (0 to 100)
    #[arg(long)]
    pub probability: Option<f64>,

    /// Free-response MKT weight as answer=weight (repeatable)
    #[arg(long = "resolution", value_parser = parse_weight)]
    pub resolutions: Vec<(String, f64)>,

    /// Resolve as this user (defaults to the contract creator)
    #[arg(long = "as")]
    pub caller: Option<String>,

    /// Configuration file for fees, loans and payment retries
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (answer, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected answer=weight, got '{raw}'"))?;
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid weight in '{raw}': {e}"))?;
    Ok((answer.trim().to_string(), weight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_quote_command() {
        let cli = Cli::try_parse_from([
            "oddsmith",
            "quote",
            "--scenario",
            "s.json",
            "--outcome",
            "YES",
            "--amount",
            "12.5",
        ])
        .unwrap();
        if let Commands::Quote(args) = cli.command {
            assert_eq!(args.outcome, "YES");
            assert_eq!(args.amount, dec!(12.5));
            assert!(args.config.is_none());
        } else {
            panic!("Expected Quote command");
        }
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_resolve_with_weights() {
        let cli = Cli::try_parse_from([
            "oddsmith",
            "--json",
            "resolve",
            "--scenario",
            "s.json",
            "--outcome",
            "MKT",
            "--resolution",
            "1=70",
            "--resolution",
            "2 = 30",
            "--as",
            "creator",
        ])
        .unwrap();
        assert!(cli.json);
        if let Commands::Resolve(args) = cli.command {
            assert_eq!(
                args.resolutions,
                vec![("1".to_string(), 70.0), ("2".to_string(), 30.0)]
            );
            assert_eq!(args.caller.as_deref(), Some("creator"));
            assert!(args.probability.is_none());
        } else {
            panic!("Expected Resolve command");
        }
    }

    #[test]
    fn test_parse_weight_rejects_missing_separator() {
        assert!(parse_weight("1:70").is_err());
        assert!(parse_weight("1=lots").is_err());
    }

    #[test]
    fn test_config_check_command() {
        let cli = Cli::try_parse_from(["oddsmith", "config", "check", "oddsmith.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommand::Check(_))
        ));
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["oddsmith", "-vv", "config", "show", "x.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
