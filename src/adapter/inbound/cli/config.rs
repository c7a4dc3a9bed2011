//! Handler for the `config` command group.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Load `path` if given, otherwise use the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    path.map_or_else(|| Ok(Config::default()), Config::load)
}

/// Execute `config check`.
pub fn execute_check(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.check",
            "path": path.display().to_string(),
            "valid": true,
        }));
        return Ok(());
    }

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");
    output::field("Log format", &config.logging.format);
    output::field("Max attempts", config.payments.max_attempts);
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    let fees = config.fee_schedule();
    let loans = config.loan_policy();

    if output::is_json() {
        output::json_output(json!({
            "command": "config.show",
            "fees": fees,
            "loans": loans,
            "payments": {
                "max_attempts": config.payments.max_attempts,
                "initial_delay_ms": config.payments.initial_delay_ms,
                "max_delay_ms": config.payments.max_delay_ms,
                "backoff_multiplier": config.payments.backoff_multiplier,
            },
        }));
        return Ok(());
    }

    output::section("Logging");
    output::field("Level", &config.logging.level);
    output::field("Format", &config.logging.format);

    output::section("Parimutuel fees");
    output::field("Creator", fees.dpm.creator);
    output::field("Platform", fees.dpm.platform);

    output::section("Constant-product fees");
    output::field("Creator", fees.cpmm.creator);
    output::field("Platform", fees.cpmm.platform);
    output::field("Liquidity", fees.cpmm.liquidity);

    output::section("Loans");
    output::field("Per contract", loans.max_per_contract);
    output::field("Fraction", loans.fraction);

    output::section("Payments");
    output::field("Max attempts", config.payments.max_attempts);
    output::field(
        "Backoff",
        format!(
            "{}ms x{} up to {}ms",
            config.payments.initial_delay_ms,
            config.payments.backoff_multiplier,
            config.payments.max_delay_ms
        ),
    );
    Ok(())
}
