//! Handler for the `quote` command.

use serde_json::json;

use crate::adapter::inbound::cli::command::QuoteArgs;
use crate::adapter::inbound::cli::scenario::Scenario;
use crate::adapter::inbound::cli::{config, output};
use crate::application::trading;
use crate::domain::DISPLAY_DP;
use crate::error::Result;

/// Execute `quote`.
pub fn execute(args: &QuoteArgs) -> Result<()> {
    let config = config::load_or_default(args.config.as_deref())?;
    let scenario = Scenario::load(&args.scenario)?;
    let quote = trading::quote(
        &scenario.contract,
        &config.fee_schedule(),
        &args.outcome,
        args.amount,
    )?;

    if output::is_json() {
        output::json_output(json!({
            "command": "quote",
            "contract_id": scenario.contract.id,
            "outcome": quote.outcome,
            "amount": quote.amount,
            "prob_before": quote.prob_before,
            "prob_after": quote.prob_after,
            "shares": quote.shares,
        }));
        return Ok(());
    }

    output::section("Quote");
    output::field("Contract", &scenario.contract.id);
    output::field("Mechanism", scenario.contract.mechanism);
    output::field("Outcome", &quote.outcome);
    output::field("Amount", quote.amount);
    output::field("Probability", percent(quote.prob_before));
    output::field("After bet", output::highlight(percent(quote.prob_after)));
    output::field("Shares", quote.shares.round_dp(DISPLAY_DP));
    Ok(())
}

fn percent(p: rust_decimal::Decimal) -> String {
    format!("{}%", (p * rust_decimal::Decimal::ONE_HUNDRED).round_dp(DISPLAY_DP))
}
