//! Handler for the `resolve` command.
//!
//! Seeds the scenario into the in-memory store, resolves it through the
//! real resolver and prints the resulting per-user ledger.

use std::collections::BTreeMap;

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::ResolveArgs;
use crate::adapter::inbound::cli::scenario::Scenario;
use crate::adapter::inbound::cli::{config, output};
use crate::domain::{Amount, UserId, DISPLAY_DP};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::port::{ResolutionReport, ResolutionService, ResolveRequest, ResolveResponse};

#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Payout")]
    payout: String,
    #[tabled(rename = "Loan")]
    loan: String,
    #[tabled(rename = "Net")]
    net: String,
}

/// Execute `resolve`.
pub async fn execute(args: &ResolveArgs) -> Result<()> {
    let config = config::load_or_default(args.config.as_deref())?;
    let scenario = Scenario::load(&args.scenario)?;
    let caller = args
        .caller
        .as_deref()
        .map_or_else(|| scenario.contract.creator_id.clone(), UserId::new);

    let services = bootstrap::in_memory(&config);
    let contract_id = scenario.seed(services.store.as_ref()).await?;
    let request = build_request(args, contract_id);

    let result = services.resolver.resolve(Some(&caller), request).await;
    let response = ResolveResponse::from(&result);
    let report = result?;

    if output::is_json() {
        output::json_output(json!({
            "command": "resolve",
            "response": response,
            "contract_id": report.contract.id,
            "outcome": report.contract.resolution.as_ref().map(|r| r.outcome.clone()),
            "ledger": ledger_json(&report),
            "creator_payout": report.settlement.creator_payout,
            "collected_fees": report.settlement.collected_fees,
        }));
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn build_request(args: &ResolveArgs, contract_id: crate::domain::ContractId) -> ResolveRequest {
    let mut request = ResolveRequest::new(contract_id, args.outcome.clone());
    if let Some(probability) = args.probability {
        request = request.with_probability_int(probability);
    }
    if !args.resolutions.is_empty() {
        let weights: BTreeMap<String, f64> = args.resolutions.iter().cloned().collect();
        request = request.with_resolutions(weights);
    }
    request
}

/// Per-user payout, loan and net amounts, in user order.
fn rows(report: &ResolutionReport) -> Vec<(UserId, Amount, Amount, Amount)> {
    report
        .ledger
        .iter()
        .map(|(user_id, net)| {
            let loan = report.loans.loan(user_id);
            (user_id.clone(), net + loan, loan, net)
        })
        .collect()
}

fn ledger_json(report: &ResolutionReport) -> serde_json::Value {
    rows(report)
        .into_iter()
        .map(|(user_id, payout, loan, net)| {
            json!({
                "user_id": user_id,
                "payout": payout,
                "loan": loan,
                "net": net,
            })
        })
        .collect()
}

fn print_report(report: &ResolutionReport) {
    let contract = &report.contract;
    output::section("Resolution");
    output::field("Contract", &contract.id);
    output::field("Question", &contract.question);
    if let Some(resolution) = &contract.resolution {
        output::field("Outcome", output::highlight(&resolution.outcome));
        if let Some(p) = resolution.resolution_probability {
            output::field("Probability", p);
        }
    }

    output::section("Payouts");
    if report.ledger.is_empty() {
        output::note("(no payouts)");
    } else {
        let table: Vec<LedgerRow> = rows(report)
            .into_iter()
            .map(|(user_id, payout, loan, net)| LedgerRow {
                user: user_id.to_string(),
                payout: payout.round_dp(DISPLAY_DP).to_string(),
                loan: loan.round_dp(DISPLAY_DP).to_string(),
                net: net.round_dp(DISPLAY_DP).to_string(),
            })
            .collect();
        output::lines(&Table::new(table).to_string());
    }

    output::field("Total paid", output::signed(report.ledger.total().round_dp(DISPLAY_DP)));
    output::field(
        "Creator fee",
        report.settlement.creator_payout.round_dp(DISPLAY_DP),
    );
    output::field(
        "Platform fee",
        report.settlement.collected_fees.platform_fee.round_dp(DISPLAY_DP),
    );
    output::success("Contract resolved");
}
