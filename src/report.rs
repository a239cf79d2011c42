//! Plain-text rendering of a batch summary

use std::fmt;

use crate::config::SimulationParameters;
use crate::stats::Summary;

const BAR_WIDTH: usize = 40;

/// Parameters, headline numbers, days-to-pass histogram and the failure
/// breakdown of one batch
pub struct Report<'a> {
    pub tier: &'a str,
    pub params: &'a SimulationParameters,
    pub summary: &'a Summary,
}

/// Render a batch report as printable text
pub fn render(tier: &str, params: &SimulationParameters, summary: &Summary) -> String {
    Report {
        tier,
        params,
        summary,
    }
    .to_string()
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_report(out, self.tier, self.params, self.summary)
    }
}

fn write_report(
    out: &mut fmt::Formatter<'_>,
    tier: &str,
    params: &SimulationParameters,
    summary: &Summary,
) -> fmt::Result {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(
        out,
        "ACCOUNT: {} (${:.0} target, ${:.0} max loss)",
        tier, params.profit_target, params.max_loss_limit
    )?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "Win Rate: {:.1}%", params.win_rate * 100.0)?;
    writeln!(
        out,
        "Risk: ${:.0} | Reward:Risk {:.1} | Trades/Day: {}",
        params.risk_per_trade, params.reward_risk_ratio, params.trades_per_day
    )?;
    writeln!(out)?;
    writeln!(out, "SIMULATION RESULTS ({} runs):", summary.simulations)?;
    writeln!(out, "{}", "-".repeat(40))?;
    writeln!(
        out,
        "  Pass Rate:          {:.1}% ({} passed)",
        summary.pass_rate, summary.passes
    )?;

    match (summary.average_days_to_pass, summary.median_days_to_pass) {
        (Some(avg), Some(median)) => {
            writeln!(out, "  Avg Days to Pass:   {:.1}", avg)?;
            writeln!(out, "  Median Days:        {}", median)?;
        }
        _ => writeln!(out, "  Avg Days to Pass:   N/A")?,
    }

    if !summary.days_histogram.is_empty() {
        writeln!(out)?;
        writeln!(out, "DAYS TO PASS:")?;
        let max_count = summary.days_histogram.values().copied().max().unwrap_or(1);
        for (days, count) in &summary.days_histogram {
            let width = (count * BAR_WIDTH).div_ceil(max_count);
            writeln!(
                out,
                "  {:>4} | {:<w$} {}",
                days,
                "#".repeat(width),
                count,
                w = BAR_WIDTH
            )?;
        }
    }

    if !summary.failure_reason_counts.is_empty() {
        writeln!(out)?;
        writeln!(out, "FAIL REASONS ({} failed):", summary.failures())?;
        let mut reasons: Vec<_> = summary.failure_reason_counts.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (reason, count) in reasons {
            writeln!(
                out,
                "  {:<16} {:>6} ({:.1}%)",
                reason.as_str(),
                count,
                summary.failure_rate(*reason)
            )?;
        }
    }

    Ok(())
}
