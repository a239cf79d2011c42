//! Statistics over a batch of outcomes
//!
//! Everything here is a pure function of the outcome multiset: reordering the
//! input never changes the summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::simulator::{Outcome, OutcomeReason};

/// Aggregated view of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub simulations: usize,
    pub passes: usize,
    /// Percentage of attempts that passed, one decimal
    pub pass_rate: f64,
    /// Mean days over passing attempts, one decimal. `None` without passes.
    pub average_days_to_pass: Option<f64>,
    pub median_days_to_pass: Option<u32>,
    /// Days-to-pass -> number of passing attempts
    pub days_histogram: BTreeMap<u32, usize>,
    /// Failure reason -> number of failing attempts
    pub failure_reason_counts: BTreeMap<OutcomeReason, usize>,
}

impl Summary {
    /// Share of all attempts that failed for `reason`, in percent
    pub fn failure_rate(&self, reason: OutcomeReason) -> f64 {
        if self.simulations == 0 {
            return 0.0;
        }
        let count = self.failure_reason_counts.get(&reason).copied().unwrap_or(0);
        count as f64 / self.simulations as f64 * 100.0
    }

    pub fn failures(&self) -> usize {
        self.simulations - self.passes
    }
}

/// `num / den` rounded to one decimal, ties to even. Works on the exact
/// integer ratio so that halves like 0.25 or 4.25 are real ties.
fn round1_ratio(num: u64, den: u64) -> f64 {
    let tenths = num * 10;
    let (q, r) = (tenths / den, tenths % den);
    let rounded = match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q % 2),
    };
    rounded as f64 / 10.0
}

/// Summarize a batch. An empty batch yields a 0.0 pass rate and empty tables.
pub fn summarize(outcomes: &[Outcome]) -> Summary {
    let mut days_histogram = BTreeMap::new();
    let mut failure_reason_counts = BTreeMap::new();
    let mut pass_days: Vec<u32> = Vec::new();

    for outcome in outcomes {
        if outcome.passed {
            pass_days.push(outcome.days_elapsed);
            *days_histogram.entry(outcome.days_elapsed).or_insert(0) += 1;
        } else {
            *failure_reason_counts.entry(outcome.reason).or_insert(0) += 1;
        }
    }

    let simulations = outcomes.len();
    let passes = pass_days.len();

    let pass_rate = if simulations > 0 {
        round1_ratio(passes as u64 * 100, simulations as u64)
    } else {
        0.0
    };

    let average_days_to_pass = if passes > 0 {
        let total: u64 = pass_days.iter().map(|&d| u64::from(d)).sum();
        Some(round1_ratio(total, passes as u64))
    } else {
        None
    };

    let median_days_to_pass = if passes > 0 {
        pass_days.sort_unstable();
        Some(pass_days[passes / 2])
    } else {
        None
    };

    Summary {
        simulations,
        passes,
        pass_rate,
        average_days_to_pass,
        median_days_to_pass,
        days_histogram,
        failure_reason_counts,
    }
}
