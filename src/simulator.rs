//! Single evaluation attempt
//!
//! Random walk over trades with two absorbing barriers (profit target and
//! trailing drawdown from the equity peak), followed by the path-dependent
//! profit-day and consistency checks once the target is reached.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationParameters;

/// Why an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutcomeReason {
    #[serde(rename = "passed")]
    Passed,
    #[serde(rename = "drawdown")]
    Drawdown,
    /// Target reached with fewer than two profitable days
    #[serde(rename = "<2 profit days")]
    InsufficientProfitDays,
    /// Target reached but one profitable day was too large a share
    #[serde(rename = "consistency")]
    Consistency,
    /// Day bound exhausted before either barrier was hit
    #[serde(rename = "target_not_hit")]
    TargetNotHit,
}

impl OutcomeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Drawdown => "drawdown",
            Self::InsufficientProfitDays => "<2 profit days",
            Self::Consistency => "consistency",
            Self::TargetNotHit => "target_not_hit",
        }
    }
}

impl std::fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal record of one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub passed: bool,
    pub days_elapsed: u32,
    pub reason: OutcomeReason,
    pub final_balance: f64,
    pub peak_balance: f64,
    pub trades_taken: u64,
}

/// Mutable state of one attempt. Never shared between attempts.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub balance: f64,
    pub peak_balance: f64,
    pub day_index: u32,
    pub daily_profit_record: Vec<f64>,
    pub trades_taken: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawdown(&self) -> f64 {
        self.peak_balance - self.balance
    }

    pub fn breached(&self, params: &SimulationParameters) -> bool {
        self.drawdown() > params.max_loss_limit
    }

    pub fn target_hit(&self, params: &SimulationParameters) -> bool {
        self.balance >= params.profit_target
    }

    /// Book one trade result and move the equity peak
    pub fn apply_trade(&mut self, pnl: f64) {
        self.balance += pnl;
        self.peak_balance = self.peak_balance.max(self.balance);
        self.trades_taken += 1;
    }

    fn finish(&self, reason: OutcomeReason) -> Outcome {
        Outcome {
            passed: reason == OutcomeReason::Passed,
            days_elapsed: self.day_index,
            reason,
            final_balance: self.balance,
            peak_balance: self.peak_balance,
            trades_taken: self.trades_taken,
        }
    }

    /// Verdict once the target is reached. `balance` is the balance at the
    /// moment of target achievement.
    fn judge(&self) -> OutcomeReason {
        let positive_days: Vec<f64> = self
            .daily_profit_record
            .iter()
            .copied()
            .filter(|&pl| pl > 0.0)
            .collect();

        if positive_days.len() < 2 {
            return OutcomeReason::InsufficientProfitDays;
        }

        let lowest = positive_days.iter().copied().fold(f64::INFINITY, f64::min);
        if lowest < 0.5 * self.balance {
            OutcomeReason::Consistency
        } else {
            OutcomeReason::Passed
        }
    }
}

/// Simulate one attempt with the given random source.
///
/// The drawdown barrier is checked after every trade, so a breach ends the
/// attempt mid-day. Reaching the target only ends the current day's trading;
/// the day's P/L is still recorded before the pass rules are applied.
pub fn simulate_attempt<R: Rng + ?Sized>(params: &SimulationParameters, rng: &mut R) -> Outcome {
    simulate_attempt_with_state(params, rng).0
}

/// Same as [`simulate_attempt`], also returning the final run state with its
/// per-day P/L record.
pub fn simulate_attempt_with_state<R: Rng + ?Sized>(
    params: &SimulationParameters,
    rng: &mut R,
) -> (Outcome, RunState) {
    let mut state = RunState::new();
    let reason = advance(&mut state, params, rng);
    (state.finish(reason), state)
}

fn advance<R: Rng + ?Sized>(
    state: &mut RunState,
    params: &SimulationParameters,
    rng: &mut R,
) -> OutcomeReason {
    let win = params.win_amount();
    let loss = -params.risk_per_trade;

    while !state.target_hit(params) && !state.breached(params) {
        if state.day_index >= params.max_days {
            return OutcomeReason::TargetNotHit;
        }

        state.day_index += 1;
        let mut day_pl = 0.0;

        for _ in 0..params.trades_per_day {
            let pnl = if rng.gen::<f64>() < params.win_rate {
                win
            } else {
                loss
            };
            state.apply_trade(pnl);
            day_pl += pnl;

            if state.breached(params) {
                return OutcomeReason::Drawdown;
            }
            if state.target_hit(params) {
                break;
            }
        }

        state.daily_profit_record.push(day_pl);
    }

    if state.target_hit(params) {
        state.judge()
    } else {
        OutcomeReason::TargetNotHit
    }
}
