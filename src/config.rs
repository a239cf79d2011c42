//! Account tiers, simulation parameters and shell request limits

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SimError, SimResult};

/// Default termination bound for a single attempt, in trading days.
/// High enough that no realistic parameter set ever reaches it.
pub const DEFAULT_MAX_DAYS: u32 = 10_000;

/// Behavioural and account assumptions for one batch of attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Probability in [0, 1] that a single trade wins
    pub win_rate: f64,

    /// Dollars lost on a losing trade
    pub risk_per_trade: f64,

    /// A win pays `risk_per_trade * reward_risk_ratio`
    pub reward_risk_ratio: f64,

    /// Trades attempted per day (fewer if the target is hit mid-day)
    pub trades_per_day: u32,

    /// Balance at or above this ends the attempt as a pass candidate
    pub profit_target: f64,

    /// Maximum allowed decline from the running equity peak
    pub max_loss_limit: f64,

    /// Attempt is abandoned as `target_not_hit` after this many days
    #[serde(default = "default_max_days")]
    pub max_days: u32,
}

fn default_max_days() -> u32 {
    DEFAULT_MAX_DAYS
}

impl SimulationParameters {
    /// Reject anything that would produce meaningless statistics.
    /// Nothing is clamped.
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.win_rate) {
            return Err(SimError::invalid(
                "win_rate",
                format!("{} is not a probability in [0, 1]", self.win_rate),
            ));
        }
        check_positive("risk_per_trade", self.risk_per_trade)?;
        check_positive("reward_risk_ratio", self.reward_risk_ratio)?;
        check_positive("profit_target", self.profit_target)?;
        check_positive("max_loss_limit", self.max_loss_limit)?;
        if self.trades_per_day == 0 {
            return Err(SimError::invalid("trades_per_day", "must be at least 1"));
        }
        if self.max_days == 0 {
            return Err(SimError::invalid("max_days", "must be at least 1"));
        }
        Ok(())
    }

    /// Dollar result of a winning trade
    pub fn win_amount(&self) -> f64 {
        self.risk_per_trade * self.reward_risk_ratio
    }
}

fn check_positive(name: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("{} must be a positive amount", value)))
    }
}

/// Profit target and drawdown limit for one account size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTier {
    pub name: String,
    pub profit_target: f64,
    pub max_loss_limit: f64,
}

impl AccountTier {
    pub fn new(name: impl Into<String>, profit_target: f64, max_loss_limit: f64) -> Self {
        Self {
            name: name.into(),
            profit_target,
            max_loss_limit,
        }
    }
}

/// Lookup table of account tiers, kept in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTable {
    tiers: Vec<AccountTier>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self::new(vec![
            AccountTier::new("50K", 3000.0, 2000.0),
            AccountTier::new("100K", 6000.0, 3000.0),
            AccountTier::new("150K", 9000.0, 4500.0),
        ])
    }
}

impl TierTable {
    pub fn new(tiers: Vec<AccountTier>) -> Self {
        Self { tiers }
    }

    /// Load a tier table from a JSON array of tiers
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tier file {:?}", path))?;
        let table: TierTable = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse tier file {:?}", path))?;

        if table.tiers.is_empty() {
            anyhow::bail!("Tier file {:?} defines no tiers", path);
        }
        for tier in &table.tiers {
            check_positive("profit_target", tier.profit_target)
                .and_then(|_| check_positive("max_loss_limit", tier.max_loss_limit))
                .with_context(|| format!("Invalid tier `{}`", tier.name))?;
        }

        Ok(table)
    }

    pub fn get(&self, name: &str) -> SimResult<&AccountTier> {
        self.tiers
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SimError::UnknownTier(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|t| t.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountTier> {
        self.tiers.iter()
    }
}

/// Bounds the operator-facing inputs must fall within
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestLimits {
    pub simulations: (usize, usize),
    pub win_rate_pct: (f64, f64),
    pub risk_per_trade: (f64, f64),
    pub reward_risk_ratio: (f64, f64),
    pub trades_per_day: (u32, u32),
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            simulations: (100, 2000),
            win_rate_pct: (35.0, 65.0),
            risk_per_trade: (100.0, 2000.0),
            reward_risk_ratio: (1.0, 3.0),
            trades_per_day: (1, 10),
        }
    }
}

impl RequestLimits {
    /// Only the core validity rules apply
    pub fn unbounded() -> Self {
        Self {
            simulations: (1, usize::MAX),
            win_rate_pct: (0.0, 100.0),
            risk_per_trade: (f64::MIN_POSITIVE, f64::MAX),
            reward_risk_ratio: (f64::MIN_POSITIVE, f64::MAX),
            trades_per_day: (1, u32::MAX),
        }
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> SimResult<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(SimError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Configuration as collected from an operator (CLI flags or API body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRequest {
    pub tier: String,
    pub simulations: usize,
    /// Win rate in percent
    pub win_rate_pct: f64,
    pub risk_per_trade: f64,
    pub reward_risk_ratio: f64,
    pub trades_per_day: u32,
    /// Makes the batch reproducible
    pub seed: Option<u64>,
    pub max_days: Option<u32>,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            tier: "50K".to_string(),
            simulations: 500,
            win_rate_pct: 55.0,
            risk_per_trade: 300.0,
            reward_risk_ratio: 2.0,
            trades_per_day: 2,
            seed: None,
            max_days: None,
        }
    }
}

impl SimulationRequest {
    /// Check the request against `limits` and turn it into core parameters
    /// plus the number of attempts to run.
    pub fn resolve(
        &self,
        tiers: &TierTable,
        limits: &RequestLimits,
    ) -> SimResult<(SimulationParameters, usize)> {
        let tier = tiers.get(&self.tier)?;

        if self.simulations == 0 {
            return Err(SimError::ZeroSimulations);
        }
        let (min_sims, max_sims) = limits.simulations;
        check_range(
            "simulations",
            self.simulations as f64,
            (min_sims as f64, max_sims as f64),
        )?;
        check_range("win_rate_pct", self.win_rate_pct, limits.win_rate_pct)?;
        check_range("risk_per_trade", self.risk_per_trade, limits.risk_per_trade)?;
        check_range(
            "reward_risk_ratio",
            self.reward_risk_ratio,
            limits.reward_risk_ratio,
        )?;
        let (min_tpd, max_tpd) = limits.trades_per_day;
        check_range(
            "trades_per_day",
            self.trades_per_day as f64,
            (min_tpd as f64, max_tpd as f64),
        )?;

        let params = SimulationParameters {
            win_rate: self.win_rate_pct / 100.0,
            risk_per_trade: self.risk_per_trade,
            reward_risk_ratio: self.reward_risk_ratio,
            trades_per_day: self.trades_per_day,
            profit_target: tier.profit_target,
            max_loss_limit: tier.max_loss_limit,
            max_days: self.max_days.unwrap_or(DEFAULT_MAX_DAYS),
        };
        params.validate()?;

        Ok((params, self.simulations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimulationParameters {
        SimulationParameters {
            win_rate: 0.55,
            risk_per_trade: 300.0,
            reward_risk_ratio: 2.0,
            trades_per_day: 2,
            profit_target: 3000.0,
            max_loss_limit: 2000.0,
            max_days: DEFAULT_MAX_DAYS,
        }
    }

    #[test]
    fn test_valid_parameters() {
        assert!(params().validate().is_ok());
        assert_eq!(params().win_amount(), 600.0);
    }

    #[test]
    fn test_rejects_bad_win_rate() {
        for win_rate in [-0.1, 1.01, f64::NAN] {
            let p = SimulationParameters {
                win_rate,
                ..params()
            };
            assert!(matches!(
                p.validate(),
                Err(SimError::InvalidParameter { name: "win_rate", .. })
            ));
        }
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let p = SimulationParameters {
            risk_per_trade: 0.0,
            ..params()
        };
        assert!(p.validate().is_err());

        let p = SimulationParameters {
            reward_risk_ratio: -1.0,
            ..params()
        };
        assert!(p.validate().is_err());

        let p = SimulationParameters {
            max_loss_limit: f64::INFINITY,
            ..params()
        };
        assert!(p.validate().is_err());

        let p = SimulationParameters {
            trades_per_day: 0,
            ..params()
        };
        assert!(p.validate().is_err());

        let p = SimulationParameters {
            max_days: 0,
            ..params()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_default_tiers() {
        let tiers = TierTable::default();
        assert_eq!(tiers.names().collect::<Vec<_>>(), vec!["50K", "100K", "150K"]);

        let t = tiers.get("100K").unwrap();
        assert_eq!(t.profit_target, 6000.0);
        assert_eq!(t.max_loss_limit, 3000.0);

        assert_eq!(
            tiers.get("25K"),
            Err(SimError::UnknownTier("25K".to_string()))
        );
    }

    #[test]
    fn test_custom_tier_table() {
        let tiers = TierTable::new(vec![AccountTier::new("tiny", 200.0, 1000.0)]);
        let request = SimulationRequest {
            tier: "tiny".to_string(),
            ..Default::default()
        };
        let (p, n) = request.resolve(&tiers, &RequestLimits::default()).unwrap();
        assert_eq!(p.profit_target, 200.0);
        assert_eq!(p.max_loss_limit, 1000.0);
        assert_eq!(n, 500);
    }

    #[test]
    fn test_tier_table_json() {
        let json = r#"[{"name": "25K", "profit_target": 1500, "max_loss_limit": 1500}]"#;
        let table: TierTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.get("25K").unwrap().profit_target, 1500.0);

        let path = std::env::temp_dir().join(format!("tiers-{}.json", std::process::id()));
        std::fs::write(&path, json).unwrap();
        let loaded = TierTable::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_request_resolves_defaults() {
        let (p, n) = SimulationRequest::default()
            .resolve(&TierTable::default(), &RequestLimits::default())
            .unwrap();

        assert_eq!(n, 500);
        assert!((p.win_rate - 0.55).abs() < 1e-12);
        assert_eq!(p.risk_per_trade, 300.0);
        assert_eq!(p.reward_risk_ratio, 2.0);
        assert_eq!(p.trades_per_day, 2);
        assert_eq!(p.profit_target, 3000.0);
        assert_eq!(p.max_loss_limit, 2000.0);
        assert_eq!(p.max_days, DEFAULT_MAX_DAYS);
    }

    #[test]
    fn test_request_limits() {
        let tiers = TierTable::default();
        let limits = RequestLimits::default();

        let request = SimulationRequest {
            win_rate_pct: 80.0,
            ..Default::default()
        };
        assert!(matches!(
            request.resolve(&tiers, &limits),
            Err(SimError::OutOfRange { field: "win_rate_pct", .. })
        ));

        let request = SimulationRequest {
            simulations: 5000,
            ..Default::default()
        };
        assert!(matches!(
            request.resolve(&tiers, &limits),
            Err(SimError::OutOfRange { field: "simulations", .. })
        ));

        let request = SimulationRequest {
            simulations: 0,
            ..Default::default()
        };
        assert_eq!(request.resolve(&tiers, &limits), Err(SimError::ZeroSimulations));

        // Outside the operator bounds but still a valid model
        let request = SimulationRequest {
            simulations: 5000,
            win_rate_pct: 80.0,
            ..Default::default()
        };
        assert!(request.resolve(&tiers, &RequestLimits::unbounded()).is_ok());
    }

    #[test]
    fn test_request_json_fills_defaults() {
        let request: SimulationRequest =
            serde_json::from_str(r#"{"tier": "150K", "seed": 7}"#).unwrap();
        assert_eq!(request.tier, "150K");
        assert_eq!(request.seed, Some(7));
        assert_eq!(request.simulations, 500);
        assert_eq!(request.trades_per_day, 2);
    }
}
