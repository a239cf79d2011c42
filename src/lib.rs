// Library crate - Monte Carlo engine for prop firm evaluation attempts

pub mod error;
pub mod config;
pub mod simulator;
pub mod batch;
pub mod stats;
pub mod report;
pub mod api;

// Re-export commonly used types
pub use batch::{run_batch, BatchRunner};
pub use config::{AccountTier, RequestLimits, SimulationParameters, SimulationRequest, TierTable};
pub use error::{SimError, SimResult};
pub use simulator::{
    simulate_attempt, simulate_attempt_with_state, Outcome, OutcomeReason, RunState,
};
pub use stats::{summarize, Summary};
