//! Strategy modules: pure functions from a snapshot set to trade signals.
//!
//! One module per structure type:
//! - Iron condor: delta-targeted short strangle with fixed-width wings
//! - Credit spread: bull put / bear call verticals, delta-targeted
//! - Vertical debit spread: ATM anchor with fixed-width opposing leg
//! - Covered call: single OTM short call
//! - Poor man's covered call: LEAPS plus shorter-dated short call
//!
//! Strategies are independent, deterministic given identical snapshots and
//! configuration, and have no network or persistence side effects. The
//! explicit [`registry`] replaces runtime plugin discovery.

pub mod covered_call;
pub mod credit_spread;
pub mod iron_condor;
pub mod pmcc;
pub mod registry;
pub mod signal;
pub mod vertical_spread;

pub use covered_call::{CoveredCallConfig, CoveredCallStrategy};
pub use credit_spread::{CreditSpreadConfig, CreditSpreadStrategy};
pub use iron_condor::{IronCondorConfig, IronCondorStrategy};
pub use pmcc::{PmccConfig, PmccStrategy};
pub use signal::{Direction, TradeSignal};
pub use vertical_spread::{VerticalSpreadConfig, VerticalSpreadStrategy};

use crate::data::OptionChainSnapshot;

/// A strategy module.
///
/// `evaluate` scans the run's snapshots and proposes zero or more signals.
/// Absence of a qualifying candidate is not an error; malformed snapshots
/// are skipped, never fatal.
pub trait Strategy: Send + Sync {
    /// Short name used in reports and the position cache.
    fn name(&self) -> &str;

    /// Evaluate the run's snapshots and propose trade signals.
    fn evaluate(&self, snapshots: &[OptionChainSnapshot]) -> Vec<TradeSignal>;
}

/// Shared emit hook: logs each proposed signal exactly once before it is
/// returned to the caller.
pub fn emit(strategy: &str, signal: TradeSignal) -> TradeSignal {
    tracing::info!(
        strategy,
        symbol = %signal.symbol,
        expiry = %signal.expiry,
        strike = %signal.strike,
        option_type = signal.option_type.as_str(),
        direction = signal.direction.as_str(),
        rationale = %signal.rationale,
        "signal emitted"
    );
    signal
}
