//! Explicit strategy registry.
//!
//! Builds the run's strategy set from configuration toggles. Adding a
//! strategy means adding a module and a line here; there is no runtime
//! discovery.

use std::sync::Arc;

use crate::config::ScanConfig;
use crate::state::MarketStateProvider;

use super::{
    CoveredCallStrategy, CreditSpreadStrategy, IronCondorStrategy, PmccStrategy, Strategy,
    VerticalSpreadStrategy,
};

/// Instantiate every enabled strategy.
///
/// The market-state provider, when present, is shared by the directional
/// strategies; the neutral ones ignore it.
pub fn build(
    config: &ScanConfig,
    market_state: Option<Arc<dyn MarketStateProvider>>,
) -> Vec<Box<dyn Strategy>> {
    let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();

    if config.strategies.iron_condor {
        strategies.push(Box::new(IronCondorStrategy::new(config.iron_condor.clone())));
    }
    if config.strategies.credit_spread {
        let mut strategy = CreditSpreadStrategy::new(config.credit_spread.clone());
        if let Some(provider) = &market_state {
            strategy = strategy.with_market_state(Arc::clone(provider));
        }
        strategies.push(Box::new(strategy));
    }
    if config.strategies.vertical_spread {
        let mut strategy = VerticalSpreadStrategy::new(config.vertical_spread.clone());
        if let Some(provider) = &market_state {
            strategy = strategy.with_market_state(Arc::clone(provider));
        }
        strategies.push(Box::new(strategy));
    }
    if config.strategies.covered_call {
        strategies.push(Box::new(CoveredCallStrategy::new(config.covered_call.clone())));
    }
    if config.strategies.pmcc {
        strategies.push(Box::new(PmccStrategy::new(config.pmcc.clone())));
    }

    strategies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_enabled_by_default() {
        let strategies = build(&ScanConfig::default(), None);
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["IronCondor", "CreditSpread", "VerticalSpread", "CoveredCall", "Pmcc"]
        );
    }

    #[test]
    fn test_toggles_disable_strategies() {
        let mut config = ScanConfig::default();
        config.strategies.iron_condor = false;
        config.strategies.pmcc = false;
        let strategies = build(&config, None);
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["CreditSpread", "VerticalSpread", "CoveredCall"]);
    }
}
