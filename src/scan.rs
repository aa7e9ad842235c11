//! Scan orchestration.
//!
//! One scan pass runs every strategy over the snapshot set, records the
//! resulting signals in the position cache, and then evaluates exits for the
//! cached book. Strategies evaluate in parallel; cache mutation stays
//! sequential and follows strategy order, so runs are reproducible.

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::cache::{ExitRecommendation, PositionCache};
use crate::data::OptionChainSnapshot;
use crate::strategy::{Strategy, TradeSignal};

/// Hook invoked once per emitted signal, after cache recording.
pub trait SignalObserver: Send + Sync {
    fn on_signal(&self, strategy: &str, signal: &TradeSignal);
}

/// Outcome of one scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// (strategy name, signal) in strategy order.
    pub signals: Vec<(String, TradeSignal)>,

    /// Advisory exits for the cached book.
    pub exits: Vec<ExitRecommendation>,
}

/// Run every strategy, record signals, and evaluate exits.
///
/// The cache is updated in memory only; persisting it is the caller's
/// decision.
pub fn run_scan(
    strategies: &[Box<dyn Strategy>],
    snapshots: &[OptionChainSnapshot],
    cache: &mut PositionCache,
    observers: &[Box<dyn SignalObserver>],
    now: DateTime<Utc>,
) -> ScanReport {
    let per_strategy: Vec<(String, Vec<TradeSignal>)> = strategies
        .par_iter()
        .map(|strategy| (strategy.name().to_string(), strategy.evaluate(snapshots)))
        .collect();

    let mut signals = Vec::new();
    for (name, emitted) in per_strategy {
        for signal in emitted {
            let snapshot = snapshots
                .iter()
                .find(|s| s.symbol.eq_ignore_ascii_case(&signal.symbol));
            cache.record(&name, &signal, snapshot, now);
            for observer in observers {
                observer.on_signal(&name, &signal);
            }
            signals.push((name.clone(), signal));
        }
    }

    let exits = cache.evaluate_exits(snapshots, now);
    ScanReport { signals, exits }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionQuote, OptionType};
    use crate::strategy::{CoveredCallConfig, CoveredCallStrategy, Direction};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl SignalObserver for Recorder {
        fn on_signal(&self, strategy: &str, signal: &TradeSignal) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{}:{}", strategy, signal.symbol));
        }
    }

    fn snapshot() -> OptionChainSnapshot {
        let now = Utc::now();
        let expiry = (now + Duration::days(30)).date_naive();
        let call = OptionQuote {
            expiry,
            strike: dec!(525),
            option_type: OptionType::Call,
            bid: dec!(6.00),
            ask: dec!(6.20),
            mark: dec!(6.10),
            last: Decimal::ZERO,
            delta: 0.2,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            implied_volatility: 0.3,
        };
        OptionChainSnapshot::new("SPY", dec!(500), now, vec![call])
    }

    #[test]
    fn test_scan_records_and_notifies() {
        let now = Utc::now();
        let strategies: Vec<Box<dyn Strategy>> = vec![Box::new(CoveredCallStrategy::new(
            CoveredCallConfig::default(),
        ))];
        let mut cache = PositionCache::load("/nonexistent/positions.json");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observers: Vec<Box<dyn SignalObserver>> = vec![Box::new(Recorder(Arc::clone(&seen)))];

        let report = run_scan(&strategies, &[snapshot()], &mut cache, &observers, now);

        assert_eq!(report.signals.len(), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), ["CoveredCall:SPY"]);
        assert_eq!(report.signals[0].0, "CoveredCall");
        assert_eq!(report.signals[0].1.direction, Direction::ShortCall);
        assert_eq!(cache.len(), 1);
        let position = cache.entries().next().unwrap();
        assert_eq!(position.context.underlying_price, Some(dec!(500)));
        // Underlying far below the strike and DTE healthy: no exits.
        assert!(report.exits.is_empty());
    }

    #[test]
    fn test_exit_evaluated_for_preexisting_position() {
        let now = Utc::now();
        let strategies: Vec<Box<dyn Strategy>> = Vec::new();
        let mut cache = PositionCache::load("/nonexistent/positions.json");
        let expiry = (now + Duration::days(30)).date_naive();
        cache.record(
            "CoveredCall",
            &TradeSignal {
                symbol: "SPY".to_string(),
                expiry,
                strike: dec!(480),
                option_type: OptionType::Call,
                direction: Direction::ShortCall,
                rationale: "test".to_string(),
            },
            None,
            now,
        );

        let report = run_scan(&strategies, &[snapshot()], &mut cache, &[], now);
        assert!(report.signals.is_empty());
        // 500 underlying breaches 480 * 1.02.
        assert_eq!(report.exits.len(), 1);
    }
}
