//! Market state classification for underlyings.
//!
//! Strategies that only make sense on one side of the market consult a
//! [`MarketStateProvider`] before emitting directional structures. The
//! classification itself is fed by an external history/indicator
//! collaborator; this module only carries the rule and the in-memory
//! provider.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trend classification for one underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketState {
    /// Strong uptrend: price above all stacked moving averages.
    Bull,
    /// Milder constructive trend, supplied by external classifiers.
    Uptrend,
    /// Downtrend or broken moving-average stack.
    Bear,
}

impl MarketState {
    /// Whether this state permits bullish structures.
    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::Bull | Self::Uptrend)
    }
}

/// How strategies request state information.
pub trait MarketStateProvider: Send + Sync {
    /// Latest known state for `symbol`, if any. `None` means unclassified,
    /// which strategies treat as unrestricted.
    fn get_state(&self, symbol: &str) -> Option<MarketState>;
}

/// Simple provider backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketStateProvider {
    states: HashMap<String, MarketState>,
}

impl StaticMarketStateProvider {
    pub fn new(states: impl IntoIterator<Item = (String, MarketState)>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|(symbol, state)| (symbol.to_uppercase(), state))
                .collect(),
        }
    }

    pub fn set_state(&mut self, symbol: &str, state: MarketState) {
        self.states.insert(symbol.to_uppercase(), state);
    }
}

impl MarketStateProvider for StaticMarketStateProvider {
    fn get_state(&self, symbol: &str) -> Option<MarketState> {
        self.states.get(&symbol.to_uppercase()).copied()
    }
}

/// One enriched daily bar from the indicator collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendBar {
    pub date: NaiveDate,
    pub close: f64,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma30: Option<f64>,
}

/// A classification decision.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketStateResult {
    pub symbol: String,
    pub state: MarketState,
    pub as_of: NaiveDate,
    pub close: f64,
}

/// Classifies a security's trend from its moving-average stack.
///
/// Bull when the latest complete bar satisfies
/// `close > ma5 > ma10 > ma30`; Bear otherwise.
#[derive(Debug, Clone, Default)]
pub struct MarketStateClassifier;

impl MarketStateClassifier {
    pub fn classify(&self, history: &[TrendBar], symbol: &str) -> Option<MarketStateResult> {
        let latest = history
            .iter()
            .rev()
            .find(|bar| bar.ma5.is_some() && bar.ma10.is_some() && bar.ma30.is_some())?;
        let (ma5, ma10, ma30) = (latest.ma5?, latest.ma10?, latest.ma30?);
        let state = if latest.close > ma5 && ma5 > ma10 && ma10 > ma30 {
            MarketState::Bull
        } else {
            MarketState::Bear
        };
        Some(MarketStateResult {
            symbol: symbol.to_uppercase(),
            state,
            as_of: latest.date,
            close: latest.close,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: f64, ma5: f64, ma10: f64, ma30: f64) -> TrendBar {
        TrendBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            close,
            ma5: Some(ma5),
            ma10: Some(ma10),
            ma30: Some(ma30),
        }
    }

    #[test]
    fn test_stacked_averages_classify_bull() {
        let classifier = MarketStateClassifier;
        let result = classifier
            .classify(&[bar(105.0, 103.0, 101.0, 99.0)], "nvda")
            .unwrap();
        assert_eq!(result.state, MarketState::Bull);
        assert_eq!(result.symbol, "NVDA");
    }

    #[test]
    fn test_broken_stack_classifies_bear() {
        let classifier = MarketStateClassifier;
        let result = classifier
            .classify(&[bar(100.0, 103.0, 101.0, 99.0)], "NVDA")
            .unwrap();
        assert_eq!(result.state, MarketState::Bear);
    }

    #[test]
    fn test_incomplete_history_yields_none() {
        let classifier = MarketStateClassifier;
        let incomplete = TrendBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            close: 100.0,
            ma5: Some(99.0),
            ma10: None,
            ma30: Some(95.0),
        };
        assert!(classifier.classify(&[incomplete], "NVDA").is_none());
        assert!(classifier.classify(&[], "NVDA").is_none());
    }

    #[test]
    fn test_static_provider_is_case_insensitive() {
        let mut provider = StaticMarketStateProvider::default();
        provider.set_state("nvda", MarketState::Uptrend);
        assert_eq!(provider.get_state("NVDA"), Some(MarketState::Uptrend));
        assert!(MarketState::Uptrend.is_bullish());
        assert!(provider.get_state("AAPL").is_none());
    }
}
