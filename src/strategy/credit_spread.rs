//! Credit spread strategy.
//!
//! Delta-targeted bull put and bear call verticals. The short leg sits near
//! the target delta and the long leg exactly one spread-width further
//! out-of-the-money. Candidates are scored by return on risk, defined as
//! credit over (width minus credit).
//!
//! When a market-state provider is attached, bullish states suppress bear
//! call spreads and non-bullish states suppress bull put spreads. Without a
//! provider, both sides are considered.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{ExpiryChain, OptionChainSnapshot, OptionQuote, PriceSide};
use crate::state::MarketStateProvider;

use super::signal::{Direction, TradeSignal};
use super::{emit, Strategy};

/// Credit spread configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditSpreadConfig {
    /// Target absolute delta for the short leg.
    pub target_delta: f64,

    /// Tolerance band around the target delta.
    pub delta_tolerance: f64,

    /// Distance between the short and long strikes.
    pub spread_width: Decimal,

    /// Minimum absolute credit per spread, in dollars.
    pub min_credit: Decimal,

    /// Minimum credit as a fraction of the underlying price.
    pub min_credit_pct: f64,

    /// Skip expiries closer than this many days.
    pub min_dte: i64,
}

impl Default for CreditSpreadConfig {
    fn default() -> Self {
        Self {
            target_delta: 0.20,
            delta_tolerance: 0.05,
            spread_width: Decimal::from(5),
            min_credit: Decimal::new(5, 1),
            min_credit_pct: 0.001,
            min_dte: 14,
        }
    }
}

struct SpreadCandidate<'a> {
    symbol: String,
    expiry: NaiveDate,
    direction: Direction,
    short: &'a OptionQuote,
    long: &'a OptionQuote,
    return_on_risk: f64,
    rationale: String,
}

/// Keep the higher-scoring candidate per symbol and side.
fn consider<'a>(
    best: &mut BTreeMap<String, SpreadCandidate<'a>>,
    symbol: &str,
    candidate: Option<SpreadCandidate<'a>>,
) {
    let Some(candidate) = candidate else { return };
    let key = format!("{}::{}", symbol, candidate.direction.as_str());
    match best.get(&key) {
        Some(current) if current.return_on_risk >= candidate.return_on_risk => {}
        _ => {
            best.insert(key, candidate);
        }
    }
}

/// Credit spread strategy.
pub struct CreditSpreadStrategy {
    config: CreditSpreadConfig,
    market_state: Option<Arc<dyn MarketStateProvider>>,
}

impl CreditSpreadStrategy {
    pub fn new(config: CreditSpreadConfig) -> Self {
        Self {
            config,
            market_state: None,
        }
    }

    pub fn with_market_state(mut self, provider: Arc<dyn MarketStateProvider>) -> Self {
        self.market_state = Some(provider);
        self
    }

    /// (bull put allowed, bear call allowed) for this symbol.
    fn sides_allowed(&self, symbol: &str) -> (bool, bool) {
        match self.market_state.as_deref() {
            Some(provider) => match provider.get_state(symbol) {
                Some(state) if state.is_bullish() => (true, false),
                Some(_) => (false, true),
                None => (true, true),
            },
            None => (true, true),
        }
    }

    fn score_spread<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
        short: &'a OptionQuote,
        long: &'a OptionQuote,
        direction: Direction,
    ) -> Option<SpreadCandidate<'a>> {
        let credit = short.price(PriceSide::Sell) - long.price(PriceSide::Buy);
        if credit <= Decimal::ZERO || credit < self.config.min_credit {
            return None;
        }
        let credit_pct: f64 = (credit / snapshot.underlying_price)
            .try_into()
            .unwrap_or(0.0);
        if credit_pct < self.config.min_credit_pct {
            return None;
        }

        let max_loss = self.config.spread_width - credit;
        if max_loss <= Decimal::ZERO {
            return None;
        }
        let return_on_risk: f64 = (credit / max_loss).try_into().unwrap_or(0.0);

        let rationale = format!(
            "{} credit {:.2} ({:.2}%) | short delta {:.2} | RoR {:.2} | {} strikes {}/{}",
            direction.as_str(),
            credit,
            credit_pct * 100.0,
            short.delta,
            return_on_risk,
            chain.expiry,
            short.strike,
            long.strike,
        );

        Some(SpreadCandidate {
            symbol: snapshot.symbol.to_uppercase(),
            expiry: chain.expiry,
            direction,
            short,
            long,
            return_on_risk,
            rationale,
        })
    }

    fn build_bull_put<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
    ) -> Option<SpreadCandidate<'a>> {
        let short =
            chain.nearest_put_by_delta(self.config.target_delta, self.config.delta_tolerance)?;
        let long = chain.put_at_strike(short.strike - self.config.spread_width)?;
        self.score_spread(snapshot, chain, short, long, Direction::BullPutCreditSpread)
    }

    fn build_bear_call<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
    ) -> Option<SpreadCandidate<'a>> {
        let short =
            chain.nearest_call_by_delta(self.config.target_delta, self.config.delta_tolerance)?;
        let long = chain.call_at_strike(short.strike + self.config.spread_width)?;
        self.score_spread(snapshot, chain, short, long, Direction::BearCallCreditSpread)
    }
}

impl Strategy for CreditSpreadStrategy {
    fn name(&self) -> &str {
        "CreditSpread"
    }

    fn evaluate(&self, snapshots: &[OptionChainSnapshot]) -> Vec<TradeSignal> {
        let mut best: BTreeMap<String, SpreadCandidate<'_>> = BTreeMap::new();

        for snapshot in snapshots {
            if !snapshot.is_usable() {
                continue;
            }
            let symbol = snapshot.symbol.to_uppercase();
            let (allow_bull_put, allow_bear_call) = self.sides_allowed(&symbol);

            for chain in snapshot.chains() {
                if chain.dte(snapshot.timestamp) < self.config.min_dte {
                    continue;
                }

                if allow_bull_put {
                    consider(&mut best, &symbol, self.build_bull_put(snapshot, &chain));
                }
                if allow_bear_call {
                    consider(&mut best, &symbol, self.build_bear_call(snapshot, &chain));
                }
            }
        }

        let mut signals = Vec::new();
        for spread in best.into_values() {
            for quote in [spread.short, spread.long] {
                signals.push(emit(
                    self.name(),
                    TradeSignal {
                        symbol: spread.symbol.clone(),
                        expiry: spread.expiry,
                        strike: quote.strike,
                        option_type: quote.option_type,
                        direction: spread.direction.clone(),
                        rationale: spread.rationale.clone(),
                    },
                ));
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use crate::state::{MarketState, StaticMarketStateProvider};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn quote(
        expiry: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
        bid: Decimal,
        delta: f64,
    ) -> OptionQuote {
        OptionQuote {
            expiry,
            strike,
            option_type,
            bid,
            ask: bid + dec!(0.10),
            mark: bid + dec!(0.05),
            last: Decimal::ZERO,
            delta,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            implied_volatility: 0.3,
        }
    }

    fn put_ladder_snapshot() -> OptionChainSnapshot {
        let now = Utc::now();
        let expiry = (now + Duration::days(30)).date_naive();
        let options = vec![
            quote(expiry, dec!(85), OptionType::Put, dec!(0.45), -0.10),
            quote(expiry, dec!(90), OptionType::Put, dec!(1.20), -0.18),
            quote(expiry, dec!(95), OptionType::Put, dec!(2.10), -0.25),
        ];
        OptionChainSnapshot::new("NVDA", dec!(100), now, options)
    }

    fn config() -> CreditSpreadConfig {
        CreditSpreadConfig {
            target_delta: 0.20,
            delta_tolerance: 0.05,
            spread_width: dec!(5),
            min_credit: dec!(0.5),
            min_credit_pct: 0.001,
            min_dte: 14,
        }
    }

    #[test]
    fn test_bull_put_selects_delta_target_and_exact_wing() {
        let strategy = CreditSpreadStrategy::new(config());
        let signals = strategy.evaluate(&[put_ladder_snapshot()]);

        assert_eq!(signals.len(), 2);
        assert!(signals
            .iter()
            .all(|s| s.direction == Direction::BullPutCreditSpread));
        assert_eq!(signals[0].strike, dec!(90));
        assert_eq!(signals[1].strike, dec!(85));
        // Credit: 1.20 bid short minus 0.55 ask long.
        assert!(signals[0].rationale.contains("credit 0.65"));
    }

    #[test]
    fn test_best_return_on_risk_wins_across_expiries() {
        let now = Utc::now();
        let near = (now + Duration::days(30)).date_naive();
        let far = (now + Duration::days(45)).date_naive();
        let options = vec![
            // Near expiry: credit 0.65 on a 5-wide.
            quote(near, dec!(90), OptionType::Put, dec!(1.20), -0.18),
            quote(near, dec!(85), OptionType::Put, dec!(0.45), -0.10),
            // Far expiry: credit 1.30, roughly double the return on risk.
            quote(far, dec!(90), OptionType::Put, dec!(2.00), -0.19),
            quote(far, dec!(85), OptionType::Put, dec!(0.60), -0.10),
        ];
        let snapshot = OptionChainSnapshot::new("NVDA", dec!(100), now, options);

        let strategy = CreditSpreadStrategy::new(config());
        let signals = strategy.evaluate(&[snapshot]);

        // One spread per symbol and side, taken from the richer expiry.
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| s.expiry == far));
    }

    #[test]
    fn test_min_credit_floor_rejects_spread() {
        let mut cfg = config();
        cfg.min_credit = dec!(2);
        let strategy = CreditSpreadStrategy::new(cfg);
        assert!(strategy.evaluate(&[put_ladder_snapshot()]).is_empty());
    }

    #[test]
    fn test_bear_state_suppresses_bull_put() {
        let mut provider = StaticMarketStateProvider::default();
        provider.set_state("NVDA", MarketState::Bear);
        let strategy =
            CreditSpreadStrategy::new(config()).with_market_state(Arc::new(provider));
        // The snapshot has no calls, so the bear side finds nothing either.
        assert!(strategy.evaluate(&[put_ladder_snapshot()]).is_empty());
    }

    #[test]
    fn test_uptrend_state_allows_bull_put() {
        let mut provider = StaticMarketStateProvider::default();
        provider.set_state("NVDA", MarketState::Uptrend);
        let strategy =
            CreditSpreadStrategy::new(config()).with_market_state(Arc::new(provider));
        assert_eq!(strategy.evaluate(&[put_ladder_snapshot()]).len(), 2);
    }

    #[test]
    fn test_unclassified_symbol_considers_both_sides() {
        let provider = StaticMarketStateProvider::default();
        let strategy =
            CreditSpreadStrategy::new(config()).with_market_state(Arc::new(provider));
        let now = Utc::now();
        let expiry = (now + Duration::days(30)).date_naive();
        let options = vec![
            quote(expiry, dec!(90), OptionType::Put, dec!(1.20), -0.18),
            quote(expiry, dec!(85), OptionType::Put, dec!(0.45), -0.10),
            quote(expiry, dec!(110), OptionType::Call, dec!(1.30), 0.19),
            quote(expiry, dec!(115), OptionType::Call, dec!(0.50), 0.11),
        ];
        let snapshot = OptionChainSnapshot::new("NVDA", dec!(100), now, options);

        let signals = strategy.evaluate(&[snapshot]);
        assert_eq!(signals.len(), 4);
        assert!(signals
            .iter()
            .any(|s| s.direction == Direction::BearCallCreditSpread));
        assert!(signals
            .iter()
            .any(|s| s.direction == Direction::BullPutCreditSpread));
    }
}
