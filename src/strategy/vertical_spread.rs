//! Vertical debit spread strategy.
//!
//! Anchors the long leg at-the-money and shorts the first strike at least one
//! spread-width beyond it. Unlike the credit structures there is no exact
//! wing requirement; the short leg search walks outward until a listed strike
//! clears the width.
//!
//! Candidates are scored by return on capital: (strike distance minus debit)
//! over debit. Market state gates direction the same way the credit spread
//! does, with bull call spreads suppressed in bear markets and bear put
//! spreads suppressed in bullish ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{ExpiryChain, OptionChainSnapshot, OptionQuote, PriceSide};
use crate::state::MarketStateProvider;

use super::signal::{Direction, TradeSignal};
use super::{emit, Strategy};

/// Vertical debit spread configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalSpreadConfig {
    /// Minimum distance between the long and short strikes.
    pub spread_width: Decimal,

    /// Skip expiries closer than this many days.
    pub min_dte: i64,

    /// Minimum return on capital for a candidate.
    pub min_return_on_capital: f64,
}

impl Default for VerticalSpreadConfig {
    fn default() -> Self {
        Self {
            spread_width: Decimal::from(5),
            min_dte: 14,
            min_return_on_capital: 0.2,
        }
    }
}

struct DebitCandidate<'a> {
    symbol: String,
    expiry: NaiveDate,
    direction: Direction,
    long: &'a OptionQuote,
    short: &'a OptionQuote,
    return_on_capital: f64,
    rationale: String,
}

/// Keep the higher-scoring candidate per symbol and variant.
fn consider<'a>(
    best: &mut BTreeMap<String, DebitCandidate<'a>>,
    symbol: &str,
    candidate: Option<DebitCandidate<'a>>,
) {
    let Some(candidate) = candidate else { return };
    let key = format!("{}::{}", symbol, candidate.direction.as_str());
    match best.get(&key) {
        Some(current) if current.return_on_capital >= candidate.return_on_capital => {}
        _ => {
            best.insert(key, candidate);
        }
    }
}

/// Vertical debit spread strategy.
pub struct VerticalSpreadStrategy {
    config: VerticalSpreadConfig,
    market_state: Option<Arc<dyn MarketStateProvider>>,
}

impl VerticalSpreadStrategy {
    pub fn new(config: VerticalSpreadConfig) -> Self {
        Self {
            config,
            market_state: None,
        }
    }

    pub fn with_market_state(mut self, provider: Arc<dyn MarketStateProvider>) -> Self {
        self.market_state = Some(provider);
        self
    }

    /// (bull call allowed, bear put allowed) for this symbol.
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

    fn score_debit<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
        long: &'a OptionQuote,
        short: &'a OptionQuote,
        direction: Direction,
    ) -> Option<DebitCandidate<'a>> {
        let debit = long.price(PriceSide::Buy) - short.price(PriceSide::Sell);
        if debit <= Decimal::ZERO {
            return None;
        }
        let strike_distance = (short.strike - long.strike).abs();
        let max_profit = strike_distance - debit;
        if max_profit <= Decimal::ZERO {
            return None;
        }
        let return_on_capital: f64 = (max_profit / debit).try_into().unwrap_or(0.0);
        if return_on_capital < self.config.min_return_on_capital {
            return None;
        }

        let iv_skew = short.implied_volatility - long.implied_volatility;
        let rationale = format!(
            "{} debit {:.2} | max profit {:.2} | RoC {:.2} | IV skew {:+.3} | {} strikes {}/{}",
            direction.as_str(),
            debit,
            max_profit,
            return_on_capital,
            iv_skew,
            chain.expiry,
            long.strike,
            short.strike,
        );

        Some(DebitCandidate {
            symbol: snapshot.symbol.to_uppercase(),
            expiry: chain.expiry,
            direction,
            long,
            short,
            return_on_capital,
            rationale,
        })
    }

    fn build_bull_call<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
    ) -> Option<DebitCandidate<'a>> {
        let long = chain.atm_call(snapshot.underlying_price)?;
        let floor = long.strike + self.config.spread_width;
        let short = chain
            .calls
            .iter()
            .find(|q| q.strike >= floor)
            .copied()?;
        self.score_debit(snapshot, chain, long, short, Direction::BullCallDebitSpread)
    }

    fn build_bear_put<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
    ) -> Option<DebitCandidate<'a>> {
        let long = chain.atm_put(snapshot.underlying_price)?;
        let ceiling = long.strike - self.config.spread_width;
        let short = chain
            .puts
            .iter()
            .rev()
            .find(|q| q.strike <= ceiling)
            .copied()?;
        self.score_debit(snapshot, chain, long, short, Direction::BearPutDebitSpread)
    }
}

impl Strategy for VerticalSpreadStrategy {
    fn name(&self) -> &str {
        "VerticalSpread"
    }

    fn evaluate(&self, snapshots: &[OptionChainSnapshot]) -> Vec<TradeSignal> {
        let mut best: BTreeMap<String, DebitCandidate<'_>> = BTreeMap::new();

        for snapshot in snapshots {
            if !snapshot.is_usable() {
                continue;
            }
            let symbol = snapshot.symbol.to_uppercase();
            let (allow_bull_call, allow_bear_put) = self.sides_allowed(&symbol);

            for chain in snapshot.chains() {
                if chain.dte(snapshot.timestamp) < self.config.min_dte {
                    continue;
                }

                if allow_bull_call {
                    consider(&mut best, &symbol, self.build_bull_call(snapshot, &chain));
                }
                if allow_bear_put {
                    consider(&mut best, &symbol, self.build_bear_put(snapshot, &chain));
                }
            }
        }

        let mut signals = Vec::new();
        for spread in best.into_values() {
            for quote in [spread.long, spread.short] {
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
