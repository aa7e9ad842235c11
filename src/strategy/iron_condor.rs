//! Iron condor strategy.
//!
//! Identifies neutral premium-selling setups: a short put and a short call
//! near the target delta, with long wings exactly one spread-width further
//! out. If a wing strike is not listed, the whole candidate for that expiry
//! is discarded; there is no nearest-strike substitution.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{ExpiryChain, OptionChainSnapshot, OptionQuote, PriceSide};

use super::signal::{Direction, TradeSignal};
use super::{emit, Strategy};

/// Iron condor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IronCondorConfig {
    /// Target absolute delta for the short legs.
    pub target_delta: f64,

    /// Tolerance band around the target delta.
    pub delta_tolerance: f64,

    /// Minimum absolute credit (per condor) worth trading, in dollars.
    pub premium_threshold: Decimal,

    /// Minimum credit as a fraction of the underlying price.
    pub min_credit_pct: f64,

    /// Distance between each short leg and its long wing.
    pub spread_width: Decimal,

    /// Skip expiries closer than this many days.
    pub min_dte: i64,

    /// Cap how many candidate expiries per symbol are evaluated each run.
    pub max_expiries_per_symbol: usize,

    /// Optional allow-list of underlyings. Defaults to the liquid index
    /// ETFs; set to `None` to scan everything.
    #[serde(default)]
    pub allowed_symbols: Option<Vec<String>>,
}

impl Default for IronCondorConfig {
    fn default() -> Self {
        Self {
            target_delta: 0.15,
            delta_tolerance: 0.10,
            premium_threshold: Decimal::ONE,
            min_credit_pct: 0.01,
            spread_width: Decimal::from(5),
            min_dte: 21,
            max_expiries_per_symbol: 3,
            allowed_symbols: Some(vec![
                "SPY".to_string(),
                "QQQ".to_string(),
                "IWM".to_string(),
            ]),
        }
    }
}

struct CondorCandidate<'a> {
    symbol: String,
    expiry: NaiveDate,
    short_call: &'a OptionQuote,
    long_call: &'a OptionQuote,
    short_put: &'a OptionQuote,
    long_put: &'a OptionQuote,
    total_credit: Decimal,
    rationale: String,
}

/// Iron condor strategy.
pub struct IronCondorStrategy {
    config: IronCondorConfig,
}

impl IronCondorStrategy {
    pub fn new(config: IronCondorConfig) -> Self {
        Self { config }
    }

    fn symbol_allowed(&self, symbol: &str) -> bool {
        match &self.config.allowed_symbols {
            Some(allowed) => allowed.iter().any(|s| s.eq_ignore_ascii_case(symbol)),
            None => true,
        }
    }

    fn build_condor<'a>(
        &self,
        snapshot: &'a OptionChainSnapshot,
        chain: &ExpiryChain<'a>,
    ) -> Option<CondorCandidate<'a>> {
        let short_put =
            chain.nearest_put_by_delta(self.config.target_delta, self.config.delta_tolerance)?;
        let short_call =
            chain.nearest_call_by_delta(self.config.target_delta, self.config.delta_tolerance)?;

        // Degenerate body: shorts inverted or touching.
        if short_put.strike >= short_call.strike {
            return None;
        }

        // Wings must exist at exactly short +/- width.
        let long_put = chain.put_at_strike(short_put.strike - self.config.spread_width)?;
        let long_call = chain.call_at_strike(short_call.strike + self.config.spread_width)?;

        let credit_call = short_call.price(PriceSide::Sell) - long_call.price(PriceSide::Buy);
        let credit_put = short_put.price(PriceSide::Sell) - long_put.price(PriceSide::Buy);
        let total_credit = credit_call + credit_put;

        if total_credit < self.config.premium_threshold {
            return None;
        }
        let credit_pct: f64 = (total_credit / snapshot.underlying_price)
            .try_into()
            .unwrap_or(0.0);
        if credit_pct < self.config.min_credit_pct {
            return None;
        }

        let rationale = format!(
            "Iron condor credit {:.2} ({:.2}%) | call delta {:.2} / put delta {:.2} | {} strikes {}-{} / {}-{}",
            total_credit,
            credit_pct * 100.0,
            short_call.delta,
            short_put.delta,
            chain.expiry,
            short_put.strike,
            long_put.strike,
            short_call.strike,
            long_call.strike,
        );

        Some(CondorCandidate {
            symbol: snapshot.symbol.to_uppercase(),
            expiry: chain.expiry,
            short_call,
            long_call,
            short_put,
            long_put,
            total_credit,
            rationale,
        })
    }
}

impl Strategy for IronCondorStrategy {
    fn name(&self) -> &str {
        "IronCondor"
    }

    fn evaluate(&self, snapshots: &[OptionChainSnapshot]) -> Vec<TradeSignal> {
        let mut best_by_symbol: BTreeMap<String, CondorCandidate<'_>> = BTreeMap::new();

        for snapshot in snapshots {
            if !snapshot.is_usable() {
                continue;
            }
            let symbol = snapshot.symbol.to_uppercase();
            if !self.symbol_allowed(&symbol) {
                continue;
            }

            let mut evaluated = 0usize;
            for chain in snapshot.chains() {
                if chain.dte(snapshot.timestamp) < self.config.min_dte {
                    continue;
                }
                if evaluated >= self.config.max_expiries_per_symbol {
                    break;
                }
                let Some(candidate) = self.build_condor(snapshot, &chain) else {
                    continue;
                };
                evaluated += 1;
                match best_by_symbol.get(&symbol) {
                    Some(current) if current.total_credit >= candidate.total_credit => {}
                    _ => {
                        best_by_symbol.insert(symbol.clone(), candidate);
                    }
                }
            }
        }

        let mut signals = Vec::new();
        for condor in best_by_symbol.into_values() {
            let mut leg = |quote: &OptionQuote, direction: Direction| {
                signals.push(emit(
                    self.name(),
                    TradeSignal {
                        symbol: condor.symbol.clone(),
                        expiry: condor.expiry,
                        strike: quote.strike,
                        option_type: quote.option_type,
                        direction,
                        rationale: condor.rationale.clone(),
                    },
                ));
            };
            leg(condor.short_call, Direction::ShortCondorCall);
            leg(condor.long_call, Direction::LongCondorCall);
            leg(condor.short_put, Direction::ShortCondorPut);
            leg(condor.long_put, Direction::LongCondorPut);
        }
        signals
    }
}
