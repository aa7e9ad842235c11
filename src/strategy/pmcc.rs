//! Poor man's covered call strategy.
//!
//! Pairs a deep in-the-money LEAPS call with a shorter-dated out-of-the-money
//! short call. The LEAPS substitutes for shares, so it must be far-dated,
//! high-delta, and carry limited extrinsic value. Pairs are scored by return
//! on capital: short-call credit over the net debit of the pair.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{OptionChainSnapshot, OptionQuote, OptionType, PriceSide};

use super::signal::{Direction, TradeSignal};
use super::{emit, Strategy};

/// PMCC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PmccConfig {
    /// Minimum days to expiry for the LEAPS leg.
    pub leaps_min_dte: i64,

    /// Minimum absolute delta for the LEAPS leg.
    pub leaps_delta_threshold: f64,

    /// LEAPS strike must sit at or below this fraction of the underlying.
    pub leaps_max_strike_pct: f64,

    /// Maximum extrinsic value in the LEAPS, as a fraction of the underlying.
    pub max_leaps_extrinsic_pct: f64,

    /// Short call expiry window, in days.
    pub short_min_dte: i64,
    pub short_max_dte: i64,

    /// Short strike must sit at least this fraction above the underlying.
    pub short_otm_pct: f64,

    /// Minimum return on capital for a pair.
    pub min_return_on_capital: f64,
}

impl Default for PmccConfig {
    fn default() -> Self {
        Self {
            leaps_min_dte: 240,
            leaps_delta_threshold: 0.7,
            leaps_max_strike_pct: 0.9,
            max_leaps_extrinsic_pct: 0.35,
            short_min_dte: 21,
            short_max_dte: 60,
            short_otm_pct: 0.05,
            min_return_on_capital: 0.12,
        }
    }
}

struct PmccCandidate<'a> {
    symbol: String,
    leaps: &'a OptionQuote,
    short: &'a OptionQuote,
    return_on_capital: f64,
    rationale: String,
}

/// Poor man's covered call strategy.
pub struct PmccStrategy {
    config: PmccConfig,
}

impl PmccStrategy {
    pub fn new(config: PmccConfig) -> Self {
        Self { config }
    }

    fn leaps_qualifies(&self, snapshot: &OptionChainSnapshot, quote: &OptionQuote) -> bool {
        if quote.option_type != OptionType::Call {
            return false;
        }
        if quote.dte(snapshot.timestamp) < self.config.leaps_min_dte {
            return false;
        }
        let max_strike = snapshot.underlying_price
            * Decimal::try_from(self.config.leaps_max_strike_pct).unwrap_or(Decimal::ONE);
        if quote.strike > max_strike {
            return false;
        }
        if quote.delta_abs() < self.config.leaps_delta_threshold {
            return false;
        }
        let price = quote.price(PriceSide::Buy);
        if price <= Decimal::ZERO {
            return false;
        }
        let intrinsic = (snapshot.underlying_price - quote.strike).max(Decimal::ZERO);
        let extrinsic_pct: f64 = ((price - intrinsic) / snapshot.underlying_price)
            .try_into()
            .unwrap_or(f64::MAX);
        extrinsic_pct <= self.config.max_leaps_extrinsic_pct
    }

    fn short_qualifies(&self, snapshot: &OptionChainSnapshot, quote: &OptionQuote) -> bool {
        if quote.option_type != OptionType::Call {
            return false;
        }
        let dte = quote.dte(snapshot.timestamp);
        if dte < self.config.short_min_dte || dte > self.config.short_max_dte {
            return false;
        }
        let min_strike = snapshot.underlying_price
            * Decimal::try_from(1.0 + self.config.short_otm_pct).unwrap_or(Decimal::ONE);
        if quote.strike < min_strike {
            return false;
        }
        quote.price(PriceSide::Sell) > Decimal::ZERO
    }

    fn pair<'a>(
        &self,
        snapshot: &OptionChainSnapshot,
        leaps: &'a OptionQuote,
        short: &'a OptionQuote,
    ) -> Option<PmccCandidate<'a>> {
        // The short must expire first and never undercut the LEAPS strike.
        if short.expiry >= leaps.expiry || short.strike < leaps.strike {
            return None;
        }
        let leaps_price = leaps.price(PriceSide::Buy);
        let credit = short.price(PriceSide::Sell);
        let net_debit = leaps_price - credit;
        if net_debit <= Decimal::ZERO {
            return None;
        }
        let return_on_capital: f64 = (credit / net_debit).try_into().unwrap_or(0.0);
        if return_on_capital < self.config.min_return_on_capital {
            return None;
        }

        let rationale = format!(
            "PMCC net debit {:.2} | credit {:.2} | ROC {:.2} | LEAPS {} {} (delta {:.2}) / short {} {}",
            net_debit,
            credit,
            return_on_capital,
            leaps.expiry,
            leaps.strike,
            leaps.delta,
            short.expiry,
            short.strike,
        );

        Some(PmccCandidate {
            symbol: snapshot.symbol.to_uppercase(),
            leaps,
            short,
            return_on_capital,
            rationale,
        })
    }
}

impl Strategy for PmccStrategy {
    fn name(&self) -> &str {
        "Pmcc"
    }

    fn evaluate(&self, snapshots: &[OptionChainSnapshot]) -> Vec<TradeSignal> {
        let mut best: BTreeMap<String, PmccCandidate<'_>> = BTreeMap::new();

        for snapshot in snapshots {
            if !snapshot.is_usable() {
                continue;
            }
            let symbol = snapshot.symbol.to_uppercase();

            let leaps_pool: Vec<&OptionQuote> = snapshot
                .options
                .iter()
                .filter(|q| self.leaps_qualifies(snapshot, q))
                .collect();
            let short_pool: Vec<&OptionQuote> = snapshot
                .options
                .iter()
                .filter(|q| self.short_qualifies(snapshot, q))
                .collect();

            for &leaps in &leaps_pool {
                for &short in &short_pool {
                    let Some(candidate) = self.pair(snapshot, leaps, short) else {
                        continue;
                    };
                    match best.get(&symbol) {
                        Some(current)
                            if current.return_on_capital >= candidate.return_on_capital => {}
                        _ => {
                            best.insert(symbol.clone(), candidate);
                        }
                    }
                }
            }
        }

        let mut signals = Vec::new();
        for pair in best.into_values() {
            let mut leg = |quote: &OptionQuote, direction: Direction| {
                signals.push(emit(
                    self.name(),
                    TradeSignal {
                        symbol: pair.symbol.clone(),
                        expiry: quote.expiry,
                        strike: quote.strike,
                        option_type: quote.option_type,
                        direction,
                        rationale: pair.rationale.clone(),
                    },
                ));
            };
            leg(pair.leaps, Direction::LongPmccLeaps);
            leg(pair.short, Direction::ShortPmccCall);
        }
        signals
    }
}
