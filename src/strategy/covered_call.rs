//! Covered call strategy.
//!
//! Single-leg premium selling against an assumed share position. Picks the
//! richest call at least `otm_pct` above the underlying, subject to premium
//! floors. Share ownership itself is outside this crate's scope; the signal
//! only proposes the short call.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{OptionChainSnapshot, OptionQuote, PriceSide};

use super::signal::{Direction, TradeSignal};
use super::{emit, Strategy};

/// Covered call configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveredCallConfig {
    /// Skip expiries closer than this many days.
    pub min_dte: i64,

    /// Strike must sit at least this fraction above the underlying.
    pub otm_pct: f64,

    /// Minimum absolute premium, in dollars.
    pub min_premium: Decimal,

    /// Minimum premium as a fraction of the underlying price.
    pub min_premium_pct: f64,
}

impl Default for CoveredCallConfig {
    fn default() -> Self {
        Self {
            min_dte: 14,
            otm_pct: 0.05,
            min_premium: Decimal::ONE,
            min_premium_pct: 0.01,
        }
    }
}

struct CallCandidate<'a> {
    symbol: String,
    expiry: NaiveDate,
    quote: &'a OptionQuote,
    premium: Decimal,
    rationale: String,
}

/// Covered call strategy.
pub struct CoveredCallStrategy {
    config: CoveredCallConfig,
}

impl CoveredCallStrategy {
    pub fn new(config: CoveredCallConfig) -> Self {
        Self { config }
    }

    fn min_strike(&self, underlying: Decimal) -> Decimal {
        let multiplier = Decimal::try_from(1.0 + self.config.otm_pct).unwrap_or(Decimal::ONE);
        underlying * multiplier
    }
}

impl Strategy for CoveredCallStrategy {
    fn name(&self) -> &str {
        "CoveredCall"
    }

    fn evaluate(&self, snapshots: &[OptionChainSnapshot]) -> Vec<TradeSignal> {
        let mut best: BTreeMap<String, CallCandidate<'_>> = BTreeMap::new();

        for snapshot in snapshots {
            if !snapshot.is_usable() {
                continue;
            }
            let symbol = snapshot.symbol.to_uppercase();
            let min_strike = self.min_strike(snapshot.underlying_price);

            for chain in snapshot.chains() {
                if chain.dte(snapshot.timestamp) < self.config.min_dte {
                    continue;
                }
                for &quote in &chain.calls {
                    if quote.strike < min_strike {
                        continue;
                    }
                    let premium = quote.price(PriceSide::Sell);
                    if premium < self.config.min_premium {
                        continue;
                    }
                    let premium_pct: f64 = (premium / snapshot.underlying_price)
                        .try_into()
                        .unwrap_or(0.0);
                    if premium_pct < self.config.min_premium_pct {
                        continue;
                    }

                    match best.get(&symbol) {
                        Some(current) if current.premium >= premium => {}
                        _ => {
                            let rationale = format!(
                                "Covered call premium {:.2} ({:.2}%) | strike {} ({:.1}% OTM) | {}",
                                premium,
                                premium_pct * 100.0,
                                quote.strike,
                                ((quote.strike / snapshot.underlying_price)
                                    .try_into()
                                    .unwrap_or(1.0f64)
                                    - 1.0)
                                    * 100.0,
                                chain.expiry,
                            );
                            best.insert(
                                symbol.clone(),
                                CallCandidate {
                                    symbol: symbol.clone(),
                                    expiry: chain.expiry,
                                    quote,
                                    premium,
                                    rationale,
                                },
                            );
                        }
                    }
                }
            }
        }

        best.into_values()
            .map(|candidate| {
                emit(
                    self.name(),
                    TradeSignal {
                        symbol: candidate.symbol,
                        expiry: candidate.expiry,
                        strike: candidate.quote.strike,
                        option_type: candidate.quote.option_type,
                        direction: Direction::ShortCall,
                        rationale: candidate.rationale,
                    },
                )
            })
            .collect()
    }
}
