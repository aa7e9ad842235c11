//! Core data contracts for the option scanner.
//!
//! These types form the input contract with the market-data collaborator:
//! one immutable `OptionChainSnapshot` per symbol per run, carrying a flat
//! list of per-contract quotes. Strategies never mutate a snapshot; they
//! borrow per-expiry views from it via [`ExpiryChain`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }
}

/// Which side of the book a leg trades against.
///
/// Legs that are sold are priced off the bid; legs that are bought off the
/// ask. When the preferred side is zero or missing, pricing falls back to
/// mark, then last, then the far touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSide {
    /// Selling the contract (short leg).
    Sell,
    /// Buying the contract (long leg).
    Buy,
}

/// A single option quote inside a snapshot.
///
/// No identity beyond its fields; always consumed read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Expiration date.
    pub expiry: NaiveDate,

    /// Strike price.
    pub strike: Decimal,

    /// Option type (call or put).
    pub option_type: OptionType,

    /// Bid price.
    pub bid: Decimal,

    /// Ask price.
    pub ask: Decimal,

    /// Mark (midpoint) price.
    pub mark: Decimal,

    /// Last traded price.
    pub last: Decimal,

    /// Delta (signed; negative for puts).
    pub delta: f64,

    /// Gamma.
    pub gamma: f64,

    /// Theta.
    pub theta: f64,

    /// Vega.
    pub vega: f64,

    /// Implied volatility.
    pub implied_volatility: f64,
}

impl OptionQuote {
    /// Best available price for trading this leg on the given side.
    ///
    /// Zero and negative values are treated as missing and skipped.
    pub fn price(&self, side: PriceSide) -> Decimal {
        let preference = match side {
            PriceSide::Sell => [self.bid, self.mark, self.last, self.ask],
            PriceSide::Buy => [self.ask, self.mark, self.last, self.bid],
        };
        preference
            .into_iter()
            .find(|p| *p > Decimal::ZERO)
            .unwrap_or(Decimal::ZERO)
    }

    /// Absolute delta, for target-delta searches.
    pub fn delta_abs(&self) -> f64 {
        self.delta.abs()
    }

    /// Calendar days until expiry, relative to `at`.
    pub fn dte(&self, at: DateTime<Utc>) -> i64 {
        (self.expiry - at.date_naive()).num_days()
    }
}

/// Per-expiry view over a snapshot, with calls and puts sorted by strike.
#[derive(Debug, Clone)]
pub struct ExpiryChain<'a> {
    /// Expiration date for this chain.
    pub expiry: NaiveDate,

    /// Call quotes, ascending by strike.
    pub calls: Vec<&'a OptionQuote>,

    /// Put quotes, ascending by strike.
    pub puts: Vec<&'a OptionQuote>,
}

impl<'a> ExpiryChain<'a> {
    /// Calendar days until this chain's expiry, relative to `at`.
    pub fn dte(&self, at: DateTime<Utc>) -> i64 {
        (self.expiry - at.date_naive()).num_days()
    }

    /// Find the call at an exact strike.
    pub fn call_at_strike(&self, strike: Decimal) -> Option<&'a OptionQuote> {
        self.calls.iter().find(|q| q.strike == strike).copied()
    }

    /// Find the put at an exact strike.
    pub fn put_at_strike(&self, strike: Decimal) -> Option<&'a OptionQuote> {
        self.puts.iter().find(|q| q.strike == strike).copied()
    }

    /// Call whose absolute delta is closest to `target`, within `tolerance`.
    pub fn nearest_call_by_delta(&self, target: f64, tolerance: f64) -> Option<&'a OptionQuote> {
        Self::nearest_by_delta(&self.calls, target, tolerance)
    }

    /// Put whose absolute delta is closest to `target`, within `tolerance`.
    pub fn nearest_put_by_delta(&self, target: f64, tolerance: f64) -> Option<&'a OptionQuote> {
        Self::nearest_by_delta(&self.puts, target, tolerance)
    }

    /// Call with strike closest to the underlying price.
    pub fn atm_call(&self, underlying: Decimal) -> Option<&'a OptionQuote> {
        Self::closest_to(&self.calls, underlying)
    }

    /// Put with strike closest to the underlying price.
    pub fn atm_put(&self, underlying: Decimal) -> Option<&'a OptionQuote> {
        Self::closest_to(&self.puts, underlying)
    }

    fn nearest_by_delta(
        quotes: &[&'a OptionQuote],
        target: f64,
        tolerance: f64,
    ) -> Option<&'a OptionQuote> {
        quotes
            .iter()
            .filter(|q| (q.delta_abs() - target).abs() <= tolerance)
            .min_by(|a, b| {
                let da = (a.delta_abs() - target).abs();
                let db = (b.delta_abs() - target).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }

    fn closest_to(quotes: &[&'a OptionQuote], underlying: Decimal) -> Option<&'a OptionQuote> {
        quotes
            .iter()
            .min_by_key(|q| (q.strike - underlying).abs())
            .copied()
    }
}

/// Immutable per-run market capture for one underlying.
///
/// Created once per symbol per run by the market-data collaborator and
/// discarded after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    /// Underlying symbol (e.g. "SPY").
    pub symbol: String,

    /// Underlying price at capture time.
    pub underlying_price: Decimal,

    /// Capture timestamp. DTE calculations are relative to this, so a
    /// strategy run is deterministic given identical snapshots.
    pub timestamp: DateTime<Utc>,

    /// All option quotes, one row per contract.
    pub options: Vec<OptionQuote>,
}

impl OptionChainSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        underlying_price: Decimal,
        timestamp: DateTime<Utc>,
        options: Vec<OptionQuote>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            underlying_price,
            timestamp,
            options,
        }
    }

    /// A snapshot is usable when it has rows and a positive underlying price.
    pub fn is_usable(&self) -> bool {
        !self.options.is_empty() && self.underlying_price > Decimal::ZERO
    }

    /// Distinct expiries, ascending.
    pub fn expiries(&self) -> Vec<NaiveDate> {
        let mut expiries: Vec<_> = self.options.iter().map(|q| q.expiry).collect();
        expiries.sort();
        expiries.dedup();
        expiries
    }

    /// Per-expiry views, ascending by expiry, each side sorted by strike.
    pub fn chains(&self) -> Vec<ExpiryChain<'_>> {
        let mut grouped: BTreeMap<NaiveDate, ExpiryChain<'_>> = BTreeMap::new();
        for quote in &self.options {
            let chain = grouped.entry(quote.expiry).or_insert_with(|| ExpiryChain {
                expiry: quote.expiry,
                calls: Vec::new(),
                puts: Vec::new(),
            });
            match quote.option_type {
                OptionType::Call => chain.calls.push(quote),
                OptionType::Put => chain.puts.push(quote),
            }
        }
        let mut chains: Vec<_> = grouped.into_values().collect();
        for chain in &mut chains {
            chain.calls.sort_by(|a, b| a.strike.cmp(&b.strike));
            chain.puts.sort_by(|a, b| a.strike.cmp(&b.strike));
        }
        chains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(
        expiry: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
        bid: Decimal,
        ask: Decimal,
        delta: f64,
    ) -> OptionQuote {
        OptionQuote {
            expiry,
            strike,
            option_type,
            bid,
            ask,
            mark: (bid + ask) / dec!(2),
            last: Decimal::ZERO,
            delta,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            implied_volatility: 0.25,
        }
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("put"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("CALL"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_price_prefers_side_then_falls_back() {
        let expiry = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let mut q = quote(expiry, dec!(100), OptionType::Call, dec!(1.50), dec!(1.70), 0.30);
        assert_eq!(q.price(PriceSide::Sell), dec!(1.50));
        assert_eq!(q.price(PriceSide::Buy), dec!(1.70));

        // Zero bid falls back to mark.
        q.bid = Decimal::ZERO;
        q.mark = dec!(1.60);
        assert_eq!(q.price(PriceSide::Sell), dec!(1.60));

        // Zero mark too: falls back to last.
        q.mark = Decimal::ZERO;
        q.last = dec!(1.55);
        assert_eq!(q.price(PriceSide::Sell), dec!(1.55));
    }

    #[test]
    fn test_chains_group_and_sort() {
        let near = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let far = NaiveDate::from_ymd_opt(2024, 7, 19).unwrap();
        let snapshot = OptionChainSnapshot::new(
            "SPY",
            dec!(500),
            Utc::now(),
            vec![
                quote(far, dec!(510), OptionType::Call, dec!(4.0), dec!(4.2), 0.35),
                quote(near, dec!(505), OptionType::Call, dec!(3.0), dec!(3.2), 0.40),
                quote(near, dec!(495), OptionType::Put, dec!(3.1), dec!(3.3), -0.40),
                quote(near, dec!(500), OptionType::Call, dec!(5.0), dec!(5.2), 0.50),
            ],
        );

        let chains = snapshot.chains();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].expiry, near);
        assert_eq!(chains[0].calls.len(), 2);
        assert_eq!(chains[0].calls[0].strike, dec!(500));
        assert_eq!(chains[0].puts.len(), 1);
        assert_eq!(chains[1].expiry, far);
    }

    #[test]
    fn test_nearest_by_delta_respects_tolerance() {
        let expiry = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let snapshot = OptionChainSnapshot::new(
            "SPY",
            dec!(500),
            Utc::now(),
            vec![
                quote(expiry, dec!(520), OptionType::Call, dec!(2.0), dec!(2.2), 0.22),
                quote(expiry, dec!(530), OptionType::Call, dec!(1.2), dec!(1.4), 0.14),
                quote(expiry, dec!(540), OptionType::Call, dec!(0.6), dec!(0.8), 0.08),
            ],
        );
        let chains = snapshot.chains();
        let chain = &chains[0];

        let hit = chain.nearest_call_by_delta(0.15, 0.05).unwrap();
        assert_eq!(hit.strike, dec!(530));

        // Nothing within a tight tolerance around 0.30.
        assert!(chain.nearest_call_by_delta(0.30, 0.02).is_none());
    }

    #[test]
    fn test_usability_guards() {
        let empty = OptionChainSnapshot::new("SPY", dec!(500), Utc::now(), vec![]);
        assert!(!empty.is_usable());

        let expiry = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let bad_price = OptionChainSnapshot::new(
            "SPY",
            Decimal::ZERO,
            Utc::now(),
            vec![quote(expiry, dec!(500), OptionType::Call, dec!(1.0), dec!(1.2), 0.5)],
        );
        assert!(!bad_price.is_usable());
    }
}
