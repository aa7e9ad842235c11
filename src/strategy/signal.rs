//! Trade signals and direction tags.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data::OptionType;

/// Identifies both the overall structure and a leg's role within it.
///
/// The tag string is part of the position-cache identity key and the exit
/// evaluator dispatch, so known variants round-trip through their exact
/// string form. Tags this crate has never seen land in [`Direction::Other`],
/// which keeps the original string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    ShortCondorCall,
    LongCondorCall,
    ShortCondorPut,
    LongCondorPut,
    BullPutCreditSpread,
    BearCallCreditSpread,
    BullCallDebitSpread,
    BearPutDebitSpread,
    ShortCall,
    ShortPmccCall,
    LongPmccLeaps,
    Other(String),
}

impl Direction {
    /// Parse a direction tag. Unknown tags are preserved verbatim.
    pub fn parse(tag: &str) -> Self {
        match tag.to_uppercase().as_str() {
            "SHORT_CONDOR_CALL" => Self::ShortCondorCall,
            "LONG_CONDOR_CALL" => Self::LongCondorCall,
            "SHORT_CONDOR_PUT" => Self::ShortCondorPut,
            "LONG_CONDOR_PUT" => Self::LongCondorPut,
            "BULL_PUT_CREDIT_SPREAD" => Self::BullPutCreditSpread,
            "BEAR_CALL_CREDIT_SPREAD" => Self::BearCallCreditSpread,
            "BULL_CALL_DEBIT_SPREAD" => Self::BullCallDebitSpread,
            "BEAR_PUT_DEBIT_SPREAD" => Self::BearPutDebitSpread,
            "SHORT_CALL" => Self::ShortCall,
            "SHORT_PMCC_CALL" => Self::ShortPmccCall,
            "LONG_PMCC_LEAPS" => Self::LongPmccLeaps,
            _ => Self::Other(tag.to_string()),
        }
    }

    /// The canonical tag string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ShortCondorCall => "SHORT_CONDOR_CALL",
            Self::LongCondorCall => "LONG_CONDOR_CALL",
            Self::ShortCondorPut => "SHORT_CONDOR_PUT",
            Self::LongCondorPut => "LONG_CONDOR_PUT",
            Self::BullPutCreditSpread => "BULL_PUT_CREDIT_SPREAD",
            Self::BearCallCreditSpread => "BEAR_CALL_CREDIT_SPREAD",
            Self::BullCallDebitSpread => "BULL_CALL_DEBIT_SPREAD",
            Self::BearPutDebitSpread => "BEAR_PUT_DEBIT_SPREAD",
            Self::ShortCall => "SHORT_CALL",
            Self::ShortPmccCall => "SHORT_PMCC_CALL",
            Self::LongPmccLeaps => "LONG_PMCC_LEAPS",
            Self::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

/// A trade signal emitted by a strategy, one per leg of a structure.
///
/// Immutable once produced; the rationale string documents the derivation
/// (credit, targets, chosen strikes) and is shared across a structure's legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Underlying symbol.
    pub symbol: String,

    /// Leg expiration date.
    pub expiry: NaiveDate,

    /// Leg strike.
    pub strike: Decimal,

    /// Leg option type.
    pub option_type: OptionType,

    /// Structure/role tag.
    pub direction: Direction,

    /// Human-readable derivation trail.
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip() {
        for tag in [
            "SHORT_CONDOR_CALL",
            "BULL_PUT_CREDIT_SPREAD",
            "LONG_PMCC_LEAPS",
            "SHORT_CALL",
        ] {
            assert_eq!(Direction::parse(tag).as_str(), tag);
        }
    }

    #[test]
    fn test_unknown_direction_preserved() {
        let custom = Direction::parse("CUSTOM_STRATEGY");
        assert_eq!(custom, Direction::Other("CUSTOM_STRATEGY".to_string()));
        assert_eq!(custom.as_str(), "CUSTOM_STRATEGY");
    }

    #[test]
    fn test_direction_serde_as_string() {
        let json = serde_json::to_string(&Direction::BullPutCreditSpread).unwrap();
        assert_eq!(json, "\"BULL_PUT_CREDIT_SPREAD\"");
        let back: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Direction::BullPutCreditSpread);
    }
}
