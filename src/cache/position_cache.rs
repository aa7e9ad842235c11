//! Position cache and exit evaluation.
//!
//! Every emitted signal is recorded as a cached position keyed by its
//! identity (symbol, direction, option type, strike, expiry). The cache
//! persists as pretty-printed JSON and survives malformed files by starting
//! empty rather than failing the run.
//!
//! Exit evaluation walks the open positions against the latest snapshots.
//! Each direction tag has a default evaluator; callers may register
//! overrides per tag, which take precedence.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::data::{OptionChainSnapshot, OptionType};
use crate::strategy::{Direction, TradeSignal};

/// Cache persistence errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Lifecycle state of a cached position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Market context captured alongside a position, refreshed on re-observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underlying_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_ts: Option<DateTime<Utc>>,
}

/// One tracked position leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPosition {
    pub id: Uuid,
    pub strategy: String,
    pub symbol: String,
    pub direction: Direction,
    pub option_type: OptionType,
    pub strike: Decimal,
    /// ISO date string; kept as text so the identity key is stable even for
    /// entries written by other tools.
    pub expiry: String,
    pub opened_at: DateTime<Utc>,
    pub rationale: String,
    pub status: PositionStatus,
    #[serde(default)]
    pub context: SnapshotContext,
    pub last_seen: DateTime<Utc>,
}

impl CachedPosition {
    /// Identity key used for deduplication and reconciliation.
    pub fn key(&self) -> String {
        entry_key(
            &self.symbol,
            &self.direction,
            self.option_type,
            self.strike,
            &self.expiry,
        )
    }

    /// Calendar days until expiry, clamped at zero. Malformed expiry strings
    /// count as already expired.
    pub fn days_to_expiry(&self, now: DateTime<Utc>) -> i64 {
        match NaiveDate::parse_from_str(&self.expiry, "%Y-%m-%d") {
            Ok(expiry) => (expiry - now.date_naive()).num_days().max(0),
            Err(_) => 0,
        }
    }
}

/// Canonical identity key for a position leg.
pub fn entry_key(
    symbol: &str,
    direction: &Direction,
    option_type: OptionType,
    strike: Decimal,
    expiry: &str,
) -> String {
    format!(
        "{}::{}::{}::{:.4}::{}",
        symbol.to_uppercase(),
        direction.as_str(),
        option_type.as_str(),
        strike,
        expiry,
    )
}

/// Advisory exit action. Only one kind today; the enum keeps the JSON shape
/// extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitAction {
    #[serde(rename = "CONSIDER_EXIT")]
    ConsiderExit,
}

/// An advisory exit recommendation for an open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRecommendation {
    pub symbol: String,
    pub strategy: String,
    pub direction: Direction,
    pub strike: Decimal,
    pub expiry: String,
    pub reason: String,
    pub action: ExitAction,
}

/// Custom exit rule for one direction tag.
pub type ExitEvaluator =
    Box<dyn Fn(&CachedPosition, &OptionChainSnapshot, DateTime<Utc>) -> Option<String> + Send + Sync>;

/// JSON-backed store of every position the scanner has proposed.
pub struct PositionCache {
    path: PathBuf,
    entries: HashMap<String, CachedPosition>,
    overrides: HashMap<String, ExitEvaluator>,
}

impl PositionCache {
    /// Load the cache from `path`. A missing file yields an empty cache; an
    /// unreadable or malformed file is logged and also yields an empty cache,
    /// so one bad write never wedges subsequent runs.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, CachedPosition>>(&raw) {
                Ok(entries) => entries,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "position cache unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "position cache unreadable, starting empty");
                HashMap::new()
            }
        };
        Self {
            path,
            entries,
            overrides: HashMap::new(),
        }
    }

    /// Persist the cache. Writes to a sibling temp file first so a crash
    /// mid-write leaves the previous cache intact.
    pub fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut sorted: Vec<(&String, &CachedPosition)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let ordered: serde_json::Map<String, serde_json::Value> = sorted
            .into_iter()
            .map(|(key, position)| Ok((key.clone(), serde_json::to_value(position)?)))
            .collect::<Result<_, serde_json::Error>>()?;

        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, serde_json::to_string_pretty(&ordered)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Record a signal as a position. New keys open a new entry; existing
    /// keys refresh `last_seen` and the snapshot context but never touch
    /// `status` or `opened_at`, so a closed entry stays closed even if the
    /// same setup reappears.
    pub fn record(
        &mut self,
        strategy: &str,
        signal: &TradeSignal,
        snapshot: Option<&OptionChainSnapshot>,
        now: DateTime<Utc>,
    ) {
        let expiry = signal.expiry.format("%Y-%m-%d").to_string();
        let key = entry_key(
            &signal.symbol,
            &signal.direction,
            signal.option_type,
            signal.strike,
            &expiry,
        );
        let context = SnapshotContext {
            underlying_price: snapshot.map(|s| s.underlying_price),
            snapshot_ts: snapshot.map(|s| s.timestamp),
        };

        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.last_seen = now;
                if context.underlying_price.is_some() {
                    existing.context.underlying_price = context.underlying_price;
                }
                if context.snapshot_ts.is_some() {
                    existing.context.snapshot_ts = context.snapshot_ts;
                }
            }
            None => {
                self.entries.insert(
                    key,
                    CachedPosition {
                        id: Uuid::new_v4(),
                        strategy: strategy.to_string(),
                        symbol: signal.symbol.to_uppercase(),
                        direction: signal.direction.clone(),
                        option_type: signal.option_type,
                        strike: signal.strike,
                        expiry,
                        opened_at: now,
                        rationale: signal.rationale.clone(),
                        status: PositionStatus::Open,
                        context,
                        last_seen: now,
                    },
                );
            }
        }
    }

    /// Mark open positions absent from `live_keys` as closed.
    pub fn reconcile<I, S>(&mut self, live_keys: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let live: std::collections::HashSet<String> = live_keys
            .into_iter()
            .map(|k| k.as_ref().to_uppercase())
            .collect();
        for (key, position) in self.entries.iter_mut() {
            if position.status == PositionStatus::Open && !live.contains(&key.to_uppercase()) {
                position.status = PositionStatus::Closed;
                position.last_seen = now;
            }
        }
    }

    /// Register a custom exit evaluator for a direction tag, replacing the
    /// default for that tag.
    pub fn register_evaluator(&mut self, direction_tag: &str, evaluator: ExitEvaluator) {
        self.overrides
            .insert(direction_tag.to_uppercase(), evaluator);
    }

    /// Evaluate exits for every open position with a matching snapshot.
    /// Positions whose symbol has no snapshot this run are skipped, not
    /// closed.
    pub fn evaluate_exits(
        &self,
        snapshots: &[OptionChainSnapshot],
        now: DateTime<Utc>,
    ) -> Vec<ExitRecommendation> {
        let by_symbol: HashMap<String, &OptionChainSnapshot> = snapshots
            .iter()
            .map(|s| (s.symbol.to_uppercase(), s))
            .collect();

        let mut sorted: Vec<(&String, &CachedPosition)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut recommendations = Vec::new();
        for (_, position) in sorted {
            if position.status != PositionStatus::Open {
                continue;
            }
            let Some(snapshot) = by_symbol.get(&position.symbol.to_uppercase()) else {
                continue;
            };

            let reason = match self
                .overrides
                .get(&position.direction.as_str().to_uppercase())
            {
                Some(evaluator) => evaluator(position, snapshot, now),
                None => default_exit_reason(position, snapshot, now),
            };
            if let Some(reason) = reason {
                recommendations.push(ExitRecommendation {
                    symbol: position.symbol.clone(),
                    strategy: position.strategy.clone(),
                    direction: position.direction.clone(),
                    strike: position.strike,
                    expiry: position.expiry.clone(),
                    reason,
                    action: ExitAction::ConsiderExit,
                });
            }
        }
        recommendations
    }

    pub fn entries(&self) -> impl Iterator<Item = &CachedPosition> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Built-in exit rules per direction tag.
fn default_exit_reason(
    position: &CachedPosition,
    snapshot: &OptionChainSnapshot,
    now: DateTime<Utc>,
) -> Option<String> {
    let underlying: f64 = snapshot.underlying_price.try_into().unwrap_or(0.0);
    let strike: f64 = position.strike.try_into().unwrap_or(0.0);
    let dte = position.days_to_expiry(now);

    match &position.direction {
        Direction::BullPutCreditSpread => {
            if underlying <= strike {
                return Some(format!(
                    "Underlying {:.2} below short strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 5 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::BearCallCreditSpread => {
            if underlying >= strike {
                return Some(format!(
                    "Underlying {:.2} above short strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 5 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::BullCallDebitSpread => {
            if underlying >= strike {
                return Some(format!(
                    "Underlying {:.2} reached strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 3 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::BearPutDebitSpread => {
            if underlying <= strike {
                return Some(format!(
                    "Underlying {:.2} reached strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 3 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::ShortCall | Direction::ShortPmccCall | Direction::ShortCondorCall => {
            if underlying >= strike * 1.02 {
                return Some(format!(
                    "Underlying {:.2} above risk threshold near strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 5 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::ShortCondorPut => {
            if underlying <= strike * 0.98 {
                return Some(format!(
                    "Underlying {:.2} below risk threshold near strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 5 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::LongPmccLeaps => {
            if underlying <= strike * 0.9 {
                return Some(format!(
                    "Underlying {:.2} broke below collar strike {:.2}",
                    underlying, strike
                ));
            }
            if dte <= 60 {
                return Some(format!("LEAPS nearing expiry (DTE {})", dte));
            }
            None
        }
        Direction::LongCondorCall | Direction::LongCondorPut => {
            if dte <= 5 {
                return Some(format!("DTE {} below management threshold", dte));
            }
            None
        }
        Direction::Other(_) => {
            if dte <= 3 {
                return Some(format!("DTE {} below default management threshold", dte));
            }
            None
        }
    }
}
