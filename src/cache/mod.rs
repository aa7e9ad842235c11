pub mod position_cache;

pub use position_cache::{
    entry_key, CacheError, CachedPosition, ExitAction, ExitEvaluator, ExitRecommendation,
    PositionCache, PositionStatus, SnapshotContext,
};
