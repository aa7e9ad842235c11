pub mod cache;
pub mod config;
pub mod data;
pub mod scan;
pub mod state;
pub mod strategy;

// Re-export commonly used types
pub use cache::{CachedPosition, ExitRecommendation, PositionCache, PositionStatus};
pub use config::{ScanConfig, StrategyToggles};
pub use data::{OptionChainSnapshot, OptionQuote, OptionType};
pub use scan::{run_scan, ScanReport, SignalObserver};
pub use state::{MarketState, MarketStateClassifier, MarketStateProvider};
pub use strategy::{Direction, Strategy, TradeSignal};
