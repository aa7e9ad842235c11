pub mod market_state;

pub use market_state::{
    MarketState, MarketStateClassifier, MarketStateProvider, MarketStateResult,
    StaticMarketStateProvider, TrendBar,
};
