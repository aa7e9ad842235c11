pub mod types;

pub use types::{ExpiryChain, OptionChainSnapshot, OptionQuote, OptionType, PriceSide};
