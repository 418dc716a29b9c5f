pub mod ohlc_store;
pub mod price_feed;

pub use ohlc_store::OhlcStore;
pub use price_feed::PriceFeed;
