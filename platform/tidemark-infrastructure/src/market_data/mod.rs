pub mod tiingo;

pub use tiingo::TiingoClient;
