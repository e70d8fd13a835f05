//! Upstream data provider abstraction and the Yahoo Finance implementation.

mod traits;

pub mod yahoo;

pub use traits::{DataProvider, FetchParams};
pub use yahoo::YahooProvider;
