//! Symbol spelling resolution.
//!
//! Indian equities list on two exchanges and Yahoo spells each listing with
//! its own suffix (`RELIANCE.NS` on NSE, `RELIANCE.BO` on BSE). When one
//! spelling yields nothing the other often does, so the fetcher walks an
//! ordered list of variants produced here.
//!
//! ```text
//!   "RELIANCE.NS" ──► ["RELIANCE.NS", "RELIANCE.BO"]
//!   "RELIANCE.BO" ──► ["RELIANCE.BO", "RELIANCE.NS"]
//!   "AAPL"        ──► ["AAPL"]
//! ```

mod variants;

pub use variants::{SuffixPair, VariantGenerator, BSE_SUFFIX, NSE_SUFFIX};
