//! Raw artifact persistence.

mod writer;

pub use writer::{WriteOutcome, Writer, DEFAULT_PROVIDER_TAG};
