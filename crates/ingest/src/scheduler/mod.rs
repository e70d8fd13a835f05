//! Batch scheduling.
//!
//! A [`BatchJob`](crate::models::BatchJob) is split into fixed-size chunks.
//! Each chunk fans out into concurrent per-symbol tasks; chunks are
//! separated by a cooldown to keep request volume under provider limits.

mod batch;
mod report;
pub mod resources;

pub use batch::BatchScheduler;
pub use report::{BatchReport, SymbolOutcome};
pub use resources::ResourceUsage;
