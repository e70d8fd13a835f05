//! Fetched result validation.
//!
//! A structurally valid but empty answer is treated exactly like no answer:
//! both must push the fetcher to the next variant, never into a
//! successful-but-empty write.

use serde_json::Value;

use crate::models::Payload;

/// Classifies fetched values as usable or not.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResultValidator;

impl ResultValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns true if `result` carries data worth persisting.
    ///
    /// Rules, in order:
    /// - absent -> not usable
    /// - table with zero rows -> not usable
    /// - mapping with zero entries -> not usable
    /// - list with zero items -> not usable
    /// - JSON null -> not usable
    /// - anything else -> usable
    pub fn is_usable(&self, result: Option<&Payload>) -> bool {
        match result {
            None => false,
            Some(Payload::Table(table)) => !table.is_empty(),
            Some(Payload::Keyed(map)) => !map.is_empty(),
            Some(Payload::List(items)) => !items.is_empty(),
            Some(Payload::Scalar(Value::Null)) => false,
            Some(Payload::Scalar(_)) => true,
        }
    }
}
