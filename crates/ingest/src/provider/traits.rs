//! Data provider trait definition.
//!
//! The upstream provider is an external collaborator: the fetcher only knows
//! that a call takes a symbol spelling, a dataset and some parameters, and
//! returns a payload or a typed [`ProviderError`].

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{Dataset, Payload};

/// Extra parameters forwarded to the provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchParams {
    /// History range (`1mo`, `1y`, `max`, ...). Ignored by reference datasets.
    pub period: Option<String>,
}

/// Trait for upstream data providers.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stockify_ingest::provider::{DataProvider, FetchParams};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl DataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     async fn fetch(
///         &self,
///         symbol: &str,
///         dataset: Dataset,
///         params: &FetchParams,
///     ) -> Result<Payload, ProviderError> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Unique identifier, used in logs and error messages.
    fn id(&self) -> &'static str;

    /// Fetch one dataset for one symbol spelling.
    ///
    /// Implementations must map their native errors to [`ProviderError`]
    /// variants so that throttling and unknown symbols are recognisable
    /// without inspecting text downstream.
    async fn fetch(
        &self,
        symbol: &str,
        dataset: Dataset,
        params: &FetchParams,
    ) -> Result<Payload, ProviderError>;
}
