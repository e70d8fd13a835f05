/// Classification for retry policy.
///
/// Used by the fetcher to decide how to react to a provider error. The
/// fetcher only ever looks at this class, never at error text.
///
/// # Behavior Summary
///
/// | Class | Consumes a retry? | Next variant? | Fetcher-wide pause? |
/// |-------|-------------------|---------------|---------------------|
/// | `RateLimited` | No | No | Yes (fixed cooldown) |
/// | `NotFound` | n/a | Yes | No |
/// | `Transient` | Yes (with backoff) | After last retry | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The provider is throttling us.
    ///
    /// The whole fetcher pauses for the rate-limit cooldown, then the same
    /// attempt is repeated without spending a retry.
    RateLimited,

    /// The instrument is unknown, delisted or has no data under this spelling.
    /// Retrying the same variant won't help; try the next one.
    NotFound,

    /// Anything else: network hiccups, 5xx, malformed responses.
    /// Retry the same variant after exponential backoff.
    Transient,
}
