//! Bounded-concurrency, order-preserving fan-out (§5).
//!
//! The engine never admits more than `limit` in-flight requests to a single
//! pipeline stage, and always joins results in issue order regardless of which
//! request's response lands first — `buffered` (not `buffer_unordered`) is load
//! bearing here, not a style choice.

use futures::{stream, StreamExt, TryStreamExt};

/// Runs `requests` with at most `limit` in flight at a time, returning results
/// in the same order the requests were issued.
pub async fn batched<T, E, Fut, I>(requests: I, limit: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Fut>,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let limit = limit.max(1);
    stream::iter(requests)
        .map(|fut| fut)
        .buffered(limit)
        .try_collect()
        .await
}
