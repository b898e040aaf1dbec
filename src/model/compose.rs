//! Ordered resolution of asynchronous child producers.
//!
//! When a child sequence is assembled from producers that may resolve at
//! arbitrary times (package part reads, composed builders), the flattened
//! result must follow declaration order, not completion order. These
//! combinators await each producer strictly in sequence; they deliberately
//! avoid unordered-completion primitives, which would interleave results by
//! finish time.

use std::future::Future;

/// Resolve producers one by one, in declaration order.
pub async fn resolve_ordered<T, F>(producers: Vec<F>) -> Vec<T>
where
    F: Future<Output = T>,
{
    let mut out = Vec::with_capacity(producers.len());
    for producer in producers {
        out.push(producer.await);
    }
    out
}

/// Resolve producers of child sequences in declaration order and flatten
/// the results into one list.
pub async fn flatten_ordered<T, F>(producers: Vec<F>) -> Vec<T>
where
    F: Future<Output = Vec<T>>,
{
    let mut out = Vec::new();
    for producer in producers {
        out.extend(producer.await);
    }
    out
}
