//! Concurrent fan-out primitive.
//!
//! Runs a fallible async function over a collection, one task per item, and
//! yields the surviving results in the original item order.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;

/// Per-item result of a fan-out function.
///
/// `Skip` opts the item out of the output sequence without failing the
/// fan-out; errors are reported through the surrounding `Result` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Keep(T),
    Skip,
}

/// Run `f` over `items` concurrently and collect the kept results in input
/// order.
///
/// Every task is spawned before any is awaited, so all items make progress
/// concurrently; results are then gathered by awaiting the handles in the
/// original sequence, which makes the output order deterministic and equal
/// to the sequential order regardless of completion order.
///
/// `max_concurrency` gates how many task bodies run at once; `None` leaves
/// the fan-out unbounded. A task that returns an error fails the whole
/// fan-out when its slot is reached; already-spawned tasks still run to
/// completion (there is no cancellation).
pub async fn fan_out<T, R, F, Fut>(
    items: impl IntoIterator<Item = T>,
    max_concurrency: Option<usize>,
    f: F,
) -> anyhow::Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = anyhow::Result<Outcome<R>>> + Send + 'static,
    R: Send + 'static,
{
    let gate = max_concurrency.map(|limit| Arc::new(Semaphore::new(limit.max(1))));

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let fut = f(item);
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = match gate {
                    Some(gate) => Some(
                        gate.acquire_owned()
                            .await
                            .context("fan-out concurrency gate closed")?,
                    ),
                    None => None,
                };
                fut.await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await.context("fan-out task panicked")?? {
            Outcome::Keep(value) => results.push(value),
            Outcome::Skip => {}
        }
    }
    Ok(results)
}
