//! Chunked, rate-limit-windowed batch driver.
//!
//! Identifiers are processed in fixed-size chunks. Every item in a chunk runs
//! concurrently and the chunk settles as a unit; at least `window` of
//! wall-clock time separates the start of consecutive chunks, which keeps the
//! run inside the locator's requests-per-minute quota no matter how fast the
//! individual calls return. Per-item failures never abort siblings; they fold
//! into a monotonic `any_rejected` flag after the chunk barrier.

use anyhow::Result;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Cooldown between chunk starts. Sized for the locator's free-tier quota
/// (60 requests/minute).
pub const BATCH_WINDOW: Duration = Duration::from_secs(35);

/// Configuration for one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Identifiers dispatched concurrently per window.
    pub chunk_size: usize,
    /// Minimum wall-clock spacing between chunk starts.
    pub window: Duration,
}

impl BatchConfig {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            window: BATCH_WINDOW,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Aggregate outcome of one run over the identifier list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestRunResult {
    pub total: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True from the first per-item failure onward; never cleared.
    pub any_rejected: bool,
}

/// Per-iteration rate-limit state: when the chunk started and how long the
/// iteration must last.
struct BatchWindow {
    started: Instant,
    target: Duration,
}

impl BatchWindow {
    fn open(target: Duration) -> Self {
        Self {
            started: Instant::now(),
            target,
        }
    }

    /// Time left before the next chunk may start, if any.
    fn remaining(&self) -> Option<Duration> {
        self.target.checked_sub(self.started.elapsed())
    }
}

enum ItemOutcome {
    Persisted,
    Skipped,
}

/// Drive `fetch` and `persist` over all identifiers in rate-limited chunks.
///
/// `fetch` returning `Ok(None)` means the remote has no record for the
/// identifier — a skip, neither success nor failure. All items in a chunk
/// settle before the next chunk starts; there is no cross-chunk concurrency.
pub async fn ingest_chunked<T, F, FFut, P, PFut>(
    identifiers: &[String],
    fetch: F,
    persist: P,
    config: &BatchConfig,
) -> IngestRunResult
where
    F: Fn(String) -> FFut,
    FFut: Future<Output = Result<Option<T>>>,
    P: Fn(T) -> PFut,
    PFut: Future<Output = Result<()>>,
{
    let mut result = IngestRunResult {
        total: identifiers.len(),
        ..Default::default()
    };
    let chunk_size = config.chunk_size.max(1);
    let chunk_count = identifiers.len().div_ceil(chunk_size).max(1);

    for (index, chunk) in identifiers.chunks(chunk_size).enumerate() {
        let window = BatchWindow::open(config.window);
        info!(
            "🔄 chunk {}/{}: dispatching {} identifiers",
            index + 1,
            chunk_count,
            chunk.len()
        );

        let outcomes = join_all(chunk.iter().map(|id| {
            let id = id.clone();
            let fetch = &fetch;
            let persist = &persist;
            async move {
                match fetch(id).await? {
                    Some(item) => {
                        persist(item).await?;
                        Ok::<_, anyhow::Error>(ItemOutcome::Persisted)
                    }
                    None => Ok(ItemOutcome::Skipped),
                }
            }
        }))
        .await;

        // Reduce after the barrier; the flag is never written concurrently.
        for (id, outcome) in chunk.iter().zip(outcomes) {
            match outcome {
                Ok(ItemOutcome::Persisted) => result.persisted += 1,
                Ok(ItemOutcome::Skipped) => {
                    debug!("⚪ {}: no remote record, skipped", id);
                    result.skipped += 1;
                }
                Err(e) => {
                    error!("❌ {}: {:#}", id, e);
                    result.failed += 1;
                    result.any_rejected = true;
                }
            }
        }

        let is_last = index + 1 == chunk_count;
        if !is_last {
            if let Some(remaining) = window.remaining() {
                info!(
                    "⏳ waiting {}s before next chunk...",
                    remaining.as_secs_f64().ceil()
                );
                tokio::time::sleep(remaining).await;
            }
        }
    }

    info!(
        "✅ run complete: {} persisted, {} skipped, {} failed out of {}",
        result.persisted, result.skipped, result.failed, result.total
    );
    result
}
