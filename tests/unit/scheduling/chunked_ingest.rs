//! Chunked batch driver behavior: fan-out isolation, rate-limit windows and
//! the monotonic rejection flag.

use anyhow::anyhow;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use stock_filings::batch_ingester::{ingest_chunked, BatchConfig};

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn window_config(chunk_size: usize) -> BatchConfig {
    BatchConfig {
        chunk_size,
        window: Duration::from_secs(35),
    }
}

/// Records the identifier and (paused-clock) start time of every fetch call.
#[derive(Clone, Default)]
struct CallLog {
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl CallLog {
    fn record(&self, id: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((id.to_string(), Instant::now()));
    }

    fn entries(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_item_does_not_abort_siblings() {
    let log = CallLog::default();
    let persisted: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let result = ingest_chunked(
        &ids(&["AAPL", "MSFT", "GOOG", "AMZN"]),
        |id| {
            let log = log.clone();
            async move {
                log.record(&id);
                if id == "MSFT" {
                    return Err(anyhow!("simulated fetch failure"));
                }
                Ok(Some(id))
            }
        },
        |id: String| {
            let persisted = persisted.clone();
            async move {
                persisted.lock().unwrap().push(id);
                Ok(())
            }
        },
        &window_config(2),
    )
    .await;

    // All four identifiers were attempted despite the failure in chunk one.
    let attempted: Vec<String> = log.entries().into_iter().map(|(id, _)| id).collect();
    assert_eq!(attempted.len(), 4);
    assert_eq!(
        persisted.lock().unwrap().as_slice(),
        &["AAPL".to_string(), "GOOG".to_string(), "AMZN".to_string()]
    );

    assert!(result.any_rejected);
    assert_eq!(result.total, 4);
    assert_eq!(result.persisted, 3);
    assert_eq!(result.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_window_spacing_between_chunk_starts() {
    let log = CallLog::default();
    let start = Instant::now();

    let result = ingest_chunked(
        &ids(&["AAPL", "MSFT", "GOOG", "AMZN"]),
        |id| {
            let log = log.clone();
            async move {
                log.record(&id);
                Ok(Some(()))
            }
        },
        |_: ()| async { Ok(()) },
        &window_config(2),
    )
    .await;
    let elapsed = start.elapsed();

    let entries = log.entries();
    assert_eq!(entries.len(), 4);

    // Chunk two starts no earlier than chunk one's start plus the window.
    let first_chunk_start = entries[0].1;
    let second_chunk_start = entries[2].1;
    assert!(second_chunk_start - first_chunk_start >= Duration::from_secs(35));

    // One inter-chunk wait; no wait after the final chunk.
    assert!(elapsed >= Duration::from_secs(35));
    assert!(elapsed < Duration::from_secs(70));

    assert!(!result.any_rejected);
    assert_eq!(result.persisted, 4);
}

#[tokio::test(start_paused = true)]
async fn test_slow_chunk_skips_the_sleep() {
    let start = Instant::now();
    let result = ingest_chunked(
        &ids(&["AAPL", "MSFT"]),
        |_id| async {
            // Slower than the whole window; the driver must not sleep again.
            tokio::time::sleep(Duration::from_secs(40)).await;
            Ok(Some(()))
        },
        |_: ()| async { Ok(()) },
        &BatchConfig {
            chunk_size: 1,
            window: Duration::from_secs(35),
        },
    )
    .await;

    assert_eq!(result.persisted, 2);
    // Two 40s chunks, no extra cooldown in between.
    assert_eq!(start.elapsed(), Duration::from_secs(80));
}

#[tokio::test(start_paused = true)]
async fn test_missing_remote_records_are_skips_not_failures() {
    let result = ingest_chunked(
        &ids(&["AAPL", "MSFT", "GOOG"]),
        |id| async move {
            if id == "MSFT" {
                Ok(None)
            } else {
                Ok(Some(id))
            }
        },
        |_: String| async { Ok(()) },
        &window_config(2),
    )
    .await;

    assert!(!result.any_rejected);
    assert_eq!(result.persisted, 2);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_flag_is_monotonic() {
    // The failure lands in the first chunk; later chunks all succeed and must
    // not clear the flag.
    let result = ingest_chunked(
        &ids(&["BAD", "AAPL", "MSFT", "GOOG", "AMZN", "META"]),
        |id| async move {
            if id == "BAD" {
                Err(anyhow!("boom"))
            } else {
                Ok(Some(id))
            }
        },
        |_: String| async { Ok(()) },
        &window_config(2),
    )
    .await;

    assert!(result.any_rejected);
    assert_eq!(result.persisted, 5);
    assert_eq!(result.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_persist_failures_also_reject() {
    let result = ingest_chunked(
        &ids(&["AAPL", "MSFT"]),
        |id| async move { Ok(Some(id)) },
        |id: String| async move {
            if id == "AAPL" {
                Err(anyhow!("constraint violation"))
            } else {
                Ok(())
            }
        },
        &window_config(2),
    )
    .await;

    assert!(result.any_rejected);
    assert_eq!(result.persisted, 1);
    assert_eq!(result.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_last_chunk_may_be_short() {
    let log = CallLog::default();
    let result = ingest_chunked(
        &ids(&["A", "B", "C", "D", "E"]),
        |id| {
            let log = log.clone();
            async move {
                log.record(&id);
                Ok(Some(()))
            }
        },
        |_: ()| async { Ok(()) },
        &window_config(2),
    )
    .await;

    assert_eq!(result.persisted, 5);

    // Three windows' worth of starts: [A,B], [C,D], [E].
    let entries = log.entries();
    let base = entries[0].1;
    assert_eq!(entries[1].1 - base, Duration::ZERO);
    assert!(entries[2].1 - base >= Duration::from_secs(35));
    assert!(entries[4].1 - base >= Duration::from_secs(70));
}
