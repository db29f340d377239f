//! Async drivers feeding document streams through the statement scanner.
//!
//! Each driver stops reading the moment the scanner reports `Done`; for HTTP
//! sources, dropping the body stream aborts the remaining transfer, so large
//! documents cost no more than the prefix containing the statement tables.

use std::io;
use std::path::Path;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::models::FilingRecord;

use super::scanner::{ScanControl, StatementScanner};
use super::ExtractError;

/// Scanner plus UTF-8 reassembly for byte-oriented sources. A multi-byte
/// character split across chunks is held back until its remaining bytes
/// arrive; invalid sequences become replacement characters.
struct StreamScanner {
    scanner: StatementScanner,
    pending: Vec<u8>,
}

impl StreamScanner {
    fn new() -> Self {
        Self {
            scanner: StatementScanner::new(),
            pending: Vec::new(),
        }
    }

    fn feed_bytes(&mut self, chunk: &[u8]) -> ScanControl {
        let carried;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut data = std::mem::take(&mut self.pending);
            data.extend_from_slice(chunk);
            carried = data;
            &carried
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => return self.scanner.feed(text),
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    if self.scanner.feed(&String::from_utf8_lossy(valid)) == ScanControl::Done {
                        return ScanControl::Done;
                    }
                    match e.error_len() {
                        Some(n) => {
                            if self.scanner.feed("\u{fffd}") == ScanControl::Done {
                                return ScanControl::Done;
                            }
                            input = &rest[n..];
                        }
                        None => {
                            self.pending = rest.to_vec();
                            return ScanControl::Continue;
                        }
                    }
                }
            }
        }
    }

    fn finish(self) -> FilingRecord {
        self.scanner.finish()
    }
}

/// Scan a filing from any byte reader (a local file in offline mode, or a
/// test harness). Stops reading once all financial fields are committed.
pub async fn scan_reader<R>(mut reader: R) -> Result<FilingRecord, ExtractError>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = StreamScanner::new();
    let mut buf = [0u8; 8 * 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if scanner.feed_bytes(&buf[..n]) == ScanControl::Done {
            debug!("all fields captured, aborting read");
            break;
        }
    }
    Ok(scanner.finish())
}

/// Scan a filing stored on the local filesystem.
pub async fn extract_from_path(path: impl AsRef<Path>) -> Result<FilingRecord, ExtractError> {
    let file = tokio::fs::File::open(path).await?;
    scan_reader(tokio::io::BufReader::new(file)).await
}

/// Fetch a filing over HTTP and scan it incrementally. The client must carry
/// the contact-identifying user agent required by the filing host (see
/// `api::filing_document_client`).
pub async fn extract_from_url(
    client: &reqwest::Client,
    url: &str,
) -> Result<FilingRecord, ExtractError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::Status(status));
    }

    let mut stream = response.bytes_stream();
    let mut scanner = StreamScanner::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if scanner.feed_bytes(&chunk) == ScanControl::Done {
            debug!("all fields captured, aborting transfer from {}", url);
            break;
        }
    }
    Ok(scanner.finish())
}
