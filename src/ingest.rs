//! Per-ticker ingestion glue: locate a filing, stream-extract its statement
//! figures, and attach filing metadata to the record.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::api::FilingProvider;
use crate::models::{FieldKey, FieldValue, FilingRecord, FilingReference};
use crate::parser::extract_from_url;

/// Fetch and extract the latest quarterly filing for a ticker.
///
/// Locator errors and tickers with no listed filing are "no record"
/// (`Ok(None)`), not failures; a broken document stream is a hard error and
/// counts against the batch.
pub async fn fetch_company_filing<P: FilingProvider>(
    provider: &P,
    documents: &reqwest::Client,
    ticker: &str,
) -> Result<Option<FilingRecord>> {
    let reference = match provider.latest_quarterly_filing(ticker).await {
        Ok(Some(reference)) => reference,
        Ok(None) => {
            warn!("no quarterly filing listed for {}", ticker);
            return Ok(None);
        }
        Err(e) => {
            warn!("filing locator failed for {}: {:#}", ticker, e);
            return Ok(None);
        }
    };

    let mut record = extract_from_url(documents, &reference.report_url).await?;
    attach_metadata(&mut record, &reference, ticker);
    info!(
        "📄 {}: extracted {} of 5 statement fields from {}",
        ticker,
        record.financial_len(),
        reference.access_number
    );
    Ok(Some(record))
}

/// Fetch and extract a specific filing by accession identifier. Used by the
/// manual-correction path, where an operator re-ingests one filing.
pub async fn fetch_filing_by_accession<P: FilingProvider>(
    provider: &P,
    documents: &reqwest::Client,
    accession: &str,
) -> Result<Option<FilingRecord>> {
    let reference = match provider.filing_by_accession(accession).await {
        Ok(Some(reference)) => reference,
        Ok(None) => {
            warn!("no filing found for accession {}", accession);
            return Ok(None);
        }
        Err(e) => {
            warn!("filing locator failed for accession {}: {:#}", accession, e);
            return Ok(None);
        }
    };

    let ticker = reference.symbol.clone();
    let mut record = extract_from_url(documents, &reference.report_url).await?;
    attach_metadata(&mut record, &reference, &ticker);
    Ok(Some(record))
}

fn attach_metadata(record: &mut FilingRecord, reference: &FilingReference, ticker: &str) {
    record.insert(
        FieldKey::Id,
        FieldValue::Text(reference.access_number.clone()),
    );
    record.insert(FieldKey::Ticker, FieldValue::Text(ticker.to_string()));
    record.insert(
        FieldKey::Timestamp,
        FieldValue::Text(reference.filed_date.clone()),
    );
    if let Some(year) = fiscal_year(&reference.filed_date) {
        record.insert(FieldKey::Year, FieldValue::Integer(year));
    } else {
        warn!(
            "unparseable filed date {:?} for {}; fiscal year left unset",
            reference.filed_date, ticker
        );
    }
}

/// Fiscal year a filing reports on. Quarterly filings dated January or
/// February cover the prior calendar year's final quarter, so they are
/// attributed to that year.
pub fn fiscal_year(filed_date: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(filed_date.get(..10)?, "%Y-%m-%d").ok()?;
    let year = date.year() as i64;
    if date.month() <= 2 {
        Some(year - 1)
    } else {
        Some(year)
    }
}
