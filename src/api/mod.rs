use anyhow::Result;
use std::time::Duration;

use crate::models::{CompanyProfile, FilingReference};

pub mod finnhub_client;
pub use finnhub_client::FinnhubClient;

/// Filing-locator seam. The batch driver and ingestion glue only ever talk to
/// this trait, so tests can substitute a canned provider.
#[async_trait::async_trait]
pub trait FilingProvider {
    /// Latest quarterly (10-Q) filing listed for a ticker.
    async fn latest_quarterly_filing(&self, ticker: &str) -> Result<Option<FilingReference>>;

    /// Look a filing up by its accession identifier.
    async fn filing_by_accession(&self, accession: &str) -> Result<Option<FilingReference>>;

    /// Company profile for a ticker.
    async fn company_profile(&self, ticker: &str) -> Result<Option<CompanyProfile>>;
}

/// HTTP client for fetching filing documents. The filing host requires
/// requests to identify the application and a contact address in the
/// user agent.
pub fn filing_document_client(contact_email: &str) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(format!("Download10Q/1.0 (contact: {contact_email})"))
        .build()?;
    Ok(client)
}
