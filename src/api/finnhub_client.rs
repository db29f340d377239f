use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::models::{CompanyProfile, Config, FilingReference};

use super::FilingProvider;

/// Finnhub filing-locator client
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl FinnhubClient {
    /// Create a new Finnhub client
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("stock-filings/1.0")
            .build()?;

        let base_url = Url::parse(&config.finnhub_base_url)?;

        Ok(Self {
            client,
            api_key: config.finnhub_api_key.clone(),
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("invalid finnhub base url: {}", self.base_url))?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    async fn filings(&self, query: &[(&str, &str)]) -> Result<Vec<FilingReference>> {
        let url = self.endpoint("stock/filings")?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("filing locator returned status {status}"));
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl FilingProvider for FinnhubClient {
    async fn latest_quarterly_filing(&self, ticker: &str) -> Result<Option<FilingReference>> {
        let filings = self
            .filings(&[("symbol", ticker), ("form", "10-Q")])
            .await?;
        Ok(filings.into_iter().next())
    }

    async fn filing_by_accession(&self, accession: &str) -> Result<Option<FilingReference>> {
        let filings = self.filings(&[("accessNumber", accession)]).await?;
        Ok(filings.into_iter().next())
    }

    async fn company_profile(&self, ticker: &str) -> Result<Option<CompanyProfile>> {
        let url = self.endpoint("stock/profile2")?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("profile lookup returned status {status}"));
        }
        // Finnhub answers unknown tickers with an empty object.
        let value: serde_json::Value = response.json().await?;
        if value.as_object().map_or(true, |o| o.is_empty()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}
