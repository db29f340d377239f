use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Fields the ingestion pipeline knows how to populate.
///
/// The first five are extracted from the filing document itself; the rest are
/// attached by the ingestion glue from filing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Revenue,
    NetIncome,
    Eps,
    Liabilities,
    Equity,
    Id,
    Ticker,
    Timestamp,
    Year,
}

impl FieldKey {
    /// Fields read out of the statement tables, in pattern-match order.
    pub const FINANCIAL: [FieldKey; 5] = [
        FieldKey::Revenue,
        FieldKey::NetIncome,
        FieldKey::Eps,
        FieldKey::Liabilities,
        FieldKey::Equity,
    ];

    /// Fields attached from filing metadata.
    pub const METADATA: [FieldKey; 4] = [
        FieldKey::Id,
        FieldKey::Ticker,
        FieldKey::Timestamp,
        FieldKey::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Revenue => "revenue",
            FieldKey::NetIncome => "netIncome",
            FieldKey::Eps => "eps",
            FieldKey::Liabilities => "liabilities",
            FieldKey::Equity => "equity",
            FieldKey::Id => "id",
            FieldKey::Ticker => "ticker",
            FieldKey::Timestamp => "timestamp",
            FieldKey::Year => "year",
        }
    }

    pub fn is_financial(&self) -> bool {
        FieldKey::FINANCIAL.contains(self)
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single filing field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Integer(i64),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Text(_) => None,
        }
    }
}

/// Ordered mapping of extracted filing fields.
///
/// Keys are unique; insertion order is preserved so diagnostic output reads in
/// the order fields were encountered in the document. Serializes as a JSON
/// object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilingRecord {
    entries: Vec<(FieldKey, FieldValue)>,
}

impl FilingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping its original position on replace.
    pub fn insert(&mut self, key: FieldKey, value: FieldValue) {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn number(&self, key: FieldKey) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_number)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of financial fields captured so far.
    pub fn financial_len(&self) -> usize {
        self.entries.iter().filter(|(k, _)| k.is_financial()).count()
    }

    /// A record is complete when all financial fields and all metadata fields
    /// are present. Completeness gates auto-persist versus escalation for
    /// manual correction.
    pub fn is_complete(&self) -> bool {
        FieldKey::FINANCIAL.iter().all(|k| self.contains(*k))
            && FieldKey::METADATA.iter().all(|k| self.contains(*k))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(FieldKey, FieldValue)> {
        self.entries.iter()
    }
}

impl Serialize for FilingRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

/// One filing listed by the locator service.
#[derive(Debug, Clone, Deserialize)]
pub struct FilingReference {
    #[serde(rename = "accessNumber")]
    pub access_number: String,
    pub symbol: String,
    /// Filed date as reported by the locator, e.g. "2025-05-02 00:00:00".
    #[serde(rename = "filedDate")]
    pub filed_date: String,
    #[serde(rename = "reportUrl")]
    pub report_url: String,
}

/// Company profile as returned by the locator service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompanyProfile {
    pub ticker: String,
    pub name: String,
    pub country: String,
    pub exchange: String,
    pub currency: String,
    #[serde(rename = "finnhubIndustry")]
    pub industry: String,
    #[serde(rename = "marketCapitalization")]
    pub market_capitalization: f64,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub finnhub_api_key: String,
    pub finnhub_base_url: String,
    pub contact_email: String,
    pub chunk_size: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            finnhub_api_key: std::env::var("FINNHUB_API_KEY")
                .map_err(|_| anyhow::anyhow!("FINNHUB_API_KEY environment variable required"))?,
            finnhub_base_url: std::env::var("FINNHUB_BASE_URL")
                .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
            contact_email: std::env::var("CONTACT_EMAIL")
                .map_err(|_| anyhow::anyhow!("CONTACT_EMAIL environment variable required"))?,
            chunk_size: std::env::var("CHUNK_SIZE")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
        })
    }
}
