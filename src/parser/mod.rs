//! Streaming extraction of financial figures from filing documents.
//!
//! Filing HTML has no fixed schema; the statement tables are identified
//! heuristically from nearby header text, and line items are matched against
//! a fixed pattern table. The scan is single-pass and stops as soon as every
//! financial field has been captured.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::FieldKey;

pub mod extract;
pub mod scanner;
pub mod tokenizer;

pub use extract::{extract_from_path, extract_from_url, scan_reader};
pub use scanner::{ScanControl, StatementScanner};

/// Which statement table the scan position currently falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    IncomeStatement,
    BalanceSheet,
}

struct FieldPattern {
    key: FieldKey,
    section: Section,
    pattern: Regex,
}

// Matched in order; the first matching entry wins.
static FIELD_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        FieldPattern {
            key: FieldKey::Revenue,
            section: Section::IncomeStatement,
            pattern: Regex::new(r"(?i)revenue|net sales").unwrap(),
        },
        FieldPattern {
            key: FieldKey::NetIncome,
            section: Section::IncomeStatement,
            pattern: Regex::new(r"(?i)^net income$").unwrap(),
        },
        FieldPattern {
            key: FieldKey::Eps,
            section: Section::IncomeStatement,
            pattern: Regex::new(r"(?i)basic|diluted").unwrap(),
        },
        FieldPattern {
            key: FieldKey::Liabilities,
            section: Section::BalanceSheet,
            pattern: Regex::new(r"(?i)^total liabilities$").unwrap(),
        },
        FieldPattern {
            key: FieldKey::Equity,
            section: Section::BalanceSheet,
            pattern: Regex::new(r"(?i)^total liabilities and.*equity$").unwrap(),
        },
    ]
});

static STATEMENT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)statement").unwrap());
static STATEMENT_TOPIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)income|operation|financial").unwrap());
static BALANCE_SHEET_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)balance\s+sheet").unwrap());

/// Classify a unit of freeform text as a statement section header, if it is
/// one. Headers and table cells are not distinguishable from tag context, so
/// this runs on every text unit.
pub(crate) fn classify_section(text: &str) -> Option<Section> {
    if STATEMENT_HEADER.is_match(text) && STATEMENT_TOPIC.is_match(text) {
        Some(Section::IncomeStatement)
    } else if BALANCE_SHEET_HEADER.is_match(text) {
        Some(Section::BalanceSheet)
    } else {
        None
    }
}

/// Match a row-label cell against the field pattern table, constrained to the
/// section the scan is currently inside.
pub(crate) fn classify_line_item(text: &str, section: Section) -> Option<FieldKey> {
    FIELD_PATTERNS
        .iter()
        .find(|p| p.section == section && p.pattern.is_match(text))
        .map(|p| p.key)
}

/// Errors surfaced by the extractor. Stream-level failures are never
/// swallowed into a partial record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to fetch document: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("document host returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("document stream failed: {0}")]
    Stream(#[from] std::io::Error),
}
