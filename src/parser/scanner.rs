//! Table-scanning state machine over tokenizer events.

use crate::models::{FieldKey, FieldValue, FilingRecord};

use super::tokenizer::{MarkupEvent, MarkupTokenizer};
use super::{classify_line_item, classify_section, Section};

/// Whether the caller should keep feeding the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    /// Every financial field has been captured; abort the stream.
    Done,
}

/// Single-pass scan over one filing document.
///
/// Section headers are re-matched on every unit of text, including inside
/// table cells, because headers and cells are not distinguishable from tag
/// context alone. Within a row, the first cell is classified against the
/// line-item patterns for the current section and the first parseable
/// subsequent cell supplies the value. The first qualifying row wins per
/// field; later rows matching an already-committed field are ignored.
pub struct StatementScanner {
    tokenizer: MarkupTokenizer,
    section: Option<Section>,
    in_cell: bool,
    first_cell: bool,
    row_key: Option<FieldKey>,
    row_value: Option<f64>,
    cell_text: String,
    record: FilingRecord,
    done: bool,
}

impl StatementScanner {
    pub fn new() -> Self {
        Self {
            tokenizer: MarkupTokenizer::new(),
            section: None,
            in_cell: false,
            first_cell: false,
            row_key: None,
            row_value: None,
            cell_text: String::new(),
            record: FilingRecord::new(),
            done: false,
        }
    }

    /// Feed the next chunk of markup. Returns `Done` once all financial
    /// fields are committed; no further input is examined after that.
    pub fn feed(&mut self, chunk: &str) -> ScanControl {
        if self.done {
            return ScanControl::Done;
        }
        for event in self.tokenizer.push(chunk) {
            if self.on_event(event) == ScanControl::Done {
                return ScanControl::Done;
            }
        }
        ScanControl::Continue
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume the scanner, flushing any buffered trailing text, and return
    /// whatever was collected. A record with fewer than five financial fields
    /// is a valid partial result, not an error.
    pub fn finish(mut self) -> FilingRecord {
        if !self.done {
            for event in self.tokenizer.finish() {
                if self.on_event(event) == ScanControl::Done {
                    break;
                }
            }
        }
        self.record
    }

    fn on_event(&mut self, event: MarkupEvent) -> ScanControl {
        match event {
            MarkupEvent::TagOpen(name) => match name.as_str() {
                "tr" => {
                    self.first_cell = true;
                    self.row_key = None;
                    self.row_value = None;
                }
                "td" => {
                    self.in_cell = true;
                    self.cell_text.clear();
                }
                _ => {}
            },
            MarkupEvent::Text(text) => self.on_text(&text),
            MarkupEvent::TagClose(name) => match name.as_str() {
                "td" => self.on_cell_close(),
                "tr" => return self.on_row_close(),
                _ => {}
            },
        }
        ScanControl::Continue
    }

    fn on_text(&mut self, text: &str) {
        let trimmed = text.trim();
        // Section headers can appear anywhere, so this check is unconditional.
        if let Some(section) = classify_section(trimmed) {
            self.section = Some(section);
        }
        if !self.in_cell || self.section.is_none() || trimmed.is_empty() {
            return;
        }
        self.cell_text.push_str(trimmed);
    }

    fn on_cell_close(&mut self) {
        if self.first_cell {
            if let Some(section) = self.section {
                if self.row_key.is_none() {
                    self.row_key = classify_line_item(&self.cell_text, section)
                        .filter(|key| !self.record.contains(*key));
                }
            }
        } else if self.row_key.is_some() && self.row_value.is_none() {
            self.row_value = parse_numeric_cell(&self.cell_text);
        }
        self.first_cell = false;
        self.in_cell = false;
    }

    fn on_row_close(&mut self) -> ScanControl {
        if let (Some(key), Some(value)) = (self.row_key, self.row_value) {
            if !self.record.contains(key) {
                self.record.insert(key, FieldValue::Number(value));
                if self.record.financial_len() == FieldKey::FINANCIAL.len() {
                    self.derive_equity();
                    self.done = true;
                    return ScanControl::Done;
                }
            }
        }
        ScanControl::Continue
    }

    /// The balance-sheet pattern captures the "total liabilities and equity"
    /// figure under the equity key; convert it in place to true equity.
    fn derive_equity(&mut self) {
        if let (Some(total), Some(liabilities)) = (
            self.record.number(FieldKey::Equity),
            self.record.number(FieldKey::Liabilities),
        ) {
            self.record
                .insert(FieldKey::Equity, FieldValue::Number(total - liabilities));
        }
    }
}

impl Default for StatementScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a cell as a number after stripping thousands separators. Mirrors
/// parse-float semantics: the longest leading numeric prefix counts, so
/// footnote markers after the figure do not spoil the cell.
pub(crate) fn parse_numeric_cell(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '+' | '-' if i == 0 => end = i + 1,
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    cleaned[..end].parse().ok()
}
