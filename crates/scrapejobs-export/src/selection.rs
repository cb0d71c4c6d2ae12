//! Column selection.

use std::collections::HashSet;

/// Lower-cased set of selected column names. Empty selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    fields: HashSet<String>,
}

impl FieldSelection {
    /// Parse a comma-separated field list such as `"title, Phone"`.
    pub fn parse(fields: &str) -> Self {
        let fields = fields
            .split(',')
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        Self { fields }
    }

    /// True when every column passes.
    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of selected columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, header: &str) -> bool {
        self.is_all() || self.fields.contains(&header.to_lowercase())
    }

    /// Keep the selected headers, in their original order.
    pub fn filter_headers(&self, headers: &[String]) -> Vec<String> {
        if self.is_all() {
            return headers.to_vec();
        }
        headers
            .iter()
            .filter(|h| self.contains(h))
            .cloned()
            .collect()
    }

    /// Keep the values whose header is selected.
    pub fn filter_row(&self, headers: &[String], row: &[String]) -> Vec<String> {
        if self.is_all() {
            return row.to_vec();
        }
        headers
            .iter()
            .zip(row)
            .filter(|(h, _)| self.contains(h))
            .map(|(_, v)| v.clone())
            .collect()
    }
}
