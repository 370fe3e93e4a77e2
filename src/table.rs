//! Lookup table and coefficient files
//!
//! Both are plain comma-separated text. Blank lines and lines starting with
//! `#` are ignored; any other row that does not parse is an error carrying
//! the row number and content.

use std::fs;
use std::path::Path;

use crate::compensation::LayerwiseCompensator;
use crate::error::{Result, TableError};

/// Uniform-mode lookup table as three aligned columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    /// Block start heights (exclusive)
    pub starts: Vec<f64>,
    /// Block end heights (inclusive)
    pub ends: Vec<f64>,
    /// Per-layer compensation in each block (mm, positive = thicker)
    pub offsets: Vec<f64>,
}

impl LookupTable {
    /// Parse `start,end,offset` rows. Row order is not significant.
    pub fn parse(text: &str) -> std::result::Result<Self, TableError> {
        let mut table = Self::default();

        for (row, content) in data_rows(text) {
            let values = parse_row(row, content)?;
            let [start, end, offset] = values[..] else {
                return Err(malformed(row, content));
            };
            table.starts.push(start);
            table.ends.push(end);
            table.offsets.push(offset);
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn into_compensator(self) -> std::result::Result<LayerwiseCompensator, TableError> {
        LayerwiseCompensator::from_columns(&self.starts, &self.ends, &self.offsets)
    }
}

/// Parse a coefficient list: the first column of every row
pub fn parse_coefficients(text: &str) -> std::result::Result<Vec<f64>, TableError> {
    data_rows(text)
        .map(|(row, content)| {
            content
                .split(',')
                .next()
                .and_then(|field| field.trim().parse().ok())
                .ok_or_else(|| malformed(row, content))
        })
        .collect()
}

pub fn read_lookup_table(path: impl AsRef<Path>) -> Result<LookupTable> {
    let text = fs::read_to_string(path.as_ref())?;
    let table = LookupTable::parse(&text)?;
    log::debug!("loaded {} lookup rows from {}", table.len(), path.as_ref().display());
    Ok(table)
}

pub fn read_coefficients(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path.as_ref())?;
    let coefficients = parse_coefficients(&text)?;
    log::debug!(
        "loaded {} coefficients from {}",
        coefficients.len(),
        path.as_ref().display()
    );
    Ok(coefficients)
}

/// Non-blank, non-comment rows with their 1-based row numbers
fn data_rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse every field of a row; trailing empty fields are allowed
fn parse_row(row: usize, content: &str) -> std::result::Result<Vec<f64>, TableError> {
    let fields: Vec<&str> = content.split(',').map(str::trim).collect();
    let used = fields
        .iter()
        .rposition(|field| !field.is_empty())
        .map_or(0, |last| last + 1);

    fields[..used]
        .iter()
        .map(|field| field.parse().map_err(|_| malformed(row, content)))
        .collect()
}

fn malformed(row: usize, content: &str) -> TableError {
    TableError::MalformedRow {
        row,
        content: content.to_string(),
    }
}
