// TalentScore - GPL-3.0-or-later
// This file is part of TalentScore.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// TalentScore is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// TalentScore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with TalentScore.  If not, see <https://www.gnu.org/licenses/>.

//! Candidate input tables.
//!
//! A table is one identity column plus numeric feature columns. Cells are
//! coerced to numbers with [`coerce_numeric`]; anything that does not parse
//! counts as zero.

pub mod csv;

use crate::error::{Result, ScoringError};
use indexmap::IndexMap;
use ndarray::Array2;
use std::collections::HashSet;

pub use csv::RawTable;

/// Coerce a cell to a feature value.
///
/// Empty, non-numeric, NaN and infinite cells all become `0.0`.
#[must_use]
pub fn coerce_numeric(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// One candidate row.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub identity: String,
    /// Named numeric features in input column order
    pub features: IndexMap<String, f64>,
    /// Descriptive fields carried untouched into the report
    pub passthrough: IndexMap<String, String>,
}

impl CandidateRecord {
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            features: IndexMap::new(),
            passthrough: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        self.features.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_passthrough(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.passthrough.insert(name.into(), value.into());
        self
    }

    /// Feature value by name; missing features read as zero.
    #[must_use]
    pub fn feature(&self, name: &str) -> f64 {
        self.features.get(name).copied().unwrap_or(0.0)
    }
}

/// Which columns of a raw table play which role.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema<'a> {
    pub identity_column: &'a str,
    /// Dropped entirely; never features
    pub excluded_columns: &'a [String],
    /// Copied verbatim into each record; may also be features
    pub passthrough_columns: &'a [String],
}

/// A batch of candidates ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTable {
    identity_column: String,
    feature_columns: Vec<String>,
    records: Vec<CandidateRecord>,
}

impl CandidateTable {
    #[must_use]
    pub fn new(identity_column: impl Into<String>) -> Self {
        Self {
            identity_column: identity_column.into(),
            feature_columns: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Append a record. Feature columns not seen before are added to the
    /// schema; earlier records read them as zero.
    pub fn push(&mut self, record: CandidateRecord) {
        for name in record.features.keys() {
            if !self.feature_columns.iter().any(|c| c == name) {
                self.feature_columns.push(name.clone());
            }
        }
        self.records.push(record);
    }

    /// Build a table from parsed CSV.
    ///
    /// Every column other than the identity column and the excluded columns
    /// becomes a feature, coerced with [`coerce_numeric`].
    pub fn from_raw(raw: &RawTable, schema: TableSchema<'_>) -> Result<Self> {
        let identity_idx = raw
            .column_index(schema.identity_column)
            .ok_or_else(|| ScoringError::schema(schema.identity_column))?;

        let passthrough_idx = schema
            .passthrough_columns
            .iter()
            .map(|name| {
                raw.column_index(name)
                    .map(|idx| (name.clone(), idx))
                    .ok_or_else(|| ScoringError::schema(name.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;

        let feature_idx: Vec<(String, usize)> = raw
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                *idx != identity_idx && !schema.excluded_columns.iter().any(|e| e == *name)
            })
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let mut table = Self::new(schema.identity_column);
        table.feature_columns = feature_idx.iter().map(|(name, _)| name.clone()).collect();

        let mut seen = HashSet::new();
        for row in &raw.rows {
            let identity = row[identity_idx].trim().to_string();
            if !seen.insert(identity.clone()) {
                tracing::warn!("Duplicate identity '{identity}' in input table");
            }
            let record = CandidateRecord {
                identity,
                features: feature_idx
                    .iter()
                    .map(|(name, idx)| (name.clone(), coerce_numeric(&row[*idx])))
                    .collect(),
                passthrough: passthrough_idx
                    .iter()
                    .map(|(name, idx)| (name.clone(), row[*idx].clone()))
                    .collect(),
            };
            table.records.push(record);
        }

        tracing::debug!(
            "Loaded {} candidates with {} feature columns",
            table.records.len(),
            table.feature_columns.len()
        );
        Ok(table)
    }

    /// Parse CSV text and build a table in one step.
    pub fn from_csv(text: &str, schema: TableSchema<'_>) -> Result<Self> {
        Self::from_raw(&RawTable::parse(text), schema)
    }

    #[must_use]
    pub fn identity_column(&self) -> &str {
        &self.identity_column
    }

    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    #[must_use]
    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn has_feature(&self, name: &str) -> bool {
        self.feature_columns.iter().any(|c| c == name)
    }

    /// Values of one feature column, or `None` if the column does not exist.
    #[must_use]
    pub fn feature_column(&self, name: &str) -> Option<Vec<f64>> {
        self.has_feature(name)
            .then(|| self.records.iter().map(|r| r.feature(name)).collect())
    }

    /// N × M matrix of features in column order.
    #[must_use]
    pub fn feature_matrix(&self) -> Array2<f64> {
        let cols = self.feature_columns.len();
        Array2::from_shape_fn((self.records.len(), cols), |(i, j)| {
            self.records[i].feature(&self.feature_columns[j])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GITHUB_CSV: &str = "username,followers,public_repos,bio,total_stars\n\
                              alice,120,14,hi,900\n\
                              bob,n/a,3,,10\n\
                              carol,7,,rust dev,0\n";

    const fn schema<'a>(excluded: &'a [String], passthrough: &'a [String]) -> TableSchema<'a> {
        TableSchema {
            identity_column: "username",
            excluded_columns: excluded,
            passthrough_columns: passthrough,
        }
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric("42"), 42.0);
        assert_eq!(coerce_numeric(" 3.5 "), 3.5);
        assert_eq!(coerce_numeric("-1e2"), -100.0);
        assert_eq!(coerce_numeric(""), 0.0);
        assert_eq!(coerce_numeric("n/a"), 0.0);
        assert_eq!(coerce_numeric("NaN"), 0.0);
        assert_eq!(coerce_numeric("inf"), 0.0);
    }

    #[test]
    fn test_from_csv_coerces_and_excludes() {
        let excluded = vec!["total_stars".to_string()];
        let table = CandidateTable::from_csv(GITHUB_CSV, schema(&excluded, &[]))
            .expect("table should load");

        assert_eq!(table.len(), 3);
        assert_eq!(table.feature_columns(), ["followers", "public_repos", "bio"]);
        assert_eq!(table.feature_column("followers"), Some(vec![120.0, 0.0, 7.0]));
        assert_eq!(table.feature_column("bio"), Some(vec![0.0, 0.0, 0.0]));
        assert!(table.feature_column("total_stars").is_none());

        let matrix = table.feature_matrix();
        assert_eq!(matrix.dim(), (3, 3));
        assert_eq!(matrix[[2, 1]], 0.0);
    }

    #[test]
    fn test_passthrough_is_carried_verbatim() {
        let passthrough = vec!["bio".to_string()];
        let table = CandidateTable::from_csv(GITHUB_CSV, schema(&[], &passthrough))
            .expect("table should load");
        assert_eq!(table.records()[2].passthrough["bio"], "rust dev");
    }

    #[test]
    fn test_missing_identity_is_schema_error() {
        let schema = TableSchema {
            identity_column: "user_id",
            excluded_columns: &[],
            passthrough_columns: &[],
        };
        let err = CandidateTable::from_csv(GITHUB_CSV, schema).expect_err("should fail");
        assert_eq!(err, ScoringError::schema("user_id"));
    }

    #[test]
    fn test_missing_passthrough_is_schema_error() {
        let passthrough = vec!["DisplayName".to_string()];
        let err = CandidateTable::from_csv(GITHUB_CSV, schema(&[], &passthrough))
            .expect_err("should fail");
        assert_eq!(err, ScoringError::schema("DisplayName"));
    }

    #[test]
    fn test_push_extends_feature_columns() {
        let mut table = CandidateTable::new("username");
        table.push(CandidateRecord::new("a").with_feature("x", 1.0));
        table.push(
            CandidateRecord::new("b")
                .with_feature("x", 2.0)
                .with_feature("y", f64::NAN),
        );
        assert_eq!(table.feature_columns(), ["x", "y"]);
        let matrix = table.feature_matrix();
        assert_eq!(matrix[[0, 1]], 0.0);
        assert_eq!(matrix[[1, 1]], 0.0);
    }
}
