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

//! Error taxonomy for a scoring run.
//!
//! Every variant is fatal for the current batch: the orchestrator never
//! returns partial results.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// Too few rows to fit the pipeline.
    #[error("insufficient data: {rows} row(s) provided, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    /// Fewer than two tiers were populated, so no discriminative model can be fit.
    #[error("degenerate labels: only {distinct} distinct tier(s) present, need at least 2")]
    DegenerateLabels { distinct: usize },

    /// A required column (identity or proxy) is missing from the input.
    #[error("schema error: required column '{column}' not found")]
    Schema { column: String },

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl ScoringError {
    #[must_use]
    pub fn schema(column: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = ScoringError::InsufficientData {
            rows: 1,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: 1 row(s) provided, at least 3 required"
        );

        let err = ScoringError::schema("followers");
        assert!(err.to_string().contains("'followers'"));
    }
}
