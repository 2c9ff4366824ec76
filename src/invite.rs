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

//! Assessment invitations for shortlisted candidates.
//!
//! Only builds the link; delivering it is someone else's job.

use crate::config::ProfileSource;
use crate::pipeline::RankedTable;

/// Invitation to the coding assessment, carrying the model score along
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentInvite {
    pub username: String,
    pub source: ProfileSource,
    pub score: f64,
}

impl AssessmentInvite {
    #[must_use]
    pub fn new(username: impl Into<String>, source: ProfileSource, score: f64) -> Self {
        Self {
            username: username.into(),
            source,
            score,
        }
    }

    /// Assessment URL with `username`, `source` and `score` (two decimals)
    /// as query parameters.
    #[must_use]
    pub fn link(&self, base_url: &str) -> String {
        format!(
            "{}/?username={}&source={}&score={:.2}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.username),
            urlencoding::encode(self.source.as_str()),
            self.score
        )
    }
}

/// Invitations for the `limit` best-scored candidates of a run.
#[must_use]
pub fn shortlist(table: &RankedTable, source: ProfileSource, limit: usize) -> Vec<AssessmentInvite> {
    table
        .rows
        .iter()
        .take(limit)
        .map(|row| AssessmentInvite::new(row.record.identity.clone(), source, row.score))
        .collect()
}
