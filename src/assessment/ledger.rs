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

use crate::config::ProfileSource;
use crate::table::coerce_numeric;
use crate::table::csv::{write_row, RawTable};
use serde::{Deserialize, Serialize};

pub const LEDGER_COLUMNS: [&str; 5] = ["username", "source", "model_score", "exam_score", "status"];
pub const STATUS_COMPLETED: &str = "Completed";

/// One graded exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRecord {
    pub username: String,
    pub source: String,
    pub model_score: f64,
    pub exam_score: f64,
    pub status: String,
}

impl ExamRecord {
    #[must_use]
    pub fn completed(
        username: impl Into<String>,
        source: ProfileSource,
        model_score: f64,
        exam_score: f64,
    ) -> Self {
        Self {
            username: username.into(),
            source: source.to_string(),
            model_score,
            exam_score,
            status: STATUS_COMPLETED.to_string(),
        }
    }
}

/// Exam results, one entry per username. Re-taking the exam replaces the
/// earlier entry and moves it to the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExamLedger {
    records: Vec<ExamRecord>,
}

impl ExamLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Read a ledger written by [`ExamLedger::to_csv`]. Missing columns read
    /// as empty, repeated usernames keep their last row.
    #[must_use]
    pub fn from_csv(text: &str) -> Self {
        let raw = RawTable::parse(text);
        let cols: Vec<Option<usize>> = LEDGER_COLUMNS
            .iter()
            .map(|c| raw.column_index(c))
            .collect();
        let cell = |row: &[String], i: usize| {
            cols[i]
                .and_then(|c| row.get(c))
                .cloned()
                .unwrap_or_default()
        };

        let mut ledger = Self::new();
        for row in &raw.rows {
            ledger.record(ExamRecord {
                username: cell(row, 0),
                source: cell(row, 1),
                model_score: coerce_numeric(&cell(row, 2)),
                exam_score: coerce_numeric(&cell(row, 3)),
                status: cell(row, 4),
            });
        }
        ledger
    }

    pub fn record(&mut self, entry: ExamRecord) {
        if let Some(pos) = self
            .records
            .iter()
            .position(|r| r.username == entry.username)
        {
            tracing::debug!("Replacing earlier exam of {}", entry.username);
            self.records.remove(pos);
        }
        self.records.push(entry);
    }

    #[must_use]
    pub fn get(&self, username: &str) -> Option<&ExamRecord> {
        self.records.iter().find(|r| r.username == username)
    }

    #[must_use]
    pub fn records(&self) -> &[ExamRecord] {
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

    /// Best exam score; the earliest entry wins ties.
    #[must_use]
    pub fn top_scorer(&self) -> Option<&ExamRecord> {
        self.records.iter().reduce(|best, r| {
            if r.exam_score > best.exam_score {
                r
            } else {
                best
            }
        })
    }

    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, &LEDGER_COLUMNS);
        for r in &self.records {
            write_row(
                &mut out,
                &[
                    r.username.clone(),
                    r.source.clone(),
                    r.model_score.to_string(),
                    r.exam_score.to_string(),
                    r.status.clone(),
                ],
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retake_replaces_and_moves_to_end() {
        let mut ledger = ExamLedger::new();
        ledger.record(ExamRecord::completed("ada", ProfileSource::GitHub, 91.0, 40.0));
        ledger.record(ExamRecord::completed("bo", ProfileSource::GitHub, 75.5, 66.67));
        ledger.record(ExamRecord::completed("ada", ProfileSource::GitHub, 91.0, 100.0));

        assert_eq!(ledger.len(), 2);
        let names: Vec<&str> = ledger.records().iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["bo", "ada"]);
        assert_eq!(ledger.get("ada").map(|r| r.exam_score), Some(100.0));
    }

    #[test]
    fn test_top_scorer() {
        let mut ledger = ExamLedger::new();
        assert!(ledger.top_scorer().is_none());
        ledger.record(ExamRecord::completed("ada", ProfileSource::GitHub, 50.0, 66.67));
        ledger.record(ExamRecord::completed("9", ProfileSource::StackOverflow, 80.0, 100.0));
        ledger.record(ExamRecord::completed("bo", ProfileSource::GitHub, 20.0, 100.0));
        assert_eq!(ledger.top_scorer().map(|r| r.username.as_str()), Some("9"));
    }

    #[test]
    fn test_csv_round_trip() {
        let mut ledger = ExamLedger::new();
        ledger.record(ExamRecord::completed("Jon, Sr.", ProfileSource::StackOverflow, 88.5, 77.78));
        let csv = ledger.to_csv();
        assert!(csv.starts_with("username,source,model_score,exam_score,status\n"));
        assert!(csv.contains("\"Jon, Sr.\",StackOverflow,88.5,77.78,Completed"));
        assert_eq!(ExamLedger::from_csv(&csv), ledger);
    }

    #[test]
    fn test_from_csv_keeps_last_duplicate() {
        let text = "username,source,model_score,exam_score,status\n\
                    ada,GitHub,90,10,Completed\n\
                    ada,GitHub,90,55.5,Completed\n";
        let ledger = ExamLedger::from_csv(text);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("ada").map(|r| r.exam_score), Some(55.5));
    }
}
