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

//! Talent scoring for scraped developer profiles.
//!
//! Candidates are ranked without ground-truth labels: clusters in a reduced
//! feature space become tiers, a classifier learns those tiers, and its
//! tier-weighted confidence becomes a 0-100 score.

pub mod assessment;
pub mod config;
pub mod error;
pub mod invite;
pub mod pipeline;
pub mod table;

pub use config::{PipelineConfig, ProfileSource, TalentConfig};
pub use error::{Result, ScoringError};
pub use pipeline::{run_pipeline, RankedCandidate, RankedTable};
pub use table::{CandidateRecord, CandidateTable};
