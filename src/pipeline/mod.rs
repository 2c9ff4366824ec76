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

//! Talent scoring pipeline.
//!
//! normalize → reduce → tier → model → scale, run as one pure batch
//! transform. Any stage error aborts the whole batch.

pub mod model;
pub mod normalizer;
pub mod reducer;
pub mod scaling;
pub mod tiers;

use crate::config::PipelineConfig;
use crate::error::{Result, ScoringError};
use crate::table::csv::write_row;
use crate::table::{CandidateRecord, CandidateTable};
use model::{LogisticRegression, ModelInput};
use normalizer::QuantileNormalizer;
use reducer::Pca;
use scaling::scale_scores;
use tiers::{assign_tiers, KMeans, TierAssignment, TierMapping};

/// A scored candidate
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub record: CandidateRecord,
    pub tier: TierAssignment,
    /// Weighted model confidence before scaling
    pub raw_score: f64,
    /// Final score in `[0, 100]`
    pub score: f64,
}

/// Per-tier statistics of one run
#[derive(Debug, Clone, PartialEq)]
pub struct TierSummary {
    pub tier_rank: usize,
    pub label: String,
    pub count: usize,
    /// Proxy statistic of the cluster behind this tier
    pub proxy: f64,
    pub mean_score: f64,
}

/// Pipeline output, sorted by score descending.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTable {
    pub identity_column: String,
    pub passthrough_columns: Vec<String>,
    pub score_column: String,
    pub tier_column: String,
    pub rows: Vec<RankedCandidate>,
    pub tiers: Vec<TierSummary>,
}

impl RankedTable {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&RankedCandidate> {
        self.rows.iter().find(|r| r.record.identity == identity)
    }

    /// Render as CSV: identity, passthrough columns, score, tier label.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();

        let mut header = vec![self.identity_column.clone()];
        header.extend(self.passthrough_columns.iter().cloned());
        header.push(self.score_column.clone());
        header.push(self.tier_column.clone());
        write_row(&mut out, &header);

        for row in &self.rows {
            let mut cells = vec![row.record.identity.clone()];
            cells.extend(self.passthrough_columns.iter().map(|c| {
                row.record.passthrough.get(c).cloned().unwrap_or_default()
            }));
            cells.push(row.score.to_string());
            cells.push(row.tier.label.clone());
            write_row(&mut out, &cells);
        }
        out
    }
}

/// Score one candidate table.
///
/// Validates the configuration and schema, then runs every stage in order.
/// Needs at least `max(2, K)` rows for K tiers.
pub fn run_pipeline(table: &CandidateTable, config: &PipelineConfig) -> Result<RankedTable> {
    config.validate()?;

    if !table.has_feature(&config.proxy_column) {
        return Err(ScoringError::schema(config.proxy_column.as_str()));
    }

    let rows = table.len();
    let required = config.tier_count().max(2);
    if rows < required {
        return Err(ScoringError::InsufficientData { rows, required });
    }

    tracing::debug!(
        "Scoring {rows} candidates with '{}' ({} features)",
        config.name,
        table.feature_columns().len()
    );

    let features = table.feature_matrix();
    let normalized = QuantileNormalizer::new(config.n_quantiles, config.output_distribution)
        .fit_transform(&features)?;
    let reduced = Pca::new(config.n_components).fit_transform(&normalized);

    let proxy = table
        .feature_column(&config.proxy_column)
        .ok_or_else(|| ScoringError::schema(config.proxy_column.as_str()))?;
    let kmeans = KMeans::new(config.tier_count(), config.n_init, config.seed);
    let (tiers, mapping) = assign_tiers(
        &reduced,
        &proxy,
        &kmeans,
        config.proxy_statistic,
        &config.tier_labels,
    )?;

    let ranks: Vec<usize> = tiers.iter().map(|t| t.tier_rank).collect();
    let model_features = match config.model_input {
        ModelInput::Normalized => &normalized,
        ModelInput::Reduced => &reduced,
    };
    let model = LogisticRegression::default().fit(model_features, &ranks)?;
    let raw_scores = model.raw_scores(model_features);
    let scores = scale_scores(&raw_scores, config.scaling);

    let mut ranked: Vec<RankedCandidate> = table
        .records()
        .iter()
        .zip(tiers)
        .zip(raw_scores.iter().zip(&scores))
        .map(|((record, tier), (&raw_score, &score))| RankedCandidate {
            record: record.clone(),
            tier,
            raw_score,
            score,
        })
        .collect();

    // Stable sort keeps input order for exact ties
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.raw_score.total_cmp(&a.raw_score))
    });

    let summaries = summarize_tiers(&ranked, &mapping, &config.tier_labels);
    for tier in &summaries {
        tracing::info!(
            "[{}] {}: {} candidates, proxy {:.2}, mean score {:.2}",
            config.name,
            tier.label,
            tier.count,
            tier.proxy,
            tier.mean_score
        );
    }

    Ok(RankedTable {
        identity_column: table.identity_column().to_string(),
        passthrough_columns: config.passthrough_columns.clone(),
        score_column: config.score_column.clone(),
        tier_column: config.tier_column.clone(),
        rows: ranked,
        tiers: summaries,
    })
}

fn summarize_tiers(
    ranked: &[RankedCandidate],
    mapping: &TierMapping,
    labels: &[String],
) -> Vec<TierSummary> {
    let mut summaries: Vec<TierSummary> = Vec::new();
    for (tier_rank, label) in labels.iter().enumerate() {
        let members: Vec<&RankedCandidate> = ranked
            .iter()
            .filter(|r| r.tier.tier_rank == tier_rank)
            .collect();
        let Some(first) = members.first() else {
            continue;
        };
        let count = members.len();
        let mean_score = members.iter().map(|r| r.score).sum::<f64>() / count as f64;
        summaries.push(TierSummary {
            tier_rank,
            label: label.clone(),
            count,
            proxy: mapping.statistic_of(first.tier.cluster_id).unwrap_or(0.0),
            mean_score,
        });
    }
    summaries
}
