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

use super::normalizer::{transform_column, OutputDistribution};
use serde::{Deserialize, Serialize};

pub const SCORE_MAX: f64 = 100.0;

/// Quantile count for the uniform score mapping (capped by batch size)
const SCORE_QUANTILES: usize = 1000;

/// How raw ranking scalars become 0-100 scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicy {
    /// Linear between batch min and max; outliers compress everyone else
    #[default]
    MinMax,
    /// Empirical rank position; robust to skewed raw scores
    QuantileUniform,
}

/// Rescale raw scores to `[0, 100]`, preserving their order.
#[must_use]
pub fn scale_scores(raw: &[f64], policy: ScalingPolicy) -> Vec<f64> {
    let scaled = match policy {
        ScalingPolicy::MinMax => normalize_scores(raw),
        ScalingPolicy::QuantileUniform => {
            transform_column(raw, SCORE_QUANTILES, OutputDistribution::Uniform)
                .into_iter()
                .map(|u| u * SCORE_MAX)
                .collect()
        }
    };
    scaled.into_iter().map(|s| s.clamp(0.0, SCORE_MAX)).collect()
}

/// Min-max normalize scores to 0-100
#[must_use]
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let min_score = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max_score - min_score).abs() < 1e-10 {
        // All scores are the same
        return vec![SCORE_MAX / 2.0; scores.len()];
    }

    scores
        .iter()
        .map(|&s| ((s - min_score) / (max_score - min_score)) * SCORE_MAX)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_hits_both_ends() {
        let scaled = scale_scores(&[-3.0, 1.0, 5.0], ScalingPolicy::MinMax);
        assert_eq!(scaled, vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_constant_scores_sit_in_the_middle() {
        assert_eq!(normalize_scores(&[2.0, 2.0]), vec![50.0, 50.0]);
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_quantile_uniform_flattens_outliers() {
        let raw = [0.0, 1.0, 2.0, 3.0, 1000.0];
        let min_max = scale_scores(&raw, ScalingPolicy::MinMax);
        let quantile = scale_scores(&raw, ScalingPolicy::QuantileUniform);

        // Min-max squeezes the first four into the bottom percent
        assert!(min_max[3] < 1.0);
        assert!((quantile[1] - 25.0).abs() < 1e-9);
        assert!((quantile[3] - 75.0).abs() < 1e-9);
        assert_eq!(quantile[4], 100.0);
    }

    #[test]
    fn test_both_policies_keep_order() {
        let raw = [0.3, -1.2, 4.4, 4.4, 0.0, 2.5, -0.7];
        for policy in [ScalingPolicy::MinMax, ScalingPolicy::QuantileUniform] {
            let scaled = scale_scores(&raw, policy);
            for i in 0..raw.len() {
                for j in 0..raw.len() {
                    if raw[i] >= raw[j] {
                        assert!(scaled[i] >= scaled[j], "{policy:?} broke order");
                    }
                }
                assert!((0.0..=100.0).contains(&scaled[i]));
            }
        }
    }
}
