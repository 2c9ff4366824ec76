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

//! Quantile feature normalizer.
//!
//! Maps every column onto a reference distribution through its empirical
//! quantiles. The fit lives only for one call, so outputs are comparable
//! within a batch and never across batches.

use crate::error::{Result, ScoringError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Values are clipped this far inside (0, 1) before the normal inverse CDF
pub const BOUNDS_THRESHOLD: f64 = 1e-7;

/// Target marginal distribution of each normalized column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDistribution {
    #[default]
    Normal,
    Uniform,
}

/// Empirical quantiles of one column on an evenly spaced reference grid.
#[derive(Debug, Clone)]
pub struct ColumnQuantiles {
    quantiles: Vec<f64>,
    references: Vec<f64>,
    neg_quantiles_rev: Vec<f64>,
    neg_references_rev: Vec<f64>,
}

impl ColumnQuantiles {
    /// Fit `n_quantiles` quantiles of `values`. `values` must not be empty.
    #[must_use]
    pub fn fit(values: &[f64], n_quantiles: usize) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let references = linspace(n_quantiles.max(1));
        let mut quantiles: Vec<f64> = references
            .iter()
            .map(|&r| percentile(&sorted, r))
            .collect();

        // Interpolation can wobble by an ulp; quantiles must be non-decreasing
        for i in 1..quantiles.len() {
            if quantiles[i] < quantiles[i - 1] {
                quantiles[i] = quantiles[i - 1];
            }
        }

        let neg_quantiles_rev = quantiles.iter().rev().map(|q| -q).collect();
        let neg_references_rev = references.iter().rev().map(|r| -r).collect();

        Self {
            quantiles,
            references,
            neg_quantiles_rev,
            neg_references_rev,
        }
    }

    /// Position of `value` on the uniform `[0, 1]` scale.
    ///
    /// Averages the forward and the reversed interpolation so runs of
    /// repeated quantiles land in the middle of their reference span.
    #[must_use]
    pub fn to_uniform(&self, value: f64) -> f64 {
        let lower = self.quantiles[0];
        let upper = self.quantiles[self.quantiles.len() - 1];

        // Lower bound wins when both apply (constant column)
        if value - BOUNDS_THRESHOLD < lower {
            return 0.0;
        }
        if value + BOUNDS_THRESHOLD > upper {
            return 1.0;
        }

        let forward = interp(value, &self.quantiles, &self.references);
        let backward = interp(-value, &self.neg_quantiles_rev, &self.neg_references_rev);
        (0.5 * (forward - backward)).clamp(0.0, 1.0)
    }
}

/// Fits a fresh per-column quantile transform on every call.
#[derive(Debug, Clone, Copy)]
pub struct QuantileNormalizer {
    max_quantiles: usize,
    output: OutputDistribution,
}

impl QuantileNormalizer {
    #[must_use]
    pub const fn new(max_quantiles: usize, output: OutputDistribution) -> Self {
        Self {
            max_quantiles,
            output,
        }
    }

    /// Quantile count actually used for `rows` samples; never more than `rows`.
    #[must_use]
    pub fn quantile_count(&self, rows: usize) -> usize {
        self.max_quantiles.min(rows).max(1)
    }

    /// Fit on `x` and return the transformed matrix of the same shape.
    pub fn fit_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let rows = x.nrows();
        if rows == 0 {
            return Err(ScoringError::InsufficientData { rows, required: 1 });
        }

        let n_quantiles = self.quantile_count(rows);
        let mut out = Array2::zeros(x.dim());

        for (j, column) in x.columns().into_iter().enumerate() {
            let values: Vec<f64> = column.iter().copied().collect();
            let transformed = transform_column(&values, n_quantiles, self.output);
            for (i, v) in transformed.into_iter().enumerate() {
                out[[i, j]] = v;
            }
        }

        tracing::debug!(
            "Quantile-normalized {rows}x{} features with {n_quantiles} quantiles",
            x.ncols()
        );
        Ok(out)
    }
}

/// Fit and apply a quantile transform to a single column.
///
/// Returns an empty vector for empty input.
#[must_use]
pub fn transform_column(
    values: &[f64],
    n_quantiles: usize,
    output: OutputDistribution,
) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let fitted = ColumnQuantiles::fit(values, n_quantiles.min(values.len()));

    match output {
        OutputDistribution::Uniform => values.iter().map(|&v| fitted.to_uniform(v)).collect(),
        OutputDistribution::Normal => {
            let normal = Normal::standard();
            values
                .iter()
                .map(|&v| {
                    let u = fitted
                        .to_uniform(v)
                        .clamp(BOUNDS_THRESHOLD, 1.0 - BOUNDS_THRESHOLD);
                    normal.inverse_cdf(u)
                })
                .collect()
        }
    }
}

fn linspace(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![0.0];
    }
    let step = 1.0 / (n - 1) as f64;
    (0..n).map(|i| (i as f64 * step).min(1.0)).collect()
}

/// Linear-interpolated percentile of pre-sorted data, `q` in `[0, 1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Piecewise-linear interpolation over non-decreasing `xp`.
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    // xp[j] <= x < xp[j + 1], so the segment has positive width
    let j = xp.partition_point(|&v| v <= x) - 1;
    let t = (x - xp[j]) / (xp[j + 1] - xp[j]);
    // Rounding must not carry past the segment end, or order breaks at knots
    (fp[j] + t * (fp[j + 1] - fp[j])).min(fp[j + 1])
}
