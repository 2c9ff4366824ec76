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

//! Tier confidence model.
//!
//! A multinomial logistic regression is fit on the tier ranks of the same
//! batch it later scores. It is a ranking signal that turns discrete tiers
//! into a smooth within-tier ordering, not a predictor for unseen
//! populations.

use crate::error::{Result, ScoringError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

const POWER_ITERATIONS: usize = 100;

/// Which feature matrix the score model is trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelInput {
    /// Quantile-normalized features, before PCA
    #[default]
    Normalized,
    /// PCA projection
    Reduced,
}

/// Softmax regression with an L2 penalty, fit by full-batch gradient descent.
#[derive(Debug, Clone, Copy)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    /// Stop once every gradient entry is below this
    pub tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 2000,
            tol: 1e-6,
        }
    }
}

impl LogisticRegression {
    /// Fit on `x` with tier ranks `labels` (one per row).
    pub fn fit(&self, x: &Array2<f64>, labels: &[usize]) -> Result<FittedModel> {
        let (rows, cols) = x.dim();
        if rows != labels.len() {
            return Err(ScoringError::InvalidConfig(format!(
                "{rows} feature rows but {} labels",
                labels.len()
            )));
        }

        let mut classes: Vec<usize> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ScoringError::DegenerateLabels {
                distinct: classes.len(),
            });
        }

        let n_classes = classes.len();
        let mut targets = Array2::<f64>::zeros((rows, n_classes));
        for (i, label) in labels.iter().enumerate() {
            if let Ok(idx) = classes.binary_search(label) {
                targets[[i, idx]] = 1.0;
            }
        }

        let n = rows as f64;
        let penalty = 1.0 / (self.c * n);
        // Softmax loss curvature is at most half the Gram matrix's largest eigenvalue
        let lipschitz = 0.55 * gram_spectral_bound(x) + penalty;
        let step = 1.0 / lipschitz;

        let mut weights = Array2::<f64>::zeros((n_classes, cols));
        let mut intercepts = Array1::<f64>::zeros(n_classes);
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let probabilities = softmax(&logits(x, &weights, &intercepts));
            let residual = probabilities - &targets;

            let grad_w = residual.t().dot(x) / n + &weights * penalty;
            let grad_b = residual.sum_axis(Axis(0)) / n;

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));

            weights.scaled_add(-step, &grad_w);
            intercepts.scaled_add(-step, &grad_b);

            if max_grad < self.tol {
                break;
            }
        }

        tracing::debug!(
            "Fitted {n_classes}-class logistic model on {rows}x{cols} in {iterations} iterations"
        );

        Ok(FittedModel {
            classes,
            weights,
            intercepts,
            iterations,
        })
    }
}

/// A fitted tier model
#[derive(Debug, Clone)]
pub struct FittedModel {
    classes: Vec<usize>,
    weights: Array2<f64>,
    intercepts: Array1<f64>,
    iterations: usize,
}

impl FittedModel {
    /// Tier ranks seen during fitting, ascending; one decision column each.
    #[must_use]
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Per-class decision values, centered so each row sums to zero.
    #[must_use]
    pub fn decision_function(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut z = logits(x, &self.weights, &self.intercepts);
        for mut row in z.rows_mut() {
            let mean = row.mean().unwrap_or(0.0);
            row -= mean;
        }
        z
    }

    #[must_use]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        softmax(&logits(x, &self.weights, &self.intercepts))
    }

    /// Raw ranking scalar per row: decision values weighted by tier rank.
    #[must_use]
    pub fn raw_scores(&self, x: &Array2<f64>) -> Vec<f64> {
        weighted_confidence(&self.decision_function(x), &self.classes)
    }
}

/// Collapse a per-class confidence matrix to one scalar per row by dotting
/// it with the class tier ranks, so higher tiers pull the score up.
#[must_use]
pub fn weighted_confidence(confidence: &Array2<f64>, classes: &[usize]) -> Vec<f64> {
    let weights = Array1::from_iter(classes.iter().map(|&c| c as f64));
    confidence.dot(&weights).to_vec()
}

fn logits(x: &Array2<f64>, weights: &Array2<f64>, intercepts: &Array1<f64>) -> Array2<f64> {
    x.dot(&weights.t()) + intercepts
}

fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut p = z.clone();
    for mut row in p.rows_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    p
}

/// Estimate the largest eigenvalue of `[x, 1]ᵀ[x, 1] / n` by power iteration.
fn gram_spectral_bound(x: &Array2<f64>) -> f64 {
    let (rows, cols) = x.dim();
    // Trailing column of ones stands in for the intercept
    let augmented = Array2::from_shape_fn((rows, cols + 1), |(i, j)| {
        if j < cols {
            x[[i, j]]
        } else {
            1.0
        }
    });
    let gram = augmented.t().dot(&augmented) / rows.max(1) as f64;

    let mut v = Array1::<f64>::ones(cols + 1);
    v /= (v.dot(&v)).sqrt();
    let mut estimate = 1.0;
    for _ in 0..POWER_ITERATIONS {
        let next = gram.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm <= f64::EPSILON {
            break;
        }
        estimate = v.dot(&next);
        v = next / norm;
    }
    estimate.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ordered_data() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [-2.0, -1.8],
            [-1.7, -2.1],
            [-1.5, -1.4],
            [-0.1, 0.2],
            [0.1, -0.2],
            [0.3, 0.1],
            [1.6, 1.9],
            [2.0, 1.7],
            [2.2, 2.3],
        ];
        (x, vec![0, 0, 0, 1, 1, 1, 2, 2, 2])
    }

    #[test]
    fn test_single_class_is_degenerate() {
        let x = array![[1.0], [2.0], [3.0]];
        let err = LogisticRegression::default()
            .fit(&x, &[1, 1, 1])
            .expect_err("one class cannot be fit");
        assert_eq!(err, ScoringError::DegenerateLabels { distinct: 1 });
    }

    #[test]
    fn test_fit_recovers_training_tiers() {
        let (x, labels) = ordered_data();
        let model = LogisticRegression::default().fit(&x, &labels).expect("fit");
        assert_eq!(model.classes(), [0, 1, 2]);

        let proba = model.predict_proba(&x);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        let argmax = |i: usize| {
            proba
                .row(i)
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(c, _)| c)
        };
        assert_eq!(argmax(0), Some(0));
        assert_eq!(argmax(8), Some(2));
    }

    #[test]
    fn test_raw_scores_rise_with_tier() {
        let (x, labels) = ordered_data();
        let model = LogisticRegression::default().fit(&x, &labels).expect("fit");
        let raw = model.raw_scores(&x);

        let max_of = |tier: usize| {
            raw.iter()
                .zip(&labels)
                .filter(|&(_, &l)| l == tier)
                .map(|(r, _)| *r)
                .fold(f64::NEG_INFINITY, f64::max)
        };
        let min_of = |tier: usize| {
            raw.iter()
                .zip(&labels)
                .filter(|&(_, &l)| l == tier)
                .map(|(r, _)| *r)
                .fold(f64::INFINITY, f64::min)
        };
        assert!(max_of(0) < min_of(1));
        assert!(max_of(1) < min_of(2));
    }

    #[test]
    fn test_decision_rows_are_centered() {
        let (x, labels) = ordered_data();
        let model = LogisticRegression::default().fit(&x, &labels).expect("fit");
        let decision = model.decision_function(&x);
        for row in decision.rows() {
            assert!(row.sum().abs() < 1e-9);
        }
    }

    #[test]
    fn test_weighted_confidence_uses_rank_weights() {
        let confidence = array![[0.7, 0.2, 0.1], [0.1, 0.2, 0.7]];
        let raw = weighted_confidence(&confidence, &[0, 1, 2]);
        assert!((raw[0] - 0.4).abs() < 1e-12);
        assert!((raw[1] - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_rank_gaps_keep_their_weights() {
        let confidence = array![[0.5, -0.5]];
        let raw = weighted_confidence(&confidence, &[0, 2]);
        assert!((raw[0] + 1.0).abs() < 1e-12);
    }
}
