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

//! Principal component projection.
//!
//! The covariance eigenproblem is solved with cyclic Jacobi rotations, which
//! is exact enough for the handful of profile features we carry and fully
//! deterministic.

use ndarray::{Array1, Array2, Axis};

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_EPSILON: f64 = 1e-12;

/// Fitted principal axes of one batch
#[derive(Debug, Clone)]
pub struct PcaFit {
    /// Column means subtracted before projecting
    pub mean: Array1<f64>,
    /// `n_components × n_features`, rows ordered by explained variance
    pub components: Array2<f64>,
    pub explained_variance: Vec<f64>,
}

impl PcaFit {
    /// Project `x` onto the fitted components.
    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let centered = x - &self.mean;
        centered.dot(&self.components.t())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pca {
    n_components: usize,
}

impl Pca {
    #[must_use]
    pub const fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    #[must_use]
    pub fn fit(&self, x: &Array2<f64>) -> PcaFit {
        let (rows, cols) = x.dim();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(cols));

        let centered = x - &mean;
        let denom = rows.saturating_sub(1).max(1) as f64;
        let covariance = centered.t().dot(&centered) / denom;

        let (eigenvalues, eigenvectors) = symmetric_eigen(covariance);

        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]).then(a.cmp(&b)));

        let mut components = Array2::zeros((self.n_components, cols));
        let mut explained_variance = vec![0.0; self.n_components];
        for (k, &idx) in order.iter().take(self.n_components).enumerate() {
            let mut axis = eigenvectors.column(idx).to_owned();

            // Largest loading positive, so repeated fits agree on orientation
            let pivot = axis
                .iter()
                .copied()
                .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if pivot < 0.0 {
                axis.mapv_inplace(|v| -v);
            }

            components.row_mut(k).assign(&axis);
            explained_variance[k] = eigenvalues[idx].max(0.0);
        }

        if cols < self.n_components {
            tracing::warn!(
                "Only {cols} feature column(s) for {} components; padding with zero-variance axes",
                self.n_components
            );
        }

        PcaFit {
            mean,
            components,
            explained_variance,
        }
    }

    /// Fit on `x` and project it: `N × n_components`.
    #[must_use]
    pub fn fit_transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let fit = self.fit(x);
        tracing::debug!(
            "PCA explained variance: {:?}",
            fit.explained_variance
        );
        fit.transform(x)
    }
}

/// Eigen-decompose a symmetric matrix.
///
/// Returns the eigenvalues and a matrix whose columns are the matching
/// unit eigenvectors.
#[must_use]
pub fn symmetric_eigen(mut a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::eye(n);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        let scale: f64 = (0..n).map(|i| a[[i, i]] * a[[i, i]]).sum::<f64>().max(1.0);
        if off_diagonal <= JACOBI_EPSILON * JACOBI_EPSILON * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + theta.mul_add(theta, 1.0).sqrt());
                let c = 1.0 / t.mul_add(t, 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[[i, i]]).collect();
    (eigenvalues, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_symmetric_eigen_recovers_known_values() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (mut values, _) = symmetric_eigen(m);
        values.sort_by(f64::total_cmp);
        assert!((values[0] - 1.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_eigenvectors_diagonalize() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let (values, vectors) = symmetric_eigen(m.clone());
        for (i, value) in values.iter().enumerate() {
            let vec = vectors.column(i);
            let mv = m.dot(&vec);
            for k in 0..3 {
                assert!((mv[k] - value * vec[k]).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_first_component_follows_dominant_direction() {
        // Points spread along y = x with a little noise on y = -x
        let x = array![
            [-2.0, -2.1],
            [-1.0, -0.9],
            [0.0, 0.1],
            [1.0, 0.9],
            [2.0, 2.1],
        ];
        let fit = Pca::new(2).fit(&x);
        let first = fit.components.row(0);
        assert!(first[0] > 0.6 && first[1] > 0.6);
        assert!(fit.explained_variance[0] > fit.explained_variance[1]);

        let projected = fit.transform(&x);
        assert_eq!(projected.dim(), (5, 2));
        assert!(projected[[0, 0]] < projected[[4, 0]]);
    }

    #[test]
    fn test_too_few_columns_pads_with_zeros() {
        let x = array![[1.0], [2.0], [4.0]];
        let projected = Pca::new(2).fit_transform(&x);
        assert_eq!(projected.dim(), (3, 2));
        assert!(projected.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constant_columns_are_not_fatal() {
        let x = array![[1.0, 5.0], [1.0, 5.0], [1.0, 5.0]];
        let projected = Pca::new(2).fit_transform(&x);
        assert!(projected.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = array![[0.3, 1.2, -0.5], [1.1, -0.4, 0.9], [-0.7, 0.8, 0.1], [0.2, 0.0, -1.3]];
        let a = Pca::new(2).fit_transform(&x);
        let b = Pca::new(2).fit_transform(&x);
        assert_eq!(a, b);
    }
}
