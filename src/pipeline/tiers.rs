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

//! Tier assignment: seeded k-means, then proxy-ordered tier ranks.
//!
//! k-means cluster ids carry no meaning and can swap between runs. Tiers get
//! their order from [`align_tiers`], which ranks clusters by a proxy metric
//! (followers, reputation) that is known to track quality.

use crate::error::{Result, ScoringError};
use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How the proxy column is summarized per cluster before ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyStatistic {
    #[default]
    Mean,
    Median,
}

impl ProxyStatistic {
    /// Summarize `values`; `None` for an empty cluster.
    #[must_use]
    pub fn summarize(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
        }
    }
}

/// Result of one k-means fit
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Raw cluster id per row, in `0..k`
    pub labels: Vec<usize>,
    pub centroids: Array2<f64>,
    pub inertia: f64,
}

/// Lloyd's k-means with k-means++ seeding and several restarts.
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl KMeans {
    #[must_use]
    pub const fn new(k: usize, n_init: usize, seed: u64) -> Self {
        Self {
            k,
            n_init,
            max_iter: 300,
            tol: 1e-4,
            seed,
        }
    }

    /// Partition the rows of `x` into `k` groups, keeping the lowest-inertia
    /// restart. The RNG is created here from `seed`, so every call is
    /// independent and reproducible.
    pub fn fit(&self, x: &Array2<f64>) -> Result<Clustering> {
        let rows = x.nrows();
        if self.k == 0 {
            return Err(ScoringError::InvalidConfig(
                "k-means needs at least one cluster".to_string(),
            ));
        }
        if rows < self.k {
            return Err(ScoringError::InsufficientData {
                rows,
                required: self.k,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tol = self.tol * mean_variance(x);

        let mut best: Option<Clustering> = None;
        for run in 0..self.n_init.max(1) {
            let centroids = self.init_centroids(x, &mut rng);
            let candidate = self.lloyd(x, centroids, tol);
            tracing::trace!("k-means run {run}: inertia {}", candidate.inertia);
            if best.as_ref().map_or(true, |b| candidate.inertia < b.inertia) {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| ScoringError::InvalidConfig("k-means produced no run".to_string()))
    }

    /// k-means++ seeding: each new centroid is drawn with probability
    /// proportional to its squared distance from the nearest existing one.
    fn init_centroids(&self, x: &Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
        let rows = x.nrows();
        let mut centroids = Array2::zeros((self.k, x.ncols()));

        let first = rng.gen_range(0..rows);
        centroids.row_mut(0).assign(&x.row(first));

        let mut closest: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| squared_distance(row, centroids.row(0)))
            .collect();

        for c in 1..self.k {
            let total: f64 = closest.iter().sum();
            let chosen = if total > 0.0 {
                let target = rng.gen::<f64>() * total;
                let mut acc = 0.0;
                closest
                    .iter()
                    .position(|&d| {
                        acc += d;
                        acc > target
                    })
                    .unwrap_or(rows - 1)
            } else {
                // Every point already sits on a centroid
                rng.gen_range(0..rows)
            };

            centroids.row_mut(c).assign(&x.row(chosen));
            for (i, row) in x.rows().into_iter().enumerate() {
                let d = squared_distance(row, centroids.row(c));
                if d < closest[i] {
                    closest[i] = d;
                }
            }
        }

        centroids
    }

    fn lloyd(&self, x: &Array2<f64>, mut centroids: Array2<f64>, tol: f64) -> Clustering {
        let mut labels = vec![0usize; x.nrows()];

        for _ in 0..self.max_iter {
            let changed = assign_labels(x, &centroids, &mut labels);

            let mut updated = centroids.clone();
            let mut counts = vec![0usize; self.k];
            let mut sums = Array2::<f64>::zeros(centroids.dim());
            for (row, &label) in x.rows().into_iter().zip(&labels) {
                counts[label] += 1;
                let mut sum = sums.row_mut(label);
                sum += &row;
            }
            for (c, &count) in counts.iter().enumerate() {
                // Empty clusters keep their previous centroid
                if count > 0 {
                    updated.row_mut(c).assign(&(&sums.row(c) / count as f64));
                }
            }

            let shift: f64 = (&updated - &centroids).iter().map(|v| v * v).sum();
            centroids = updated;
            if !changed || shift <= tol {
                break;
            }
        }

        // Final assignment against the settled centroids
        assign_labels(x, &centroids, &mut labels);
        let inertia = x
            .rows()
            .into_iter()
            .zip(&labels)
            .map(|(row, &label)| squared_distance(row, centroids.row(label)))
            .sum();

        Clustering {
            labels,
            centroids,
            inertia,
        }
    }
}

/// Assign every row to its nearest centroid (ties go to the lower id).
/// Returns whether any label changed.
fn assign_labels(x: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (i, row) in x.rows().into_iter().enumerate() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (c, centroid) in centroids.rows().into_iter().enumerate() {
            let d = squared_distance(row, centroid);
            if d < best_distance {
                best_distance = d;
                best = c;
            }
        }
        if labels[i] != best {
            labels[i] = best;
            changed = true;
        }
    }
    changed
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean_variance(x: &Array2<f64>) -> f64 {
    if x.ncols() == 0 || x.nrows() == 0 {
        return 0.0;
    }
    x.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

/// Mapping from raw cluster id to ordered tier rank.
#[derive(Debug, Clone, PartialEq)]
pub struct TierMapping {
    ranks: Vec<Option<usize>>,
    statistics: Vec<Option<f64>>,
}

impl TierMapping {
    /// Tier rank of a raw cluster id, `None` for an empty cluster.
    #[must_use]
    pub fn rank_of(&self, cluster_id: usize) -> Option<usize> {
        self.ranks.get(cluster_id).copied().flatten()
    }

    /// Proxy statistic of a raw cluster id, `None` for an empty cluster.
    #[must_use]
    pub fn statistic_of(&self, cluster_id: usize) -> Option<f64> {
        self.statistics.get(cluster_id).copied().flatten()
    }

    /// Number of clusters that received at least one row.
    #[must_use]
    pub fn populated(&self) -> usize {
        self.ranks.iter().filter(|r| r.is_some()).count()
    }
}

/// Order raw cluster ids into tier ranks by a proxy metric.
///
/// Each non-empty cluster is summarized with `statistic` over its members'
/// proxy values; clusters are ranked ascending (ties by cluster id), so rank
/// 0 is the weakest tier. Empty clusters get no rank. The populated clusters
/// are spread over `0..k` so the weakest always takes rank 0 and the
/// strongest rank `k - 1`; the unused ranks fall in between.
#[must_use]
pub fn align_tiers(
    labels: &[usize],
    proxy: &[f64],
    k: usize,
    statistic: ProxyStatistic,
) -> TierMapping {
    let mut members: Vec<Vec<f64>> = vec![Vec::new(); k];
    for (&label, &value) in labels.iter().zip(proxy) {
        if let Some(bucket) = members.get_mut(label) {
            bucket.push(value);
        }
    }

    let statistics: Vec<Option<f64>> = members.iter().map(|m| statistic.summarize(m)).collect();

    let mut populated: Vec<(usize, f64)> = statistics
        .iter()
        .enumerate()
        .filter_map(|(id, s)| s.map(|s| (id, s)))
        .collect();
    populated.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut ranks = vec![None; k];
    let m = populated.len();
    for (position, (id, _)) in populated.iter().enumerate() {
        ranks[*id] = Some(spread_rank(position, m, k));
    }

    let empty = k - populated.len();
    if empty > 0 {
        tracing::warn!("{empty} of {k} clusters are empty; their tier ranks stay unused");
    }

    TierMapping { ranks, statistics }
}

/// Rank of the `position`-th of `populated` ordered clusters among `k` tiers.
/// Strictly increasing in `position`, pinned to 0 and `k - 1` at the ends.
const fn spread_rank(position: usize, populated: usize, k: usize) -> usize {
    if populated <= 1 {
        0
    } else {
        position * (k - 1) / (populated - 1)
    }
}

/// Tier attached to one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierAssignment {
    /// Raw k-means id, arbitrary
    pub cluster_id: usize,
    /// 0 = weakest
    pub tier_rank: usize,
    pub label: String,
}

/// Cluster `reduced` and label every row with its proxy-ordered tier.
///
/// `labels` is the tier vocabulary, weakest first, one entry per cluster.
pub fn assign_tiers(
    reduced: &Array2<f64>,
    proxy: &[f64],
    kmeans: &KMeans,
    statistic: ProxyStatistic,
    labels: &[String],
) -> Result<(Vec<TierAssignment>, TierMapping)> {
    if labels.len() != kmeans.k {
        return Err(ScoringError::InvalidConfig(format!(
            "{} tier labels for {} tiers",
            labels.len(),
            kmeans.k
        )));
    }

    let clustering = kmeans.fit(reduced)?;
    let mapping = align_tiers(&clustering.labels, proxy, kmeans.k, statistic);

    let assignments = clustering
        .labels
        .iter()
        .map(|&cluster_id| {
            // Every labelled row belongs to a populated cluster
            let tier_rank = mapping.rank_of(cluster_id).unwrap_or(0);
            TierAssignment {
                cluster_id,
                tier_rank,
                label: labels[tier_rank].clone(),
            }
        })
        .collect();

    Ok((assignments, mapping))
}
