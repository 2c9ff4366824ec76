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

use crate::error::{Result, ScoringError};
use crate::pipeline::model::ModelInput;
use crate::pipeline::normalizer::OutputDistribution;
use crate::pipeline::scaling::ScalingPolicy;
use crate::pipeline::tiers::ProxyStatistic;
use crate::table::TableSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_ASSESSMENT_URL: &str = "http://localhost:8502";
pub const DEFAULT_SEED: u64 = 42;

/// Profile platform a candidate table was scraped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileSource {
    GitHub,
    StackOverflow,
}

impl ProfileSource {
    /// Built-in pipeline settings for this source
    #[must_use]
    pub fn preset(self) -> PipelineConfig {
        match self {
            Self::GitHub => PipelineConfig::github(),
            Self::StackOverflow => PipelineConfig::stackoverflow(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::StackOverflow => "StackOverflow",
        }
    }
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one scoring run needs to know about its input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub identity_column: String,
    /// Columns dropped before feature extraction
    pub excluded_columns: Vec<String>,
    /// Columns copied untouched into the ranked report
    pub passthrough_columns: Vec<String>,
    /// Numeric column that orders clusters into tiers
    pub proxy_column: String,
    pub proxy_statistic: ProxyStatistic,
    /// Tier vocabulary, weakest first; its length is the tier count
    pub tier_labels: Vec<String>,
    pub n_quantiles: usize,
    pub output_distribution: OutputDistribution,
    pub n_components: usize,
    /// k-means restarts
    pub n_init: usize,
    pub seed: u64,
    pub model_input: ModelInput,
    pub scaling: ScalingPolicy,
    pub score_column: String,
    pub tier_column: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::github()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl PipelineConfig {
    /// GitHub profiles: three tiers ordered by mean followers, min-max scores.
    #[must_use]
    pub fn github() -> Self {
        Self {
            name: "github".to_string(),
            identity_column: "username".to_string(),
            excluded_columns: strings(&[
                "total_stars",
                "total_forks",
                "total_watchers",
                "total_open_issues",
            ]),
            passthrough_columns: Vec::new(),
            proxy_column: "followers".to_string(),
            proxy_statistic: ProxyStatistic::Mean,
            tier_labels: strings(&["Weak", "Average", "Strong"]),
            n_quantiles: 500,
            output_distribution: OutputDistribution::Normal,
            n_components: 2,
            n_init: 50,
            seed: DEFAULT_SEED,
            model_input: ModelInput::Normalized,
            scaling: ScalingPolicy::MinMax,
            score_column: "GTS".to_string(),
            tier_column: "cluster_name".to_string(),
        }
    }

    /// StackOverflow profiles: two tiers ordered by mean reputation,
    /// model on the PCA projection, quantile-uniform scores.
    #[must_use]
    pub fn stackoverflow() -> Self {
        Self {
            name: "stackoverflow".to_string(),
            identity_column: "user_id".to_string(),
            excluded_columns: strings(&["DisplayName"]),
            passthrough_columns: strings(&["DisplayName", "Reputation"]),
            proxy_column: "Reputation".to_string(),
            proxy_statistic: ProxyStatistic::Mean,
            tier_labels: strings(&["Standard", "Top Talent"]),
            n_quantiles: 1000,
            output_distribution: OutputDistribution::Normal,
            n_components: 2,
            n_init: 10,
            seed: DEFAULT_SEED,
            model_input: ModelInput::Reduced,
            scaling: ScalingPolicy::QuantileUniform,
            score_column: "SOTS".to_string(),
            tier_column: "Tier_Name".to_string(),
        }
    }

    #[must_use]
    pub const fn tier_count(&self) -> usize {
        self.tier_labels.len()
    }

    #[must_use]
    pub fn schema(&self) -> TableSchema<'_> {
        TableSchema {
            identity_column: &self.identity_column,
            excluded_columns: &self.excluded_columns,
            passthrough_columns: &self.passthrough_columns,
        }
    }

    /// Reject settings no batch could ever satisfy.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ScoringError::InvalidConfig(msg));

        if self.tier_count() < 2 {
            return invalid(format!(
                "'{}' needs at least 2 tier labels, has {}",
                self.name,
                self.tier_count()
            ));
        }
        if self.n_components == 0 {
            return invalid(format!("'{}' needs at least one PCA component", self.name));
        }
        if self.n_quantiles < 2 {
            return invalid(format!("'{}' needs at least 2 quantiles", self.name));
        }
        if self.n_init == 0 {
            return invalid(format!("'{}' needs at least one k-means run", self.name));
        }
        if self.proxy_column == self.identity_column
            || self.excluded_columns.contains(&self.proxy_column)
        {
            return invalid(format!(
                "proxy column '{}' must be a feature column",
                self.proxy_column
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// User configuration file.
///
/// Pipeline sections are partial: keys present override the built-in preset,
/// everything else keeps the preset value.
#[derive(Debug, Clone, PartialEq)]
pub struct TalentConfig {
    pub assessment_url: String,
    pub github: PipelineConfig,
    pub stackoverflow: PipelineConfig,
}

impl Default for TalentConfig {
    fn default() -> Self {
        Self {
            assessment_url: DEFAULT_ASSESSMENT_URL.to_string(),
            github: PipelineConfig::github(),
            stackoverflow: PipelineConfig::stackoverflow(),
        }
    }
}

impl TalentConfig {
    /// Get the path to the user config file
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("talentscore").join("config.json"))
    }

    /// Load the user config, returning defaults if it is missing or broken
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            tracing::info!("No config found at {}, using defaults", path.display());
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("{e}; using defaults");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let mut config = Self::default();

        if let Some(url) = value.get("assessment_url").and_then(|v| v.as_str()) {
            config.assessment_url = url.to_string();
        }
        if let Some(patch) = value.get("github") {
            config.github = overlay(&config.github, patch)?;
        }
        if let Some(patch) = value.get("stackoverflow") {
            config.stackoverflow = overlay(&config.stackoverflow, patch)?;
        }
        Ok(config)
    }

    #[must_use]
    pub const fn pipeline(&self, source: ProfileSource) -> &PipelineConfig {
        match source {
            ProfileSource::GitHub => &self.github,
            ProfileSource::StackOverflow => &self.stackoverflow,
        }
    }
}

/// Apply the keys of a JSON object on top of `base`.
fn overlay(base: &PipelineConfig, patch: &serde_json::Value) -> serde_json::Result<PipelineConfig> {
    let mut merged = serde_json::to_value(base)?;
    if let (Some(target), Some(fields)) = (merged.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged)
}
