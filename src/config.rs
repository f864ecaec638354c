// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::adjudication::scorer::TracebackScorer;
use crate::errors::Error;

/// Alignment scores. Penalties are given as positive numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, CopyGetters, Serialize, Deserialize)]
#[builder(default)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct ScoringParams {
    #[serde(rename = "match")]
    match_score: i32,
    mismatch: i32,
    gap_open: i32,
    gap_extend: i32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        ScoringParams {
            match_score: 1,
            mismatch: 4,
            gap_open: 6,
            gap_extend: 1,
        }
    }
}

impl ScoringParams {
    /// Penalty of a gap of length `len`.
    pub fn gap(&self, len: u32) -> i32 {
        if len == 0 {
            0
        } else {
            self.gap_open + self.gap_extend * (len as i32 - 1)
        }
    }
}

/// Settings for a whole adjudication run, usually read from a YAML file.
///
/// ```yaml
/// scoring:
///   match: 1
///   mismatch: 4
///   gap_open: 6
///   gap_extend: 1
/// percent_threshold: 80
/// threads: 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    scoring: ScoringParams,
    /// Minimum percentage of the maximal score a node or read needs.
    percent_threshold: u32,
    /// Minimum total score of a read alignment.
    score_threshold: i32,
    /// Reference bases around a variant cluster.
    flank: u64,
    /// Maximum distance between variants of one cluster.
    cluster_distance: u64,
    /// Ignore evidence that only covers sequence shared with a sibling node.
    suppress_ambiguous: bool,
    threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scoring: ScoringParams::default(),
            percent_threshold: 80,
            score_threshold: 0,
            flank: 150,
            cluster_distance: 50,
            suppress_ambiguous: true,
            threads: 1,
        }
    }
}

fn invalid(msg: &str) -> anyhow::Error {
    Error::InvalidConfig {
        msg: msg.to_owned(),
    }
    .into()
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| invalid(&e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("unable to read configuration {}", path.as_ref().display())
        })?;
        Self::from_yaml_str(&yaml)
            .with_context(|| format!("invalid configuration {}", path.as_ref().display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(invalid("threads must be at least 1"));
        }
        if self.percent_threshold > 100 {
            return Err(invalid("percent_threshold must not exceed 100"));
        }
        if self.scoring.match_score <= 0 {
            return Err(invalid("match score must be positive"));
        }
        if self.scoring.mismatch < 0 || self.scoring.gap_open < 0 || self.scoring.gap_extend < 0
        {
            return Err(invalid("penalties must not be negative"));
        }
        Ok(())
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_suppress_ambiguous(mut self, suppress_ambiguous: bool) -> Self {
        self.suppress_ambiguous = suppress_ambiguous;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringParams) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_flank(mut self, flank: u64) -> Self {
        self.flank = flank;
        self
    }

    pub fn with_cluster_distance(mut self, cluster_distance: u64) -> Self {
        self.cluster_distance = cluster_distance;
        self
    }

    pub fn with_percent_threshold(mut self, percent_threshold: u32) -> Self {
        self.percent_threshold = percent_threshold;
        self
    }

    pub fn scorer(&self) -> TracebackScorer {
        TracebackScorer::new(self.scoring, self.percent_threshold, self.suppress_ambiguous)
    }
}
