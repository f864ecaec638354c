// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::sync::Arc;

use crate::adjudication::scorer::{Attribution, ScoredTraceback, TracebackScorer};
use crate::aligner::Traceback;
use crate::graph::Graph;
use crate::reads::AlignedRead;
use crate::samples::Sample;

/// The alignment of one read against one graph.
#[derive(Getters)]
#[getset(get = "pub")]
pub struct Mapping {
    read: Arc<dyn AlignedRead>,
    sample: Arc<Sample>,
    graph: Arc<Graph>,
    traceback: Traceback,
    scored: ScoredTraceback,
}

impl Mapping {
    pub fn new(
        read: Arc<dyn AlignedRead>,
        sample: Arc<Sample>,
        graph: Arc<Graph>,
        traceback: Traceback,
        scorer: &TracebackScorer,
    ) -> Self {
        let scored = scorer.score(&traceback);
        Mapping {
            read,
            sample,
            graph,
            traceback,
            scored,
        }
    }

    /// Alignment score without soft clip credit, used to pick the best graph for a read.
    pub fn mapping_score(&self) -> i32 {
        self.scored.aligned_score()
    }

    pub fn attribution(&self, scorer: &TracebackScorer) -> Attribution {
        scorer.attribute(&self.graph, &self.scored, self.read.len())
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("read", &self.read.name())
            .field("sample", self.sample.name())
            .field("score", &self.mapping_score())
            .field(
                "cigar",
                &self
                    .traceback
                    .segments()
                    .iter()
                    .map(|segment| format!("{}:{}", segment.node().index(), segment.cigar()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
