// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use crate::aligner::{CigarOp, Traceback};
use crate::config::ScoringParams;
use crate::graph::{Graph, NodeId};
use crate::reads::Strand;
use crate::variants::Allele;

/// Score of the part of a traceback that falls onto one node.
#[derive(Debug, Clone, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct SegmentScore {
    node: NodeId,
    node_offset: usize,
    /// Node bases covered by the segment.
    ref_len: usize,
    /// Total length of all operations.
    length: u32,
    score: i32,
    /// Score relative to the length of the segment, in percent.
    percent: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, CopyGetters)]
pub struct ScoredTraceback {
    #[getset(get = "pub")]
    segments: Vec<SegmentScore>,
    #[getset(get_copy = "pub")]
    total_score: i32,
    /// Local alignment score without credit for soft clips or per-segment flooring.
    #[getset(get_copy = "pub")]
    aligned_score: i32,
    /// Matching bases before the first mismatch or gap.
    #[getset(get_copy = "pub")]
    prefix_match: u32,
    /// Matching bases after the last mismatch or gap.
    #[getset(get_copy = "pub")]
    suffix_match: u32,
}

/// The outcome of adjudicating one read.
#[derive(Debug, Clone)]
pub enum Attribution {
    /// The alignment is too weak to support anything.
    NoCall,
    /// Alleles clearly supported by the alignment, each at most once.
    Support(Vec<Arc<Allele>>),
}

impl Attribution {
    pub fn is_no_call(&self) -> bool {
        matches!(self, Attribution::NoCall)
    }

    pub fn alleles(&self) -> &[Arc<Allele>] {
        match self {
            Attribution::NoCall => &[],
            Attribution::Support(alleles) => alleles,
        }
    }

    /// Increment the counters of all supported alleles.
    pub fn apply(&self, sample: &str, strand: Strand) {
        for allele in self.alleles() {
            allele.increment(sample, strand);
        }
    }
}

/// Turns tracebacks into per-node scores and decides which alleles a read supports.
#[derive(new, Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct TracebackScorer {
    scoring: ScoringParams,
    percent_threshold: u32,
    suppress_ambiguous: bool,
}

impl TracebackScorer {
    pub fn score(&self, traceback: &Traceback) -> ScoredTraceback {
        let mut scored = ScoredTraceback::default();
        let mut in_prefix = true;

        for segment in traceback.segments() {
            let mut score = 0;
            let mut length = 0;
            for run in segment.ops() {
                match run.op() {
                    CigarOp::Match | CigarOp::SoftClip => {
                        scored.suffix_match += run.len();
                        if in_prefix {
                            scored.prefix_match += run.len();
                        }
                        let gain = self.scoring.match_score() * run.len() as i32;
                        score += gain;
                        if run.op() == CigarOp::Match {
                            scored.aligned_score += gain;
                        }
                    }
                    CigarOp::Mismatch => {
                        in_prefix = false;
                        scored.suffix_match = 0;
                        let penalty = self.scoring.mismatch() * run.len() as i32;
                        score -= penalty;
                        scored.aligned_score -= penalty;
                    }
                    CigarOp::Insertion | CigarOp::Deletion => {
                        in_prefix = false;
                        scored.suffix_match = 0;
                        let penalty = self.scoring.gap(run.len());
                        score -= penalty;
                        scored.aligned_score -= penalty;
                    }
                }
                length += run.len();
            }
            let score = score.max(0);
            let percent = if length > 0 {
                (100 * score as u32) / length
            } else {
                0
            };
            scored.total_score += score;
            scored.segments.push(SegmentScore {
                node: segment.node(),
                node_offset: segment.node_offset(),
                ref_len: segment.ref_len(),
                length,
                score,
                percent,
            });
        }

        scored
    }

    /// Decide which alleles a read of length `read_len` supports.
    pub fn attribute(&self, graph: &Graph, scored: &ScoredTraceback, read_len: usize) -> Attribution {
        if read_len == 0
            || scored.total_score < graph.score_threshold()
            || (100 * scored.total_score.max(0) as u64 / read_len as u64)
                < self.percent_threshold as u64
        {
            return Attribution::NoCall;
        }

        let mut alleles: Vec<Arc<Allele>> = Vec::new();
        let last = scored.segments.len().saturating_sub(1);
        for (idx, segment) in scored.segments.iter().enumerate() {
            if segment.percent < self.percent_threshold || segment.ref_len == 0 {
                continue;
            }
            let node = match graph.node(segment.node) {
                Some(node) => node,
                None => continue,
            };
            if self.suppress_ambiguous {
                let start = segment.node_offset;
                let end = start + segment.ref_len;
                // a read that runs through the whole node into the next one has left the
                // shared sequence behind
                let leaves_node = end == node.len() && idx < last;
                let enters_node = start == 0 && idx > 0;
                let within_prefix = end <= node.identical_prefix_len() && !leaves_node;
                let within_suffix =
                    start + node.identical_suffix_len() >= node.len() && !enters_node;
                if within_prefix || within_suffix {
                    trace!(
                        "ignoring ambiguous evidence on node {} ({}..{})",
                        segment.node.index(),
                        start,
                        end
                    );
                    continue;
                }
            }
            for allele in node.overlapping_alleles() {
                if !alleles.iter().any(|known| Arc::ptr_eq(known, &allele)) {
                    alleles.push(allele);
                }
            }
        }

        Attribution::Support(alleles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::{OpRun, TracebackSegment};

    fn scorer() -> TracebackScorer {
        TracebackScorer::new(ScoringParams::default(), 80, true)
    }

    fn traceback(ops: &[(CigarOp, u32)]) -> Traceback {
        Traceback::new(vec![TracebackSegment::new(
            NodeId::new(0),
            0,
            ops.iter().map(|(op, len)| OpRun::new(*op, *len)).collect(),
        )])
    }

    #[test]
    fn test_soft_clips_count_as_matches() {
        let scored = scorer().score(&traceback(&[(CigarOp::SoftClip, 2), (CigarOp::Match, 5)]));
        assert_eq!(scored.total_score(), 7);
        assert_eq!(scored.aligned_score(), 5);
        assert_eq!(scored.segments()[0].percent(), 100);
        assert_eq!(scored.segments()[0].ref_len(), 5);
        assert_eq!(scored.prefix_match(), 7);
        assert_eq!(scored.suffix_match(), 7);
    }

    #[test]
    fn test_mismatch_penalty() {
        let scored = scorer().score(&traceback(&[(CigarOp::Match, 10), (CigarOp::Mismatch, 1)]));
        assert_eq!(scored.total_score(), 6);
        assert_eq!(scored.segments()[0].percent(), 54);
        assert_eq!(scored.suffix_match(), 0);
    }

    #[test]
    fn test_gap_penalty() {
        let scored = scorer().score(&traceback(&[
            (CigarOp::Match, 8),
            (CigarOp::Insertion, 3),
            (CigarOp::Match, 2),
        ]));
        // 8 - (6 + 2) + 2
        assert_eq!(scored.total_score(), 2);
        assert_eq!(scored.aligned_score(), 2);
        assert_eq!(scored.segments()[0].percent(), 15);
    }

    #[test]
    fn test_score_floor() {
        let scored = scorer().score(&traceback(&[(CigarOp::Mismatch, 3), (CigarOp::Match, 1)]));
        assert_eq!(scored.total_score(), 0);
        assert_eq!(scored.segments()[0].percent(), 0);
    }

    #[test]
    fn test_prefix_and_suffix_match() {
        let segments = vec![
            TracebackSegment::new(
                NodeId::new(0),
                0,
                vec![
                    OpRun::new(CigarOp::Match, 5),
                    OpRun::new(CigarOp::Mismatch, 1),
                ],
            ),
            TracebackSegment::new(NodeId::new(1), 0, vec![OpRun::new(CigarOp::Match, 3)]),
        ];
        let scored = scorer().score(&Traceback::new(segments));
        assert_eq!(scored.prefix_match(), 5);
        assert_eq!(scored.suffix_match(), 3);
        assert_eq!(scored.segments().len(), 2);
        assert_eq!(scored.total_score(), 1 + 3);
    }
}
