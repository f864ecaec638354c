// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Alignment of reads against variant graphs.
//!
//! The actual dynamic programming is delegated to an `AlignmentBackend`. `GraphAligner`
//! mirrors a `Graph` into the backend once and translates tracebacks back into graph
//! node ids.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::Result;
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::config::ScoringParams;
use crate::errors::Error;
use crate::graph::{Graph, NodeId};

pub mod smith_waterman;

/// Alignment operation of a traceback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum CigarOp {
    #[strum(serialize = "M")]
    Match,
    #[strum(serialize = "X")]
    Mismatch,
    #[strum(serialize = "I")]
    Insertion,
    #[strum(serialize = "D")]
    Deletion,
    #[strum(serialize = "S")]
    SoftClip,
}

impl CigarOp {
    /// Whether the operation consumes bases of the graph node.
    pub fn consumes_reference(self) -> bool {
        matches!(self, CigarOp::Match | CigarOp::Mismatch | CigarOp::Deletion)
    }
}

/// A run of identical operations.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct OpRun {
    op: CigarOp,
    len: u32,
}

impl fmt::Display for OpRun {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.len, self.op)
    }
}

/// Append `op` to a run-length encoded operation list.
pub(crate) fn push_op(ops: &mut Vec<OpRun>, op: CigarOp, len: u32) {
    if len == 0 {
        return;
    }
    match ops.last_mut() {
        Some(last) if last.op == op => last.len += len,
        _ => ops.push(OpRun::new(op, len)),
    }
}

/// The part of a traceback that falls onto one backend node.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct NodeCigar<H> {
    pub node: H,
    /// Offset into the node sequence where the alignment starts.
    pub node_offset: usize,
    pub ops: Vec<OpRun>,
}

/// A graph alignment engine.
///
/// Nodes have to be built in topological order and edges may only point from an
/// earlier to a later node. `traceback` refers to the last `fill` with the same query.
pub trait AlignmentBackend {
    type Handle: Copy + Eq + Hash + fmt::Debug;

    fn build_node(&mut self, sequence: &[u8]) -> Result<Self::Handle>;

    fn add_edge(&mut self, from: Self::Handle, to: Self::Handle) -> Result<()>;

    fn fill(&mut self, query: &[u8], scoring: &ScoringParams) -> Result<()>;

    /// Optimal local alignment of the last filled query, as consecutive node segments.
    /// Empty if no positive scoring alignment exists.
    fn traceback(
        &mut self,
        query: &[u8],
        scoring: &ScoringParams,
    ) -> Result<Vec<NodeCigar<Self::Handle>>>;
}

/// A traceback segment on one graph node.
#[derive(new, Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct TracebackSegment {
    #[getset(get_copy = "pub")]
    node: NodeId,
    #[getset(get_copy = "pub")]
    node_offset: usize,
    #[getset(get = "pub")]
    ops: Vec<OpRun>,
}

impl TracebackSegment {
    /// Number of node bases covered by the segment.
    pub fn ref_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|run| run.op().consumes_reference())
            .map(|run| run.len() as usize)
            .sum()
    }

    pub fn cigar(&self) -> String {
        self.ops.iter().map(|run| run.to_string()).collect()
    }
}

/// The alignment of one read against a graph.
#[derive(new, Debug, Clone, Default, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Traceback {
    segments: Vec<TracebackSegment>,
}

impl Traceback {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Aligns reads against one graph, owning the backend state for it.
///
/// An aligner is used by a single thread at a time.
pub struct GraphAligner<B: AlignmentBackend> {
    graph: Arc<Graph>,
    backend: B,
    scoring: ScoringParams,
    nodes: HashMap<B::Handle, NodeId>,
}

impl<B: AlignmentBackend> GraphAligner<B> {
    pub fn new(graph: Arc<Graph>, mut backend: B, scoring: ScoringParams) -> Result<Self> {
        let mut handles = HashMap::new();
        let mut nodes = HashMap::new();
        for id in graph.alignment_order() {
            let node = graph.node(id).ok_or_else(|| Error::UnknownBackendNode {
                handle: format!("{:?}", id),
            })?;
            let handle = backend.build_node(node.sequence())?;
            handles.insert(id, handle);
            nodes.insert(handle, id);
        }
        let handle = |id: NodeId| {
            handles.get(&id).cloned().ok_or_else(|| Error::UnknownBackendNode {
                handle: format!("{:?}", id),
            })
        };
        for (from, to) in graph.edges() {
            backend.add_edge(handle(from)?, handle(to)?)?;
        }

        Ok(GraphAligner {
            graph,
            backend,
            scoring,
            nodes,
        })
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Align a read sequence and return its traceback in graph node ids.
    pub fn align(&mut self, query: &[u8]) -> Result<Traceback> {
        self.backend.fill(query, &self.scoring)?;
        let cigars = self.backend.traceback(query, &self.scoring)?;
        let segments = cigars
            .into_iter()
            .map(|cigar| -> Result<TracebackSegment> {
                let node = self.nodes.get(&cigar.node).cloned().ok_or_else(|| {
                    Error::UnknownBackendNode {
                        handle: format!("{:?}", cigar.node),
                    }
                })?;
                Ok(TracebackSegment::new(node, cigar.node_offset, cigar.ops))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Traceback::new(segments))
    }
}

impl<B: AlignmentBackend> Drop for GraphAligner<B> {
    fn drop(&mut self) {
        trace!(
            "releasing alignment backend for graph with {} nodes",
            self.nodes.len()
        );
    }
}
