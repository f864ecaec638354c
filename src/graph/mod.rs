// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Local variant graphs: a reference backbone with one branch per alternative allele.

use std::fmt;
use std::sync::{Arc, Weak};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::{Direction, Incoming, Outgoing};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::region::Region;
use crate::variants::{Allele, Variant};

pub mod builder;

pub type NodeId = NodeIndex<u32>;

pub(crate) type NodeArena = StableDiGraph<Node, (), u32>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum AlleleType {
    Reference,
    Alternate,
}

/// A sequence fragment of a graph.
#[derive(Getters, CopyGetters)]
pub struct Node {
    #[getset(get_copy = "pub")]
    id: NodeId,
    #[getset(get = "pub")]
    sequence: Vec<u8>,
    /// Genomic position of the first base.
    #[getset(get_copy = "pub")]
    position: u64,
    #[getset(get_copy = "pub")]
    allele_type: AlleleType,
    overlapping_alleles: Vec<Weak<Allele>>,
    /// Length of the longest prefix shared with a sibling node.
    #[getset(get_copy = "pub")]
    identical_prefix_len: usize,
    /// Length of the longest suffix shared with a sibling node.
    #[getset(get_copy = "pub")]
    identical_suffix_len: usize,
}

impl Node {
    pub(crate) fn new(sequence: Vec<u8>, position: u64, allele_type: AlleleType) -> Self {
        Node {
            id: NodeId::end(),
            sequence,
            position,
            allele_type,
            overlapping_alleles: Vec::new(),
            identical_prefix_len: 0,
            identical_suffix_len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn is_reference(&self) -> bool {
        self.allele_type == AlleleType::Reference
    }

    /// Alleles this node's sequence belongs to.
    pub fn overlapping_alleles(&self) -> Vec<Arc<Allele>> {
        self.overlapping_alleles
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn add_allele(&mut self, allele: &Arc<Allele>) {
        let weak = Arc::downgrade(allele);
        if !self
            .overlapping_alleles
            .iter()
            .any(|known| Weak::ptr_eq(known, &weak))
        {
            self.overlapping_alleles.push(weak);
        }
    }

    /// Append the sequence and alleles of the following node.
    pub(crate) fn absorb(&mut self, other: Node) {
        self.sequence.extend(other.sequence);
        for allele in other.overlapping_alleles {
            if !self
                .overlapping_alleles
                .iter()
                .any(|known| Weak::ptr_eq(known, &allele))
            {
                self.overlapping_alleles.push(allele);
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id.index())
            .field("sequence", &String::from_utf8_lossy(&self.sequence))
            .field("position", &self.position)
            .field("allele_type", &self.allele_type)
            .field("alleles", &self.overlapping_alleles.len())
            .field("identical_prefix_len", &self.identical_prefix_len)
            .field("identical_suffix_len", &self.identical_suffix_len)
            .finish()
    }
}

/// One entry-to-sink path.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct GraphPath {
    nodes: Vec<NodeId>,
    sequence: Vec<u8>,
}

/// A condensed variant graph for one cluster of variants. Immutable once built.
#[derive(Getters, CopyGetters)]
pub struct Graph {
    nodes: NodeArena,
    #[getset(get_copy = "pub")]
    entry: NodeId,
    #[getset(get = "pub")]
    variants: Vec<Arc<Variant>>,
    #[getset(get = "pub")]
    regions: Vec<Region>,
    #[getset(get_copy = "pub")]
    flank: u64,
    /// Minimum total alignment score for a read to be adjudicated at all.
    #[getset(get_copy = "pub")]
    score_threshold: i32,
}

impl Graph {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.node_weight(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.edge_count()
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        let mut ids: Vec<_> = self.nodes.node_indices().collect();
        ids.sort();
        ids.into_iter().map(move |id| &self.nodes[id])
    }

    /// All edges as `(from, to)` pairs, ordered.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<_> = self
            .nodes
            .edge_indices()
            .filter_map(|edge| self.nodes.edge_endpoints(edge))
            .collect();
        edges.sort();
        edges
    }

    pub fn out_nodes(&self, id: NodeId) -> Vec<NodeId> {
        neighbors(&self.nodes, id, Outgoing)
    }

    pub fn in_nodes(&self, id: NodeId) -> Vec<NodeId> {
        neighbors(&self.nodes, id, Incoming)
    }

    /// Successor along the reference backbone.
    pub fn reference_out(&self, id: NodeId) -> Option<NodeId> {
        reference_neighbor(&self.nodes, id, Outgoing)
    }

    /// Predecessor along the reference backbone.
    pub fn reference_in(&self, id: NodeId) -> Option<NodeId> {
        reference_neighbor(&self.nodes, id, Incoming)
    }

    /// Last node of the reference backbone.
    pub fn sink(&self) -> NodeId {
        let mut node = self.entry;
        while let Some(next) = self.reference_out(node) {
            node = next;
        }
        node
    }

    /// Nodes in the order they are handed to an alignment engine: walking the
    /// reference backbone, each node is followed by its alternative branches (by id)
    /// before the walk continues with the next reference node.
    pub fn alignment_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.node_count());
        let mut node = Some(self.entry);
        while let Some(id) = node {
            order.push(id);
            order.extend(
                self.out_nodes(id)
                    .into_iter()
                    .filter(|out| !self.nodes[*out].is_reference()),
            );
            node = self.reference_out(id);
        }
        order
    }

    /// Enumerate entry-to-sink paths, at most `limit` of them.
    pub fn paths(&self, limit: usize) -> Vec<GraphPath> {
        let mut paths = Vec::new();
        let mut stack = vec![vec![self.entry]];
        while let Some(path) = stack.pop() {
            if paths.len() >= limit {
                break;
            }
            let last = *path.last().unwrap_or(&self.entry);
            let outs = self.out_nodes(last);
            if outs.is_empty() {
                let sequence = path
                    .iter()
                    .flat_map(|id| self.nodes[*id].sequence.iter().cloned())
                    .collect();
                paths.push(GraphPath {
                    nodes: path,
                    sequence,
                });
            } else {
                // reversed so that lower ids are explored first
                for out in outs.into_iter().rev() {
                    let mut next = path.clone();
                    next.push(out);
                    stack.push(next);
                }
            }
        }
        paths
    }

    /// Log all paths at trace level.
    pub(crate) fn log_paths(&self, limit: usize) {
        if log_enabled!(log::Level::Trace) {
            for path in self.paths(limit) {
                trace!(
                    "graph path {}: {:?}",
                    String::from_utf8_lossy(path.sequence()),
                    path.nodes().iter().map(|id| id.index()).collect::<Vec<_>>()
                );
            }
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes().collect::<Vec<_>>())
            .field("edges", &self.edges())
            .field("regions", &self.regions)
            .finish()
    }
}

fn neighbors(nodes: &NodeArena, id: NodeId, direction: Direction) -> Vec<NodeId> {
    let mut neighbors: Vec<_> = nodes.neighbors_directed(id, direction).collect();
    neighbors.sort();
    neighbors.dedup();
    neighbors
}

fn reference_neighbor(nodes: &NodeArena, id: NodeId, direction: Direction) -> Option<NodeId> {
    neighbors(nodes, id, direction)
        .into_iter()
        .find(|neighbor| nodes[*neighbor].is_reference())
}
