// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use petgraph::{Direction, Incoming, Outgoing};
use strum_macros::Display;

use crate::errors::Error;
use crate::graph::{AlleleType, Graph, Node, NodeArena, NodeId};
use crate::reference::ReferenceProvider;
use crate::region::Region;
use crate::utils::{common_prefix_len, common_suffix_len};
use crate::variants::Variant;

/// Maximum number of paths logged after construction.
const MAX_LOGGED_PATHS: usize = 64;

/// Which side of a variant an anchor node is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AnchorKind {
    Entry,
    Exit,
}

/// Builds condensed variant graphs from a reference provider.
#[derive(new)]
pub struct GraphBuilder<'a> {
    reference: &'a dyn ReferenceProvider,
    /// Reference bases added on both sides of the variant cluster.
    flank: u64,
    score_threshold: i32,
}

impl<'a> GraphBuilder<'a> {
    /// Build the graph for a cluster of variants on a single chromosome.
    ///
    /// Either a complete graph is returned or the error that prevented it.
    pub fn build(&self, variants: Vec<Arc<Variant>>) -> Result<Graph> {
        let region = self.bounding_region(&variants)?;
        let sequence = self.reference.sequence(&region)?;
        if sequence.len() as u64 != region.len() {
            return Err(Error::ReferenceIntervalUnavailable {
                region: region.to_string(),
            }
            .into());
        }

        let mut nodes = NodeArena::default();
        let backbone: Vec<NodeId> = sequence
            .iter()
            .enumerate()
            .map(|(i, base)| {
                add_node(
                    &mut nodes,
                    Node::new(vec![*base], region.start() + i as u64, AlleleType::Reference),
                )
            })
            .collect();
        for (from, to) in backbone.iter().tuple_windows() {
            nodes.add_edge(*from, *to, ());
        }
        let (entry, sink) = match (backbone.first(), backbone.last()) {
            (Some(entry), Some(sink)) => (*entry, *sink),
            _ => {
                return Err(Error::ReferenceIntervalUnavailable {
                    region: region.to_string(),
                }
                .into())
            }
        };

        for variant in &variants {
            add_variant(&mut nodes, &backbone, &region, &sequence, variant)?;
        }

        condense(&mut nodes, sink)?;
        set_identical_prefix_and_suffix(&mut nodes);

        debug!(
            "built graph for {} variant(s) in {}: {} nodes, {} edges",
            variants.len(),
            region,
            nodes.node_count(),
            nodes.edge_count()
        );

        let graph = Graph {
            nodes,
            entry,
            variants,
            regions: vec![region],
            flank: self.flank,
            score_threshold: self.score_threshold,
        };
        graph.log_paths(MAX_LOGGED_PATHS);

        Ok(graph)
    }

    fn bounding_region(&self, variants: &[Arc<Variant>]) -> Result<Region> {
        let first = variants.first().ok_or(Error::EmptyVariantCluster)?;
        let chrom = first.chromosome();
        if let Some(other) = variants.iter().find(|v| v.chromosome() != chrom) {
            return Err(Error::MixedChromosomes {
                first: chrom.to_owned(),
                other: other.chromosome().to_owned(),
            }
            .into());
        }

        let min_pos = variants.iter().map(|v| v.position()).min().unwrap_or(0);
        let max_end = variants.iter().map(|v| v.end()).max().unwrap_or(0);

        let first_pos = self.reference.first_position(chrom)?;
        let last_pos = self.reference.last_position(chrom)?;
        let start = min_pos.saturating_sub(self.flank).max(first_pos);
        let end = (max_end + self.flank).min(last_pos + 1);

        Region::new(chrom, start, end.max(start), self.reference.based())
    }
}

fn add_node(nodes: &mut NodeArena, node: Node) -> NodeId {
    let id = nodes.add_node(node);
    nodes[id].id = id;
    id
}

fn add_variant(
    nodes: &mut NodeArena,
    backbone: &[NodeId],
    region: &Region,
    sequence: &[u8],
    variant: &Arc<Variant>,
) -> Result<()> {
    let chrom = variant.chromosome();
    let pos = variant.position();
    let missing = |kind| Error::MissingAnchor {
        kind,
        chrom: chrom.to_owned(),
        pos,
    };
    let backbone_idx = |position: u64| {
        if region.contains(position) {
            Some((position - region.start()) as usize)
        } else {
            None
        }
    };

    let entry_idx = pos
        .checked_sub(1)
        .and_then(backbone_idx)
        .ok_or_else(|| missing(AnchorKind::Entry))?;
    let exit_idx = backbone_idx(variant.end()).ok_or_else(|| missing(AnchorKind::Exit))?;

    let ref_span = &sequence[entry_idx + 1..exit_idx];
    if ref_span != variant.ref_allele().sequence() {
        debug!(
            "reference allele of {} does not match the reference sequence {}",
            variant,
            String::from_utf8_lossy(ref_span)
        );
    }
    for id in &backbone[entry_idx + 1..exit_idx] {
        nodes[*id].add_allele(variant.ref_allele());
    }

    for alt in variant.alt_alleles() {
        let mut node = Node::new(alt.sequence().to_vec(), pos, AlleleType::Alternate);
        node.add_allele(alt);
        let id = add_node(nodes, node);
        nodes.add_edge(backbone[entry_idx], id, ());
        nodes.add_edge(id, backbone[exit_idx], ());
    }

    Ok(())
}

fn sorted_neighbors(nodes: &NodeArena, id: NodeId, direction: Direction) -> Vec<NodeId> {
    let mut neighbors: Vec<_> = nodes.neighbors_directed(id, direction).collect();
    neighbors.sort();
    neighbors
}

/// Merge runs of unbranched reference nodes, walking back from the sink.
fn condense(nodes: &mut NodeArena, sink: NodeId) -> Result<()> {
    let mut node = sink;
    loop {
        let preds = sorted_neighbors(nodes, node, Incoming);
        if preds.is_empty() {
            break;
        }
        let pred = preds
            .iter()
            .cloned()
            .find(|pred| nodes[*pred].is_reference())
            .ok_or_else(|| Error::BrokenReferencePath {
                position: nodes[node].position(),
            })?;

        if preds.len() > 1 || nodes.neighbors_directed(pred, Outgoing).count() > 1 {
            node = pred;
            continue;
        }

        let outs = sorted_neighbors(nodes, node, Outgoing);
        let merged = nodes
            .remove_node(node)
            .ok_or_else(|| Error::BrokenReferencePath {
                position: nodes[pred].position(),
            })?;
        nodes[pred].absorb(merged);
        for out in outs {
            nodes.add_edge(pred, out, ());
        }
        node = pred;
    }
    Ok(())
}

/// Record, per node, the longest prefix and suffix it shares with any sibling, i.e.
/// nodes branching off the same node or joining into the same node.
fn set_identical_prefix_and_suffix(nodes: &mut NodeArena) {
    let prefix = max_shared_len(nodes, Outgoing, common_prefix_len);
    let suffix = max_shared_len(nodes, Incoming, common_suffix_len);

    for (id, len) in prefix {
        nodes[id].identical_prefix_len = len;
    }
    for (id, len) in suffix {
        nodes[id].identical_suffix_len = len;
    }
}

fn max_shared_len(
    nodes: &NodeArena,
    direction: Direction,
    shared_len: fn(&[u8], &[u8]) -> usize,
) -> HashMap<NodeId, usize> {
    let mut lengths = HashMap::new();
    for id in nodes.node_indices() {
        let siblings = sorted_neighbors(nodes, id, direction);
        for (a, b) in siblings.iter().tuple_combinations() {
            let len = shared_len(nodes[*a].sequence(), nodes[*b].sequence());
            for sibling in &[*a, *b] {
                let known = lengths.entry(*sibling).or_insert(0);
                *known = (*known).max(len);
            }
        }
    }
    lengths
}
