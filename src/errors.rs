// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

use crate::graph::builder::AnchorKind;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("variant cluster is empty, at least one variant is needed to build a graph")]
    EmptyVariantCluster,
    #[error("variant cluster spans multiple chromosomes ({first} and {other})")]
    MixedChromosomes { first: String, other: String },
    #[error("invalid variant at {chrom}:{pos}: {msg}")]
    InvalidVariant { chrom: String, pos: u64, msg: String },
    #[error("invalid region {reference_id}:{start}-{end}: start must not exceed end")]
    InvalidRegion {
        reference_id: String,
        start: u64,
        end: u64,
    },
    #[error("invalid region {spec}: use CHROM:START-END syntax with 1-based inclusive coordinates")]
    InvalidRegionSpec { spec: String },
    #[error("unknown reference sequence {reference_id}")]
    UnknownReference { reference_id: String },
    #[error("reference interval {region} is not available from the reference provider")]
    ReferenceIntervalUnavailable { region: String },
    #[error("invalid graph: no {kind} anchor node for the variant at {chrom}:{pos}")]
    MissingAnchor {
        kind: AnchorKind,
        chrom: String,
        pos: u64,
    },
    #[error("invalid graph: reference path is broken at position {position}")]
    BrokenReferencePath { position: u64 },
    #[error("read group {read_group} is not registered with any sample")]
    UnregisteredSample { read_group: String },
    #[error("alignment backend received an empty node sequence")]
    EmptyBackendNode,
    #[error("alignment backend edge {from} -> {to} violates topological node order")]
    BackendEdgeOrder { from: usize, to: usize },
    #[error("alignment backend refers to unknown node handle {handle}")]
    UnknownBackendNode { handle: String },
    #[error("traceback requested before the alignment matrices were filled for this query")]
    TracebackWithoutFill,
    #[error("invalid configuration: {msg}")]
    InvalidConfig { msg: String },
    #[error("evaluation task failed: {msg}")]
    TaskFailed { msg: String },
}

pub(crate) fn invalid_variant(chrom: &str, pos: u64, msg: &str) -> Error {
    Error::InvalidVariant {
        chrom: chrom.to_owned(),
        pos,
        msg: msg.to_owned(),
    }
}
