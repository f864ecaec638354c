// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Adjudication of read support for candidate variant alleles.
//!
//! A cluster of nearby candidate variants is turned into a small local sequence graph
//! (reference backbone plus one branch per alternate allele). Every read is aligned
//! against that graph, the traceback is scored per node, and the winning alignment of
//! each read increments the counters of the alleles it clearly supports.

#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate typed_builder;

pub mod adjudication;
pub mod aligner;
pub mod config;
pub mod errors;
pub mod graph;
pub mod reads;
pub mod reference;
pub mod region;
pub mod samples;
pub mod utils;
pub mod variants;

pub use crate::adjudication::manager::MappingManager;
pub use crate::adjudication::mapping::Mapping;
pub use crate::adjudication::scorer::TracebackScorer;
pub use crate::adjudication::{Adjudicator, RegionProcessor};
pub use crate::aligner::{smith_waterman::SmithWaterman, GraphAligner};
pub use crate::config::{Config, ScoringParams};
pub use crate::errors::Error;
pub use crate::graph::{builder::GraphBuilder, AlleleType, Graph, Node, NodeId};
pub use crate::region::{Based, Region};
pub use crate::variants::{allele::Allele, Variant};
