// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;

pub mod manager;
pub mod mapping;
pub mod scorer;

use crate::adjudication::manager::{EvaluationSummary, MappingManager};
use crate::adjudication::mapping::Mapping;
use crate::adjudication::scorer::TracebackScorer;
use crate::aligner::smith_waterman::SmithWaterman;
use crate::aligner::GraphAligner;
use crate::config::Config;
use crate::graph::builder::GraphBuilder;
use crate::graph::Graph;
use crate::reads::{AlignedRead, ReadSource};
use crate::reference::ReferenceProvider;
use crate::region::Region;
use crate::samples::SampleRegistry;
use crate::variants::cluster::cluster_variants;
use crate::variants::VariantList;

/// A read that could not be mapped, together with the reason.
#[derive(Debug)]
pub struct ReadFailure {
    pub read: String,
    pub error: anyhow::Error,
}

/// Aligns reads against a graph and registers the resulting mappings.
#[derive(TypedBuilder)]
pub struct Adjudicator {
    scorer: Arc<TracebackScorer>,
    samples: Arc<SampleRegistry>,
}

impl Adjudicator {
    /// Map all given reads against `graph`. Reads whose read group belongs to no
    /// registered sample are skipped and reported back.
    pub fn map_reads(
        &self,
        graph: &Arc<Graph>,
        reads: &[Arc<dyn AlignedRead>],
        manager: &MappingManager,
    ) -> Result<Vec<ReadFailure>> {
        let mut aligner =
            GraphAligner::new(Arc::clone(graph), SmithWaterman::new(), self.scorer.scoring())?;
        let mut failures = Vec::new();

        for read in reads {
            let sample = match self.samples.sample_for(read.read_group()) {
                Ok(sample) => sample,
                Err(error) => {
                    debug!("skipping read {}: {}", read.name(), error);
                    failures.push(ReadFailure {
                        read: read.name().to_owned(),
                        error,
                    });
                    continue;
                }
            };
            let traceback = aligner.align(read.sequence())?;
            manager.register(Mapping::new(
                Arc::clone(read),
                sample,
                Arc::clone(graph),
                traceback,
                &self.scorer,
            ));
        }

        Ok(failures)
    }
}

/// Outcome of processing one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct ProcessingSummary {
    clusters_built: usize,
    /// Clusters skipped because no graph could be built for them.
    clusters_failed: usize,
    reads_mapped: usize,
    reads_failed: usize,
    evaluation: EvaluationSummary,
}

/// Adjudicates all variants of a region: clusters them, builds one graph per cluster,
/// maps the overlapping reads and evaluates the mappings.
#[derive(TypedBuilder)]
pub struct RegionProcessor<'a> {
    config: Config,
    reference: &'a dyn ReferenceProvider,
    reads: &'a dyn ReadSource,
    samples: Arc<SampleRegistry>,
}

impl<'a> RegionProcessor<'a> {
    pub fn process(&self, region: &Region, variants: &VariantList) -> Result<ProcessingSummary> {
        self.config.validate()?;
        let manager = MappingManager::new(self.config.threads())?;
        let scorer = Arc::new(self.config.scorer());
        let adjudicator = Adjudicator::builder()
            .scorer(Arc::clone(&scorer))
            .samples(Arc::clone(&self.samples))
            .build();
        let builder = GraphBuilder::new(
            self.reference,
            self.config.flank(),
            self.config.score_threshold(),
        );
        let mut summary = ProcessingSummary::default();

        let clusters = cluster_variants(
            variants.variants_in_region(region),
            self.config.cluster_distance(),
        );
        info!("processing {} variant clusters in {}", clusters.len(), region);

        for cluster in clusters {
            let first = cluster
                .first()
                .map(|variant| variant.to_string())
                .unwrap_or_default();
            let graph = match builder.build(cluster) {
                Ok(graph) => Arc::new(graph),
                Err(e) => {
                    warn!("skipping variant cluster starting at {}: {}", first, e);
                    summary.clusters_failed += 1;
                    continue;
                }
            };
            summary.clusters_built += 1;

            let reads = self.fetch_reads(&graph)?;
            let failures = adjudicator.map_reads(&graph, &reads, &manager)?;
            summary.reads_failed += failures.len();
            summary.reads_mapped += reads.len() - failures.len();
        }

        manager.evaluate(scorer)?;
        manager.join()?;
        summary.evaluation = manager.summary();
        debug!("{}: {:?}", region, summary);

        Ok(summary)
    }

    fn fetch_reads(&self, graph: &Graph) -> Result<Vec<Arc<dyn AlignedRead>>> {
        let mut seen = HashSet::new();
        let mut reads = Vec::new();
        for region in graph.regions() {
            for read in self.reads.reads(region)? {
                if seen.insert((read.read_group().to_owned(), read.key())) {
                    reads.push(read);
                }
            }
        }
        Ok(reads)
    }
}
