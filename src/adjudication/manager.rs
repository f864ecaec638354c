// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use crate::adjudication::mapping::Mapping;
use crate::adjudication::scorer::TracebackScorer;
use crate::reads::ReadKey;
use crate::utils::ThreadPool;

/// Counts of evaluated reads and mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct EvaluationSummary {
    /// Reads evaluated.
    reads: usize,
    /// Mappings evaluated, over all reads.
    mappings: usize,
    /// Reads whose best mapping incremented at least one allele.
    attributed: usize,
    /// Reads whose best mapping supported no allele.
    no_calls: usize,
    /// Mappings that lost against a better mapping of the same read.
    discarded: usize,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    mappings: AtomicUsize,
    attributed: AtomicUsize,
    no_calls: AtomicUsize,
    discarded: AtomicUsize,
}

impl Counters {
    fn add(counter: &AtomicUsize, value: usize) {
        counter.fetch_add(value, Ordering::SeqCst);
    }

    fn summary(&self) -> EvaluationSummary {
        EvaluationSummary {
            reads: self.reads.load(Ordering::SeqCst),
            mappings: self.mappings.load(Ordering::SeqCst),
            attributed: self.attributed.load(Ordering::SeqCst),
            no_calls: self.no_calls.load(Ordering::SeqCst),
            discarded: self.discarded.load(Ordering::SeqCst),
        }
    }
}

/// Collects the mappings of reads against graphs and evaluates them concurrently.
///
/// Each read is adjudicated once: among all mappings registered for it, only the one
/// with the highest score (the first registered one on ties) increments allele counts.
pub struct MappingManager {
    pool: ThreadPool,
    mappings: Mutex<Vec<Mapping>>,
    counters: Arc<Counters>,
}

impl MappingManager {
    pub fn new(threads: usize) -> Result<Self> {
        Ok(MappingManager {
            pool: ThreadPool::new(threads)?,
            mappings: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
        })
    }

    fn mappings(&self) -> MutexGuard<Vec<Mapping>> {
        self.mappings.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, mapping: Mapping) {
        self.mappings().push(mapping);
    }

    /// Number of mappings waiting for evaluation.
    pub fn registered(&self) -> usize {
        self.mappings().len()
    }

    /// Discard all registered mappings without evaluating them.
    pub fn clear(&self) {
        self.mappings().clear();
    }

    /// Hand all registered mappings to the workers, one job per read. Use `join` to
    /// wait for completion.
    pub fn evaluate(&self, scorer: Arc<TracebackScorer>) -> Result<()> {
        let mappings: Vec<Mapping> = self.mappings().drain(..).collect();

        let mut read_idx: HashMap<(String, ReadKey), usize> = HashMap::new();
        let mut reads: Vec<Vec<Mapping>> = Vec::new();
        for mapping in mappings {
            let key = (mapping.sample().name().to_owned(), mapping.read().key());
            let idx = *read_idx.entry(key).or_insert_with(|| {
                reads.push(Vec::new());
                reads.len() - 1
            });
            reads[idx].push(mapping);
        }
        debug!("evaluating mappings of {} reads", reads.len());

        for read_mappings in reads {
            let scorer = Arc::clone(&scorer);
            let counters = Arc::clone(&self.counters);
            self.pool.submit(move || {
                evaluate_read(&read_mappings, &scorer, &counters);
                Ok(())
            })?;
        }

        Ok(())
    }

    /// Wait for all evaluation jobs and report the first failure.
    pub fn join(&self) -> Result<()> {
        self.pool.join()
    }

    pub fn summary(&self) -> EvaluationSummary {
        self.counters.summary()
    }

    pub fn threads(&self) -> usize {
        self.pool.threads()
    }
}

fn evaluate_read(mappings: &[Mapping], scorer: &TracebackScorer, counters: &Counters) {
    let mut best: Option<&Mapping> = None;
    for mapping in mappings {
        if best.map_or(true, |best| mapping.mapping_score() > best.mapping_score()) {
            best = Some(mapping);
        }
    }

    Counters::add(&counters.reads, 1);
    Counters::add(&counters.mappings, mappings.len());
    if let Some(best) = best {
        Counters::add(&counters.discarded, mappings.len() - 1);
        let attribution = best.attribution(scorer);
        if attribution.alleles().is_empty() {
            Counters::add(&counters.no_calls, 1);
        } else {
            attribution.apply(best.sample().name(), best.read().strand());
            Counters::add(&counters.attributed, 1);
        }
    }
}
