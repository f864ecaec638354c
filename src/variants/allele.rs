// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::reads::Strand;

/// Per-strand read support of one allele in one sample.
#[derive(Debug, Default)]
pub struct StrandCounts {
    forward: AtomicU32,
    reverse: AtomicU32,
}

impl StrandCounts {
    fn counter(&self, strand: Strand) -> &AtomicU32 {
        match strand {
            Strand::Forward => &self.forward,
            Strand::Reverse => &self.reverse,
        }
    }

    pub fn get(&self, strand: Strand) -> u32 {
        self.counter(strand).load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u32 {
        self.get(Strand::Forward) + self.get(Strand::Reverse)
    }
}

/// An allele sequence together with the number of adjudicated reads supporting it,
/// per sample and strand.
///
/// Counters can be incremented concurrently through a shared reference.
pub struct Allele {
    sequence: Vec<u8>,
    counts: RwLock<HashMap<String, StrandCounts>>,
}

impl Allele {
    pub fn new(sequence: impl Into<Vec<u8>>) -> Self {
        Allele {
            sequence: sequence.into().to_ascii_uppercase(),
            counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    // Counters are plain atomics, so a panic while holding the lock cannot leave
    // them half-updated and a poisoned lock is safe to reuse.
    fn read_counts(&self) -> RwLockReadGuard<HashMap<String, StrandCounts>> {
        self.counts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_counts(&self) -> RwLockWriteGuard<HashMap<String, StrandCounts>> {
        self.counts.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one supporting read of `sample` on `strand`.
    pub fn increment(&self, sample: &str, strand: Strand) {
        {
            let counts = self.read_counts();
            if let Some(sample_counts) = counts.get(sample) {
                sample_counts.counter(strand).fetch_add(1, Ordering::SeqCst);
                return;
            }
        }
        self.write_counts()
            .entry(sample.to_owned())
            .or_insert_with(StrandCounts::default)
            .counter(strand)
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self, sample: &str, strand: Strand) -> u32 {
        self.read_counts()
            .get(sample)
            .map_or(0, |counts| counts.get(strand))
    }

    /// Supporting reads of `sample` on both strands.
    pub fn sample_count(&self, sample: &str) -> u32 {
        self.read_counts()
            .get(sample)
            .map_or(0, |counts| counts.total())
    }

    /// Supporting reads over all samples and strands.
    pub fn total_count(&self) -> u32 {
        self.read_counts().values().map(|counts| counts.total()).sum()
    }

    pub fn reset_counts(&self) {
        self.write_counts().clear();
    }
}

impl fmt::Debug for Allele {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Allele")
            .field("sequence", &String::from_utf8_lossy(&self.sequence))
            .field("total_count", &self.total_count())
            .finish()
    }
}
