// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::errors::Error;

/// A sequenced sample, identified by the read group its reads are tagged with.
#[derive(new, Debug, Clone, PartialEq, Eq, Hash, Getters)]
#[getset(get = "pub")]
pub struct Sample {
    name: String,
    read_group: String,
    /// Alignment file the sample's reads originate from, if any.
    source: Option<PathBuf>,
}

/// Resolves read group tags to samples.
#[derive(Default, Debug, Clone)]
pub struct SampleRegistry {
    samples: HashMap<String, Arc<Sample>>,
}

impl SampleRegistry {
    pub fn new() -> Self {
        SampleRegistry::default()
    }

    /// Register a sample under its read group. A sample previously registered under
    /// the same read group is replaced and returned.
    pub fn register(&mut self, sample: Sample) -> Option<Arc<Sample>> {
        self.samples
            .insert(sample.read_group().to_owned(), Arc::new(sample))
    }

    pub fn sample_for(&self, read_group: &str) -> Result<Arc<Sample>> {
        self.samples
            .get(read_group)
            .map(Arc::clone)
            .ok_or_else(|| {
                Error::UnregisteredSample {
                    read_group: read_group.to_owned(),
                }
                .into()
            })
    }

    /// Registered samples, ordered by name.
    pub fn samples(&self) -> Vec<Arc<Sample>> {
        let mut samples: Vec<_> = self.samples.values().cloned().collect();
        samples.sort_by(|a, b| a.name().cmp(b.name()));
        samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
