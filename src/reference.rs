// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, Context, Result};
use bio::io::fasta;
use bio_types::genome::AbstractInterval;
use lru_time_cache::LruCache;

use crate::errors::Error;
use crate::region::{Based, Region};

/// Source of reference sequence for graph construction.
pub trait ReferenceProvider: Send + Sync {
    /// Bases covered by `region`, exactly `region.len()` of them.
    fn sequence(&self, region: &Region) -> Result<Vec<u8>>;

    /// First valid position of the given sequence.
    fn first_position(&self, reference_id: &str) -> Result<u64>;

    /// Last valid (inclusive) position of the given sequence.
    fn last_position(&self, reference_id: &str) -> Result<u64>;

    /// Coordinate convention of the positions handed out by this provider.
    fn based(&self) -> Based;
}

fn unavailable(region: &Region) -> Error {
    Error::ReferenceIntervalUnavailable {
        region: region.to_string(),
    }
}

/// Slice `region` out of `sequence`, which starts at 0-based contig offset `seq_start`.
fn slice_region(sequence: &[u8], seq_start: u64, region: &Region) -> Result<Vec<u8>> {
    let range = region.range();
    if range.start < seq_start {
        return Err(unavailable(region).into());
    }
    let start = (range.start - seq_start) as usize;
    let end = (range.end - seq_start) as usize;
    if end > sequence.len() {
        return Err(unavailable(region).into());
    }
    Ok(sequence[start..end].to_ascii_uppercase())
}

/// A reference held in memory for a single region, e.g. a locus that was fetched
/// upstream or a synthetic sequence.
#[derive(Debug, Clone, Getters)]
pub struct InMemoryReference {
    #[getset(get = "pub")]
    region: Region,
    bases: Vec<u8>,
}

impl InMemoryReference {
    pub fn new(region: Region, sequence: impl Into<Vec<u8>>) -> Result<Self> {
        let sequence = sequence.into();
        if sequence.len() as u64 != region.len() {
            return Err(anyhow!(
                "reference sequence of length {} does not match region {} of length {}",
                sequence.len(),
                region,
                region.len()
            ));
        }
        Ok(InMemoryReference {
            region,
            bases: sequence,
        })
    }

    /// Reference for a whole sequence starting at the first base of the given convention.
    pub fn from_sequence(
        reference_id: &str,
        sequence: impl Into<Vec<u8>>,
        based: Based,
    ) -> Result<Self> {
        let sequence = sequence.into();
        let start = based.offset();
        let region = Region::new(reference_id, start, start + sequence.len() as u64, based)?;
        Self::new(region, sequence)
    }

    fn check_reference(&self, reference_id: &str) -> Result<()> {
        if reference_id != self.region.reference_id() {
            return Err(Error::UnknownReference {
                reference_id: reference_id.to_owned(),
            }
            .into());
        }
        Ok(())
    }
}

impl ReferenceProvider for InMemoryReference {
    fn sequence(&self, region: &Region) -> Result<Vec<u8>> {
        self.check_reference(region.reference_id())?;
        slice_region(&self.bases, self.region.range().start, region)
    }

    fn first_position(&self, reference_id: &str) -> Result<u64> {
        self.check_reference(reference_id)?;
        Ok(self.region.start())
    }

    fn last_position(&self, reference_id: &str) -> Result<u64> {
        self.check_reference(reference_id)?;
        if self.region.is_empty() {
            return Err(unavailable(&self.region).into());
        }
        Ok(self.region.end() - 1)
    }

    fn based(&self) -> Based {
        self.region.based()
    }
}

/// A lazy buffer for reference sequences read from an indexed FASTA file.
pub struct Buffer {
    reader: RwLock<fasta::IndexedReader<fs::File>>,
    sequences: Mutex<LruCache<String, Arc<Vec<u8>>>>,
    reference_path: Option<PathBuf>,
    based: Based,
}

impl Buffer {
    pub fn from_path<P: AsRef<Path> + std::fmt::Debug>(
        path: P,
        capacity: usize,
        based: Based,
    ) -> Result<Self> {
        let fasta: fasta::IndexedReader<fs::File> = fasta::IndexedReader::from_file(&path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("unable to open indexed FASTA file {:?}", path))?;
        Ok(Buffer {
            reader: RwLock::new(fasta),
            sequences: Mutex::new(LruCache::with_capacity(capacity)),
            reference_path: Some(path.as_ref().to_path_buf()),
            based,
        })
    }

    pub fn reference_path(&self) -> Option<&PathBuf> {
        self.reference_path.as_ref()
    }

    pub fn sequences(&self) -> Vec<fasta::Sequence> {
        match self.reader.read() {
            Ok(reader) => reader.index.sequences(),
            Err(poisoned) => poisoned.into_inner().index.sequences(),
        }
    }

    /// Load given chromosome and return it. This is O(1) if chromosome was loaded before.
    pub fn seq(&self, chrom: &str) -> Result<Arc<Vec<u8>>> {
        let mut sequences = self
            .sequences
            .lock()
            .map_err(|_| anyhow!("reference cache lock poisoned"))?;

        if let Some(sequence) = sequences.get(chrom) {
            return Ok(Arc::clone(sequence));
        }

        let mut sequence = Vec::new();
        {
            let mut reader = self
                .reader
                .write()
                .map_err(|_| anyhow!("reference reader lock poisoned"))?;
            reader
                .fetch_all(chrom)
                .with_context(|| format!("unable to fetch {} from reference", chrom))?;
            reader.read(&mut sequence)?;
        }
        let sequence = Arc::new(sequence);
        sequences.insert(chrom.to_owned(), Arc::clone(&sequence));
        Ok(sequence)
    }

    fn len(&self, reference_id: &str) -> Result<u64> {
        self.sequences()
            .into_iter()
            .find(|sequence| sequence.name == reference_id)
            .map(|sequence| sequence.len)
            .ok_or_else(|| {
                Error::UnknownReference {
                    reference_id: reference_id.to_owned(),
                }
                .into()
            })
    }
}

impl ReferenceProvider for Buffer {
    fn sequence(&self, region: &Region) -> Result<Vec<u8>> {
        let seq = self.seq(region.contig())?;
        slice_region(&seq, 0, region)
    }

    fn first_position(&self, reference_id: &str) -> Result<u64> {
        self.len(reference_id)?;
        Ok(self.based.offset())
    }

    fn last_position(&self, reference_id: &str) -> Result<u64> {
        let len = self.len(reference_id)?;
        if len == 0 {
            return Err(Error::UnknownReference {
                reference_id: reference_id.to_owned(),
            }
            .into());
        }
        Ok(len - 1 + self.based.offset())
    }

    fn based(&self) -> Based {
        self.based
    }
}
