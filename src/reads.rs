// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::region::Region;

/// SAM flag marking a read as reverse complemented.
const FLAG_REVERSE: u16 = 0x10;

/// Strand a read was sequenced from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum Strand {
    #[strum(serialize = "+")]
    Forward,
    #[strum(serialize = "-")]
    Reverse,
}

impl Strand {
    pub fn from_flags(flags: u16) -> Self {
        if flags & FLAG_REVERSE != 0 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}

/// A read that has been placed on the reference by an upstream aligner.
pub trait AlignedRead: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Read bases as stored in the alignment record.
    fn sequence(&self) -> &[u8];

    fn len(&self) -> usize {
        self.sequence().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reference_id(&self) -> &str;

    /// Leftmost aligned position, in the coordinates of the reference provider.
    fn position(&self) -> u64;

    fn strand(&self) -> Strand;

    /// Read group tag, used to resolve the sample.
    fn read_group(&self) -> &str;

    /// Identity of the alignment record. Mates of a pair share their name but not
    /// their placement.
    fn key(&self) -> ReadKey {
        ReadKey {
            name: self.name().to_owned(),
            reference_id: self.reference_id().to_owned(),
            position: self.position(),
            strand: self.strand(),
        }
    }
}

/// Identifies one alignment record of a read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct ReadKey {
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    reference_id: String,
    #[getset(get_copy = "pub")]
    position: u64,
    #[getset(get_copy = "pub")]
    strand: Strand,
}

/// Plain owned read record.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    name: String,
    sequence: Vec<u8>,
    reference_id: String,
    position: u64,
    strand: Strand,
    read_group: String,
}

impl AlignedRead for ReadRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    fn reference_id(&self) -> &str {
        &self.reference_id
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn strand(&self) -> Strand {
        self.strand
    }

    fn read_group(&self) -> &str {
        &self.read_group
    }
}

/// Supplies the reads overlapping a region.
pub trait ReadSource: Send + Sync {
    fn reads(&self, region: &Region) -> Result<Vec<Arc<dyn AlignedRead>>>;
}

/// Reads held in memory, grouped by reference sequence and sorted by position.
#[derive(Default, Debug)]
pub struct InMemoryReads {
    reads: HashMap<String, Vec<Arc<dyn AlignedRead>>>,
}

impl InMemoryReads {
    pub fn new() -> Self {
        InMemoryReads::default()
    }

    pub fn push(&mut self, read: Arc<dyn AlignedRead>) {
        let reads = self
            .reads
            .entry(read.reference_id().to_owned())
            .or_insert_with(Vec::new);
        let idx = reads.partition_point(|other| other.position() <= read.position());
        reads.insert(idx, read);
    }

    pub fn len(&self) -> usize {
        self.reads.values().map(|reads| reads.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReadSource for InMemoryReads {
    fn reads(&self, region: &Region) -> Result<Vec<Arc<dyn AlignedRead>>> {
        Ok(self
            .reads
            .get(region.reference_id())
            .map(|reads| {
                reads
                    .iter()
                    .take_while(|read| read.position() < region.end())
                    .filter(|read| read.position() + read.len() as u64 > region.start())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
