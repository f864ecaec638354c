// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use anyhow::Result;
use bio_types::genome::AbstractInterval;
use regex::Regex;
use strum_macros::{Display, EnumString};

use crate::errors::Error;

lazy_static! {
    static ref REGION_SPEC: Regex =
        Regex::new(r"^(?P<chrom>[^:\s]+):(?P<start>[0-9,]+)-(?P<end>[0-9,]+)$").unwrap();
}

/// Offset of the first base of a reference sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Based {
    #[strum(serialize = "0")]
    Zero,
    #[strum(serialize = "1")]
    One,
}

impl Based {
    pub fn offset(self) -> u64 {
        match self {
            Based::Zero => 0,
            Based::One => 1,
        }
    }
}

impl Default for Based {
    fn default() -> Self {
        Based::One
    }
}

/// A genomic interval `[start, end)` given in the coordinates of its `Based` convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct Region {
    #[getset(get = "pub")]
    reference_id: String,
    #[getset(get_copy = "pub")]
    start: u64,
    #[getset(get_copy = "pub")]
    end: u64,
    #[getset(get_copy = "pub")]
    based: Based,
}

impl Region {
    pub fn new(reference_id: &str, start: u64, end: u64, based: Based) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRegion {
                reference_id: reference_id.to_owned(),
                start,
                end,
            }
            .into());
        }
        Ok(Region {
            reference_id: reference_id.to_owned(),
            start,
            end,
            based,
        })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `position` (in this region's convention) lies within the region.
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.end
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        if self.reference_id != other.reference_id {
            return false;
        }
        let (a, b) = (self.range(), other.range());
        a.start < b.end && b.start < a.end
    }
}

impl AbstractInterval for Region {
    fn contig(&self) -> &str {
        &self.reference_id
    }

    /// 0-based half-open range on the contig.
    fn range(&self) -> Range<u64> {
        let offset = self.based.offset();
        self.start.saturating_sub(offset)..self.end.saturating_sub(offset)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // printed in samtools convention
        let range = self.range();
        write!(f, "{}:{}-{}", self.reference_id, range.start + 1, range.end)
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    /// Parse `CHROM:START-END` with 1-based inclusive coordinates.
    fn from_str(spec: &str) -> Result<Self> {
        let invalid = || Error::InvalidRegionSpec {
            spec: spec.to_owned(),
        };
        let caps = REGION_SPEC.captures(spec.trim()).ok_or_else(invalid)?;
        let parse = |name: &str| -> Result<u64> {
            Ok(caps[name].replace(',', "").parse::<u64>().map_err(|_| invalid())?)
        };
        let start = parse("start")?;
        let end = parse("end")?;
        if start == 0 {
            return Err(invalid().into());
        }
        Region::new(&caps["chrom"], start, end + 1, Based::One)
    }
}
