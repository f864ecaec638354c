// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::errors::invalid_variant;

pub mod allele;
pub mod cluster;
pub mod variant_list;

pub use allele::Allele;
pub use variant_list::{VariantList, VariantSource};

/// A candidate variant: a reference allele at `position` and one or more alternatives
/// replacing it.
#[derive(Debug, Getters, CopyGetters)]
pub struct Variant {
    #[getset(get = "pub")]
    chromosome: String,
    /// First base of the reference allele, in the reference provider's coordinates.
    #[getset(get_copy = "pub")]
    position: u64,
    #[getset(get = "pub")]
    ref_allele: Arc<Allele>,
    #[getset(get = "pub")]
    alt_alleles: Vec<Arc<Allele>>,
}

impl Variant {
    pub fn new(
        chromosome: &str,
        position: u64,
        ref_allele: &[u8],
        alt_alleles: &[&[u8]],
    ) -> Result<Self> {
        if ref_allele.is_empty() {
            return Err(invalid_variant(chromosome, position, "empty reference allele").into());
        }
        if alt_alleles.is_empty() {
            return Err(
                invalid_variant(chromosome, position, "no alternative allele given").into(),
            );
        }
        if alt_alleles.iter().any(|alt| alt.is_empty()) {
            return Err(invalid_variant(chromosome, position, "empty alternative allele").into());
        }

        Ok(Variant {
            chromosome: chromosome.to_owned(),
            position,
            ref_allele: Arc::new(Allele::new(ref_allele)),
            alt_alleles: alt_alleles
                .iter()
                .map(|alt| Arc::new(Allele::new(*alt)))
                .collect(),
        })
    }

    /// Position right after the reference allele.
    pub fn end(&self) -> u64 {
        self.position + self.ref_allele.len() as u64
    }

    /// Reference allele followed by all alternative alleles.
    pub fn alleles(&self) -> impl Iterator<Item = &Arc<Allele>> {
        std::iter::once(&self.ref_allele).chain(self.alt_alleles.iter())
    }

    pub fn reset_counts(&self) {
        for allele in self.alleles() {
            allele.reset_counts();
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let alts: Vec<_> = self
            .alt_alleles
            .iter()
            .map(|alt| String::from_utf8_lossy(alt.sequence()))
            .collect();
        write!(
            f,
            "{}:{} {}>{}",
            self.chromosome,
            self.position,
            String::from_utf8_lossy(self.ref_allele.sequence()),
            alts.join(",")
        )
    }
}
