// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use bio_types::genome::AbstractInterval;

use crate::region::Region;
use crate::variants::Variant;

/// A stream of candidate variants, e.g. records of a variant call file.
pub trait VariantSource {
    /// The next variant, or `None` when the source is exhausted.
    fn next_variant(&mut self) -> Option<Arc<Variant>>;
}

/// An in-memory list of variants that can itself be consumed as a source.
#[derive(Debug, Default)]
pub struct VariantList {
    variants: Vec<Arc<Variant>>,
    cursor: usize,
}

impl VariantList {
    pub fn new() -> Self {
        VariantList::default()
    }

    pub fn push(&mut self, variant: Arc<Variant>) {
        self.variants.push(variant);
    }

    pub fn add_all<I: IntoIterator<Item = Arc<Variant>>>(&mut self, variants: I) {
        self.variants.extend(variants);
    }

    /// Drain `source` into this list.
    pub fn add_from(&mut self, source: &mut dyn VariantSource) {
        while let Some(variant) = source.next_variant() {
            self.variants.push(variant);
        }
    }

    /// Sort by chromosome, then position. The order among variants at the same
    /// position is kept.
    pub fn sort(&mut self) {
        self.variants.sort_by(|a, b| {
            a.chromosome()
                .cmp(b.chromosome())
                .then(a.position().cmp(&b.position()))
        });
    }

    /// Restart consumption through `VariantSource::next_variant`.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Variants starting within `region`. The list has to be sorted.
    pub fn variants_in_region(&self, region: &Region) -> &[Arc<Variant>] {
        let start = (region.contig(), region.start());
        let end = (region.contig(), region.end());
        let lower = self.variants.partition_point(|v| key(v) < start);
        let upper = self.variants.partition_point(|v| key(v) < end);
        &self.variants[lower..upper]
    }

    pub fn variants(&self) -> &[Arc<Variant>] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

fn key(variant: &Arc<Variant>) -> (&str, u64) {
    (variant.chromosome().as_str(), variant.position())
}

impl VariantSource for VariantList {
    fn next_variant(&mut self) -> Option<Arc<Variant>> {
        let variant = self.variants.get(self.cursor).cloned();
        if variant.is_some() {
            self.cursor += 1;
        }
        variant
    }
}

impl From<Vec<Arc<Variant>>> for VariantList {
    fn from(variants: Vec<Arc<Variant>>) -> Self {
        VariantList {
            variants,
            cursor: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Based;

    fn variant(chrom: &str, pos: u64) -> Arc<Variant> {
        Arc::new(Variant::new(chrom, pos, b"A", &[b"C"]).unwrap())
    }

    #[test]
    fn test_sort_and_query() {
        let mut variants = VariantList::new();
        variants.add_all(vec![variant("2", 5), variant("1", 30), variant("1", 10)]);
        variants.push(variant("1", 20));
        variants.sort();

        let order: Vec<_> = variants
            .variants()
            .iter()
            .map(|v| (v.chromosome().clone(), v.position()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1".to_owned(), 10),
                ("1".to_owned(), 20),
                ("1".to_owned(), 30),
                ("2".to_owned(), 5)
            ]
        );

        let region = Region::new("1", 10, 30, Based::One).unwrap();
        let hits: Vec<_> = variants
            .variants_in_region(&region)
            .iter()
            .map(|v| v.position())
            .collect();
        assert_eq!(hits, vec![10, 20]);

        let region = Region::new("2", 0, 100, Based::One).unwrap();
        assert_eq!(variants.variants_in_region(&region).len(), 1);
    }

    #[test]
    fn test_add_from_source() {
        let mut source = VariantList::from(vec![variant("1", 1), variant("1", 2)]);
        let mut variants = VariantList::new();
        variants.add_from(&mut source);
        assert_eq!(variants.len(), 2);
        assert!(source.next_variant().is_none());

        source.rewind();
        assert_eq!(source.next_variant().map(|v| v.position()), Some(1));
    }
}
