use std::sync::{Arc, Once};

use anyhow::Result;

use vargraph::adjudication::ProcessingSummary;
use vargraph::reads::{AlignedRead, InMemoryReads, ReadRecord, Strand};
use vargraph::reference::InMemoryReference;
use vargraph::samples::{Sample, SampleRegistry};
use vargraph::variants::VariantList;
use vargraph::{Based, Config, Region, RegionProcessor, Variant};

pub(crate) const REFERENCE: &[u8] = b"ATACGTTTACGCTTACGT";
pub(crate) const SAMPLE: &str = "tumor";
pub(crate) const READ_GROUP: &str = "rg1";

static INIT: Once = Once::new();

pub(crate) fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub(crate) fn reference() -> InMemoryReference {
    InMemoryReference::from_sequence("1", REFERENCE, Based::Zero).unwrap()
}

pub(crate) fn variant(pos: u64, ref_allele: &[u8], alts: &[&[u8]]) -> Arc<Variant> {
    Arc::new(Variant::new("1", pos, ref_allele, alts).unwrap())
}

pub(crate) fn read(name: &str, seq: &[u8], strand: Strand, read_group: &str) -> Arc<dyn AlignedRead> {
    read_at(name, 0, seq, strand, read_group)
}

pub(crate) fn read_at(
    name: &str,
    pos: u64,
    seq: &[u8],
    strand: Strand,
    read_group: &str,
) -> Arc<dyn AlignedRead> {
    Arc::new(ReadRecord::new(
        name.to_owned(),
        seq.to_vec(),
        "1".to_owned(),
        pos,
        strand,
        read_group.to_owned(),
    ))
}

pub(crate) fn samples() -> Arc<SampleRegistry> {
    let mut samples = SampleRegistry::new();
    samples.register(Sample::new(SAMPLE.to_owned(), READ_GROUP.to_owned(), None));
    Arc::new(samples)
}

/// Adjudicate `reads` against the given variants over the whole test reference.
pub(crate) fn process(
    config: Config,
    variants: &[Arc<Variant>],
    reads: Vec<Arc<dyn AlignedRead>>,
) -> Result<ProcessingSummary> {
    init_logger();
    let reference = reference();
    let mut read_source = InMemoryReads::new();
    for read in reads {
        read_source.push(read);
    }
    let mut variant_list = VariantList::from(variants.to_vec());
    variant_list.sort();

    let processor = RegionProcessor::builder()
        .config(config)
        .reference(&reference)
        .reads(&read_source)
        .samples(samples())
        .build();
    processor.process(
        &Region::new("1", 0, REFERENCE.len() as u64, Based::Zero)?,
        &variant_list,
    )
}
