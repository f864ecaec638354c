use std::sync::Arc;

use vargraph::adjudication::Adjudicator;
use vargraph::reads::Strand;
use vargraph::{
    Config, GraphAligner, GraphBuilder, Mapping, MappingManager, SmithWaterman, Variant,
};

mod common;

use common::{process, read, read_at, reference, samples, variant, READ_GROUP, SAMPLE};

fn counts(variant: &Variant) -> (u32, Vec<u32>) {
    (
        variant.ref_allele().sample_count(SAMPLE),
        variant
            .alt_alleles()
            .iter()
            .map(|alt| alt.sample_count(SAMPLE))
            .collect(),
    )
}

macro_rules! adjudication_case {
    ($name:ident, $pos:expr, $ref_allele:expr, [$($alt:expr),+], $read:expr, $suppress:expr, $expected_ref:expr, [$($expected_alt:expr),+]) => {
        #[test]
        fn $name() {
            let var = variant($pos, $ref_allele, &[$($alt),+]);
            let config = Config::default().with_suppress_ambiguous($suppress);
            let summary = process(
                config,
                &[Arc::clone(&var)],
                vec![read("read1", $read, Strand::Forward, READ_GROUP)],
            )
            .unwrap();
            assert_eq!(summary.clusters_built(), 1);
            assert_eq!(summary.evaluation().reads(), 1);
            assert_eq!(counts(&var), ($expected_ref, vec![$($expected_alt),+]));
        }
    };
}

adjudication_case!(
    test_deletion_alt_read,
    6,
    b"TTACG",
    [b"TAG"],
    b"ATACGTTAGCTTACGT",
    true,
    0,
    [1]
);
adjudication_case!(
    test_deletion_ref_read,
    6,
    b"TTACG",
    [b"TAG"],
    b"ATACGTTTACGCTTACGT",
    true,
    1,
    [0]
);
adjudication_case!(
    test_shared_prefix_is_suppressed,
    6,
    b"TTACG",
    [b"TTACT"],
    b"ATACGTTTAC",
    true,
    0,
    [0]
);
adjudication_case!(
    test_shared_prefix_without_suppression,
    6,
    b"TTACG",
    [b"TTACT"],
    b"ATACGTTTAC",
    false,
    0,
    [1]
);
adjudication_case!(
    test_shared_suffix_is_suppressed,
    6,
    b"TTACGCT",
    [b"TGGCGCT"],
    b"CGCTTACGT",
    true,
    0,
    [0]
);
adjudication_case!(
    test_third_base_is_no_call,
    6,
    b"T",
    [b"G"],
    b"ATACGTATACGCTTACGT",
    true,
    0,
    [0]
);

// reads covering whole (W) or partial (P) nodes, or not touching (N) the prefix,
// variant and suffix nodes
adjudication_case!(
    test_ref_read_ending_in_suffix,
    6,
    b"TTACG",
    [b"TAG"],
    b"ATACGTTTACG",
    true,
    1,
    [0]
);
adjudication_case!(
    test_ref_read_starting_in_prefix,
    6,
    b"TTACG",
    [b"TAG"],
    b"TTTACGCTTACGT",
    true,
    1,
    [0]
);
adjudication_case!(
    test_ref_read_partial_flanks,
    6,
    b"TTACG",
    [b"TAG"],
    b"TTTACG",
    true,
    1,
    [0]
);
adjudication_case!(
    test_alt_read_ending_in_suffix,
    6,
    b"TTACG",
    [b"TAG"],
    b"ATACGTTAGC",
    true,
    0,
    [1]
);
adjudication_case!(
    test_alt_read_partial_flanks,
    6,
    b"TTACG",
    [b"TAG"],
    b"TTAGC",
    true,
    0,
    [1]
);
adjudication_case!(
    test_alt_read_starting_in_prefix,
    6,
    b"TTACG",
    [b"TAG"],
    b"TTAGCTTACGT",
    true,
    0,
    [1]
);
adjudication_case!(
    test_alt_read_partial_alt_node,
    6,
    b"TTACG",
    [b"TAG"],
    b"TTA",
    true,
    0,
    [1]
);
adjudication_case!(
    test_read_within_alt_node,
    6,
    b"TTACG",
    [b"AGGGACCTAGGCT"],
    b"AGGGACCTAGGCT",
    true,
    0,
    [1]
);
adjudication_case!(
    test_read_inside_alt_node,
    6,
    b"TTACG",
    [b"AGGGACCTAGGCT"],
    b"GGACCTAGG",
    true,
    0,
    [1]
);
adjudication_case!(
    test_clipped_mismatch_still_attributed,
    6,
    b"TTACG",
    [b"TAG"],
    b"ATACGTTAGCTTACGA",
    true,
    0,
    [1]
);

// anchored indels, whose one-base allele is entirely shared with its sibling
adjudication_case!(
    test_anchored_deletion_alt_read,
    6,
    b"TTACG",
    [b"T"],
    b"ATACGTTCTTACGT",
    true,
    0,
    [1]
);
adjudication_case!(
    test_anchored_deletion_alt_read_without_suppression,
    6,
    b"TTACG",
    [b"T"],
    b"ATACGTTCTTACGT",
    false,
    0,
    [1]
);
adjudication_case!(
    test_anchored_deletion_ref_read,
    6,
    b"TTACG",
    [b"T"],
    b"ATACGTTTACGCTTACGT",
    true,
    1,
    [0]
);
adjudication_case!(
    test_anchored_deletion_read_ending_on_shared_base,
    6,
    b"TTACG",
    [b"T"],
    b"ATACGTT",
    true,
    0,
    [0]
);
adjudication_case!(
    test_anchored_deletion_read_ending_on_shared_base_without_suppression,
    6,
    b"TTACG",
    [b"T"],
    b"ATACGTT",
    false,
    0,
    [1]
);
adjudication_case!(
    test_anchored_insertion_ref_read,
    6,
    b"T",
    [b"TAAA"],
    b"ATACGTTTACGCTTACGT",
    true,
    1,
    [0]
);
adjudication_case!(
    test_anchored_insertion_ref_read_without_suppression,
    6,
    b"T",
    [b"TAAA"],
    b"ATACGTTTACGCTTACGT",
    false,
    1,
    [0]
);
adjudication_case!(
    test_anchored_insertion_alt_read,
    6,
    b"T",
    [b"TAAA"],
    b"ATACGTTAAATACGCTTACGT",
    true,
    0,
    [1]
);

#[test]
fn test_exact_match_score() {
    common::init_logger();
    let reference = reference();
    let graph = Arc::new(
        GraphBuilder::new(&reference, 150, 0)
            .build(vec![variant(6, b"TTACG", &[b"TAG"])])
            .unwrap(),
    );
    let scorer = Config::default().scorer();
    let mut aligner = GraphAligner::new(Arc::clone(&graph), SmithWaterman::new(), scorer.scoring())
        .unwrap();

    for seq in &[&b"ATACGTTTACGCTTACGT"[..], &b"ATACGTTAGCTTACGT"[..]] {
        let traceback = aligner.align(seq).unwrap();
        let mapping = Mapping::new(
            read("read1", seq, Strand::Forward, READ_GROUP),
            samples().sample_for(READ_GROUP).unwrap(),
            Arc::clone(&graph),
            traceback,
            &scorer,
        );
        assert_eq!(mapping.mapping_score(), seq.len() as i32);
    }
}

fn adjudicate_against_two_graphs(tag_first: bool) {
    common::init_logger();
    let reference = reference();
    let tag = variant(6, b"TTACG", &[b"TAG"]);
    let snv = variant(13, b"T", &[b"A"]);
    let builder = GraphBuilder::new(&reference, 150, 0);
    let tag_graph = Arc::new(builder.build(vec![Arc::clone(&tag)]).unwrap());
    let snv_graph = Arc::new(builder.build(vec![Arc::clone(&snv)]).unwrap());
    let graphs = if tag_first {
        vec![tag_graph, snv_graph]
    } else {
        vec![snv_graph, tag_graph]
    };

    let scorer = Arc::new(Config::default().scorer());
    let adjudicator = Adjudicator::builder()
        .scorer(Arc::clone(&scorer))
        .samples(samples())
        .build();
    let manager = MappingManager::new(2).unwrap();
    let reads = vec![read("read1", b"ATACGTTAGCTTACGT", Strand::Reverse, READ_GROUP)];
    for graph in &graphs {
        assert!(adjudicator
            .map_reads(graph, &reads, &manager)
            .unwrap()
            .is_empty());
    }
    manager.evaluate(scorer).unwrap();
    manager.join().unwrap();

    let summary = manager.summary();
    assert_eq!(summary.reads(), 1);
    assert_eq!(summary.mappings(), 2);
    assert_eq!(summary.discarded(), 1);
    assert_eq!(counts(&tag), (0, vec![1]));
    assert_eq!(tag.alt_alleles()[0].count(SAMPLE, Strand::Reverse), 1);
    assert_eq!(counts(&snv), (0, vec![0]));
}

#[test]
fn test_best_graph_wins() {
    adjudicate_against_two_graphs(false);
}

#[test]
fn test_best_graph_wins_regardless_of_order() {
    adjudicate_against_two_graphs(true);
}

#[test]
fn test_clipped_bases_do_not_rank_mappings() {
    common::init_logger();
    let reference = reference();
    let graph = Arc::new(
        GraphBuilder::new(&reference, 150, 0)
            .build(vec![variant(13, b"T", &[b"A"])])
            .unwrap(),
    );
    let scorer = Config::default().scorer();
    let mut aligner = GraphAligner::new(Arc::clone(&graph), SmithWaterman::new(), scorer.scoring())
        .unwrap();
    let seq = b"ATACGTTAGCTTACGT";
    let traceback = aligner.align(seq).unwrap();
    let mapping = Mapping::new(
        read("read1", seq, Strand::Forward, READ_GROUP),
        samples().sample_for(READ_GROUP).unwrap(),
        Arc::clone(&graph),
        traceback,
        &scorer,
    );
    assert!(mapping.mapping_score() < seq.len() as i32);
    assert!(mapping.scored().total_score() >= mapping.mapping_score());
}

#[test]
fn test_mates_are_adjudicated_separately() {
    let var = variant(6, b"TTACG", &[b"TAG"]);
    let summary = process(
        Config::default(),
        &[Arc::clone(&var)],
        vec![
            read_at("pair1", 0, b"ATACGTTAGC", Strand::Forward, READ_GROUP),
            read_at("pair1", 5, b"TTAGCTTACGT", Strand::Reverse, READ_GROUP),
        ],
    )
    .unwrap();
    assert_eq!(summary.reads_mapped(), 2);
    assert_eq!(summary.evaluation().reads(), 2);
    assert_eq!(counts(&var), (0, vec![2]));
    assert_eq!(var.alt_alleles()[0].count(SAMPLE, Strand::Reverse), 1);
}

#[test]
fn test_tie_goes_to_first_mapping() {
    common::init_logger();
    let reference = reference();
    let first = variant(6, b"TTACG", &[b"TAG"]);
    let second = variant(6, b"TTACG", &[b"TAG"]);
    let builder = GraphBuilder::new(&reference, 150, 0);

    let scorer = Arc::new(Config::default().scorer());
    let adjudicator = Adjudicator::builder()
        .scorer(Arc::clone(&scorer))
        .samples(samples())
        .build();
    let manager = MappingManager::new(1).unwrap();
    let reads = vec![read("read1", b"ATACGTTAGCTTACGT", Strand::Forward, READ_GROUP)];
    for var in &[&first, &second] {
        let graph = Arc::new(builder.build(vec![Arc::clone(var)]).unwrap());
        adjudicator.map_reads(&graph, &reads, &manager).unwrap();
    }
    assert_eq!(manager.registered(), 2);
    manager.evaluate(scorer).unwrap();
    manager.join().unwrap();

    assert_eq!(counts(&first), (0, vec![1]));
    assert_eq!(counts(&second), (0, vec![0]));
}

#[test]
fn test_worker_count_does_not_change_counts() {
    let mut results = Vec::new();
    for threads in &[1, 4] {
        let var = variant(6, b"TTACG", &[b"TAG"]);
        let reads = (0..20)
            .map(|i| {
                let (seq, strand) = if i % 2 == 0 {
                    (&b"ATACGTTAGCTTACGT"[..], Strand::Forward)
                } else {
                    (&b"ATACGTTTACGCTTACGT"[..], Strand::Reverse)
                };
                read(&format!("read{}", i), seq, strand, READ_GROUP)
            })
            .collect();
        let summary = process(
            Config::default().with_threads(*threads),
            &[Arc::clone(&var)],
            reads,
        )
        .unwrap();
        assert_eq!(summary.evaluation().attributed(), 20);
        assert_eq!(
            var.alt_alleles()[0].count(SAMPLE, Strand::Forward),
            10
        );
        assert_eq!(var.ref_allele().count(SAMPLE, Strand::Reverse), 10);
        results.push(counts(&var));
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], (10, vec![10]));
}

#[test]
fn test_unregistered_read_group() {
    let var = variant(6, b"TTACG", &[b"TAG"]);
    let summary = process(
        Config::default(),
        &[Arc::clone(&var)],
        vec![
            read("read1", b"ATACGTTAGCTTACGT", Strand::Forward, READ_GROUP),
            read("read2", b"ATACGTTAGCTTACGT", Strand::Forward, "unknown"),
        ],
    )
    .unwrap();
    assert_eq!(summary.reads_mapped(), 1);
    assert_eq!(summary.reads_failed(), 1);
    assert_eq!(counts(&var), (0, vec![1]));
}

#[test]
fn test_region_without_variants() {
    let summary = process(
        Config::default(),
        &[],
        vec![read("read1", b"ATACGTTAGCTTACGT", Strand::Forward, READ_GROUP)],
    )
    .unwrap();
    assert_eq!(summary.clusters_built(), 0);
    assert_eq!(summary.evaluation().reads(), 0);
}

#[test]
fn test_multiallelic_cluster() {
    let first = variant(3, b"C", &[b"T", b"CAA"]);
    let second = variant(13, b"T", &[b"A"]);
    let summary = process(
        Config::default().with_flank(2),
        &[Arc::clone(&first), Arc::clone(&second)],
        vec![read("read1", b"ATACAAGTTTACGCTTACGT", Strand::Forward, READ_GROUP)],
    )
    .unwrap();
    assert_eq!(summary.clusters_built(), 1);
    assert_eq!(counts(&first), (0, vec![0, 1]));
    assert_eq!(counts(&second), (1, vec![0]));
}
