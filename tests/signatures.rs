//! Signature discovery scenarios driven through the library: sources built
//! from FASTA files, trie passes run explicitly, results checked against the
//! database by brute force.

mod common;

use std::collections::BTreeSet;

use seq::{Source, Tree};
use sigtrie::Trie;

const THREADS: usize = 3;

/// A 20-mer present in A and B but absent from C.
const SHARED: &str = "ACGTTGCAACGGTCATGCCA";

fn clade_source(dir: &std::path::Path) -> Source {
    let a = format!("GGATCCTAGCTAGGCTTACA{SHARED}TTGACCGGATAGCATCAGGA");
    let b = format!("CCTAGGATTCGAGGCAATGC{SHARED}AAGTCGATTACGGCTTCGAA");
    let c = "TGCAGGTACCGATCGATTGCGTTCAAGCGGATCTCTGCATCCATGGAACTTAGCCAGTCA";

    let path = common::write_fasta(dir, "clade.fasta", &[("A", &a), ("B", &b), ("C", c)]);
    let mut source = Source::new(20, 20, 0, 0, false);
    aodp_io::fasta::parse(&path, &mut source).unwrap();
    source
}

#[test]
fn occurrence_sets_reflect_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let source = clade_source(dir.path());

    let mut trie = Trie::new(20, 20, false);
    trie.build_slices(&source);
    trie.cover(&source, THREADS);

    // the shared 20-mer starts at position 20 of sequence A
    assert_eq!(source.printable(20, 20), SHARED);
    assert_eq!(trie.occurrences_of(&source, 20, 20), Some(BTreeSet::from([0, 1])));

    // a window inside A's left flank belongs to A alone
    assert_eq!(trie.occurrences_of(&source, 0, 20), Some(BTreeSet::from([0])));

    // the trie metrics see every recorded occurrence and every slice
    let m = trie.measure();
    assert!(m.nodes > 0 && m.occurrences > 0);
    assert_eq!(m.prefix_distribution.len(), trie.slice_count());
    let histogram_total: usize =
        m.occurrence_distribution.iter().map(|(size, count)| size * count).sum();
    assert_eq!(histogram_total, m.occurrences);
    assert_eq!(m.prefix_distribution.values().sum::<usize>(), m.nodes);
}

#[test]
fn clade_signatures_land_in_the_group_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = clade_source(dir.path());

    // ((A,B),C)
    let tree = Tree::internal(
        vec![
            Tree::internal(vec![Tree::leaf("A", ""), Tree::leaf("B", "")], "", ""),
            Tree::leaf("C", ""),
        ],
        "",
        "",
    );
    source.apply_tree(tree);

    let mut trie = Trie::new(20, 20, false);
    trie.build_slices(&source);
    trie.cover(&source, THREADS);
    trie.touch(&source, THREADS);
    trie.encode_clusters(&mut source);
    trie.collect_clusters(&source, THREADS);
    trie.collect_matches(THREADS);
    trie.sort_matches(THREADS);

    let ab = source.clusters.id_of(&BTreeSet::from([0, 1])).expect("cluster {A,B}");
    let a = source.clusters.id_of(&BTreeSet::from([0])).expect("cluster {A}");

    // the clade target of the phylogeny owns the {A,B} cluster
    assert_eq!(source.targets.name_of(&BTreeSet::from([0, 1])), Some("Node2"));

    let oligos = |cluster| -> Vec<String> {
        trie.matches
            .get(&cluster)
            .map(|sigs| {
                sigs.iter()
                    .map(|s| source.printable(s.start(), u32::from(s.depth) + u32::from(s.length)))
                    .collect()
            })
            .unwrap_or_default()
    };

    // the shared 20-mer discriminates {A,B} and must not show up as an
    // A-only signature
    assert!(oligos(ab).contains(&SHARED.to_string()));
    assert!(!oligos(a).contains(&SHARED.to_string()));

    // every reported signature occurs in every member of its cluster and in
    // no sequence outside it
    for (&cluster, sigs) in &trie.matches {
        let members = source.clusters.sequences_of(cluster);
        for sig in sigs {
            let d = u32::from(sig.depth);
            for x in 1..=u32::from(sig.length) {
                if d + x < 20 {
                    continue;
                }
                let oligo = source.printable(sig.start(), d + x);
                for seq in source.sequences() {
                    assert_eq!(
                        common::occurs_in(&source, seq, &oligo),
                        members.contains(&seq),
                        "{oligo} vs sequence {seq} of cluster {cluster}"
                    );
                }
            }
        }
    }
}

#[test]
fn homopolymer_filter_prunes_long_runs() {
    let dir = tempfile::tempdir().unwrap();
    // B carries a run of five A's in the middle of otherwise distinct text
    let a = "GGATCCTAGCTAGGCTTACATTGACCGGATAGCATCAGGA";
    let b = "CCTAGGATTCGAGGCAAAAAGCGTCGATTACGGCTTCGAA";
    let path = common::write_fasta(dir.path(), "homolo.fasta", &[("A", a), ("B", b)]);

    let mut source = Source::new(12, 20, 0, 0, false);
    aodp_io::fasta::parse(&path, &mut source).unwrap();

    let mut trie = Trie::new(12, 20, false);
    trie.build_slices(&source);
    trie.cover(&source, THREADS);
    trie.filter_homolo(&source, THREADS, 3);
    trie.touch(&source, THREADS);
    trie.encode_clusters(&mut source);
    trie.collect_clusters(&source, THREADS);
    trie.collect_matches(THREADS);
    trie.sort_matches(THREADS);

    let mut reported = 0;
    for sigs in trie.matches.values() {
        for sig in sigs {
            let d = u32::from(sig.depth);
            for x in 1..=u32::from(sig.length) {
                if d + x < 12 {
                    continue;
                }
                let oligo = source.printable(sig.start(), d + x);
                let nu = seq::symbol::from_ascii_str(&oligo).unwrap();
                assert!(
                    seq::symbol::max_homopolymer(&nu) <= 3,
                    "surviving signature with a long run: {oligo}"
                );
                reported += 1;
            }
        }
    }
    assert!(reported > 0, "the filter must not erase everything");
}

#[test]
fn snp_collapsing_removes_single_difference_signatures() {
    let dir = tempfile::tempdir().unwrap();
    let mut gen = common::NucGen::new(0x00c0ffee);
    let a = gen.sequence(60);
    let b = common::mutate(&a, 30);
    let path = common::write_fasta(dir.path(), "snp.fasta", &[("A", &a), ("B", &b)]);

    let mut source = Source::new(20, 20, 0, 0, false);
    aodp_io::fasta::parse(&path, &mut source).unwrap();

    let mut trie = Trie::new(20, 20, false);
    trie.build_slices(&source);
    trie.cover(&source, THREADS);
    trie.touch(&source, THREADS);
    trie.small_diff(&source, THREADS);
    trie.encode_clusters(&mut source);

    // the windows around the single difference would discriminate A from B,
    // but they differ in exactly one base, so they are collapsed; only the
    // shared cluster survives
    assert!(source.clusters.id_of(&BTreeSet::from([0])).is_none());
    assert!(source.clusters.id_of(&BTreeSet::from([1])).is_none());
    assert!(source.clusters.id_of(&BTreeSet::from([0, 1])).is_some());
}

#[test]
fn ambiguity_marking_poisons_overlapping_signatures() {
    let dir = tempfile::tempdir().unwrap();
    // B's only difference from A is an N over position 30: every A-window
    // covering that position is marked as matching B too
    let mut gen = common::NucGen::new(0x5eed);
    let a = gen.sequence(60);
    let mut b = a.clone().into_bytes();
    b[30] = b'N';
    let b = String::from_utf8(b).unwrap();
    let path = common::write_fasta(dir.path(), "ambig.fasta", &[("A", &a), ("B", &b)]);

    let mut source = Source::new(20, 20, 0, 0, false);
    aodp_io::fasta::parse(&path, &mut source).unwrap();

    let mut trie = Trie::new(20, 20, false);
    trie.build_slices(&source);
    trie.cover(&source, THREADS);
    trie.touch(&source, THREADS);
    trie.encode_clusters(&mut source);

    // no A-only cluster survives the marking
    assert!(source.clusters.id_of(&BTreeSet::from([0])).is_none());
    assert!(source.clusters.id_of(&BTreeSet::from([0, 1])).is_some());
}

#[test]
fn reference_confirmation_rejects_foreign_species_matches() {
    let dir = tempfile::tempdir().unwrap();

    // species are encoded in the sequence names: XX_<id>_Genus_<species>
    let w = "GGATCCTAGCTAGGCTTACA"; // A[0..20]
    let w2 = "ACGTTGCAACGGTCATGCCA"; // A[40..60]
    let a = format!("{w}TTGACCGGATAGCATCAGGA{w2}");
    let b = "CCTAGGATTCGAGGCAATGCAAGTCGATTACGGCTTCGAAGTTCAAGCGGATCTCTGCAT";
    let path = common::write_fasta(
        dir.path(),
        "confirm.fasta",
        &[("XX_1_Genus_alpha", &a), ("XX_2_Genus_beta", b)],
    );

    let mut source = Source::new(20, 20, 0, 0, false);
    aodp_io::fasta::parse(&path, &mut source).unwrap();

    let mut trie = Trie::new(20, 20, false);
    trie.build_slices(&source);
    trie.cover(&source, THREADS);
    trie.touch(&source, THREADS);
    trie.encode_clusters(&mut source);
    trie.collect_clusters(&source, THREADS);

    // taxonomy: ref1 is an alpha, ref2 a beta
    source.prepare_taxonomy();
    source.on_taxonomy_entry("ref1", "Genus_alpha").unwrap();
    source.on_taxonomy_entry("ref2", "Genus_beta").unwrap();
    source.finish_taxonomy();

    // ref1 (same species as A) carries A's signature at 40..60; ref2 (a
    // different species) carries A's signature at 0..20
    let ref1 = format!("TGCAGGTACCGATCGATTGC{w2}CCATGGAACTTAGCCAGTCA");
    let ref2 = format!("TGCAGGTACCGATCGATTGC{w}CCATGGAACTTAGCCAGTCA");
    let mut content = seq::symbol::from_ascii_str(&ref1).unwrap();
    content.extend(seq::symbol::from_ascii_str(&ref2).unwrap());
    let refs = [
        (source.reference_id("ref1").unwrap(), seq::Range::new(0u32, 60)),
        (source.reference_id("ref2").unwrap(), seq::Range::new(60u32, 60)),
    ];
    trie.confirm(&source, THREADS, &content, &refs);

    trie.collect_matches(THREADS);
    trie.sort_matches(THREADS);

    let cluster_a = source.clusters.id_of(&BTreeSet::from([0])).expect("cluster {A}");
    let oligos: Vec<String> = trie.matches[&cluster_a]
        .iter()
        .map(|s| source.printable(s.start(), u32::from(s.depth) + u32::from(s.length)))
        .collect();

    // the signature matched by the foreign-species reference is rejected;
    // the one matched by the same-species reference is retained
    assert!(!oligos.contains(&w.to_string()), "{oligos:?}");
    assert!(oligos.contains(&w2.to_string()), "{oligos:?}");
}
