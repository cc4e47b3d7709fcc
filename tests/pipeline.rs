//! End-to-end runs through the command-line surface: parse arguments, run
//! the whole pipeline, inspect the written reports.

mod common;

use std::fs;

use clap::Parser as _;
use parser::Cli;

/// Two 1 kb sequences differing only at positions 100, 500 and 900; a query
/// identical to the first must classify as that sequence at 100 %.
#[test]
fn matcher_classifies_an_exact_copy() {
    let dir = tempfile::tempdir().unwrap();

    let mut gen = common::NucGen::new(0x00decade);
    let a = gen.sequence(1000);
    let b = common::mutate(&common::mutate(&common::mutate(&a, 100), 500), 900);

    let db = common::write_fasta(dir.path(), "db.fasta", &[("A", &a), ("B", &b)]);
    let query = common::write_fasta(dir.path(), "query.fasta", &[("query", &a)]);
    let match_out = dir.path().join("match.out");
    let strings_out = dir.path().join("strings.out");

    let cli = Cli::try_parse_from([
        "aodp-rs".to_string(),
        "--oligo-size=20".to_string(),
        "--max-homolo=0".to_string(),
        "--threads=3".to_string(),
        format!("--match={}", query.display()),
        format!("--match-output={}", match_out.display()),
        format!("--strings={}", strings_out.display()),
        db.display().to_string(),
    ])
    .unwrap();
    cli.validate().unwrap();
    aodp_rs::run(&cli).unwrap();

    let result = fs::read_to_string(&match_out).unwrap();
    assert_eq!(result, "query\tA\t100.0%\t1000\t1000\t1\t2\n");

    // both sequences carry discriminating signatures around the three
    // differing positions
    let strings = fs::read_to_string(&strings_out).unwrap();
    assert!(strings.contains("------------------------\nA\n"), "{strings}");
    assert!(strings.contains("------------------------\nB\n"), "{strings}");
    assert!(
        strings.lines().any(|l| l.len() == 20 && l.bytes().all(|c| b"ACGT".contains(&c))),
        "no oligo lines in the strings report"
    );
}

/// A query that matches nothing still produces a single (negative) result
/// line.
#[test]
fn matcher_reports_short_queries() {
    let dir = tempfile::tempdir().unwrap();

    let mut gen = common::NucGen::new(0x0facade);
    let a = gen.sequence(200);
    let db = common::write_fasta(dir.path(), "db.fasta", &[("A", &a)]);
    // below 2 * max_oligo
    let query = common::write_fasta(dir.path(), "q.fasta", &[("tiny", &gen.sequence(30))]);
    let match_out = dir.path().join("match.out");

    let cli = Cli::try_parse_from([
        "aodp-rs".to_string(),
        "--oligo-size=20".to_string(),
        format!("--match={}", query.display()),
        format!("--match-output={}", match_out.display()),
        db.display().to_string(),
    ])
    .unwrap();
    cli.validate().unwrap();
    aodp_rs::run(&cli).unwrap();

    let result = fs::read_to_string(&match_out).unwrap();
    assert_eq!(result, "tiny\t-\t0.0%\t30\t30\t0\t0\n");
}

/// The tab report carries one identifier-oligo pair per signature length.
#[test]
fn tab_report_identifies_signature_sites() {
    let dir = tempfile::tempdir().unwrap();

    let shared = "ACGTTGCAACGGTCATGCCA";
    let a = format!("GGATCCTAGCTAGGCTTACA{shared}TTGACCGGATAGCATCAGGA");
    let b = format!("CCTAGGATTCGAGGCAATGC{shared}AAGTCGATTACGGCTTCGAA");
    let db = common::write_fasta(dir.path(), "db.fasta", &[("A", &a), ("B", &b)]);
    let tab_out = dir.path().join("tab.out");

    let cli = Cli::try_parse_from([
        "aodp-rs".to_string(),
        "--oligo-size=20".to_string(),
        "--max-homolo=0".to_string(),
        format!("--tab={}", tab_out.display()),
        db.display().to_string(),
    ])
    .unwrap();
    cli.validate().unwrap();
    aodp_rs::run(&cli).unwrap();

    let tab = fs::read_to_string(&tab_out).unwrap();
    // the first window of A is unique to A: 1-based site 1..20
    assert!(tab.contains(&format!("A-len20-(s1e20)\t{}", &a[..20])), "{tab}");
    // every line is identifier TAB oligo
    for line in tab.lines() {
        let (id, oligo) = line.split_once('\t').unwrap();
        assert!(id.contains("-len20-(s"));
        assert_eq!(oligo.len(), 20);
    }
}
