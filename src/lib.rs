pub mod output;
mod reference;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use parking_lot::Mutex;

use aodp_io::{fasta, lists, newick, taxonomy, Writer};
use matcher::MatchQuery;
use parser::Cli;
use seq::Source;
use sigtrie::Trie;
use thermo::FoldSink;

/// Run the whole pipeline for parsed command-line arguments.
///
/// Stage order is fixed; every pass finishes before the next begins.
pub fn run(cli: &Cli) -> Result<()> {
    let outputs = cli.outputs();
    let threads = cli.effective_threads();
    let (min_oligo, max_oligo) = cli.oligo_size;
    let (max_ambiguities, max_crowded) = cli.ambiguity_limits();

    info!("oligo sizes {min_oligo}-{max_oligo}, {threads} worker threads");

    // ----------------------------- Read input sequences
    let mut source =
        Source::new(min_oligo, max_oligo, max_ambiguities, max_crowded, cli.reverse_complement);
    for file in &cli.sequence_files {
        fasta::parse(file, &mut source)?;
    }
    source.log_summary();

    // ----------------------------- Read phylogeny and target limiters
    if let Some(tree_file) = &cli.tree_file {
        source.apply_tree(newick::parse(tree_file)?);
    }
    if let Some(outgroup) = &cli.outgroup_file {
        source.filter_outgroup(&lists::read(outgroup)?)?;
    }
    if let Some(isolation) = &cli.isolation_file {
        source.isolate(&lists::read(isolation)?)?;
    }

    // ----------------------------- Build the trie
    let mut trie = Trie::new(min_oligo, max_oligo, cli.ambiguous_oligos);
    trie.build_slices(&source);

    // ----------------------------- Melting filter / fold diagnostics
    let fold_sink: Option<FoldSink> = match &outputs.fold {
        Some(path) => Some(Mutex::new(Box::new(Writer::open(path)?) as Box<dyn Write + Send>)),
        None => None,
    };
    if cli.max_melting.is_some() || fold_sink.is_some() {
        thermo::filter_melting(
            &mut source,
            threads,
            cli.max_melting,
            cli.strand,
            cli.salt,
            fold_sink.as_ref(),
        );
        info!("melting filter done");
    }

    // ----------------------------- Covering and filtering passes
    trie.cover(&source, threads);
    info!("cover done");

    if cli.max_homolo > 0 {
        trie.filter_homolo(&source, threads, cli.max_homolo);
        info!("homopolymer filter done");
    }

    trie.touch(&source, threads);
    info!("ambiguity marking done");

    if cli.ignore_snp {
        trie.small_diff(&source, threads);
        info!("SNP collapsing done");
    }

    trie.encode_clusters(&mut source);
    trie.collect_clusters(&source, threads);

    // ----------------------------- Taxonomy and reference confirmation
    if let Some(tax) = &cli.taxonomy {
        source.prepare_taxonomy();
        taxonomy::parse(tax, &mut source)?;
        source.finish_taxonomy();
    }
    if let Some(database) = &cli.database {
        let mut confirmer = reference::ReferenceConfirmer::new(&trie, &source, threads);
        fasta::parse(database, &mut confirmer)?;
        info!("reference confirmation done");
    }

    trie.collect_matches(threads);
    trie.sort_matches(threads);

    source
        .write_excluded(Path::new("excluded.fasta"))
        .context("cannot write ambiguities exclusion file (excluded.fasta)")?;

    // ----------------------------- Match query
    if let Some(match_file) = &cli.match_file {
        let out_path = outputs.match_output.as_ref().expect("match output resolved");
        let sink: Mutex<Box<dyn Write + Send>> = Mutex::new(Box::new(Writer::open(out_path)?));
        let mut query = MatchQuery::new(&trie, &source, &sink, threads);
        fasta::parse(match_file, &mut query)?;
        sink.lock().flush()?;
        info!("match query done");
    }

    // ----------------------------- Reports
    output::write_all(&outputs, &source, &trie)?;

    if let Some(sink) = fold_sink {
        sink.into_inner().flush()?;
    }

    Ok(())
}
