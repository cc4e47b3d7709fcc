//! Report formatters: each walks the targets, their clusters and the
//! collected signatures, and writes one of the output formats.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use anyhow::Result;
use itertools::Itertools;

use aodp_io::Writer;
use parser::Outputs;
use seq::{ClusterId, Cover, FragmentId, Position, Range, SeqId, Source};
use sigtrie::{Signature, Trie};

/// Write every requested report.
pub fn write_all(outputs: &Outputs, source: &Source, trie: &Trie) -> Result<()> {
    if let Some(path) = &outputs.strings {
        strings(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.positions {
        positions(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.ranges {
        ranges(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.fasta {
        fasta(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.gff {
        gff(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.tab {
        tab(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.newick {
        newick(&mut Writer::open(path)?, source)?;
    }
    if let Some(path) = &outputs.node_list {
        node_list(&mut Writer::open(path)?, source)?;
    }
    if let Some(path) = &outputs.lineage {
        lineage(&mut Writer::open(path)?, source)?;
    }
    if let Some(path) = &outputs.cluster_list {
        cluster_list(&mut Writer::open(path)?, source)?;
    }
    if let Some(path) = &outputs.cluster_oligos {
        cluster_oligos(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.sequence_clusters {
        sequence_clusters(&mut Writer::open(path)?, source)?;
    }
    if let Some(path) = &outputs.metrics {
        metrics(&mut Writer::open(path)?, source, trie)?;
    }
    if let Some(path) = &outputs.source {
        source_dump(&mut Writer::open(path)?, source)?;
    }
    if let Some(path) = &outputs.cladogram {
        cladogram(&mut Writer::open(path)?, source, trie)?;
    }
    Ok(())
}

/// The sorted signatures of a target, when it has any.
fn target_matches<'a>(
    source: &Source,
    trie: &'a Trie,
    set: &BTreeSet<SeqId>,
) -> Option<&'a [Signature]> {
    let cluster = source.clusters.id_of(set)?;
    trie.matches.get(&cluster).map(Vec::as_slice)
}

/// Iterate the reportable lengths of a signature record.
fn lengths(sig: &Signature, min_oligo: u8) -> impl Iterator<Item = u32> + '_ {
    let d = u32::from(sig.depth);
    (1..=u32::from(sig.length)).filter(move |x| x + d >= u32::from(min_oligo))
}

/// Signature oligo strings per target.
fn strings(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    for (set, name) in source.targets.iter() {
        writeln!(out, "------------------------")?;
        writeln!(out, "{name}")?;
        writeln!(out, "------------------------")?;

        let Some(matches) = target_matches(source, trie, set) else { continue };
        for sig in matches {
            for x in lengths(sig, trie.min_oligo()) {
                writeln!(out, "{}", source.printable(sig.start(), u32::from(sig.depth) + x))?;
            }
        }
    }
    Ok(())
}

/// Transform the collected signatures into per-fragment covers of ranges:
/// per target for `--positions`, merged over all targets for `--ranges`.
#[allow(clippy::type_complexity)]
fn calculate_ranges(
    source: &Source,
    trie: &Trie,
) -> Result<(
    BTreeMap<String, BTreeMap<FragmentId, Cover<Position>>>,
    BTreeMap<FragmentId, Cover<Position>>,
)> {
    let mut by_target: BTreeMap<String, BTreeMap<FragmentId, Cover<Position>>> = BTreeMap::new();
    let mut by_fragment: BTreeMap<FragmentId, Cover<Position>> = BTreeMap::new();

    for (set, name) in source.targets.iter() {
        let Some(matches) = target_matches(source, trie, set) else { continue };
        for sig in matches {
            let f = source.fragment_at(sig.position)?;
            let r = Range::new(sig.start(), u32::from(sig.depth) + u32::from(sig.length));

            by_target.entry(name.to_string()).or_default().entry(f).or_default().insert(r);
            by_fragment.entry(f).or_default().insert(r);
        }
    }
    Ok((by_target, by_fragment))
}

/// Signature site positions (midpoints) per target and fragment, 1-based.
fn positions(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    let by_target = calculate_ranges(source, trie)?.0;

    writeln!(out, "Filename\tAccession\tSites")?;
    for (target, fragments) in &by_target {
        for (&f, cover) in fragments {
            let start = source.fragment(f).range().lo();
            write!(out, "{target}\t{}", source.fragment(f).file)?;
            for r in cover.iter() {
                let lo = r.lo() - start + 1;
                let hi = r.hi() - start + 1;
                write!(out, "\t{}", (lo + hi) / 2)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Signature ranges per fragment, 1-based, with their midpoints.
fn ranges(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    let by_fragment = calculate_ranges(source, trie)?.1;

    for (&f, cover) in &by_fragment {
        let fr = source.fragment(f);
        let start = fr.range().lo();

        writeln!(out, "------------------------")?;
        writeln!(out, "{} ({})", source.name_of(fr.sequence), fr.file)?;
        writeln!(out, "------------------------")?;

        for r in cover.iter() {
            let lo = r.lo() - start + 1;
            let hi = r.hi() - start + 1;
            writeln!(out, "[ {lo} - {hi} ] : {}", (lo + hi) / 2)?;
        }
    }
    Ok(())
}

/// Signatures in the FASTA format, named
/// `>{target}-len{L}-(s{start}e{end}){-rc}`.
fn fasta(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    for (set, name) in source.targets.iter() {
        let Some(matches) = target_matches(source, trie, set) else { continue };
        for sig in matches {
            let f = source.fragment(source.fragment_at(sig.position)?);
            let s = f.range().lo();
            let d = u32::from(sig.depth);
            for x in lengths(sig, trie.min_oligo()) {
                writeln!(
                    out,
                    ">{name}-len{}-(s{}e{}){}",
                    d + x,
                    sig.position - s - d + 1,
                    sig.position - s + x,
                    f.rc_id()
                )?;
                writeln!(out, "{}", source.printable(sig.start(), d + x))?;
            }
        }
    }
    Ok(())
}

/// Signatures in the GFF format, followed by the source sequences.
fn gff(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    writeln!(out, "##gff-version3")?;

    let mut id: u64 = 1;
    for (set, name) in source.targets.iter() {
        let Some(matches) = target_matches(source, trie, set) else { continue };
        for sig in matches {
            let f = source.fragment(source.fragment_at(sig.position)?);
            let s = f.range().lo();
            let d = u32::from(sig.depth);
            for x in lengths(sig, trie.min_oligo()) {
                writeln!(
                    out,
                    "{name}\t.\tlen\t{}\t{}\t.\t+\t.\tID={name}-{id}{}:{}",
                    sig.position - s - d + 1,
                    sig.position - s + x,
                    f.rc_id(),
                    source.printable(sig.start(), d + x)
                )?;
                id += 1;
            }
        }
    }

    writeln!(out, "##FASTA")?;
    for seq in source.sequences() {
        writeln!(out, ">{}", source.name_of(seq))?;
        for &f in source.fragments_of(seq) {
            let r = source.fragment(f).range();
            writeln!(out, "{}", source.printable(r.lo(), r.size()))?;
        }
    }
    Ok(())
}

/// Signatures in a two-column tab format: identifier and oligo.
fn tab(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    for (set, name) in source.targets.iter() {
        let Some(matches) = target_matches(source, trie, set) else { continue };
        for sig in matches {
            let f = source.fragment(source.fragment_at(sig.position)?);
            let s = f.range().lo();
            let d = u32::from(sig.depth);
            for x in lengths(sig, trie.min_oligo()) {
                writeln!(
                    out,
                    "{name}-len{}-(s{}e{}){}\t{}",
                    d + x,
                    sig.position - s - d + 1,
                    sig.position - s + x,
                    f.rc_id(),
                    source.printable(sig.start(), d + x)
                )?;
            }
        }
    }
    Ok(())
}

/// The annotated phylogeny in the Newick format.
fn newick(out: &mut dyn Write, source: &Source) -> Result<()> {
    if let Some(tree) = source.tree() {
        writeln!(out, "{tree};")?;
    }
    Ok(())
}

/// The groups of the phylogeny: internal node name and its member leaves.
fn node_list(out: &mut dyn Write, source: &Source) -> Result<()> {
    let Some(tree) = source.tree() else { return Ok(()) };
    for (name, members) in tree.groups() {
        if members.len() <= 1 {
            continue;
        }
        writeln!(out, "{name}\t{}", members.iter().join(","))?;
    }
    Ok(())
}

/// The lineage of every leaf of the phylogeny.
fn lineage(out: &mut dyn Write, source: &Source) -> Result<()> {
    if let Some(tree) = source.tree() {
        for line in tree.lineage() {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

/// One line per cluster: id, member sequences, and the matching phylogeny
/// node when the cluster is exactly a named target.
fn cluster_list(out: &mut dyn Write, source: &Source) -> Result<()> {
    for (set, id) in source.clusters.iter_by_set() {
        let names = set.iter().map(|&s| source.name_of(s)).join(" ");
        let target = source.targets.name_of(set).unwrap_or("-");
        writeln!(out, "{id}\t{names}\t{target}")?;
    }
    Ok(())
}

/// One line per collected signature record: cluster id and the full-length
/// oligo.
fn cluster_oligos(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    for (cluster, matches) in &trie.matches {
        for sig in matches {
            writeln!(
                out,
                "{cluster}\t{}",
                source.printable(sig.start(), u32::from(sig.depth) + u32::from(sig.length))
            )?;
        }
    }
    Ok(())
}

/// Cluster and clade patterns per sequence: how many sequences share the
/// pattern, how many are hidden by it, and the pattern itself.
fn sequence_clusters(out: &mut dyn Write, source: &Source) -> Result<()> {
    let mut seq_clusters: BTreeMap<SeqId, BTreeSet<ClusterId>> = BTreeMap::new();
    let mut seq_clades: BTreeMap<SeqId, BTreeSet<ClusterId>> = BTreeMap::new();
    for seq in source.sequences() {
        seq_clusters.insert(seq, BTreeSet::new());
        seq_clades.insert(seq, BTreeSet::new());
    }

    for (set, cluster) in source.clusters.iter_by_set() {
        let is_clade = source.targets.has_set(set);
        for &seq in set {
            seq_clusters.get_mut(&seq).expect("cluster over unknown sequence").insert(cluster);
            if is_clade {
                seq_clades.get_mut(&seq).expect("clade over unknown sequence").insert(cluster);
            }
        }
    }

    let mut same_cluster_pattern: BTreeMap<&BTreeSet<ClusterId>, usize> = BTreeMap::new();
    for pattern in seq_clusters.values() {
        *same_cluster_pattern.entry(pattern).or_insert(0) += 1;
    }
    let mut same_clade_pattern: BTreeMap<&BTreeSet<ClusterId>, usize> = BTreeMap::new();
    for pattern in seq_clades.values() {
        *same_clade_pattern.entry(pattern).or_insert(0) += 1;
    }

    for seq in source.sequences() {
        let sc = &seq_clusters[&seq];
        let sn = &seq_clades[&seq];

        // sequences whose pattern is included in this sequence's pattern
        let cocluster = seq_clusters.values().filter(|other| other.is_subset(sc)).count();
        let coclade = seq_clades.values().filter(|other| other.is_subset(sn)).count();

        let clades = if sn.is_empty() { "-".to_string() } else { sn.iter().join(" ") };
        writeln!(
            out,
            "{seq}\t{}\t{}\t{}\t{cocluster}\t{coclade}\t{}\t{clades}",
            source.name_of(seq),
            same_cluster_pattern[sc],
            same_clade_pattern[sn],
            sc.iter().join(" "),
        )?;
    }
    Ok(())
}

/// Counters and distributions of the source database and the trie.
fn metrics(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    let m = trie.measure();

    writeln!(out, "===================================")?;
    writeln!(out, "sequences   : {}", source.sequence_count())?;
    writeln!(out, "database    : {}", source.len())?;
    writeln!(out, "nodes       : {}", m.nodes)?;
    writeln!(out, "leaves      : {}", m.leaves)?;
    writeln!(out, "length      : {}", m.length)?;
    writeln!(out, "occurrences : {}", m.occurrences)?;
    writeln!(out, "clusters    : {}", trie.matches.len())?;

    writeln!(out, "=============nucleotides===========")?;
    let mut nucleo: BTreeMap<char, usize> = BTreeMap::new();
    for sy in source.content() {
        *nucleo.entry(sy.to_ascii()).or_insert(0) += 1;
    }
    for (nu, count) in nucleo {
        writeln!(out, "{nu}\t{count}")?;
    }

    writeln!(out, "=============depths================")?;
    for (depth, count) in &m.depth_distribution {
        writeln!(out, "{depth}\t{count}")?;
    }

    writeln!(out, "=============lengths===============")?;
    for (length, count) in &m.length_distribution {
        writeln!(out, "{length}\t{count}")?;
    }

    writeln!(out, "=============occurrences===========")?;
    for (size, count) in &m.occurrence_distribution {
        writeln!(out, "{size}\t{count}")?;
    }

    writeln!(out, "=============clusters==============")?;
    let mut cluster_sizes: BTreeMap<usize, usize> = BTreeMap::new();
    for matches in trie.matches.values() {
        *cluster_sizes.entry(matches.len()).or_insert(0) += 1;
    }
    for (size, count) in cluster_sizes {
        writeln!(out, "{size}\t{count}")?;
    }

    writeln!(out, "=============prefixes==============")?;
    for (prefix, count) in &m.prefix_distribution {
        writeln!(out, "{prefix}\t{count}")?;
    }
    Ok(())
}

/// Every fragment of every sequence with the positions and content of its
/// ambiguous sections.
fn source_dump(out: &mut dyn Write, source: &Source) -> Result<()> {
    for seq in source.sequences() {
        for &f in source.fragments_of(seq) {
            let fr = source.fragment(f);
            let r = fr.range();

            writeln!(out, "{}", source.name_of(seq))?;
            writeln!(out, "{}", source.printable(r.lo(), r.size()))?;
            writeln!(out, "{}", fr.ambig())?;
            let mut bases = String::new();
            for ar in fr.ambig().iter() {
                bases.push_str(&source.printable(ar.lo(), ar.size()));
            }
            writeln!(out, "{bases}")?;
        }
    }
    Ok(())
}

/// The phylogeny with signature-bearing targets marked `*`, in the Newick
/// format, for cladogram drawing.
fn cladogram(out: &mut dyn Write, source: &Source, trie: &Trie) -> Result<()> {
    if let Some(tree) = source.tree() {
        let marked = tree.mark(&trie.targets_with_matches(source), "*");
        writeln!(out, "{marked};")?;
    }
    Ok(())
}
