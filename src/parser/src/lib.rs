use std::path::PathBuf;

use clap::Parser;
use log::debug;
use serde::Serialize;

mod error;
pub use error::ParserError;

fn parse_oligo_size(s: &str) -> Result<(u8, u8), String> {
    let (lo, hi) = match s.split_once('-') {
        Some((lo, hi)) => (lo, hi),
        None => (s, s),
    };
    let lo: u8 = lo.parse().map_err(|e| format!("invalid value for low range ({lo}): {e}"))?;
    let hi: u8 = hi.parse().map_err(|e| format!("invalid value for high range ({hi}): {e}"))?;
    if lo > hi {
        return Err(format!("invalid numeric range ({lo}-{hi})"));
    }
    Ok((lo, hi))
}

fn parse_yes_no(s: &str) -> Result<bool, String> {
    match s {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(format!("expecting \"yes\" or \"no\", got \"{other}\"")),
    }
}

/// aodp-rs: discover oligonucleotide signatures in collections of DNA sequences
#[derive(Parser, Debug, Serialize)]
#[clap(name = "aodp-rs", version, about, long_about = None)]
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Warnings are emitted by default even when this flag is off; use
    /// --quiet/-q to disable them.
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Disable warnings. Only errors will be displayed.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Input sequence files (FASTA)
    #[clap(required(true), parse(from_os_str))]
    pub sequence_files: Vec<PathBuf>,

    /// Length range of the oligonucleotide signatures, in bp: size[-size]
    ///
    /// The minimum size must be at least 8; a single value searches at that
    /// exact length.
    #[clap(long, value_name = "size[-size]", parse(try_from_str = parse_oligo_size), default_value("32"))]
    pub oligo_size: (u8, u8),

    /// Maximum number of ambiguous bases tolerated in a fragment.
    ///
    /// Fragments with more ambiguities are excluded from the analysis and
    /// their names written to excluded.fasta. When neither this option nor
    /// --max-crowded-ambiguities is given, this defaults to 5.
    #[clap(long, value_name = "N")]
    pub max_ambiguities: Option<u32>,

    /// Maximum number of ambiguous bases within any window of the maximum
    /// oligo size; fragments beyond it are excluded.
    #[clap(long, value_name = "N")]
    pub max_crowded_ambiguities: Option<u32>,

    /// Prune oligos containing homopolymer runs longer than N; 0 disables
    /// the filter.
    #[clap(long, value_name = "N", default_value("4"))]
    pub max_homolo: u8,

    /// Drop oligos whose self-folding melting temperature reaches this
    /// temperature (Celsius).
    #[clap(long, value_name = "T")]
    pub max_melting: Option<f64>,

    /// Na+ concentration (M), between 0.05 and 1.1.
    #[clap(long, value_name = "M", default_value("1.0"))]
    pub salt: f64,

    /// Strand concentration (mM), between 0.01 and 100.
    #[clap(long, value_name = "mM", default_value("0.1"))]
    pub strand: f64,

    /// Remove signatures that differ in exactly one base from another
    /// sequence over a reportable region (SNP collapsing).
    #[clap(long = "ignore-SNP", alias = "ignore-snp")]
    pub ignore_snp: bool,

    /// Permit ambiguous bases inside signatures (yes|no). Incompatible with
    /// --max-melting.
    #[clap(long, value_name = "yes|no", parse(try_from_str = parse_yes_no), default_value("no"))]
    pub ambiguous_oligos: bool,

    /// Also search the reverse complement of every fragment.
    #[clap(long)]
    pub reverse_complement: bool,

    /// Phylogeny tree (Newick); adds every group of the tree as a signature
    /// target.
    #[clap(long, value_name = "FILE", parse(from_os_str))]
    pub tree_file: Option<PathBuf>,

    /// Erase the targets of sequences whose name contains one of the listed
    /// entries.
    #[clap(long, value_name = "FILE", parse(from_os_str))]
    pub outgroup_file: Option<PathBuf>,

    /// Keep only the targets of sequences whose name contains one of the
    /// listed entries.
    #[clap(long, value_name = "FILE", parse(from_os_str))]
    pub isolation_file: Option<PathBuf>,

    /// Reference database (FASTA) used to confirm signatures; requires
    /// --taxonomy.
    #[clap(long, value_name = "FILE", parse(from_os_str))]
    pub database: Option<PathBuf>,

    /// Taxonomy of the reference database: <reference-id>\t<lineage> per
    /// line; requires --database.
    #[clap(long, value_name = "FILE", parse(from_os_str))]
    pub taxonomy: Option<PathBuf>,

    /// Classify the sequences of this FASTA file against the signature
    /// clusters.
    #[clap(long = "match", value_name = "FILE", parse(from_os_str))]
    pub match_file: Option<PathBuf>,

    /// Worker pool size; 0 uses all available cores but one.
    #[clap(long, value_name = "N", default_value("0"))]
    pub threads: usize,

    // ----------------------------- outputs
    // Every output flag takes an optional =FILE value; the bare flag writes
    // to standard output.
    /// Print signature oligo strings per target.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub strings: Option<PathBuf>,

    /// Print signature site positions per target and fragment.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub positions: Option<PathBuf>,

    /// Print signature ranges per fragment.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub ranges: Option<PathBuf>,

    /// Print signatures in the FASTA format.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub fasta: Option<PathBuf>,

    /// Print signatures in the GFF format.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub gff: Option<PathBuf>,

    /// Print signatures in a tab-separated format.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub tab: Option<PathBuf>,

    /// Print the annotated phylogeny in the Newick format; requires
    /// --tree-file.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub newick: Option<PathBuf>,

    /// Print the groups of the phylogeny; requires --tree-file.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub node_list: Option<PathBuf>,

    /// Print the lineage of every leaf of the phylogeny; requires
    /// --tree-file.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub lineage: Option<PathBuf>,

    /// Print the computed secondary structures and melting temperatures.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub fold: Option<PathBuf>,

    /// Print the list of clusters with their member sequences.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub cluster_list: Option<PathBuf>,

    /// Print the signature oligos of every cluster.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub cluster_oligos: Option<PathBuf>,

    /// Print the cluster and clade patterns of every sequence.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub sequence_clusters: Option<PathBuf>,

    /// Print metrics of the source database and the trie.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub metrics: Option<PathBuf>,

    /// Print the loaded fragments with their ambiguous sections.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub source: Option<PathBuf>,

    /// Write the result lines of --match.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub match_output: Option<PathBuf>,

    /// Write the phylogeny with signature-bearing nodes marked, for
    /// cladogram drawing; requires --tree-file.
    #[clap(long, value_name = "FILE", require_equals(true), min_values(0), default_missing_value("-"))]
    pub cladogram: Option<PathBuf>,

    /// Compose the standard output files under this base name; incompatible
    /// with the output flags it generates.
    #[clap(long, value_name = "name", parse(from_os_str))]
    pub basename: Option<PathBuf>,

    /// Compose the cluster output files under this base name; incompatible
    /// with --cluster-list and --cluster-oligos.
    #[clap(long, value_name = "name", parse(from_os_str))]
    pub clusters: Option<PathBuf>,
}

/// Resolved output destinations, after `--basename` and `--clusters`
/// composition.
#[derive(Debug, Default, Clone)]
pub struct Outputs {
    pub strings: Option<PathBuf>,
    pub positions: Option<PathBuf>,
    pub ranges: Option<PathBuf>,
    pub fasta: Option<PathBuf>,
    pub gff: Option<PathBuf>,
    pub tab: Option<PathBuf>,
    pub newick: Option<PathBuf>,
    pub node_list: Option<PathBuf>,
    pub lineage: Option<PathBuf>,
    pub fold: Option<PathBuf>,
    pub cluster_list: Option<PathBuf>,
    pub cluster_oligos: Option<PathBuf>,
    pub sequence_clusters: Option<PathBuf>,
    pub metrics: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub match_output: Option<PathBuf>,
    pub cladogram: Option<PathBuf>,
}

impl Outputs {
    fn any(&self) -> bool {
        self.strings.is_some()
            || self.positions.is_some()
            || self.ranges.is_some()
            || self.fasta.is_some()
            || self.gff.is_some()
            || self.tab.is_some()
            || self.newick.is_some()
            || self.node_list.is_some()
            || self.lineage.is_some()
            || self.fold.is_some()
            || self.cluster_list.is_some()
            || self.cluster_oligos.is_some()
            || self.sequence_clusters.is_some()
            || self.metrics.is_some()
            || self.source.is_some()
            || self.match_output.is_some()
            || self.cladogram.is_some()
    }
}

fn with_suffix(base: &std::path::Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

impl Cli {
    /// Log the full configuration at debug level, serialized to YAML.
    pub fn serialize(&self) {
        match serde_yaml::to_string(self) {
            Ok(serialized) => debug!("\n---- Command line args ----\n{serialized}\n---"),
            Err(err) => debug!("failed to serialize command line arguments [{err}]"),
        }
    }

    /// Validate argument combinations and value ranges; fatal before any
    /// pass begins.
    pub fn validate(&self) -> Result<(), ParserError> {
        if self.sequence_files.is_empty() {
            return Err(ParserError::NoSequenceFiles);
        }

        let (min, max) = self.oligo_size;
        if min < 8 {
            return Err(ParserError::OligoSizeTooSmall(min));
        }
        if min > max {
            return Err(ParserError::InvalidRange(min, max));
        }

        if !(0.05..=1.1).contains(&self.salt) {
            return Err(ParserError::InvalidSalt(self.salt));
        }
        if !(0.01..=100.0).contains(&self.strand) {
            return Err(ParserError::InvalidStrand(self.strand));
        }

        if self.ambiguous_oligos && self.max_melting.is_some() {
            return Err(ParserError::AmbiguousWithMelting);
        }

        if self.taxonomy.is_some() && self.database.is_none() {
            return Err(ParserError::TaxonomyWithoutDatabase);
        }
        if self.database.is_some() && self.taxonomy.is_none() {
            return Err(ParserError::DatabaseWithoutTaxonomy);
        }

        if self.tree_file.is_none() {
            for (name, flag) in [
                ("newick", &self.newick),
                ("node-list", &self.node_list),
                ("lineage", &self.lineage),
                ("cladogram", &self.cladogram),
            ] {
                if flag.is_some() {
                    return Err(ParserError::MissingTreeFile(name));
                }
            }
        }

        if self.basename.is_some() {
            for (name, flag) in [
                ("strings", &self.strings),
                ("fasta", &self.fasta),
                ("gff", &self.gff),
                ("tab", &self.tab),
                ("positions", &self.positions),
                ("ranges", &self.ranges),
                ("newick", &self.newick),
                ("node-list", &self.node_list),
                ("lineage", &self.lineage),
                ("cladogram", &self.cladogram),
            ] {
                if flag.is_some() {
                    return Err(ParserError::BasenameConflict(name));
                }
            }
        }

        if self.clusters.is_some() {
            for (name, flag) in
                [("cluster-list", &self.cluster_list), ("cluster-oligos", &self.cluster_oligos)]
            {
                if flag.is_some() {
                    return Err(ParserError::ClustersConflict(name));
                }
            }
        }

        if !self.outputs().any() {
            return Err(ParserError::NoOutput);
        }

        Ok(())
    }

    /// Resolve the output destinations, composing file names for
    /// `--basename` and `--clusters`.
    #[must_use]
    pub fn outputs(&self) -> Outputs {
        let mut out = Outputs {
            strings: self.strings.clone(),
            positions: self.positions.clone(),
            ranges: self.ranges.clone(),
            fasta: self.fasta.clone(),
            gff: self.gff.clone(),
            tab: self.tab.clone(),
            newick: self.newick.clone(),
            node_list: self.node_list.clone(),
            lineage: self.lineage.clone(),
            fold: self.fold.clone(),
            cluster_list: self.cluster_list.clone(),
            cluster_oligos: self.cluster_oligos.clone(),
            sequence_clusters: self.sequence_clusters.clone(),
            metrics: self.metrics.clone(),
            source: self.source.clone(),
            match_output: self.match_output.clone(),
            cladogram: self.cladogram.clone(),
        };

        if let Some(base) = &self.basename {
            out.strings = Some(with_suffix(base, ".oligo.strings"));
            out.positions = Some(with_suffix(base, ".oligo.positions"));
            out.ranges = Some(with_suffix(base, ".oligo.ranges"));
            out.fasta = Some(with_suffix(base, ".oligo.fasta"));
            out.gff = Some(with_suffix(base, ".oligo.gff"));
            out.tab = Some(with_suffix(base, ".oligo.tab"));
            if self.tree_file.is_some() {
                out.newick = Some(with_suffix(base, ".newick"));
                out.node_list = Some(with_suffix(base, ".node-list"));
                out.lineage = Some(with_suffix(base, ".lineage"));
                out.cladogram = Some(with_suffix(base, ".cladogram"));
            }
        }

        if let Some(prefix) = &self.clusters {
            out.cluster_list = Some(with_suffix(prefix, ".cluster-list"));
            out.cluster_oligos = Some(with_suffix(prefix, ".cluster-oligos"));
        }

        // --match without --match-output reports to standard output
        if self.match_file.is_some() && out.match_output.is_none() {
            out.match_output = Some(PathBuf::from("-"));
        }

        out
    }

    /// Resolved ambiguity thresholds: when neither limit is given,
    /// --max-ambiguities defaults to 5.
    #[must_use]
    pub fn ambiguity_limits(&self) -> (u32, u32) {
        match (self.max_ambiguities, self.max_crowded_ambiguities) {
            (None, None) => (5, 0),
            (ma, mca) => (ma.unwrap_or(0), mca.unwrap_or(0)),
        }
    }

    /// Worker pool size: the configured value, or all available cores but
    /// one.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism().map_or(1, |n| n.get().saturating_sub(1).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(["aodp-rs"].iter().copied().chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn oligo_size_ranges() {
        assert_eq!(parse_oligo_size("32").unwrap(), (32, 32));
        assert_eq!(parse_oligo_size("24-48").unwrap(), (24, 48));
        assert!(parse_oligo_size("48-24").is_err());
        assert!(parse_oligo_size("abc").is_err());
        assert!(parse_oligo_size("300").is_err());
    }

    #[test]
    fn output_flags_default_to_stdout() {
        let c = cli(&["--strings", "db.fasta"]);
        assert_eq!(c.strings, Some(PathBuf::from("-")));
        assert_eq!(c.sequence_files, vec![PathBuf::from("db.fasta")]);
        c.validate().unwrap();

        let c = cli(&["--strings=out.txt", "db.fasta"]);
        assert_eq!(c.strings, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn validation_rejects_bad_combinations() {
        let c = cli(&["--oligo-size=6", "--strings", "db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::OligoSizeTooSmall(6))));

        let c = cli(&["--salt=2.0", "--strings", "db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::InvalidSalt(_))));

        let c = cli(&["--ambiguous-oligos=yes", "--max-melting=45", "--strings", "db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::AmbiguousWithMelting)));

        let c = cli(&["--taxonomy=tax.txt", "--strings", "db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::TaxonomyWithoutDatabase)));

        let c = cli(&["--newick", "db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::MissingTreeFile("newick"))));

        let c = cli(&["db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::NoOutput)));

        let c = cli(&["--basename=out", "--strings", "db.fasta"]);
        assert!(matches!(c.validate(), Err(ParserError::BasenameConflict("strings"))));
    }

    #[test]
    fn basename_composes_file_names() {
        let c = cli(&["--basename=run1", "db.fasta"]);
        let out = c.outputs();
        assert_eq!(out.strings, Some(PathBuf::from("run1.oligo.strings")));
        assert_eq!(out.tab, Some(PathBuf::from("run1.oligo.tab")));
        assert_eq!(out.newick, None); // no tree file
        c.validate().unwrap();

        let c = cli(&["--clusters=run1", "db.fasta"]);
        let out = c.outputs();
        assert_eq!(out.cluster_list, Some(PathBuf::from("run1.cluster-list")));
        assert_eq!(out.cluster_oligos, Some(PathBuf::from("run1.cluster-oligos")));
    }

    #[test]
    fn ambiguity_defaults() {
        assert_eq!(cli(&["--strings", "db.fasta"]).ambiguity_limits(), (5, 0));
        assert_eq!(cli(&["--max-ambiguities=9", "--strings", "db.fasta"]).ambiguity_limits(), (9, 0));
        assert_eq!(
            cli(&["--max-crowded-ambiguities=3", "--strings", "db.fasta"]).ambiguity_limits(),
            (0, 3)
        );
    }

    #[test]
    fn snp_flag_spelling() {
        assert!(cli(&["--ignore-SNP", "--strings", "db.fasta"]).ignore_snp);
        assert!(cli(&["--ignore-snp", "--strings", "db.fasta"]).ignore_snp);
    }
}
