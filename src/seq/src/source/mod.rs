use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use ahash::AHashMap;
use log::{debug, info, warn};

use crate::cluster::ClusterRegistry;
use crate::cover::Cover;
use crate::fragment::Fragment;
use crate::range::Range;
use crate::symbol::{self, Symbol};
use crate::tree::Tree;
use crate::{ClusterId, FragmentId, Length, Position, SeqId, SpeciesId};

mod error;
pub use error::SourceError;

/// Event-stream interface presented by FASTA parsers.
///
/// The parser announces a fragment, streams runs of encoded symbols grouped
/// by ambiguity, and closes the fragment. `finish` flushes whatever the sink
/// buffers across fragments.
pub trait FastaSink {
    fn begin_fragment(&mut self, name: &str, file: &str);
    fn append_run(&mut self, run: &[Symbol], ambiguous: bool);
    fn end_fragment(&mut self) -> anyhow::Result<()>;
    fn finish(&mut self) -> anyhow::Result<()>;
}

/// Map of named sequence sets that are targets of the signature search.
///
/// A singleton set stands for the sequence itself; larger sets come from the
/// phylogeny groups. Iteration is ordered by the sets, which keeps every
/// report deterministic.
#[derive(Debug, Default)]
pub struct Targets {
    by_set: BTreeMap<BTreeSet<SeqId>, String>,
    by_name: AHashMap<String, BTreeSet<SeqId>>,
}

impl Targets {
    pub fn insert(&mut self, set: BTreeSet<SeqId>, name: String) {
        self.by_name.insert(name.clone(), set.clone());
        self.by_set.insert(set, name);
    }

    pub fn erase_name(&mut self, name: &str) {
        if let Some(set) = self.by_name.remove(name) {
            self.by_set.remove(&set);
        }
    }

    pub fn has_set(&self, set: &BTreeSet<SeqId>) -> bool {
        self.by_set.contains_key(set)
    }

    pub fn name_of(&self, set: &BTreeSet<SeqId>) -> Option<&str> {
        self.by_set.get(set).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BTreeSet<SeqId>, &str)> {
        self.by_set.iter().map(|(set, name)| (set, name.as_str()))
    }
}

/// Source database of sequences.
///
/// A single append-only buffer of encoded symbols holds every fragment (and,
/// in reverse-complement mode, every reverse complement right after its
/// fragment), along with the indices from sequence names to fragments and the
/// per-position map of maximum admissible oligo lengths.
pub struct Source {
    min_oligo: Length,
    max_oligo: Length,
    max_ambiguities: Position,
    max_crowded_ambiguities: Position,
    with_reverse_complement: bool,

    content: Vec<Symbol>,
    /// Maximum admissible oligo length starting at each buffer position:
    /// 0 where no oligo may start; later reduced by the melting filter.
    max_length_at: Vec<Length>,

    names: Vec<String>,
    ids: AHashMap<String, SeqId>,
    fragments: Vec<Fragment>,
    sequence_fragments: Vec<Vec<FragmentId>>,
    /// Fragment end position -> fragment, for position lookups.
    fragment_ends: BTreeMap<Position, FragmentId>,

    pub targets: Targets,
    pub clusters: ClusterRegistry,

    /// FASTA names of fragments excluded because of ambiguities.
    excluded: Vec<String>,

    tree: Option<Tree>,

    // Taxonomy lookups. The species maps are temporary scaffolding between
    // `prepare_taxonomy` and `finish_taxonomy`.
    reference_ids: AHashMap<String, SeqId>,
    species_ids: AHashMap<String, SpeciesId>,
    instance_species: AHashMap<SeqId, SpeciesId>,
    reference_species: AHashMap<SeqId, SpeciesId>,
    cluster_species: AHashMap<ClusterId, BTreeSet<SpeciesId>>,

    // Current fragment being streamed by the parser.
    cur_name: String,
    cur_file: String,
    cur_lo: Position,
    cur_ambig: Cover<Position>,
    in_fragment: bool,
}

impl Source {
    #[must_use]
    pub fn new(
        min_oligo: Length,
        max_oligo: Length,
        max_ambiguities: Position,
        max_crowded_ambiguities: Position,
        with_reverse_complement: bool,
    ) -> Source {
        assert!(min_oligo >= 4, "oligo sizes below the slice prefix depth are unsupported");
        assert!(min_oligo <= max_oligo);
        Source {
            min_oligo,
            max_oligo,
            max_ambiguities,
            max_crowded_ambiguities,
            with_reverse_complement,
            content: Vec::new(),
            max_length_at: Vec::new(),
            names: Vec::new(),
            ids: AHashMap::new(),
            fragments: Vec::new(),
            sequence_fragments: Vec::new(),
            fragment_ends: BTreeMap::new(),
            targets: Targets::default(),
            clusters: ClusterRegistry::default(),
            excluded: Vec::new(),
            tree: None,
            reference_ids: AHashMap::new(),
            species_ids: AHashMap::new(),
            instance_species: AHashMap::new(),
            reference_species: AHashMap::new(),
            cluster_species: AHashMap::new(),
            cur_name: String::new(),
            cur_file: String::new(),
            cur_lo: 0,
            cur_ambig: Cover::new(),
            in_fragment: false,
        }
    }

    pub fn min_oligo(&self) -> Length {
        self.min_oligo
    }

    pub fn max_oligo(&self) -> Length {
        self.max_oligo
    }

    pub fn content(&self) -> &[Symbol] {
        &self.content
    }

    pub fn symbol(&self, p: Position) -> Symbol {
        self.content[p as usize]
    }

    pub fn len(&self) -> Position {
        self.content.len() as Position
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn max_len(&self) -> &[Length] {
        &self.max_length_at
    }

    /// Split borrows for the melting filter: the read-only buffer and
    /// fragment table next to the mutable length map.
    pub fn melting_view(&mut self) -> (&[Symbol], &[Fragment], &mut [Length]) {
        (&self.content, &self.fragments, &mut self.max_length_at)
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, id: FragmentId) -> &Fragment {
        &self.fragments[id as usize]
    }

    pub fn fragments_of(&self, seq: SeqId) -> &[FragmentId] {
        &self.sequence_fragments[seq as usize]
    }

    pub fn sequence_count(&self) -> usize {
        self.names.len()
    }

    pub fn name_of(&self, seq: SeqId) -> &str {
        &self.names[seq as usize]
    }

    pub fn id_of(&self, name: &str) -> Option<SeqId> {
        self.ids.get(name).copied()
    }

    /// Sequence ids in insertion order.
    pub fn sequences(&self) -> impl Iterator<Item = SeqId> {
        0..self.names.len() as SeqId
    }

    /// The fragment containing position `p`.
    pub fn fragment_at(&self, p: Position) -> Result<FragmentId, SourceError> {
        self.fragment_ends
            .range(p..)
            .next()
            .map(|(_, &f)| f)
            .ok_or(SourceError::NoFragmentAtPosition(p))
    }

    /// Decode `[p, p + l)` back into a human-readable string.
    pub fn printable(&self, p: Position, l: Position) -> String {
        symbol::to_ascii_string(&self.content[p as usize..(p + l) as usize])
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Whether a fragment with this ambiguity cover falls over the configured
    /// ambiguity limits.
    pub fn excluded_by_limits(&self, ambig: &Cover<Position>) -> bool {
        (self.max_ambiguities > 0 && ambig.length() > self.max_ambiguities)
            || (self.max_crowded_ambiguities > 0
                && ambig.window(Position::from(self.max_oligo)) > self.max_crowded_ambiguities)
    }

    /// Write the names of excluded fragments, one per line.
    pub fn write_excluded(&self, path: &Path) -> io::Result<()> {
        if self.excluded.is_empty() {
            return Ok(());
        }
        fs::write(path, self.excluded.join("\n") + "\n")
    }

    // ----------------------------- Fragment registration

    fn register_fragment(&mut self, name: &str, file: &str, ambig: Cover<Position>, rc: bool) {
        let range = *ambig.universe();

        // Extend the length map over the new fragment, populating it from the
        // complement of the ambiguity cover.
        self.max_length_at.resize(range.hi() as usize, 0);
        for r in ambig.complement().iter() {
            for (p, le) in r.windows(Position::from(self.min_oligo), Position::from(self.max_oligo)) {
                self.max_length_at[p as usize] = le as Length;
            }
        }

        if self.excluded_by_limits(&ambig) {
            self.excluded.push(format!("{name}\t{file}"));
            return;
        }

        let seq = match self.ids.get(name) {
            Some(&seq) => seq,
            None => {
                let seq = self.names.len() as SeqId;
                assert_eq!(seq as usize, self.sequence_fragments.len(), "sequence id out of step");
                self.ids.insert(name.to_string(), seq);
                self.names.push(name.to_string());
                self.sequence_fragments.push(Vec::new());
                self.targets.insert(BTreeSet::from([seq]), name.to_string());
                seq
            }
        };

        let fid = self.fragments.len() as FragmentId;
        self.fragments.push(Fragment::new(seq, file.to_string(), ambig, self.max_oligo, rc));
        self.sequence_fragments[seq as usize].push(fid);
        self.fragment_ends.insert(range.hi(), fid);
    }

    // ----------------------------- Phylogeny targets

    /// Attach a parsed phylogeny: label internal nodes and add every group
    /// with at least two member sequences as a named target.
    ///
    /// Leaves that do not name a loaded sequence are silently ignored; this
    /// is necessary when sequences were excluded because of ambiguities.
    pub fn apply_tree(&mut self, mut tree: Tree) {
        assert!(self.tree.is_none(), "phylogeny tree already set");
        tree.label("Node");

        for (name, members) in tree.groups() {
            if members.len() < 2 {
                // individual sequences are already targets
                continue;
            }
            let set: BTreeSet<SeqId> =
                members.iter().filter_map(|n| self.ids.get(n).copied()).collect();
            self.targets.insert(set, name);
        }

        self.tree = Some(tree);
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Erase the targets of every sequence whose name contains one of the
    /// outgroup entries as a substring. The sequences themselves stay in the
    /// database.
    pub fn filter_outgroup(&mut self, items: &[String]) -> Result<(), SourceError> {
        for item in items {
            let matched: Vec<String> =
                self.names.iter().filter(|n| n.contains(item.as_str())).cloned().collect();
            if matched.is_empty() {
                return Err(SourceError::OutgroupSequenceNotFound(item.clone()));
            }
            for name in matched {
                self.targets.erase_name(&name);
            }
        }
        Ok(())
    }

    /// Keep only the targets of sequences whose name contains one of the
    /// isolation entries; erase every other sequence target.
    pub fn isolate(&mut self, items: &[String]) -> Result<(), SourceError> {
        let mut isolation: BTreeSet<String> = BTreeSet::new();
        for item in items {
            let matched: Vec<&String> =
                self.names.iter().filter(|n| n.contains(item.as_str())).collect();
            if matched.is_empty() {
                return Err(SourceError::IsolationSequenceNotFound(item.clone()));
            }
            isolation.extend(matched.into_iter().cloned());
        }
        for name in self.names.clone() {
            if !isolation.contains(&name) {
                self.targets.erase_name(&name);
            }
        }
        Ok(())
    }

    // ----------------------------- Taxonomy

    /// Derive species from sequence names encoded `XX_999999_Genus_species...`
    /// and build the per-cluster species sets. Must run after the clusters
    /// have been encoded.
    pub fn prepare_taxonomy(&mut self) {
        for (name, &id) in &self.ids {
            let v: Vec<&str> = name.split('_').collect();
            if v.len() < 4 {
                continue; // name does not encode a species; ignore it
            }
            let spe = format!("{}_{}", v[2].to_lowercase(), v[3].to_lowercase());
            let next = self.species_ids.len() as SpeciesId;
            let sp = *self.species_ids.entry(spe).or_insert(next);
            self.instance_species.insert(id, sp);
        }

        for (set, cl) in self.clusters.iter_by_set() {
            let ss: BTreeSet<SpeciesId> =
                set.iter().filter_map(|se| self.instance_species.get(se)).copied().collect();
            self.cluster_species.insert(cl, ss);
        }

        debug!("taxonomy: {} species derived from sequence names", self.species_ids.len());
    }

    /// Register one taxonomy record: a reference sequence id and the species
    /// extracted from its lineage.
    pub fn on_taxonomy_entry(&mut self, id: &str, species: &str) -> Result<(), SourceError> {
        if self.reference_ids.contains_key(id) {
            return Err(SourceError::DuplicateTaxonomyEntry(id.to_string()));
        }
        let re = self.reference_ids.len() as SeqId;
        self.reference_ids.insert(id.to_string(), re);

        let v: Vec<&str> = species.split('_').collect();
        if v.len() < 2 {
            return Ok(()); // does not encode a species
        }
        let spe = format!("{}_{}", v[0].to_lowercase(), v[1].to_lowercase());
        if let Some(&sp) = self.species_ids.get(&spe) {
            self.reference_species.insert(re, sp);
        }
        Ok(())
    }

    /// Drop the temporary species scaffolding once the taxonomy is read.
    pub fn finish_taxonomy(&mut self) {
        self.species_ids = AHashMap::new();
        self.instance_species = AHashMap::new();
    }

    pub fn reference_id(&self, name: &str) -> Option<SeqId> {
        self.reference_ids.get(name).copied()
    }

    /// Whether the reference sequence's species belongs to the cluster's
    /// species set.
    pub fn common_species(&self, reference: SeqId, cluster: ClusterId) -> bool {
        self.reference_species
            .get(&reference)
            .is_some_and(|sp| self.cluster_species.get(&cluster).is_some_and(|ss| ss.contains(sp)))
    }

    pub fn log_summary(&self) {
        info!(
            "source: {} sequences, {} fragments, {} bp",
            self.names.len(),
            self.fragments.len(),
            self.content.len()
        );
        if !self.excluded.is_empty() {
            warn!("{} fragments excluded because of ambiguities", self.excluded.len());
        }
    }
}

impl FastaSink for Source {
    fn begin_fragment(&mut self, name: &str, file: &str) {
        assert!(!self.in_fragment, "previous fragment was not closed");
        self.in_fragment = true;
        self.cur_name = name.split_whitespace().next().unwrap_or("").to_string();
        self.cur_file = file.to_string();
        self.cur_lo = self.content.len() as Position;
        self.cur_ambig = Cover::new();
    }

    fn append_run(&mut self, run: &[Symbol], ambiguous: bool) {
        assert!(self.in_fragment, "nucleotides outside a fragment");
        if ambiguous {
            let start = self.content.len() as Position;
            self.cur_ambig.insert(Range::new(start, run.len() as Position));
        }
        self.content.extend_from_slice(run);
    }

    fn end_fragment(&mut self) -> anyhow::Result<()> {
        assert!(self.in_fragment, "no fragment to close");
        self.in_fragment = false;

        let lo = self.cur_lo;
        let le = self.content.len() as Position - lo;
        let mut ambig = std::mem::take(&mut self.cur_ambig);
        ambig.set_universe(Range::new(lo, le));

        let name = std::mem::take(&mut self.cur_name);
        let file = std::mem::take(&mut self.cur_file);

        self.register_fragment(&name, &file, ambig.clone(), false);

        if self.with_reverse_complement {
            // The reverse complement fragment is appended immediately after
            // the direct fragment, so its location stays derivable from the
            // direct fragment's range.
            let rc = symbol::reverse_complement(&self.content[lo as usize..(lo + le) as usize]);
            self.content.extend_from_slice(&rc);

            ambig.shift_right(le);
            ambig.flip();
            self.register_fragment(&name, &file, ambig, true);
        }

        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        assert!(!self.in_fragment, "unterminated fragment at end of input");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::from_ascii_str;

    fn feed(source: &mut Source, name: &str, body: &str) {
        source.begin_fragment(name, "test.fasta");
        let mut run: Vec<Symbol> = Vec::new();
        let mut run_ambig = false;
        for sy in from_ascii_str(body).unwrap() {
            if run.is_empty() || sy.is_ambiguous() == run_ambig {
                run_ambig = sy.is_ambiguous();
                run.push(sy);
                continue;
            }
            source.append_run(&run, run_ambig);
            run.clear();
            run_ambig = sy.is_ambiguous();
            run.push(sy);
        }
        if !run.is_empty() {
            source.append_run(&run, run_ambig);
        }
        source.end_fragment().unwrap();
    }

    #[test]
    fn fragments_register_under_their_sequence() {
        let mut source = Source::new(8, 16, 0, 0, false);
        feed(&mut source, "seq1 extra ignored", "ACGTACGTACGTACGTACGT");
        feed(&mut source, "seq2", "TTTTACGTACGTACGTGGGG");
        feed(&mut source, "seq1", "ACGTACGTACGTACGAACGA");
        source.finish().unwrap();

        assert_eq!(source.sequence_count(), 2);
        assert_eq!(source.name_of(0), "seq1");
        assert_eq!(source.fragments_of(0).len(), 2);
        assert_eq!(source.fragments_of(1), &[1]);
        assert_eq!(source.len(), 60);
        assert_eq!(source.fragment_at(25).unwrap(), 1);
        assert_eq!(source.printable(0, 4), "ACGT");

        // singleton targets for both sequences
        assert!(source.targets.has_set(&BTreeSet::from([0])));
        assert_eq!(source.targets.name_of(&BTreeSet::from([1])), Some("seq2"));
    }

    #[test]
    fn max_length_map_covers_unambiguous_windows() {
        let mut source = Source::new(8, 16, 0, 0, false);
        feed(&mut source, "s", "ACGTACGTACGTACGTACGTNACGTACGTAC");
        // positions 0..20 unambiguous, 20 = N, 21..31 unambiguous (10 long)
        let ml = source.max_len();
        assert_eq!(ml.len(), 31);
        assert_eq!(ml[0], 16);
        assert_eq!(ml[4], 16);
        assert_eq!(ml[8], 12);
        assert_eq!(ml[12], 8);
        assert_eq!(ml[13], 0); // a length-8 window no longer fits before the N
        assert_eq!(ml[20], 0); // the ambiguous position itself
        assert_eq!(ml[21], 10);
        assert_eq!(ml[23], 8);
        assert_eq!(ml[24], 0);
    }

    #[test]
    fn ambiguity_thresholds_exclude_fragments() {
        let mut source = Source::new(8, 16, 3, 0, false);
        feed(&mut source, "clean", "ACGTACGTACGTACGT");
        feed(&mut source, "dirty", "ACGTNNNNACGTACGT");
        source.finish().unwrap();

        assert_eq!(source.sequence_count(), 1);
        assert_eq!(source.excluded(), &["dirty\ttest.fasta".to_string()]);
        // the excluded fragment's bytes stay in the buffer, unreferenced
        assert_eq!(source.len(), 32);
    }

    #[test]
    fn crowded_ambiguities_exclude_fragments() {
        // 4 ambiguities crowded inside one max_oligo window
        let mut crowded = Source::new(8, 16, 0, 3, false);
        feed(&mut crowded, "crowded", "ACGTNNACGTACGNNTACGTACGTACGTACGT");
        assert_eq!(crowded.sequence_count(), 0);

        // same count spread beyond any single window
        let mut spread = Source::new(8, 16, 0, 3, false);
        feed(&mut spread, "spread", "ACGTNNACGTACGTACGTACGTACGTACGTACGTACGTNNACGTACGT");
        assert_eq!(spread.sequence_count(), 1);
    }

    #[test]
    fn reverse_complement_mode_appends_flipped_fragment() {
        let mut source = Source::new(8, 16, 0, 0, true);
        feed(&mut source, "s", "AAAACGTTACGTACGTACGN");
        source.finish().unwrap();

        assert_eq!(source.fragments().len(), 2);
        let rc = source.fragment(1);
        assert!(rc.reverse_complement);
        assert_eq!(rc.sequence, 0);
        assert_eq!(*rc.range(), Range::from_bounds(20, 40));
        assert_eq!(source.printable(20, 20), "NCGTACGTACGTAACGTTTT");
        // the N sits at position 19 of the direct fragment, position 20 of the flip
        assert!(rc.ambig().contains(20));
        assert!(!rc.ambig().contains(21));
    }

    #[test]
    fn outgroup_and_isolation_edit_targets() {
        let mut source = Source::new(8, 16, 0, 0, false);
        feed(&mut source, "alpha_1", "ACGTACGTACGTACGT");
        feed(&mut source, "alpha_2", "TACGTACGTACGTACG");
        feed(&mut source, "beta_1", "GGCCGGCCGGCCGGCC");
        source.finish().unwrap();

        source.filter_outgroup(&["beta".to_string()]).unwrap();
        assert!(source.targets.name_of(&BTreeSet::from([2])).is_none());
        assert!(source.targets.has_set(&BTreeSet::from([0])));

        assert!(source.filter_outgroup(&["gamma".to_string()]).is_err());

        source.isolate(&["alpha_1".to_string()]).unwrap();
        assert!(source.targets.has_set(&BTreeSet::from([0])));
        assert!(!source.targets.has_set(&BTreeSet::from([1])));
    }

    #[test]
    fn tree_groups_become_targets() {
        let mut source = Source::new(8, 16, 0, 0, false);
        feed(&mut source, "A", "ACGTACGTACGTACGT");
        feed(&mut source, "B", "TACGTACGTACGTACG");
        feed(&mut source, "C", "GGCCGGCCGGCCGGCC");
        source.finish().unwrap();

        let tree = Tree::internal(
            vec![
                Tree::internal(vec![Tree::leaf("A", ""), Tree::leaf("B", "")], "", ""),
                Tree::leaf("C", ""),
                Tree::leaf("missing", ""),
            ],
            "",
            "",
        );
        source.apply_tree(tree);

        assert_eq!(source.targets.name_of(&BTreeSet::from([0, 1])), Some("Node2"));
        assert!(source.targets.has_set(&BTreeSet::from([0, 1, 2])));
        assert!(source.tree().is_some());
    }
}
