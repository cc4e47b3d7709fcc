use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use log::{debug, info};
use parking_lot::Mutex;

use seq::{ClusterId, Depth, Length, Position, Prefix4, Range, SeqId, Source, Symbol};

pub mod slice;
pub use slice::TrieSlice;

mod pass;
use pass::{spin, WindowSet, Windows};

/// Depth of the slice prefix: the trie is sharded by its first four symbols.
pub const FIXED_DEPTH: usize = 4;

/// One collected signature: the buffer position of the node's edge, the depth
/// of the node and the edge length. The substring for a reported length `x`
/// is `source[position-depth .. position-depth+depth+x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub position: Position,
    pub depth: Depth,
    pub length: Length,
}

impl Signature {
    /// Start of the underlying subsequence window.
    #[must_use]
    pub fn start(&self) -> Position {
        self.position - Position::from(self.depth)
    }

    /// Sort key: window start, then total length.
    #[must_use]
    pub fn sort_key(&self) -> (Position, u32) {
        (self.start(), u32::from(self.depth) + u32::from(self.length))
    }
}

/// Counters and distributions for the metrics report.
///
/// Occurrence figures reflect the occurrence multisets at measuring time;
/// after cluster collection has dropped them, they read as empty.
#[derive(Debug, Default)]
pub struct TrieMetrics {
    pub nodes: usize,
    pub leaves: usize,
    pub length: usize,
    pub occurrences: usize,
    pub depth_distribution: BTreeMap<usize, usize>,
    pub length_distribution: BTreeMap<usize, usize>,
    /// Histogram of per-node occurrence-set sizes.
    pub occurrence_distribution: BTreeMap<usize, usize>,
    /// Node count of every slice, keyed by its prefix.
    pub prefix_distribution: BTreeMap<Prefix4, usize>,
}

/// Container of trie slices plus the prefix routing built once by
/// [`Trie::build_slices`]:
///
/// - exact prefix -> slice, for add and reference confirmation,
/// - prefix -> slices matching under ambiguity overlap, for mark and match,
/// - prefix -> slices at overlap-distance 1, for SNP collapsing.
///
/// Slices are independent; each one is serialized by its own lock, so the
/// parallel passes never contend except on the shared work cursor.
pub struct Trie {
    min_oligo: Length,
    max_oligo: Length,
    ambiguous: bool,
    slices: Vec<Mutex<TrieSlice>>,
    prefixes: AHashMap<Prefix4, usize>,
    prefix_match: AHashMap<Prefix4, Vec<usize>>,
    prefix_diff1: AHashMap<Prefix4, Vec<usize>>,
    /// Sorted signatures per cluster, filled by `collect_matches`.
    pub matches: BTreeMap<ClusterId, Vec<Signature>>,
}

impl Trie {
    #[must_use]
    pub fn new(min_oligo: Length, max_oligo: Length, ambiguous: bool) -> Trie {
        Trie {
            min_oligo,
            max_oligo,
            ambiguous,
            slices: Vec::new(),
            prefixes: AHashMap::new(),
            prefix_match: AHashMap::new(),
            prefix_diff1: AHashMap::new(),
            matches: BTreeMap::new(),
        }
    }

    pub fn min_oligo(&self) -> Length {
        self.min_oligo
    }

    pub fn max_oligo(&self) -> Length {
        self.max_oligo
    }

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    /// Instantiate the slices for every prefix that occurs as a window start
    /// in the database, then derive the ambiguity and distance-1 routers.
    /// Read-only afterwards.
    pub fn build_slices(&mut self, source: &Source) {
        assert!(self.slices.is_empty(), "slices already built");
        let minim = Position::from(self.min_oligo);
        let content = source.content();

        fn register(
            prefixes: &mut AHashMap<Prefix4, usize>,
            slices: &mut Vec<Mutex<TrieSlice>>,
            p4: Prefix4,
        ) {
            let next = slices.len();
            prefixes.entry(p4).or_insert_with(|| {
                slices.push(Mutex::new(TrieSlice::new(p4)));
                next
            });
        }

        for fr in source.fragments() {
            let ranges: Vec<Range<Position>> = if self.ambiguous {
                vec![*fr.range()]
            } else {
                fr.ambig_compl().iter().copied().collect()
            };
            for r in ranges {
                if r.size() < minim {
                    continue; // the range will not contribute any window
                }
                for p in r.lo()..=(r.hi() - minim) {
                    register(&mut self.prefixes, &mut self.slices, Prefix4::at(content, p as usize));
                }
            }
        }

        // Ambiguous prefixes: every 4-window that touches an ambiguity.
        let mut ap4: BTreeSet<Prefix4> = BTreeSet::new();
        if !self.ambiguous {
            for fr in source.fragments() {
                let mut c = fr.ambig().clone();
                c.amplify(FIXED_DEPTH as Position - 1);
                for r in c.iter() {
                    let rr = r.intersection(*fr.range());
                    for (p, _) in rr.windows(FIXED_DEPTH as Position, FIXED_DEPTH as Position) {
                        ap4.insert(Prefix4::at(content, p as usize));
                    }
                }
            }
        }

        // prefix -> slices matching under ambiguity overlap
        let mut matchers: BTreeMap<Prefix4, BTreeSet<usize>> = BTreeMap::new();
        for (&pr, &sl) in &self.prefixes {
            matchers.entry(pr).or_default().insert(sl);
        }
        let full = FIXED_DEPTH as u8;
        if self.ambiguous {
            for (&pr1, _) in &self.prefixes {
                for (&pr2, &sl2) in &self.prefixes {
                    if pr1.overlap(pr2) == full {
                        matchers.entry(pr1).or_default().insert(sl2);
                    }
                }
            }
        } else {
            for &pr1 in &ap4 {
                for (&pr2, &sl2) in &self.prefixes {
                    if pr1.overlap(pr2) == full {
                        matchers.entry(pr1).or_default().insert(sl2);
                    }
                }
            }
        }
        self.prefix_match =
            matchers.into_iter().map(|(pr, set)| (pr, set.into_iter().collect())).collect();

        // prefix -> slices at overlap-distance 1
        let mut diff1: BTreeMap<Prefix4, BTreeSet<usize>> = BTreeMap::new();
        for (&pr1, _) in &self.prefixes {
            for (&pr2, &sl2) in &self.prefixes {
                if pr1.overlap(pr2) == full - 1 {
                    diff1.entry(pr1).or_default().insert(sl2);
                }
            }
        }
        if !self.ambiguous {
            for &pr3 in &ap4 {
                for (&pr1, &sl1) in &self.prefixes {
                    if pr1.overlap(pr3) == full - 1 {
                        diff1.entry(pr3).or_default().insert(sl1);
                    }
                }
            }
        }
        self.prefix_diff1 = diff1.into_iter().map(|(pr, set)| (pr, set.into_iter().collect())).collect();

        info!("trie: {} slices, {} ambiguous prefixes", self.slices.len(), ap4.len());
    }

    // ----------------------------- parallel passes

    /// Load every admissible subsequence of the database into the trie.
    pub fn cover(&self, source: &Source, threads: usize) {
        let set = if self.ambiguous { WindowSet::Full } else { WindowSet::Unambiguous };
        let cursor = Mutex::new(Windows::new(source, set, self.min_oligo, self.max_oligo));
        spin(threads, || loop {
            let Some((p, l, s)) = cursor.lock().next() else { break };
            self.add(source, p, l, s);
        });
        debug!("cover done: {} nodes", self.node_count());
    }

    fn add(&self, source: &Source, p: Position, l: Length, s: SeqId) {
        let p4 = Prefix4::at(source.content(), p as usize);
        let idx = *self.prefixes.get(&p4).expect("window start routed to an unknown slice");
        self.slices[idx].lock().add(source, s, p, l, self.min_oligo);
    }

    /// Poison ambiguous subsequences: mark them into every slice their
    /// prefix overlaps.
    pub fn touch(&self, source: &Source, threads: usize) {
        let set = if self.ambiguous { WindowSet::Full } else { WindowSet::AmbiguousPlus };
        let cursor = Mutex::new(Windows::new(source, set, self.min_oligo, self.max_oligo));
        spin(threads, || loop {
            let Some((p, l, s)) = cursor.lock().next() else { break };
            self.mark(source, p, l, s);
        });
    }

    fn mark(&self, source: &Source, p: Position, l: Length, s: SeqId) {
        let p4 = Prefix4::at(source.content(), p as usize);
        if let Some(slices) = self.prefix_match.get(&p4) {
            for &idx in slices {
                self.slices[idx].lock().mark(source, s, p, l, self.min_oligo);
            }
        }
    }

    /// Collapse single-nucleotide differences: erase occurrences that differ
    /// from the walked subsequence in exactly one base.
    pub fn small_diff(&self, source: &Source, threads: usize) {
        let cursor = Mutex::new(Windows::new(source, WindowSet::Full, self.min_oligo, self.max_oligo));
        spin(threads, || loop {
            let Some((p, l, s)) = cursor.lock().next() else { break };
            self.diff(source, p, l, s);
        });
    }

    fn diff(&self, source: &Source, p: Position, l: Length, s: SeqId) {
        let p4 = Prefix4::at(source.content(), p as usize);
        if let Some(slices) = self.prefix_match.get(&p4) {
            for &idx in slices {
                self.slices[idx].lock().small_diff(source, s, p, l, self.min_oligo, 0);
            }
        }
        if let Some(slices) = self.prefix_diff1.get(&p4) {
            for &idx in slices {
                self.slices[idx].lock().small_diff(source, s, p, l, self.min_oligo, 1);
            }
        }
    }

    /// Prune subsequences with homopolymer runs longer than `max_run`.
    pub fn filter_homolo(&self, source: &Source, threads: usize, max_run: Length) {
        let cursor = Mutex::new(0..self.slices.len());
        spin(threads, || loop {
            let Some(idx) = cursor.lock().next() else { break };
            let mut slice = self.slices[idx].lock();
            let prefix = slice.prefix();
            if seq::symbol::max_homopolymer(&prefix.symbols()) > max_run {
                // the slice prefix itself carries the violation
                slice.erase_all();
            } else {
                slice.filter_homolo(
                    source,
                    max_run as usize,
                    prefix.trailing_run(),
                    self.min_oligo as usize,
                );
            }
        });
    }

    /// Canonicalize the occurrence sets: sort them lexicographically and
    /// assign contiguous cluster ids. Single-threaded so the ids are
    /// deterministic across runs.
    pub fn encode_clusters(&self, source: &mut Source) {
        let mut sets: BTreeSet<BTreeSet<SeqId>> = BTreeSet::new();
        for slice in &self.slices {
            slice.lock().encode_clusters(&mut sets);
        }
        source.clusters.encode(sets);
        info!("{} clusters", source.clusters.len());
    }

    /// Write the canonical cluster id into every node and drop the
    /// occurrence multisets.
    pub fn collect_clusters(&self, source: &Source, threads: usize) {
        let cursor = Mutex::new(0..self.slices.len());
        spin(threads, || loop {
            let Some(idx) = cursor.lock().next() else { break };
            self.slices[idx].lock().collect_clusters(&source.clusters);
        });
    }

    /// Confirm the trie against a reference database: erase clusters whose
    /// species set does not contain the species of a matching reference.
    pub fn confirm(
        &self,
        source: &Source,
        threads: usize,
        content: &[Symbol],
        refs: &[(SeqId, Range<Position>)],
    ) {
        if content.is_empty() || refs.is_empty() {
            return;
        }
        let cursor = Mutex::new(pass::RefWindows::new(refs, self.min_oligo, self.max_oligo));
        spin(threads, || loop {
            let Some((re, p, le)) = cursor.lock().next() else { break };
            let p4 = Prefix4::at(content, p as usize);
            if let Some(&idx) = self.prefixes.get(&p4) {
                self.slices[idx].lock().confirm(
                    source,
                    content,
                    re,
                    p as usize,
                    le as usize,
                    self.min_oligo as usize,
                );
            }
        });
    }

    /// Collect `(cluster, position, depth, length)` records from every slice
    /// into the per-cluster match lists.
    pub fn collect_matches(&mut self, threads: usize) {
        let shared: Mutex<BTreeMap<ClusterId, Vec<Signature>>> = Mutex::new(BTreeMap::new());
        let slices = &self.slices;
        let cursor = Mutex::new(0..slices.len());
        spin(threads, || loop {
            let Some(idx) = cursor.lock().next() else { break };
            let mut local: Vec<(ClusterId, Signature)> = Vec::new();
            slices[idx].lock().collect_matches(&mut local);
            let mut all = shared.lock();
            for (cl, sig) in local {
                all.entry(cl).or_default().push(sig);
            }
        });
        self.matches = shared.into_inner();
    }

    /// Sort the signatures of every cluster by window start and length.
    pub fn sort_matches(&mut self, threads: usize) {
        let cursor = Mutex::new(self.matches.values_mut());
        spin(threads, || loop {
            let Some(list) = cursor.lock().next() else { break };
            list.sort_by_key(Signature::sort_key);
        });
    }

    // ----------------------------- queries

    /// The cluster explaining the query window `q[pos .. pos+len)`, walking
    /// the slice of the window's own prefix with overlap matching.
    pub fn cluster_of_query(
        &self,
        source: &Source,
        q: &[Symbol],
        pos: usize,
        len: usize,
    ) -> Option<ClusterId> {
        let p4 = Prefix4::at(q, pos);
        let idx = *self.prefixes.get(&p4)?;
        self.slices[idx].lock().cluster_of_query(source, q, pos, len)
    }

    /// Occurrence set of an exact database subsequence, for inspection and
    /// tests; only valid between `cover` and `collect_clusters`.
    pub fn occurrences_of(&self, source: &Source, pos: Position, len: Length) -> Option<BTreeSet<SeqId>> {
        let p4 = Prefix4::at(source.content(), pos as usize);
        let idx = *self.prefixes.get(&p4)?;
        self.slices[idx].lock().occurrences_of(source, pos, len)
    }

    /// Names of targets that own at least one collected signature.
    pub fn targets_with_matches(&self, source: &Source) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        for &cl in self.matches.keys() {
            let set = source.clusters.sequences_of(cl);
            if let Some(name) = source.targets.name_of(set) {
                result.insert(name.to_string());
            }
        }
        result
    }

    pub fn measure(&self) -> TrieMetrics {
        let mut m = TrieMetrics::default();
        for slice in &self.slices {
            slice.lock().measure(&mut m);
        }
        for (&pr, &sl) in &self.prefixes {
            m.prefix_distribution.insert(pr, self.slices[sl].lock().node_count());
        }
        m
    }

    fn node_count(&self) -> usize {
        self.slices.iter().map(|s| s.lock().node_count()).sum()
    }
}
