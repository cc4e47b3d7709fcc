use std::collections::BTreeSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::error;
use parking_lot::Mutex;

use seq::{ClusterId, Cover, FastaSink, Length, Position, Range, SeqId, Source, Symbol};
use sigtrie::Trie;

use crate::alignment::{Alignment, MAX_ALIGN_LENGTH};

/// Ignore query sequences with less area explained by clusters.
const MIN_CLUSTER_AREA_RATIO: f64 = 0.75;
/// Multiplier for the window size vs. the minimum query length.
const SIZE_FACTOR: usize = 2;

/// Classifies query sequences against the built trie: minimum-cover cluster
/// selection followed by global alignment against the covering sequences.
///
/// Consumes a FASTA event stream, buffering sequences and processing each
/// batch with a worker pool; one output line per query, serialized by the
/// stream lock.
pub struct MatchQuery<'a> {
    trie: &'a Trie,
    source: &'a Source,
    out: &'a Mutex<Box<dyn Write + Send>>,
    threads: usize,
    /// Sliding window length: the maximum oligo size.
    window: Length,
    buffer_size: usize,

    pending: Vec<(String, Cover<Position>)>,
    content: Vec<Symbol>,
    cur_name: String,
    cur_lo: Position,
    cur_ambig: Cover<Position>,
    in_fragment: bool,
}

impl<'a> MatchQuery<'a> {
    #[must_use]
    pub fn new(
        trie: &'a Trie,
        source: &'a Source,
        out: &'a Mutex<Box<dyn Write + Send>>,
        threads: usize,
    ) -> MatchQuery<'a> {
        MatchQuery {
            trie,
            source,
            out,
            threads,
            window: trie.max_oligo(),
            buffer_size: (threads * 4).max(256),
            pending: Vec::new(),
            content: Vec::new(),
            cur_name: String::new(),
            cur_lo: 0,
            cur_ambig: Cover::new(),
            in_fragment: false,
        }
    }

    /// Process the buffered batch of query sequences.
    fn process(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let content = std::mem::take(&mut self.content);

        let next = AtomicUsize::new(0);
        let this: &MatchQuery<'_> = self;
        std::thread::scope(|scope| {
            for _ in 0..this.threads.max(1) {
                scope.spawn(|| {
                    let mut al = Alignment::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some((name, cover)) = pending.get(i) else { break };
                        this.on_sequence(name, cover, &content, &mut al);
                    }
                });
            }
        });
    }

    /// Classify one query sequence and write its result line.
    fn on_sequence(&self, name: &str, cover: &Cover<Position>, content: &[Symbol], al: &mut Alignment) {
        let qrange = *cover.universe();
        let qlen = qrange.size() as usize;
        let window = self.window as usize;
        let min_area = (MIN_CLUSTER_AREA_RATIO * qlen as f64) as i64;

        if qlen < SIZE_FACTOR * window {
            // too short for a meaningful cover
            self.print(name, "", 0.0, qlen, qlen, 0, 0);
            return;
        }

        if qlen >= MAX_ALIGN_LENGTH {
            error!("query sequence too long ({name}): {qlen} >= {MAX_ALIGN_LENGTH}");
            self.print(name, "", 0.0, qlen, qlen, 0, 0);
            return;
        }

        // (1) clusters explaining windows of the query
        let mut set_clusters: BTreeSet<ClusterId> = BTreeSet::new();
        let mut po_cluster: Vec<(Position, ClusterId)> = Vec::new();
        let mut max_set: BTreeSet<SeqId> = BTreeSet::new();

        let mut last_position: Position = 0;
        let mut area: i64 = 0;

        for ra in cover.complement().iter() {
            let mut p = ra.lo();
            loop {
                let le = ra.cover_at(p, window as Position, window as Position);
                if le == 0 {
                    break;
                }
                if let Some(clu) = self.trie.cluster_of_query(self.source, content, p as usize, le as usize)
                {
                    if p <= last_position {
                        area -= i64::from(last_position - p);
                    }
                    last_position = p + le;
                    area += i64::from(le);

                    if set_clusters.insert(clu) {
                        max_set.extend(self.source.clusters.sequences_of(clu));
                    }
                    po_cluster.push((p, clu));
                }
                p += 1;
            }
        }

        if area < min_area {
            // too many positions unexplained by any cluster
            let pct = 100.0 * area as f64 / qlen as f64;
            self.print(name, "", pct, qlen, qlen, 0, max_set.len());
            return;
        }

        // (2) greedy minimum cover, smallest cluster sets first
        let mut sorted: Vec<ClusterId> = set_clusters.iter().copied().collect();
        sorted.sort_by_key(|&c| (self.source.clusters.sequences_of(c).len(), c));

        let mut min_set: BTreeSet<SeqId> = BTreeSet::new();
        for cl1 in sorted {
            let mut s1: BTreeSet<SeqId> = self.source.clusters.sequences_of(cl1).clone();
            if !min_set.is_disjoint(&s1) {
                continue;
            }

            let mut last_position: Position = 0;
            let mut area: i64 = 0;
            for &(p, cl2) in &po_cluster {
                let s2: BTreeSet<SeqId> =
                    self.source.clusters.sequences_of(cl2).intersection(&s1).copied().collect();
                if s2.is_empty() {
                    continue; // no overlap with the running minimum set
                }
                s1 = s2;

                if p <= last_position {
                    area -= i64::from(last_position - p);
                }
                last_position = p + window as Position;
                area += window as i64;
            }

            if area < min_area {
                continue;
            }
            min_set.extend(s1);
        }

        if min_set.is_empty() {
            self.print(name, "", 100.0 * MIN_CLUSTER_AREA_RATIO, qlen, qlen, 0, max_set.len());
            return;
        }

        // (3) align the query to all fragments of the minimum-set sequences
        let query = &content[qrange.lo() as usize..qrange.hi() as usize];
        let mut aligned: Vec<(SeqId, f64, u32)> = Vec::new();
        for &se in &min_set {
            for &fid in self.source.fragments_of(se) {
                let fr: &Range<Position> = self.source.fragment(fid).range();
                let subject = &self.source.content()[fr.lo() as usize..fr.hi() as usize];
                let e = al.align(query, subject);
                debug_assert!(e.l > 0);
                aligned.push((se, 100.0 * f64::from(e.m) / f64::from(e.l), e.l));
            }
        }
        assert!(!aligned.is_empty());

        // (4) report every source at the maximum match percentage
        let best = aligned.iter().map(|&(_, pct, _)| pct).fold(f64::MIN, f64::max);
        for &(se, pct, l) in &aligned {
            if pct == best {
                self.print(
                    name,
                    self.source.name_of(se),
                    pct,
                    l as usize,
                    qlen,
                    min_set.len(),
                    max_set.len(),
                );
            }
        }
    }

    /// One tab-separated result line.
    #[allow(clippy::too_many_arguments)]
    fn print(
        &self,
        name: &str,
        source_name: &str,
        pct: f64,
        overlap: usize,
        qlen: usize,
        min_set: usize,
        max_set: usize,
    ) {
        let source_col = if source_name.is_empty() { "-" } else { source_name };
        let approx = if source_name.is_empty() && pct > 0.0 { "<" } else { "" };
        let mut out = self.out.lock();
        let _ = writeln!(
            out,
            "{name}\t{source_col}\t{approx}{pct:.1}%\t{overlap}\t{qlen}\t{min_set}\t{max_set}"
        );
    }
}

impl FastaSink for MatchQuery<'_> {
    fn begin_fragment(&mut self, name: &str, _file: &str) {
        assert!(!self.in_fragment);
        self.in_fragment = true;
        self.cur_name = name.split_whitespace().next().unwrap_or("").to_string();
        self.cur_lo = self.content.len() as Position;
        self.cur_ambig = Cover::new();
    }

    fn append_run(&mut self, run: &[Symbol], ambiguous: bool) {
        if ambiguous {
            let start = self.content.len() as Position;
            self.cur_ambig.insert(Range::new(start, run.len() as Position));
        }
        self.content.extend_from_slice(run);
    }

    fn end_fragment(&mut self) -> anyhow::Result<()> {
        assert!(self.in_fragment);
        self.in_fragment = false;

        let le = self.content.len() as Position - self.cur_lo;
        let mut ambig = std::mem::take(&mut self.cur_ambig);
        ambig.set_universe(Range::new(self.cur_lo, le));

        let name = std::mem::take(&mut self.cur_name);
        self.pending.push((name, ambig));

        if self.pending.len() >= self.buffer_size {
            self.process();
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.process();
        Ok(())
    }
}
