use std::collections::BTreeSet;

use ahash::AHashMap;

use seq::{ClusterId, Depth, Length, Position, Prefix4, SeqId, Source, Symbol};

use crate::{Signature, FIXED_DEPTH};

/// Dense node index within one slice. Node 0 is the root; splits mint new
/// ids and no node is ever moved.
pub type Node = u32;

/// Compressed radix subtree holding every subsequence whose first four
/// symbols are this slice's prefix. The prefix itself is not stored in the
/// edges: depths count from [`FIXED_DEPTH`] at the root.
///
/// Node state is laid out struct-of-arrays: the `(position, length)` witness
/// of the incoming edge, the child list keyed by the first edge symbol, the
/// occurrence multiset (dropped after cluster collection) and the cluster id.
///
/// All mutations are serialized by the owning trie's per-slice lock.
pub struct TrieSlice {
    prefix: Prefix4,
    witness: Vec<(Position, Length)>,
    children: Vec<Vec<(Symbol, Node)>>,
    occurrences: AHashMap<Node, Vec<SeqId>>,
    cluster: AHashMap<Node, ClusterId>,
}

impl TrieSlice {
    #[must_use]
    pub fn new(prefix: Prefix4) -> TrieSlice {
        TrieSlice {
            prefix,
            witness: vec![(0, 0)],
            children: vec![Vec::new()],
            occurrences: AHashMap::new(),
            cluster: AHashMap::new(),
        }
    }

    pub fn prefix(&self) -> Prefix4 {
        self.prefix
    }

    fn child_at(&self, n0: Node, sy: Symbol) -> Option<Node> {
        self.children[n0 as usize].iter().find(|(c, _)| *c == sy).map(|(_, n)| *n)
    }

    fn new_child(&mut self, n0: Node, sy: Symbol, p: Position, l: Length) -> Node {
        let n = self.witness.len() as Node;
        self.witness.push((p, l));
        self.children.push(Vec::new());
        self.children[n0 as usize].push((sy, n));
        n
    }

    /// Split the edge of `n0` at depth `dd`: a new node takes over the edge
    /// suffix (keyed by `sy`, its first symbol), inherits the children and a
    /// copy of the occurrences; `n0` keeps the prefix.
    fn split_node(&mut self, n0: Node, sy: Symbol, dd: usize) -> Node {
        let (p0, l0) = self.witness[n0 as usize];
        debug_assert!(dd > 0 && dd < l0 as usize);

        let moved = std::mem::take(&mut self.children[n0 as usize]);
        let n1 = self.new_child(n0, sy, p0 + dd as Position, (l0 as usize - dd) as Length);
        self.children[n1 as usize] = moved;
        self.witness[n0 as usize] = (p0, dd as Length);

        if let Some(occ) = self.occurrences.get(&n0).cloned() {
            self.occurrences.insert(n1, occ);
        }
        n1
    }

    /// Drop every occurrence at `n0` that does not belong to `s`.
    fn erase_occurrences_unless_own(&mut self, n0: Node, s: SeqId) {
        if let Some(occ) = self.occurrences.get_mut(&n0) {
            occ.retain(|&x| x == s);
            if occ.is_empty() {
                self.occurrences.remove(&n0);
            }
        }
    }

    fn erase_child(&mut self, n0: Node, sy: Symbol) {
        // the subtree becomes unreachable; walks always start at the root
        self.children[n0 as usize].retain(|(c, _)| *c != sy);
    }

    pub fn erase_all(&mut self) {
        self.children[0].clear();
    }

    // ----------------------------- add

    /// Record that the subsequence `source[pos .. pos+len)` occurs in
    /// sequence `seq`, with strict symbol equality.
    pub fn add(&mut self, src: &Source, seq: SeqId, pos: Position, len: Length, min: Length) {
        if len as usize <= FIXED_DEPTH {
            return;
        }
        self.add_at(
            src,
            seq,
            0,
            pos + FIXED_DEPTH as Position,
            FIXED_DEPTH,
            len as usize - FIXED_DEPTH,
            min as usize,
        );
    }

    fn add_at(&mut self, src: &Source, seq: SeqId, n0: Node, p: Position, d: usize, l: usize, min: usize) {
        let (p0, l0) = self.witness[n0 as usize];
        let l0 = l0 as usize;

        let mut dd = 0;
        let mut mismatch = false;
        while dd < l0.min(l) {
            if src.symbol(p0 + dd as Position) == src.symbol(p + dd as Position) {
                dd += 1;
                continue;
            }
            mismatch = true;
            break;
        }

        if !mismatch && l0 == l {
            // (1) full match on both: the subsequence has at least minimum
            // length, so the occurrence is always recorded
            self.occurrences.entry(n0).or_default().push(seq);
            if p < p0 {
                // point the witness at the earliest occurrence
                self.witness[n0 as usize] = (p, l0 as Length);
            }
            return;
        }

        if !mismatch && l0 < l {
            // (2) the path extends past the node
            let sy = src.symbol(p + dd as Position);
            if d + dd >= min {
                self.occurrences.entry(n0).or_default().push(seq);
            }
            if p < p0 {
                self.witness[n0 as usize] = (p, l0 as Length);
            }
            if let Some(n) = self.child_at(n0, sy) {
                self.add_at(src, seq, n, p + dd as Position, d + dd, l - dd, min);
                return;
            }
            let n = self.new_child(n0, sy, p + dd as Position, (l - dd) as Length);
            self.occurrences.entry(n).or_default().push(seq);
            return;
        }

        if !mismatch {
            // (3) the node extends past the path: split at the path end
            let sy = src.symbol(p0 + dd as Position);
            let moved = std::mem::take(&mut self.children[n0 as usize]);
            let n = self.new_child(n0, sy, p0 + dd as Position, (l0 - dd) as Length);
            self.children[n as usize] = moved;
            self.witness[n0 as usize] = (p.min(p0), dd as Length);

            if let Some(occ) = self.occurrences.get(&n0).cloned() {
                self.occurrences.insert(n, occ);
            }
            self.occurrences.entry(n0).or_default().push(seq);
            return;
        }

        // (4) divergence on a shared prefix: split and add a sibling for the
        // new suffix
        let sy1 = src.symbol(p0 + dd as Position);
        let sy2 = src.symbol(p + dd as Position);

        let moved = std::mem::take(&mut self.children[n0 as usize]);
        let n1 = self.new_child(n0, sy1, p0 + dd as Position, (l0 - dd) as Length);
        self.children[n1 as usize] = moved;
        let n2 = self.new_child(n0, sy2, p + dd as Position, (l - dd) as Length);
        self.witness[n0 as usize] = (p.min(p0), dd as Length);

        self.occurrences.entry(n2).or_default().push(seq);
        if let Some(occ) = self.occurrences.get(&n0).cloned() {
            self.occurrences.insert(n1, occ);
        }
        if d + dd >= min {
            self.occurrences.entry(n0).or_default().push(seq);
        } else {
            self.occurrences.remove(&n0);
        }
    }

    // ----------------------------- mark

    /// Record an ambiguous subsequence on every path it overlaps. Symbol
    /// comparison is by overlap, and no new sibling is created for the
    /// marking path.
    pub fn mark(&mut self, src: &Source, seq: SeqId, pos: Position, len: Length, min: Length) {
        if len as usize <= FIXED_DEPTH {
            return;
        }
        self.mark_at(
            src,
            seq,
            0,
            pos + FIXED_DEPTH as Position,
            FIXED_DEPTH,
            len as usize - FIXED_DEPTH,
            min as usize,
        );
    }

    fn mark_at(&mut self, src: &Source, seq: SeqId, n0: Node, p: Position, d: usize, l: usize, min: usize) {
        let (p0, l0) = self.witness[n0 as usize];
        let l0 = l0 as usize;

        let mut dd = 0;
        let mut mismatch = false;
        while dd < l0.min(l) {
            if src.symbol(p0 + dd as Position).matches(src.symbol(p + dd as Position)) {
                dd += 1;
                continue;
            }
            mismatch = true;
            break;
        }

        if !mismatch && l0 == l {
            self.occurrences.entry(n0).or_default().push(seq);
            return;
        }

        if !mismatch && l0 < l {
            // traverse every child whose leading symbol overlaps
            let sy = src.symbol(p + dd as Position);
            if d + dd >= min {
                self.occurrences.entry(n0).or_default().push(seq);
            }
            let kids = self.children[n0 as usize].clone();
            for (csy, cn) in kids {
                if sy.matches(csy) {
                    self.mark_at(src, seq, cn, p + dd as Position, d + dd, l - dd, min);
                }
            }
            return;
        }

        if !mismatch {
            // the node extends past the marking path: split, keeping the
            // stored witness
            self.split_node(n0, src.symbol(p0 + dd as Position), dd);
            self.occurrences.entry(n0).or_default().push(seq);
            return;
        }

        // divergence: only the shared prefix is marked, and only at depths
        // that can carry occurrences
        if d + dd < min {
            return;
        }
        self.split_node(n0, src.symbol(p0 + dd as Position), dd);
        self.occurrences.entry(n0).or_default().push(seq);
    }

    // ----------------------------- homopolymer filter

    /// Prune or truncate subtrees whose incoming path forms a homopolymer
    /// run longer than `max_run`. The seed carries the run at the end of the
    /// slice prefix.
    pub fn filter_homolo(
        &mut self,
        src: &Source,
        max_run: usize,
        seed: Option<(Symbol, u8)>,
        min: usize,
    ) {
        let (sy0, h0) = match seed {
            Some((sy, h)) => (Some(sy), h as usize),
            None => (None, 0),
        };
        if h0 > max_run {
            self.erase_all();
            return;
        }
        self.filter_homolo_at(src, max_run, 0, FIXED_DEPTH, sy0, h0, min);
    }

    #[allow(clippy::too_many_arguments)]
    fn filter_homolo_at(
        &mut self,
        src: &Source,
        max_run: usize,
        n0: Node,
        d0: usize,
        sy0: Option<Symbol>,
        h0: usize,
        min: usize,
    ) {
        let kids = self.children[n0 as usize].clone();
        for (csy, n) in kids {
            let mut sy = sy0;
            let mut h = h0;
            let (p, l) = self.witness[n as usize];
            let l = l as usize;

            let mut violated = false;
            for d in 0..l {
                let cur = src.symbol(p + d as Position);
                if sy == Some(cur) {
                    h += 1;
                    if h > max_run {
                        if d0 + d < min {
                            // the run completes before any reportable length
                            self.erase_child(n0, csy);
                        } else {
                            // shorten the edge right before the run overflow
                            self.witness[n as usize] = (p, d as Length);
                            self.children[n as usize].clear();
                        }
                        violated = true;
                        break;
                    }
                    continue;
                }
                sy = Some(cur);
                h = 1;
            }

            if !violated {
                self.filter_homolo_at(src, max_run, n, d0 + l, sy, h, min);
            }
        }
    }

    // ----------------------------- SNP collapsing

    /// Delete occurrences that differ from `seq`'s subsequence in exactly one
    /// base over a shared region of reportable length, keeping `seq`'s own
    /// occurrences. `diffs` is the number of differences already spent on the
    /// slice prefix.
    pub fn small_diff(
        &mut self,
        src: &Source,
        seq: SeqId,
        pos: Position,
        len: Length,
        min: Length,
        diffs: u8,
    ) {
        if len as usize <= FIXED_DEPTH {
            return;
        }
        let p = pos + FIXED_DEPTH as Position;
        let l = len as usize - FIXED_DEPTH;
        if diffs == 0 {
            self.small_diff0(src, 0, p, FIXED_DEPTH, l, seq, min as usize);
        } else {
            self.small_diff1(src, 0, p, FIXED_DEPTH, l, seq, min as usize);
        }
    }

    /// Walk in state "no differences seen yet".
    #[allow(clippy::too_many_arguments)]
    fn small_diff0(&mut self, src: &Source, n0: Node, p: Position, d: usize, l: usize, s: SeqId, min: usize) {
        let (p0, l0) = self.witness[n0 as usize];
        let l0 = l0 as usize;

        let mut dd = 0;
        let mut diff = 0;
        while dd < l0.min(l) {
            if src.symbol(p0 + dd as Position).matches(src.symbol(p + dd as Position)) {
                dd += 1;
                continue;
            }
            diff += 1;
            if diff == 1 {
                // first difference: split here if the shared prefix is
                // already reportable, and continue in the one-difference walk
                if dd > 0 && d + dd >= min {
                    let n1 = self.split_node(n0, src.symbol(p0 + dd as Position), dd);
                    self.erase_occurrences_unless_own(n0, s);
                    self.small_diff1(src, n1, p + dd as Position, d + dd, l - dd, s, min);
                    return;
                }
                dd += 1;
                continue;
            }
            // second difference: the shared region ends here
            if d + dd >= min {
                self.split_node(n0, src.symbol(p0 + dd as Position), dd);
                self.erase_occurrences_unless_own(n0, s);
            }
            return;
        }

        if diff == 0 {
            if l <= l0 {
                return;
            }
            let kids = self.children[n0 as usize].clone();
            for (_, cn) in kids {
                // a non-overlapping child edge spends the single difference
                self.small_diff0(src, cn, p + dd as Position, d + dd, l - dd, s, min);
            }
            return;
        }

        debug_assert_eq!(diff, 1);

        if l < l0 {
            debug_assert!(d + l >= min);
            self.split_node(n0, src.symbol(p0 + l as Position), l);
            self.erase_occurrences_unless_own(n0, s);
            return;
        }

        self.erase_occurrences_unless_own(n0, s);

        if l > l0 {
            debug_assert_eq!(dd, l0);
            let kids = self.children[n0 as usize].clone();
            for (_, cn) in kids {
                self.small_diff1(src, cn, p + dd as Position, d + dd, l - dd, s, min);
            }
        }
    }

    /// Walk in state "exactly one difference seen"; any further mismatch
    /// bails out.
    #[allow(clippy::too_many_arguments)]
    fn small_diff1(&mut self, src: &Source, n0: Node, p: Position, d: usize, l: usize, s: SeqId, min: usize) {
        let (p0, l0) = self.witness[n0 as usize];
        let l0 = l0 as usize;

        let mut dd = 0;
        while dd < l0.min(l) {
            if src.symbol(p0 + dd as Position).matches(src.symbol(p + dd as Position)) {
                dd += 1;
                continue;
            }
            // a second difference
            if dd > 0 && d + dd >= min {
                self.split_node(n0, src.symbol(p0 + dd as Position), dd);
                self.erase_occurrences_unless_own(n0, s);
            }
            return;
        }

        if l0 == l {
            // the subsequence ends exactly at the node
            self.erase_occurrences_unless_own(n0, s);
            return;
        }

        if l0 > l {
            // the subsequence ends inside the node
            self.split_node(n0, src.symbol(p0 + l as Position), l);
            self.erase_occurrences_unless_own(n0, s);
            return;
        }

        debug_assert_eq!(l0, dd);
        if d + l0 >= min {
            self.erase_occurrences_unless_own(n0, s);
        }

        let sy = src.symbol(p + l0 as Position);
        let kids = self.children[n0 as usize].clone();
        for (csy, cn) in kids {
            if sy.matches(csy) {
                self.small_diff1(src, cn, p + l0 as Position, d + l0, l - l0, s, min);
            }
        }
    }

    // ----------------------------- cluster collection

    /// Collect every distinct occurrence set reachable in this slice.
    pub fn encode_clusters(&self, out: &mut BTreeSet<BTreeSet<SeqId>>) {
        self.encode_at(0, out);
    }

    fn encode_at(&self, n: Node, out: &mut BTreeSet<BTreeSet<SeqId>>) {
        for &(_, c) in &self.children[n as usize] {
            self.encode_at(c, out);
        }
        if let Some(occ) = self.occurrences.get(&n) {
            if !occ.is_empty() {
                out.insert(occ.iter().copied().collect());
            }
        }
    }

    /// Write the canonical cluster id into every node with occurrences, then
    /// drop the occurrence multiset.
    pub fn collect_clusters(&mut self, clusters: &seq::ClusterRegistry) {
        self.collect_clusters_at(0, clusters);
        self.occurrences = AHashMap::new();
    }

    fn collect_clusters_at(&mut self, n: Node, clusters: &seq::ClusterRegistry) {
        for i in 0..self.children[n as usize].len() {
            let c = self.children[n as usize][i].1;
            self.collect_clusters_at(c, clusters);
        }
        if let Some(occ) = self.occurrences.get(&n) {
            if occ.is_empty() {
                return;
            }
            let set: BTreeSet<SeqId> = occ.iter().copied().collect();
            let id = clusters.id_of(&set).expect("occurrence set missing from cluster registry");
            self.cluster.insert(n, id);
        }
    }

    /// Emit `(cluster, signature)` records for every clustered node.
    pub fn collect_matches(&self, out: &mut Vec<(ClusterId, Signature)>) {
        self.collect_matches_at(0, FIXED_DEPTH, out);
    }

    fn collect_matches_at(&self, n: Node, d: usize, out: &mut Vec<(ClusterId, Signature)>) {
        let (p, l) = self.witness[n as usize];
        for &(_, c) in &self.children[n as usize] {
            self.collect_matches_at(c, d + l as usize, out);
        }
        if let Some(&cl) = self.cluster.get(&n) {
            out.push((cl, Signature { position: p, depth: d as Depth, length: l }));
        }
    }

    // ----------------------------- reference confirmation

    /// Walk the reference subsequence `query[pos .. pos+len)` with overlap
    /// matching; erase the cluster of every node it reaches unless the
    /// reference's species belongs to the cluster's species set.
    #[allow(clippy::too_many_arguments)]
    pub fn confirm(
        &mut self,
        src: &Source,
        query: &[Symbol],
        reference: SeqId,
        pos: usize,
        len: usize,
        min: usize,
    ) {
        if len <= FIXED_DEPTH {
            return;
        }
        self.confirm_at(src, query, reference, 0, pos + FIXED_DEPTH, FIXED_DEPTH, len - FIXED_DEPTH, min);
    }

    #[allow(clippy::too_many_arguments)]
    fn confirm_at(
        &mut self,
        src: &Source,
        q: &[Symbol],
        re: SeqId,
        n0: Node,
        p: usize,
        d: usize,
        l: usize,
        min: usize,
    ) {
        let (p0, l0) = self.witness[n0 as usize];
        let l0 = l0 as usize;

        let mut dd = 0;
        let mut mismatch = false;
        while dd < l0.min(l) {
            if src.symbol(p0 + dd as Position).matches(q[p + dd]) {
                dd += 1;
                continue;
            }
            mismatch = true;
            break;
        }

        let keep = |slice: &TrieSlice| match slice.cluster.get(&n0) {
            None => true,
            Some(&cl) => src.common_species(re, cl),
        };

        if !mismatch && l0 == l {
            // the reference window ends exactly at the node
            if !keep(self) {
                self.cluster.remove(&n0);
            }
            return;
        }

        if !mismatch && l0 < l {
            // the window continues below; reject this node's cluster where
            // reportable, then descend into overlapping children
            if d + dd >= min && !keep(self) {
                self.cluster.remove(&n0);
            }
            let sy = q[p + dd];
            let kids = self.children[n0 as usize].clone();
            for (csy, cn) in kids {
                if sy.matches(csy) {
                    self.confirm_at(src, q, re, cn, p + dd, d + dd, l - dd, min);
                }
            }
            return;
        }

        if !mismatch {
            // the window ends inside the edge: the prefix part is matched by
            // the reference; split so the rejection is exact
            if self.cluster.get(&n0).is_none() {
                return;
            }
            if keep(self) {
                return;
            }
            let n1 = self.split_node(n0, src.symbol(p0 + dd as Position), dd);
            let cl = self.cluster[&n0];
            self.cluster.insert(n1, cl);
            self.cluster.remove(&n0);
            return;
        }

        // divergence inside the edge: only the shared prefix matched
        if d + dd < min {
            return;
        }
        if self.cluster.get(&n0).is_none() {
            return;
        }
        if keep(self) {
            return;
        }
        let n1 = self.split_node(n0, src.symbol(p0 + dd as Position), dd);
        let cl = self.cluster[&n0];
        self.cluster.insert(n1, cl);
        self.cluster.remove(&n0);
    }

    // ----------------------------- queries

    /// The cluster at the end of the overlap walk of `q[pos .. pos+len)`.
    /// A walk ending mid-edge resolves to the node owning the edge.
    pub fn cluster_of_query(&self, src: &Source, q: &[Symbol], pos: usize, len: usize) -> Option<ClusterId> {
        if len <= FIXED_DEPTH {
            return None;
        }
        self.query_at(src, q, 0, pos + FIXED_DEPTH, len - FIXED_DEPTH)
    }

    fn query_at(&self, src: &Source, q: &[Symbol], n0: Node, p: usize, l: usize) -> Option<ClusterId> {
        for &(csy, cn) in &self.children[n0 as usize] {
            if !csy.matches(q[p]) {
                continue;
            }
            let (pc, lc) = self.witness[cn as usize];
            let lc = lc as usize;
            let m = lc.min(l);
            if !(0..m).all(|k| src.symbol(pc + k as Position).matches(q[p + k])) {
                continue;
            }
            if l <= lc {
                if let Some(&cl) = self.cluster.get(&cn) {
                    return Some(cl);
                }
                continue;
            }
            if let Some(cl) = self.query_at(src, q, cn, p + lc, l - lc) {
                return Some(cl);
            }
        }
        None
    }

    /// Occurrence set of the exact path `source[pos .. pos+len)`, for
    /// inspection and tests.
    pub fn occurrences_of(&self, src: &Source, pos: Position, len: Length) -> Option<BTreeSet<SeqId>> {
        if (len as usize) <= FIXED_DEPTH {
            return None;
        }
        let mut n = 0 as Node;
        let mut p = pos + FIXED_DEPTH as Position;
        let mut l = len as usize - FIXED_DEPTH;
        loop {
            let sy = src.symbol(p);
            let cn = self.child_at(n, sy)?;
            let (pc, lc) = self.witness[cn as usize];
            let lc = lc as usize;
            let m = lc.min(l);
            if !(0..m).all(|k| src.symbol(pc + k as Position) == src.symbol(p + k as Position)) {
                return None;
            }
            if l <= lc {
                return self.occurrences.get(&cn).map(|occ| occ.iter().copied().collect());
            }
            n = cn;
            p += lc as Position;
            l -= lc;
        }
    }

    // ----------------------------- metrics

    pub fn measure(&self, m: &mut crate::TrieMetrics) {
        self.measure_at(0, FIXED_DEPTH, m);
    }

    fn measure_at(&self, n: Node, d: usize, m: &mut crate::TrieMetrics) {
        let (_, l) = self.witness[n as usize];
        m.nodes += 1;
        m.length += l as usize;
        if self.children[n as usize].is_empty() {
            m.leaves += 1;
        }
        if let Some(occ) = self.occurrences.get(&n) {
            m.occurrences += occ.len();
            *m.occurrence_distribution.entry(occ.len()).or_insert(0) += 1;
        }
        *m.depth_distribution.entry(d + l as usize).or_insert(0) += 1;
        *m.length_distribution.entry(l as usize).or_insert(0) += 1;
        for &(_, c) in &self.children[n as usize] {
            self.measure_at(c, d + l as usize, m);
        }
    }

    pub fn node_count(&self) -> usize {
        self.witness.len()
    }
}
