use seq::{Length, Position, Range, SeqId, Source};

/// Spin a fixed pool of scoped workers over a shared closure. Every pass
/// owns its work cursor explicitly and hands it to the workers; a worker
/// blocks only on the cursor mutex and on per-slice locks.
pub(crate) fn spin<F>(threads: usize, worker: F)
where
    F: Fn() + Sync,
{
    std::thread::scope(|scope| {
        for _ in 0..threads.max(1) {
            scope.spawn(&worker);
        }
    });
}

/// Which windows of each fragment a pass iterates.
#[derive(Clone, Copy)]
pub(crate) enum WindowSet {
    /// Windows over the unambiguous ranges, lengths from the admissible
    /// length map (cover).
    Unambiguous,
    /// Windows whose oligo can touch an ambiguity: the ambiguity cover
    /// amplified by `max_oligo - 1`, clamped to the fragment (touch).
    AmbiguousPlus,
    /// Every window of the whole fragment range (SNP collapsing and the
    /// ambiguous trie).
    Full,
}

/// Shared work-unit iterator for the parallel passes: yields one
/// `(position, length, sequence)` triple per admissible window.
pub(crate) struct Windows<'a> {
    source: &'a Source,
    set: WindowSet,
    min: Position,
    max: Position,
    frag: usize,
    loaded: bool,
    seq: SeqId,
    universe: Range<Position>,
    ranges: Vec<Range<Position>>,
    ri: usize,
    p: Position,
}

impl<'a> Windows<'a> {
    pub(crate) fn new(source: &'a Source, set: WindowSet, min: Length, max: Length) -> Windows<'a> {
        Windows {
            source,
            set,
            min: Position::from(min),
            max: Position::from(max),
            frag: 0,
            loaded: false,
            seq: 0,
            universe: Range::zero(),
            ranges: Vec::new(),
            ri: 0,
            p: 0,
        }
    }

    fn load_fragment(&mut self) -> bool {
        let fragments = self.source.fragments();
        if self.frag >= fragments.len() {
            return false;
        }
        let fr = &fragments[self.frag];
        self.seq = fr.sequence;
        self.universe = *fr.range();
        self.ranges = match self.set {
            WindowSet::Unambiguous => fr.ambig_compl().iter().copied().collect(),
            WindowSet::AmbiguousPlus => fr.ambig_plus().iter().copied().collect(),
            WindowSet::Full => vec![*fr.range()],
        };
        self.ri = 0;
        self.p = self.ranges.first().map_or(0, Range::lo);
        self.loaded = true;
        true
    }

    fn length_at(&self, r: &Range<Position>) -> Position {
        match self.set {
            WindowSet::Unambiguous => {
                if self.p >= r.hi() {
                    return 0;
                }
                Position::from(self.source.max_len()[self.p as usize])
            }
            WindowSet::AmbiguousPlus => r.cover_at_in(self.p, self.min, self.max, &self.universe),
            WindowSet::Full => r.cover_at(self.p, self.min, self.max),
        }
    }
}

impl Iterator for Windows<'_> {
    type Item = (Position, Length, SeqId);

    fn next(&mut self) -> Option<(Position, Length, SeqId)> {
        loop {
            if !self.loaded && !self.load_fragment() {
                return None;
            }
            if self.ri >= self.ranges.len() {
                self.frag += 1;
                self.loaded = false;
                continue;
            }
            let r = self.ranges[self.ri];
            if self.p < r.lo() {
                self.p = r.lo();
            }
            let le = self.length_at(&r);
            if le == 0 {
                self.ri += 1;
                self.p = self.ranges.get(self.ri).map_or(0, Range::lo);
                continue;
            }
            let p = self.p;
            self.p += 1;
            return Some((p, le as Length, self.seq));
        }
    }
}

/// Work-unit iterator for reference confirmation: windows of every reference
/// sequence range.
pub(crate) struct RefWindows<'a> {
    refs: &'a [(SeqId, Range<Position>)],
    min: Position,
    max: Position,
    i: usize,
    p: Position,
}

impl<'a> RefWindows<'a> {
    pub(crate) fn new(refs: &'a [(SeqId, Range<Position>)], min: Length, max: Length) -> RefWindows<'a> {
        let p = refs.first().map_or(0, |(_, r)| r.lo());
        RefWindows { refs, min: Position::from(min), max: Position::from(max), i: 0, p }
    }
}

impl Iterator for RefWindows<'_> {
    type Item = (SeqId, Position, Position);

    fn next(&mut self) -> Option<(SeqId, Position, Position)> {
        loop {
            let (re, r) = *self.refs.get(self.i)?;
            let le = r.cover_at(self.p, self.min, self.max);
            if le == 0 {
                self.i += 1;
                self.p = self.refs.get(self.i).map_or(0, |(_, r)| r.lo());
                continue;
            }
            let p = self.p;
            self.p += 1;
            return Some((re, p, le));
        }
    }
}
