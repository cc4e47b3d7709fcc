use std::fmt::{self, Debug, Display, Formatter};
use std::mem;

use num::{PrimInt, Unsigned};

use crate::range::Range;

/// Sorted set of disjoint [`Range`]s together with a universe range.
///
/// Tracks the ambiguous sections of a fragment (the universe being the
/// fragment itself), and more generally any set of admissible positions.
/// Insertion merges overlapping ranges; amplification may leave ranges
/// hanging past the right edge of the universe, which window queries clamp.
#[derive(Clone, PartialEq, Eq)]
pub struct Cover<T> {
    universe: Range<T>,
    ranges: Vec<Range<T>>,
}

impl<T: PrimInt + Unsigned> Default for Cover<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PrimInt + Unsigned> Cover<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { universe: Range::universe(), ranges: Vec::new() }
    }

    #[must_use]
    pub fn with_universe(universe: Range<T>) -> Self {
        Self { universe, ranges: Vec::new() }
    }

    /// Build from parts; test support.
    #[must_use]
    pub fn from_ranges(universe: Range<T>, ranges: impl IntoIterator<Item = Range<T>>) -> Self {
        let mut c = Self::with_universe(universe);
        for r in ranges {
            c.insert(r);
        }
        c
    }

    pub fn universe(&self) -> &Range<T> {
        &self.universe
    }

    pub fn set_universe(&mut self, u: Range<T>) {
        self.universe = u;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range<T>> {
        self.ranges.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.universe = Range::universe();
        self.ranges.clear();
    }

    /// Sum of the lengths of all ranges.
    pub fn length(&self) -> T {
        self.ranges.iter().fold(T::zero(), |acc, r| acc + r.size())
    }

    /// Whether any range contains the element.
    pub fn contains(&self, e: T) -> bool {
        self.ranges.iter().any(|r| r.contains(e))
    }

    /// Add a range, repeatedly combining it with any overlapping range so the
    /// set stays disjoint. Empty ranges are rejected.
    pub fn insert(&mut self, r: Range<T>) {
        if r.is_empty() {
            return;
        }
        let mut merged = r;
        self.ranges.retain(|q| {
            if q.overlaps(merged) {
                merged.union_with(*q);
                false
            } else {
                true
            }
        });
        let at = self.ranges.partition_point(|q| *q < merged);
        self.ranges.insert(at, merged);
    }

    /// Complement within the universe. Requires the ranges to lie inside the
    /// universe (covers that have not been amplified).
    #[must_use]
    pub fn complement(&self) -> Cover<T> {
        let mut result = Cover::with_universe(self.universe);
        let mut lo = self.universe.lo();
        for r in &self.ranges {
            if r.hi() <= lo {
                continue;
            }
            let rl = r.lo().max(lo).min(self.universe.hi());
            if rl > lo {
                result.ranges.push(Range::from_bounds(lo, rl));
            }
            lo = lo.max(r.hi());
            if lo >= self.universe.hi() {
                break;
            }
        }
        if lo < self.universe.hi() {
            result.ranges.push(Range::from_bounds(lo, self.universe.hi()));
        }
        result
    }

    /// Shift the universe and every range towards higher values; ranges are
    /// clamped to the shifted universe. Supports relocating a cover onto the
    /// reverse-complement copy of its fragment.
    pub fn shift_right(&mut self, a: T) {
        let old = mem::take(&mut self.ranges);
        self.universe = self.universe.shift_right(a);
        for r in old {
            let shifted = r.shift_right(a).intersection(self.universe);
            self.insert(shifted);
        }
    }

    /// Amplify every range by `a`, chopping at the left edge of the universe
    /// only (window queries handle the right edge) and merging overlaps.
    pub fn amplify(&mut self, a: T) {
        if self.ranges.is_empty() {
            return;
        }
        let old = mem::take(&mut self.ranges);
        for r in old {
            let mut r2 = r.amplify(a);
            if r2.lo() < self.universe.lo() {
                r2 = Range::from_bounds(self.universe.lo(), r2.hi().max(self.universe.lo()));
            }
            self.insert(r2);
        }
    }

    /// Reverse ("flip") the cover so that it matches the reversed string:
    /// each `[l, h)` maps to `[u_hi - h + u_lo, u_hi - l + u_lo)`.
    pub fn flip(&mut self) {
        let u = self.universe;
        let mut flipped: Vec<Range<T>> = self
            .ranges
            .iter()
            .map(|r| Range::new(u.hi() - r.hi() + u.lo(), r.size()))
            .collect();
        flipped.reverse();
        self.ranges = flipped;
    }

    /// Windowed maximum: the largest total range length that fits within any
    /// window of length `w` inside the universe.
    ///
    /// Quantifies how crowded the ambiguities of a fragment are.
    pub fn window(&self, w: T) -> T {
        if self.ranges.is_empty() || w == T::zero() {
            return T::zero();
        }
        if self.universe.size() <= w {
            return self
                .ranges
                .iter()
                .map(|r| r.intersection(self.universe).size())
                .fold(T::zero(), |a, b| a + b);
        }
        let start_max = self.universe.hi() - w;
        let clamp = |p: T| p.max(self.universe.lo()).min(start_max);

        // A maximizing window starts at a range's low bound or ends at a
        // range's high bound.
        let mut best = T::zero();
        for anchor in &self.ranges {
            let starts =
                [clamp(anchor.lo()), clamp(if anchor.hi() >= w { anchor.hi() - w } else { T::zero() })];
            for p in starts {
                let win = Range::new(p, w);
                let total = self
                    .ranges
                    .iter()
                    .map(|r| r.intersection(win).size())
                    .fold(T::zero(), |a, b| a + b);
                best = best.max(total);
            }
        }
        best
    }
}

impl<T: PrimInt + Unsigned + Display> Display for Cover<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.universe)?;
        for r in &self.ranges {
            write!(f, "{r}")?;
        }
        write!(f, "}}")
    }
}

impl<T: PrimInt + Unsigned + Display> Debug for Cover<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type R = Range<u32>;
    type C = Cover<u32>;

    #[test]
    fn insert_merges_overlaps() {
        let mut c = C::new();
        c.insert(R::new(10, 5));
        c.insert(R::new(30, 5));
        c.insert(R::new(12, 25)); // bridges both
        let all: Vec<R> = c.iter().copied().collect();
        assert_eq!(all, vec![R::from_bounds(10, 37)]);
        assert_eq!(c.length(), 27);
    }

    #[test]
    fn insert_keeps_adjacent_ranges_separate() {
        let mut c = C::new();
        c.insert(R::new(0, 5));
        c.insert(R::new(5, 5));
        assert_eq!(c.iter().count(), 2);
        assert_eq!(c.length(), 10);
    }

    #[test]
    fn complement_within_universe() {
        let c = C::from_ranges(R::new(10, 90), [R::new(20, 10), R::new(50, 10)]);
        let comp = c.complement();
        let all: Vec<R> = comp.iter().copied().collect();
        assert_eq!(all, vec![R::from_bounds(10, 20), R::from_bounds(30, 50), R::from_bounds(60, 100)]);
    }

    #[test]
    fn complement_of_empty_is_universe() {
        let c = C::with_universe(R::new(5, 10));
        let all: Vec<R> = c.complement().iter().copied().collect();
        assert_eq!(all, vec![R::from_bounds(5, 15)]);
    }

    #[test]
    fn flip_spot_check() {
        // universe [10000, 20000): {[10100,10200),[10300,10600)}
        //   flips to {[19400,19700),[19800,19900)}
        let mut c = C::from_ranges(R::new(10_000, 10_000), [R::new(10_100, 100), R::new(10_300, 300)]);
        c.flip();
        let want = C::from_ranges(R::new(10_000, 10_000), [R::new(19_400, 300), R::new(19_800, 100)]);
        assert_eq!(c, want);
    }

    #[test]
    fn shift_for_reverse_complement() {
        let mut c = C::from_ranges(R::new(0, 100), [R::new(10, 5)]);
        c.shift_right(100);
        assert_eq!(*c.universe(), R::from_bounds(100, 200));
        let all: Vec<R> = c.iter().copied().collect();
        assert_eq!(all, vec![R::from_bounds(110, 115)]);
    }

    #[test]
    fn amplify_chops_left_only() {
        let mut c = C::from_ranges(R::new(10, 100), [R::new(12, 4), R::new(105, 4)]);
        c.amplify(4);
        let all: Vec<R> = c.iter().copied().collect();
        // left range clipped at the universe's low bound, right range hangs over
        assert_eq!(all, vec![R::from_bounds(10, 20), R::from_bounds(101, 113)]);
    }

    #[test]
    fn windowed_max() {
        let c = C::from_ranges(R::new(0, 1000), [R::new(10, 4), R::new(20, 4), R::new(500, 30)]);
        assert_eq!(c.window(32), 30);
        assert_eq!(c.window(20), 20); // a window fully inside the big range
        assert_eq!(C::new().window(10), 0);

        let sparse = C::from_ranges(R::new(0, 1000), [R::new(10, 4), R::new(20, 4), R::new(40, 4)]);
        assert_eq!(sparse.window(16), 8); // [10, 26) holds the first two ranges
        assert_eq!(sparse.window(36), 12);
        assert_eq!(sparse.window(10), 4);
    }

    #[test]
    fn windowed_max_small_universe() {
        let c = C::from_ranges(R::new(0, 20), [R::new(2, 4), R::new(10, 4)]);
        assert_eq!(c.window(32), 8);
    }
}
