use std::io::Write;

use log::debug;
use parking_lot::Mutex;

use seq::symbol::to_ascii_string;
use seq::{Length, Source, Symbol};

use crate::matrix::{Sq, SqMin};
use crate::Thermo;

/// Serialized diagnostics stream for fold reports.
pub type FoldSink = Mutex<Box<dyn Write + Send>>;

/// Minimum number of unpaired bases inside a hairpin loop.
const MIN_HAIRPIN: usize = 3;

/// Minimum-free-energy single-strand self-folding, by dynamic programming
/// over the nearest-neighbour tables.
///
/// For every `(i, j)` with `min_hairpin < j < ma` the engine computes the
/// minimum free energy of a structure over `s[i ..= i+j]`, either by splitting
/// into two independent sub-structures or by closing the outermost base pair
/// `s[i]`/`s[i+j]` on top of the incoming diagonal stack. The loop-closure
/// energy is chosen by the topology accumulated in the helix/dangle counters:
/// hairpin, bulge, internal loop or multiloop.
///
/// One fold owns its DP buffers and runs single-threaded; the caller runs
/// independent folds on different fragments in parallel.
pub struct Fold<'a> {
    th: &'a Thermo,
    s: &'a [Symbol],
    lo: usize,
    le: usize,
    /// Maximum admissible oligo lengths for `[lo, lo+le)`, indexed relative
    /// to `lo`; truncated in place when a stable structure is found.
    o: &'a mut [Length],
    mi: usize,
    ma: usize,
    truncate: bool,
    out: Option<&'a FoldSink>,

    /// Optimization criterion: free energy at the experimental temperature.
    x: SqMin,
    /// Accumulated stack free energy, if the stack were closed by a match.
    ax: Sq,
    /// Entropy of the optimum fold (needed for the melting temperature).
    ent: Sq,
    /// Accumulated stack entropy.
    aent: Sq,
    /// Depth of a possible stack ending at `(i, j)`: matches and internal
    /// single mismatches.
    depth: Sq,
    /// Traceback: split point `k`, or `j` for a closed pair.
    trace: Sq,
    /// Total number of outermost unstacked nucleotides.
    outer: Sq,
    /// Number of outermost helices.
    helices: Sq,
    /// Length dangling on the left/right side of the outermost helix; the
    /// whole strand length while no helix has formed.
    left: Sq,
    right: Sq,
}

impl<'a> Fold<'a> {
    /// Prepare a fold over `s[lo .. lo+le)` with strand lengths in
    /// `[mi, ma]`. `o` holds the admissible oligo lengths for exactly that
    /// region and is reduced in place when `truncate` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        s: &'a [Symbol],
        lo: usize,
        le: usize,
        o: &'a mut [Length],
        mi: usize,
        ma: usize,
        th: &'a Thermo,
        truncate: bool,
        out: Option<&'a FoldSink>,
    ) -> Fold<'a> {
        assert!(lo + le <= s.len());
        assert_eq!(o.len(), le);
        assert!(mi >= 2 && mi <= ma);
        assert!(le >= ma);

        let mut f = Fold {
            th,
            s,
            lo,
            le,
            o,
            mi,
            ma,
            truncate,
            out,
            x: SqMin::new(),
            ax: Sq::new(),
            ent: Sq::new(),
            aent: Sq::new(),
            depth: Sq::new(),
            trace: Sq::new(),
            outer: Sq::new(),
            helices: Sq::new(),
            left: Sq::new(),
            right: Sq::new(),
        };
        // Single-strand basis: every row shares the hairpin-floor cells,
        // which are never overwritten by the main recursion.
        for i in 0..crate::matrix::MAX_STRAND {
            for j in 0..=MIN_HAIRPIN {
                f.outer.set(i, j, j as i32 + 1);
                f.left.set(i, j, j as i32 + 1);
                f.right.set(i, j, j as i32 + 1);
            }
        }
        f
    }

    /// Run the dynamic program, one column at a time, right to left.
    pub fn fold(&mut self) {
        for ii in (0..self.le).rev() {
            let i = self.lo + ii;
            let jmax = (self.ma - 1).min(self.le - ii - 1);
            for j in (MIN_HAIRPIN + 1)..=jmax {
                self.cell(i, j);
            }
        }
    }

    /// Thermodynamic parameters `(ΔG, ΔH, ΔS, Tm °C)` of the optimum folded
    /// structure over `s[i ..= i+j]`; `None` when there is no structure.
    #[must_use]
    pub fn fold_parameters(&self, i: usize, j: usize) -> Option<(f64, f64, f64, f64)> {
        if self.x.zero_at(i, j) {
            return None;
        }
        let dg = f64::from(self.x.at(i, j)) / 100.0;
        let ds = f64::from(self.ent.at(i, j)) / 10.0;
        let dh = self.th.dh_value(self.x.at(i, j), self.ent.at(i, j));
        let tm = self.th.dg_to_tm(self.x.at(i, j), self.ent.at(i, j), j) - Thermo::K;
        Some((dg, dh, ds, tm))
    }

    fn cell(&mut self, i: usize, j: usize) {
        for k in 0..j {
            let (i1, j1, i2, j2) = (i, k, i + k + 1, j - k - 1);
            if k == 0 {
                // initializes the cell for this pass
                self.join(i, k, j);
                continue;
            }
            if self.x.copy_less(i, j, self.x.at(i1, j1), self.x.at(i2, j2)) {
                self.join(i, k, j);
            }
        }

        if self.s[i].base_pairs(self.s[i + j]) {
            self.pair(i, j);
        } else {
            self.mismatch(i, j);
        }

        if j >= self.mi - 1 && self.o[i - self.lo] as usize >= j {
            // a smaller length has not already been chosen
            if self.truncate && !self.x.zero_at(i, j) {
                let tm = self.th.dg_to_tm(self.x.at(i, j), self.ent.at(i, j), j);
                if tm >= self.th.tx {
                    // the structure is stable at the target temperature:
                    // oligos starting at i may not reach past it
                    self.o[i - self.lo] = j as Length;
                }
            }
            self.show_fold(i, j);
        }
    }

    /// Adopt the split of `[i, i+j]` at `k`, merging the topology counters of
    /// the two sections.
    fn join(&mut self, i: usize, k: usize, j: usize) {
        debug_assert!(k < j);
        let (i1, j1, i2, j2) = (i, k, i + k + 1, j - k - 1);

        self.x.set(i, j, self.x.at(i1, j1), self.x.at(i2, j2));
        self.ax.set(i, j, 0);
        self.ent.set(i, j, self.ent.at(i1, j1) + self.ent.at(i2, j2));
        self.aent.set(i, j, 0);
        self.depth.set(i, j, 0);
        self.trace.set(i, j, k as i32);
        self.outer.set(i, j, self.outer.at(i1, j1) + self.outer.at(i2, j2));
        self.helices.set(i, j, self.helices.at(i1, j1) + self.helices.at(i2, j2));

        if self.helices.at(i1, j1) == 0 {
            // first section is a single strand
            self.left.set(i, j, self.left.at(i1, j1) + self.left.at(i2, j2));
            if self.helices.at(i2, j2) == 0 {
                self.right.set(i, j, self.right.at(i1, j1) + self.right.at(i2, j2));
            } else {
                self.right.set(i, j, self.right.at(i2, j2));
            }
            return;
        }

        if self.helices.at(i2, j2) == 0 {
            // second section is a single strand
            self.left.set(i, j, self.left.at(i1, j1));
            self.right.set(i, j, self.right.at(i1, j1) + j2 as i32);
            return;
        }

        self.left.set(i, j, self.left.at(i1, j1));
        self.right.set(i, j, self.right.at(i2, j2));
    }

    /// `s[i]` and `s[i+j]` can pair: extend the diagonal stack by one
    /// nearest-neighbour dimer and close it when that is the optimum.
    fn pair(&mut self, i: usize, j: usize) {
        debug_assert!(j >= 2);
        let (ii, jj) = (i + 1, j - 2);

        self.depth.set(i, j, self.depth.at(ii, jj) + 1);

        if self.depth.at(ii, jj) == 0 {
            // first match: initialize the potential stack energies with the
            // energy of the loop it would close
            let (dg, ds) = self.loop_energy(ii, jj);
            self.ax.set(i, j, dg);
            self.aent.set(i, j, ds);
            return;
        }

        self.ax.set(i, j, self.ax.at(ii, jj) + self.th.dg.nn_fold(self.s, i, i + j));
        self.aent.set(i, j, self.aent.at(ii, jj) + self.th.ds.nn_fold(self.s, i, i + j));

        if self.x.copy_less(i, j, self.ax.at(i, j), self.th.dg.terminal_at_penalty(self.s, i, i + j)) {
            // this match is the optimum; apply the terminal AT penalty
            self.ent.set(i, j, self.aent.at(i, j) + self.th.ds.terminal_at_penalty(self.s, i, i + j));
            self.trace.set(i, j, j as i32);
            self.left.set(i, j, 0);
            self.right.set(i, j, 0);
            self.outer.set(i, j, 0);
            self.helices.set(i, j, 1); // closing a hairpin creates a helix
        }
    }

    /// `s[i]` and `s[i+j]` cannot pair: a stack may absorb one internal
    /// mismatch; two consecutive mismatches break it into a loop.
    fn mismatch(&mut self, i: usize, j: usize) {
        debug_assert!(j >= 2);
        let (ii, jj) = (i + 1, j - 2);

        if self.depth.at(ii, jj) == 0 || !self.s[ii].base_pairs(self.s[ii + jj]) {
            // cannot start a stack with a mismatch; bail after two
            // consecutive mismatches
            self.depth.set(i, j, 0);
            self.ax.set(i, j, 0);
            self.aent.set(i, j, 0);
            return;
        }

        self.depth.set(i, j, self.depth.at(ii, jj) + 1);
        self.ax.set(i, j, self.ax.at(ii, jj) + self.th.dg.nn_fold(self.s, i, i + j));
        self.aent.set(i, j, self.aent.at(ii, jj) + self.th.ds.nn_fold(self.s, i, i + j));

        if self.depth.at(ii, jj) < 2 {
            return; // cannot close a stack with just one match
        }

        if self.x.copy_less(i, j, self.ax.at(ii, jj), self.th.dg.terminal_mismatch_fold(self.s, i, i + j))
        {
            // the terminal mismatch is the optimum
            self.ent
                .set(i, j, self.aent.at(ii, jj) + self.th.ds.terminal_mismatch_fold(self.s, i, i + j));
            self.trace.set(i, j, j as i32);
            self.left.set(i, j, 1);
            self.right.set(i, j, 1);
            self.outer.set(i, j, 2);
            self.helices.set(i, j, 1);
        }
    }

    /// Energy of closing the loop starting at `i` of relative length `j`,
    /// by the observed topology.
    fn loop_energy(&self, i: usize, j: usize) -> (i32, i32) {
        if j < 2 {
            // cannot close a hairpin of length less than 3
            return (0, 0);
        }
        if self.helices.at(i, j) == 0 {
            // no inner helices: hairpin
            return (self.th.dg.hairpin(self.s, i, i + j), self.th.ds.hairpin(self.s, i, i + j));
        }
        if self.helices.at(i, j) > 1 {
            // two or more inner helices, three counting the one being closed
            let free = self.outer.at(i, j) as usize;
            let h = self.helices.at(i, j) as usize + 1;
            return (self.th.dg.multiloop(free, h), self.th.ds.multiloop(free, h));
        }
        if self.left.at(i, j) == 0 || self.right.at(i, j) == 0 {
            let l = (self.left.at(i, j) + self.right.at(i, j)) as usize;
            return (self.th.dg.bulge(l), self.th.ds.bulge(l));
        }
        (
            self.th.dg.internal_loop(self.left.at(i, j) as usize, self.right.at(i, j) as usize),
            self.th.ds.internal_loop(self.left.at(i, j) as usize, self.right.at(i, j) as usize),
        )
    }

    fn show_fold(&self, i: usize, j: usize) {
        let Some(out) = self.out else { return };

        let tm = if self.x.zero_at(i, j) {
            0.0
        } else {
            self.th.dg_to_tm(self.x.at(i, j), self.ent.at(i, j), j)
        };

        let mut structure = String::with_capacity(j + 1);
        self.render(i, j, &mut structure);

        let mut line = String::new();
        line.push_str(&to_ascii_string(&self.s[i..=i + j]));
        line.push('\t');
        line.push_str(&structure);
        line.push('\t');
        if tm > 1.0 {
            line.push_str(&format!("{:.1}", tm - Thermo::K)); // do not show absolute zero
        }
        if tm >= 100.0 + Thermo::K || tm <= Thermo::K {
            line.push('*'); // mark invalid melting temperatures
        }
        line.push_str(&format!(
            "\tDG = {:.2}  DH = {:.2}  DS = {:.1}  Tm = {:.2}",
            f64::from(self.x.at(i, j)) / 100.0,
            self.th.dh_value(self.x.at(i, j), self.ent.at(i, j)),
            f64::from(self.ent.at(i, j)) / 10.0,
            tm - Thermo::K
        ));

        let mut sink = out.lock();
        let _ = writeln!(sink, "{line}");
    }

    /// Dot-bracket rendering along the traceback; unpairable positions inside
    /// a stack show as `*`.
    fn render(&self, i: usize, j: usize, buf: &mut String) {
        if j == 0 {
            buf.push('.');
            return;
        }
        let k = self.trace.at(i, j) as usize;
        if k == j {
            let d = self.depth.at(i, j) as usize;
            for m in 0..d {
                buf.push(if self.s[i + m].base_pairs(self.s[i + j - m]) { '(' } else { '*' });
            }
            self.render(i + d, j.saturating_sub(2 * d), buf);
            for m in (0..d).rev() {
                buf.push(if self.s[i + m].base_pairs(self.s[i + j - m]) { ')' } else { '*' });
            }
            return;
        }
        self.render(i, k, buf);
        self.render(i + k + 1, j - k - 1, buf);
    }
}

/// Fold every sufficiently long unambiguous range of every fragment and
/// truncate the admissible oligo lengths at structures whose salt-corrected
/// melting temperature reaches the target.
///
/// `max_melting` is the target temperature in °C; `None` computes and reports
/// folds (at 37 °C) without truncating, for `--fold` without `--max-melting`.
/// Each fragment's length map is mutated by exactly one worker.
pub fn filter_melting(
    source: &mut Source,
    threads: usize,
    max_melting: Option<f64>,
    strand_mm: f64,
    salt_m: f64,
    sink: Option<&FoldSink>,
) {
    let min = source.min_oligo() as usize;
    let max = source.max_oligo() as usize;
    let tx = max_melting.unwrap_or(37.0) + Thermo::K;
    let th = Thermo::new(tx, strand_mm, salt_m);
    let truncate = max_melting.is_some();

    debug!("melting filter: Tx = {tx:.2} K, cT = {strand_mm} mM, [Na+] = {salt_m} M");

    let (content, fragments, max_len) = source.melting_view();

    // Carve the length map into one mutable slice per fragment; bytes of
    // excluded fragments fall into the gaps.
    let mut parts: Vec<(usize, &mut [Length])> = Vec::with_capacity(fragments.len());
    let mut rest = max_len;
    let mut offset = 0usize;
    for (fi, fr) in fragments.iter().enumerate() {
        let lo = fr.range().lo() as usize;
        let hi = fr.range().hi() as usize;
        let (_gap, tail) = rest.split_at_mut(lo - offset);
        let (mine, tail) = tail.split_at_mut(hi - lo);
        rest = tail;
        offset = hi;
        parts.push((fi, mine));
    }

    let cursor = Mutex::new(parts.into_iter());
    std::thread::scope(|scope| {
        for _ in 0..threads.max(1) {
            scope.spawn(|| loop {
                let Some((fi, part)) = cursor.lock().next() else { break };
                let fr = &fragments[fi];
                let frag_lo = fr.range().lo() as usize;
                for r in fr.ambig_compl().iter() {
                    let (rlo, rhi) = (r.lo() as usize, r.hi() as usize);
                    if rhi - rlo < min {
                        continue; // skip ranges that are too small
                    }
                    let o = &mut part[rlo - frag_lo..rhi - frag_lo];
                    let ma = (rhi - rlo).min(max);
                    let mut fold = Fold::new(content, rlo, rhi - rlo, o, min, ma, &th, truncate, sink);
                    fold.fold();
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq::symbol::from_ascii_str;

    /// Fold a standalone sequence over its full length and return the
    /// parameters of the top cell.
    fn fold_parameters_of(s: &str) -> (f64, f64, f64, f64) {
        let th = Thermo::new(
            Thermo::T37C, // Tx = 37C
            0.01,         // cT = 0.01 mM
            1.0,          // [Na+] = 1M
        );
        let nu = from_ascii_str(s).unwrap();
        let l = nu.len();
        let mut o = vec![l as Length; l];
        let mut f = Fold::new(&nu, 0, l, &mut o, l, l, &th, false, None);
        f.fold();
        f.fold_parameters(0, l - 1).expect("folded structure")
    }

    fn check(s: &str, want: (f64, f64, f64, f64), error: f64) {
        let (dg, dh, ds, tm) = fold_parameters_of(s);
        assert!((dg - want.0).abs() <= error, "{s}: DG {dg} vs {}", want.0);
        assert!((dh - want.1).abs() <= error, "{s}: DH {dh} vs {}", want.1);
        assert!((ds - want.2).abs() <= error, "{s}: DS {ds} vs {}", want.2);
        assert!((tm - want.3).abs() <= error, "{s}: Tm {tm} vs {}", want.3);
    }

    #[test]
    fn triloop_hairpins() {
        check("CGCAAAGCG", (-0.9, -20.4, -62.9, 51.1), 0.05);
        check("GCGAAACGC", (-0.9, -20.4, -62.9, 51.1), 0.05);
        check("GCAAAATGC", (-0.1, -16.1, -51.5, 39.5), 0.05);
    }

    #[test]
    fn at_closed_hairpins() {
        check("ATGAAACAT", (1.2, -13.5, -47.5, 11.1), 0.05);
        check("TAGAAACTA", (1.7, -12.8, -46.7, 1.0), 0.05);
    }

    #[test]
    fn longer_stems_and_terminal_mismatches() {
        check("GTAGAAACTAC", (0.2, -23.4, -76.0, 34.8), 0.05);
        check("ACGCAAAGCGT", (-2.3, -26.6, -78.4, 66.1), 0.05);
        check("ACGCAAAGCGA", (-2.8, -28.8, -84.0, 69.7), 0.06);
        check("AACGCAAAGCGAA", (-2.8, -28.8, -84.0, 69.7), 0.06);
    }

    #[test]
    fn unfoldable_sequence_has_no_parameters() {
        let th = Thermo::new(Thermo::T37C, 0.01, 1.0);
        let nu = from_ascii_str("AAAAAAAAA").unwrap();
        let l = nu.len();
        let mut o = vec![l as Length; l];
        let mut f = Fold::new(&nu, 0, l, &mut o, l, l, &th, false, None);
        f.fold();
        assert!(f.fold_parameters(0, l - 1).is_none());
    }

    #[test]
    fn truncation_cuts_stable_structures() {
        // CGCAAAGCG folds with Tm = 51.1C: at a 40C target the admissible
        // length at position 0 must be cut below the full 9-mer
        let th = Thermo::new(40.0 + Thermo::K, 0.01, 1.0);
        let nu = from_ascii_str("CGCAAAGCGACGT").unwrap();
        let l = nu.len();
        let mut o = vec![9 as Length; l];
        let mut f = Fold::new(&nu, 0, l, &mut o, 8, 9, &th, true, None);
        f.fold();
        assert!(o[0] < 9, "length at 0 is {}", o[0]);

        // at a 60C target the same fold melts and nothing is truncated
        let th = Thermo::new(60.0 + Thermo::K, 0.01, 1.0);
        let mut o = vec![9 as Length; l];
        let mut f = Fold::new(&nu, 0, l, &mut o, 8, 9, &th, true, None);
        f.fold();
        assert_eq!(o[0], 9);
    }
}
