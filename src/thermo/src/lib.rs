pub mod params;

mod table;
pub use table::NnTable;

mod matrix;

pub mod fold;
pub use fold::{filter_melting, Fold, FoldSink};

use seq::symbol::from_ascii_str;
use seq::Symbol;

/// Thermodynamic context: nearest-neighbour tables precomputed for one
/// experimental temperature, strand concentration and salt concentration.
///
/// Melting temperatures are derived through the pseudo-melting temperature
/// formulation: `Tp = ΔG⁰/ρ` is additive across nearest-neighbour
/// contributions and sits on the same side of the experimental temperature
/// `Tx` as the actual melting temperature,
/// `Tx − Tp = (1 + α)(Tx − Tm)` with `α = ΔS/ρ`.
pub struct Thermo {
    /// Experimental temperature (K).
    pub tx: f64,
    /// Strand concentration (mM).
    pub ct: f64,
    /// Pseudo-melting temperature divisor `R·ln(cT/x/1000)`.
    pub rho: f64,
    /// [Na⁺] concentration (M).
    pub na: f64,
    /// Salt adjustment factor `0.184·ln[Na⁺]`.
    pub lambda: f64,
    /// `λ/ρ`, 1000x.
    lambda_rho_milli: i32,

    /// Enthalpy (10x kcal/mol).
    pub dh: NnTable,
    /// Entropy (10x e.u.).
    pub ds: NnTable,
    /// Free energy at 37 °C (100x kcal/mol).
    pub dg37: NnTable,
    /// Free energy at the experimental temperature (100x kcal/mol).
    pub dg: NnTable,
    /// Pseudo-melting temperature at 1 M NaCl (1000x K).
    pub tp: NnTable,
}

impl Thermo {
    /// Gas constant (cal/K/mol).
    pub const R: f64 = 1.9872;
    /// 0 °C (K).
    pub const K: f64 = 273.15;
    /// 37 °C (K).
    pub const T37C: f64 = Thermo::K + 37.0;
    /// Strand concentration divisor (SantaLucia and Hicks 2004; eq. 3);
    /// always 1 for oligonucleotides.
    pub const X: f64 = 1.0;

    /// Build the context for experimental temperature `tx` (K), strand
    /// concentration `ct` (mM) and `[Na⁺] = na` (M).
    #[must_use]
    pub fn new(tx: f64, ct: f64, na: f64) -> Thermo {
        let rho = Thermo::R * (ct / Thermo::X / 1000.0).ln(); // 1000 converts from mM to M
        let lambda = 0.184 * na.ln();
        let mut th = Thermo {
            tx,
            ct,
            rho,
            na,
            lambda,
            lambda_rho_milli: (lambda / rho * 1000.0).round() as i32,
            dh: NnTable::default(),
            ds: NnTable::default(),
            dg37: NnTable::default(),
            dg: NnTable::default(),
            tp: NnTable::default(),
        };
        th.init();
        th
    }

    /// Free energy (kcal/mol) at temperature `t` (K) from enthalpy (kcal/mol)
    /// and entropy (e.u.).
    #[must_use]
    pub fn dg_value(dh: f64, ds: f64, t: f64) -> f64 {
        dh - t * ds / 1000.0
    }

    /// Pseudo-melting temperature (K, 1000x) at 1 M NaCl.
    #[must_use]
    pub fn pseudo_t(&self, dh: f64, ds: f64) -> i32 {
        let dg0 = dh * 1000.0 - self.tx * ds; // cal/mol
        (dg0 / self.rho * 1000.0).round() as i32
    }

    /// Salt-corrected pseudo-melting temperature (K, 1000x) of an `n`-mer.
    #[must_use]
    pub fn pseudo_t_salt(&self, tp: i32, n: usize) -> i32 {
        tp - self.lambda_rho_milli * (n as i32 - 1)
    }

    /// Melting temperature (K) from the pseudo-melting temperature (1000x)
    /// and the entropy term (10x):
    /// `Tm = Tx − (Tx − Tp_n) / (1 + α_n)`.
    #[must_use]
    pub fn tm(&self, tp: i32, ds: i32, n: usize) -> f64 {
        let alpha_n =
            f64::from(ds) / 10.0 / self.rho + f64::from(self.lambda_rho_milli) / 1000.0 * (n as f64 - 1.0);
        let tp_n = f64::from(tp) / 1000.0 - f64::from(self.lambda_rho_milli) / 1000.0 * (n as f64 - 1.0);
        assert!(1.0 + alpha_n > 0.0);
        self.tx - (self.tx - tp_n) / (1.0 + alpha_n)
    }

    /// Salt-corrected free energy (kcal/mol) of an `n`-site fold from the
    /// integer-scaled ΔG.
    #[must_use]
    pub fn dg_salt(&self, dg: i32, n: usize) -> f64 {
        f64::from(dg) / 100.0 - self.lambda * n as f64 * self.tx
    }

    /// Melting temperature (K) from the integer-scaled free energy and
    /// entropy of a fold, by applying the salt correction.
    #[must_use]
    pub fn dg_to_tm(&self, dg: i32, ds: i32, n: usize) -> f64 {
        let dss = f64::from(ds) / 10.0 + self.lambda * n as f64;
        let dgs = self.dg_salt(dg, n) * 1000.0;
        dgs / dss + self.tx
    }

    /// Enthalpy (kcal/mol) back-computed from the integer-scaled free energy
    /// and entropy.
    #[must_use]
    pub fn dh_value(&self, dg: i32, ds: i32) -> f64 {
        f64::from(dg) / 100.0 + self.tx * f64::from(ds) / 10.0 / 1000.0
    }

    // ----------------------------- Table initialization

    /// (ΔH 10x, ΔS 10x, ΔG37 100x, ΔG(Tx) 100x, Tp 1000x)
    fn scaled(&self, dh: f64, ds: f64, dg37: f64) -> (i32, i32, i32, i32, i32) {
        let dg0 = Thermo::dg_value(dh, ds, self.tx);
        debug_assert!((dg37 - Thermo::dg_value(dh, ds, Thermo::T37C)).abs() < 0.5);
        (
            (dh * 10.0).round() as i32,
            (ds * 10.0).round() as i32,
            (dg37 * 100.0).round() as i32,
            (dg0 * 100.0).round() as i32,
            self.pseudo_t(dh, ds),
        )
    }

    fn set_nn(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.nn[idx] = v.0;
        self.ds.nn[idx] = v.1;
        self.dg37.nn[idx] = v.2;
        self.dg.nn[idx] = v.3;
        self.tp.nn[idx] = v.4;
    }

    fn set_terminal_mismatch(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.terminal_mismatch[idx] = v.0;
        self.ds.terminal_mismatch[idx] = v.1;
        self.dg37.terminal_mismatch[idx] = v.2;
        self.dg.terminal_mismatch[idx] = v.3;
        self.tp.terminal_mismatch[idx] = v.4;
    }

    fn set_loop(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.loops[idx] = v.0;
        self.ds.loops[idx] = v.1;
        self.dg37.loops[idx] = v.2;
        self.dg.loops[idx] = v.3;
        self.tp.loops[idx] = v.4;
    }

    fn set_bulge(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.bulges[idx] = v.0;
        self.ds.bulges[idx] = v.1;
        self.dg37.bulges[idx] = v.2;
        self.dg.bulges[idx] = v.3;
        self.tp.bulges[idx] = v.4;
    }

    fn set_hairpin(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.hairpins[idx] = v.0;
        self.ds.hairpins[idx] = v.1;
        self.dg37.hairpins[idx] = v.2;
        self.dg.hairpins[idx] = v.3;
        self.tp.hairpins[idx] = v.4;
    }

    fn set_multiloop(&mut self, row: usize, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.multiloops[row][idx] = v.0;
        self.ds.multiloops[row][idx] = v.1;
        self.dg37.multiloops[row][idx] = v.2;
        self.dg.multiloops[row][idx] = v.3;
        self.tp.multiloops[row][idx] = v.4;
    }

    fn set_dang_x(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.dang_x[idx] = v.0;
        self.ds.dang_x[idx] = v.1;
        self.dg37.dang_x[idx] = v.2;
        self.dg.dang_x[idx] = v.3;
        self.tp.dang_x[idx] = v.4;
    }

    fn set_dang_y(&mut self, idx: usize, dh: f64, ds: f64, dg37: f64) {
        let v = self.scaled(dh, ds, dg37);
        self.dh.dang_y[idx] = v.0;
        self.ds.dang_y[idx] = v.1;
        self.dg37.dang_y[idx] = v.2;
        self.dg.dang_y[idx] = v.3;
        self.tp.dang_y[idx] = v.4;
    }

    /// Populate the tables from the published parameters.
    ///
    /// Not all dimer/dimer values are published; missing ones are inferred
    /// from their reciprocal (e.g. TG/GA from AG/GT), so every entry is first
    /// written through its reciprocal index and then overwritten directly
    /// where a direct value exists.
    fn init(&mut self) {
        let code = |c: u8| Symbol::from_ascii(c).expect("table nucleotide").code2();

        let [dhi, dsi, dgi37] = params::INITIATION;
        let v = self.scaled(dhi, dsi, dgi37);
        self.dh.initiation = v.0;
        self.ds.initiation = v.1;
        self.dg37.initiation = v.2;
        self.dg.initiation = v.3;
        self.tp.initiation = v.4;

        let [dht, dst, dgt37] = params::TERMINAL_AT_PENALTY;
        let v = self.scaled(dht, dst, dgt37);
        self.dh.terminal_at = v.0;
        self.ds.terminal_at = v.1;
        self.dg37.terminal_at = v.2;
        self.dg.terminal_at = v.3;
        self.tp.terminal_at = v.4;

        let [dhs, dss, dgs37] = params::SYMMETRY_CORRECTION;
        let v = self.scaled(dhs, dss, dgs37);
        self.dh.symmetry = v.0;
        self.ds.symmetry = v.1;
        self.dg37.symmetry = v.2;
        self.dg.symmetry = v.3;
        self.tp.symmetry = v.4;

        // Watson/Crick pairs and single mismatches share the dimer array.
        for pass in 0..2 {
            for &(name, [dh, ds, dg37]) in params::NN_WC.iter().chain(params::NN_MISMATCH) {
                let b = name.as_bytes();
                let (a1, a2, b1, b2) = (code(b[0]), code(b[1]), code(b[3]), code(b[4]));
                let idx = if pass == 0 {
                    4 * b2 + b1 + 64 * a2 + 16 * a1 // reciprocal
                } else {
                    4 * a1 + a2 + 64 * b1 + 16 * b2 // direct
                };
                self.set_nn(idx, dh, ds, dg37);
            }
        }

        for pass in 0..2 {
            for &(name, [dh, ds, dg37]) in params::TERMINAL_MISMATCH {
                let b = name.as_bytes();
                let (a1, a2, b1, b2) = (code(b[0]), code(b[1]), code(b[3]), code(b[4]));
                let idx = if pass == 0 {
                    4 * b2 + b1 + 64 * a2 + 16 * a1
                } else {
                    4 * a1 + a2 + 64 * b1 + 16 * b2
                };
                self.set_terminal_mismatch(idx, dh, ds, dg37);
            }
        }

        for &(name, [dh, ds, dg37]) in params::NN_DANG {
            let b = name.as_bytes();
            if b[2] == b'/' {
                // dangling AB/C
                let (a, bb, c) = (code(b[0]), code(b[1]), code(b[3]));
                self.set_dang_x(a * 4 + bb + c * 16, dh, ds, dg37);
            } else {
                // dangling A/BC
                assert_eq!(b[1], b'/');
                let (a, bb, c) = (code(b[0]), code(b[2]), code(b[3]));
                self.set_dang_y(a + bb * 16 + c * 4, dh, ds, dg37);
            }
        }

        // Loop, bulge and hairpin lengths; Jacobson-Stockmayer extrapolation
        // for lengths between and beyond the tabulated values:
        // ΔG(n) = ΔG(x) + 2.44·R·310.15·ln(n/x)
        let (last_x, last) = *params::NN_LOOP.last().expect("loop table");
        for i in 1..512 {
            let tab = params::NN_LOOP.iter().find(|(x, _)| *x == i).map(|(_, v)| *v);
            let values = tab.unwrap_or_else(|| {
                let js = 2.44 * Thermo::R * (i as f64 / last_x as f64).ln();
                [
                    last[0] + js / 1000.0 * Thermo::T37C,
                    last[1] + js / 1000.0 * Thermo::T37C,
                    last[2] + js / 1000.0 * Thermo::T37C,
                ]
            });

            let gl = values[0];
            self.set_loop(i, 0.0, -gl * 1000.0 / Thermo::T37C, gl);

            if i >= 256 {
                continue; // no bulges or hairpins of larger sizes
            }
            let gb = values[1];
            self.set_bulge(i, 0.0, -gb * 1000.0 / Thermo::T37C, gb);
            let gh = values[2];
            self.set_hairpin(i, 0.0, -gh * 1000.0 / Thermo::T37C, gh);
        }

        for &(name, [dg37, dh]) in params::HAIRPIN_INCREMENTS {
            let key = from_ascii_str(name).expect("hairpin increment key");
            let ds = -(dg37 - dh) * 1000.0 / Thermo::T37C;
            let v = self.scaled(dh, ds, dg37);
            self.dh.hairpin_increments.insert(key.clone(), v.0);
            self.ds.hairpin_increments.insert(key.clone(), v.1);
            self.dg37.hairpin_increments.insert(key.clone(), v.2);
            self.dg.hairpin_increments.insert(key.clone(), v.3);
            self.tp.hairpin_increments.insert(key, v.4);
        }

        // The +2.6 kcal/mol term derives the total multiloop penalty
        // (SantaLucia and Hicks 2004; table S4).
        for (row, &(_helices, values)) in params::NN_MULTILOOP.iter().enumerate() {
            for i in 0..256 {
                let dg37 = if i < values.len() {
                    values[i] + 2.6
                } else {
                    let x = values.len() - 1;
                    values[x] + 2.44 * Thermo::R / 1000.0 * Thermo::T37C * (i as f64 / x as f64).ln()
                };
                let ds = -dg37 * 1000.0 / Thermo::T37C;
                self.set_multiloop(row, i, 0.0, ds, dg37);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(s: &str) -> Vec<Symbol> {
        from_ascii_str(s).unwrap()
    }

    #[test]
    fn wc_dimers_round_to_table_values() {
        let th = Thermo::new(Thermo::T37C, 0.01, 1.0);
        let s = syms("CG");
        let r = syms("GC");
        // CG/GC: ΔH -10.6, ΔS -27.2, ΔG37 -2.17
        assert_eq!(th.dh.nn(s[0], s[1], r[0], r[1]), -106);
        assert_eq!(th.ds.nn(s[0], s[1], r[0], r[1]), -272);
        assert_eq!(th.dg37.nn(s[0], s[1], r[0], r[1]), -217);
        // at Tx = 37C the two free energy tables agree within rounding
        assert_eq!(th.dg.nn(s[0], s[1], r[0], r[1]), -216);
    }

    #[test]
    fn reciprocal_dimers_are_inferred() {
        let th = Thermo::new(Thermo::T37C, 0.01, 1.0);
        // AC/TG is not published; it reads through its reciprocal GT/CA
        let a = syms("ACTG");
        let g = syms("GTCA");
        assert_eq!(th.dh.nn(a[0], a[1], a[2], a[3]), th.dh.nn(g[0], g[1], g[2], g[3]));
        assert_eq!(th.dh.nn(a[0], a[1], a[2], a[3]), -84);
    }

    #[test]
    fn hairpin_length_three_uses_triloop_rules() {
        let th = Thermo::new(Thermo::T37C, 0.01, 1.0);
        // CGCAAAGCG: loop AAA at 3..=5, closed by C2/G6: no bonus, no AT penalty
        let s = syms("CGCAAAGCG");
        assert_eq!(th.dg.hairpin(&s, 3, 5), 350);
        assert_eq!(th.ds.hairpin(&s, 3, 5), -113);

        // GCAAAATGC: loop AAA at 3..=5 closed by the A2/T6 pair; "AAAAT" is
        // not a published pentaloop, so only the closing A/T penalty applies
        let t = syms("GCAAAATGC");
        assert_eq!(th.dg.hairpin(&t, 3, 5), 350 + 6);
        assert_eq!(th.ds.hairpin(&t, 3, 5), -113 + 69);
    }

    #[test]
    fn loop_lengths_extrapolate() {
        let th = Thermo::new(Thermo::T37C, 0.01, 1.0);
        // tabulated
        assert_eq!(th.dg37.loops[3], 320);
        assert_eq!(th.dg37.bulges[1], 400);
        assert_eq!(th.dg37.hairpins[5], 330);
        // size 11 interpolates between 10 and 12 via Jacobson-Stockmayer from 30
        let g11 = f64::from(th.dg37.loops[11]) / 100.0;
        assert!(g11 > 4.9 && g11 < 5.2, "loop(11) = {g11}");
        // beyond the table the penalty keeps growing
        assert!(th.dg37.loops[40] > th.dg37.loops[30]);
    }

    #[test]
    fn salt_correction_shifts_tm() {
        let th1 = Thermo::new(Thermo::T37C, 0.01, 1.0);
        let th2 = Thermo::new(Thermo::T37C, 0.01, 0.05);
        // a stable fold at 1M Na+ melts lower at 0.05M
        let (dg, ds, n) = (-90, -629, 8);
        assert!(th2.dg_to_tm(dg, ds, n) < th1.dg_to_tm(dg, ds, n));
        // at 1M the salt term vanishes
        assert!((th1.dg_salt(dg, n) - f64::from(dg) / 100.0).abs() < 1e-9);
    }

    #[test]
    fn duplex_calculation_accumulates_terms() {
        let th = Thermo::new(Thermo::T37C, 0.01, 1.0);
        // AA/TT dimer + initiation + two terminal A/T penalties + symmetry
        let a = syms("AA");
        let b = syms("TT");
        let want = th.dh.initiation()
            + th.dh.nn(a[0], a[1], b[0], b[1])
            + 2 * th.dh.terminal_at()
            + th.dh.symmetry_correction();
        assert_eq!(th.dh.duplex(&a, &b), want);
    }
}
