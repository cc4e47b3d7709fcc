use ahash::AHashMap;
use seq::Symbol;

/// One collection of nearest-neighbour thermodynamic parameters.
///
/// The same layout stores enthalpy, entropy, free energy at 37 °C, free
/// energy at the experimental temperature and the pseudo-melting temperature;
/// values are integer-scaled for fast accumulation in the fold engine:
/// ΔH and ΔS ×10, ΔG ×100, Tp ×1000.
///
/// Dimer lookups are indexed by the 2-bit codes of the four nucleotides of a
/// dimer pair `XY/UV` as `4X + Y + 64U + 16V`.
#[derive(Clone)]
pub struct NnTable {
    pub(crate) nn: [i32; 256],
    pub(crate) terminal_mismatch: [i32; 256],
    pub(crate) loops: [i32; 512],
    pub(crate) bulges: [i32; 256],
    pub(crate) hairpins: [i32; 256],
    /// Multiloop penalty: `[helices - 3][single-stranded residues]`; helix
    /// counts past the table default to the last row.
    pub(crate) multiloops: [[i32; 256]; 5],
    pub(crate) dang_x: [i32; 64],
    pub(crate) dang_y: [i32; 64],
    pub(crate) hairpin_increments: AHashMap<Vec<Symbol>, i32>,
    pub(crate) initiation: i32,
    pub(crate) terminal_at: i32,
    pub(crate) symmetry: i32,
}

impl Default for NnTable {
    fn default() -> Self {
        NnTable {
            nn: [0; 256],
            terminal_mismatch: [0; 256],
            loops: [0; 512],
            bulges: [0; 256],
            hairpins: [0; 256],
            multiloops: [[0; 256]; 5],
            dang_x: [0; 64],
            dang_y: [0; 64],
            hairpin_increments: AHashMap::new(),
            initiation: 0,
            terminal_at: 0,
            symmetry: 0,
        }
    }
}

#[inline]
fn idx4(x: Symbol, y: Symbol, u: Symbol, v: Symbol) -> usize {
    x.code2() * 4 + y.code2() + u.code2() * 64 + v.code2() * 16
}

impl NnTable {
    /// Value for the dimer `XY/UV`.
    #[must_use]
    pub fn nn(&self, x: Symbol, y: Symbol, u: Symbol, v: Symbol) -> i32 {
        self.nn[idx4(x, y, u, v)]
    }

    /// Dimer value for a self-folding configuration (hairpin):
    /// `s[i]s[i+1] / s[j]s[j-1]`.
    #[must_use]
    pub fn nn_fold(&self, s: &[Symbol], i: usize, j: usize) -> i32 {
        self.nn(s[i], s[i + 1], s[j], s[j - 1])
    }

    /// Terminal mismatch value for a self-folding configuration.
    #[must_use]
    pub fn terminal_mismatch_fold(&self, s: &[Symbol], i: usize, j: usize) -> i32 {
        self.terminal_mismatch[idx4(s[i], s[i + 1], s[j], s[j - 1])]
    }

    /// Internal loop with strand lengths `l1`, `l2` (both non-zero); the
    /// second term is the loop asymmetry penalty.
    #[must_use]
    pub fn internal_loop(&self, l1: usize, l2: usize) -> i32 {
        assert!(l1 > 0 && l2 > 0, "internal loop with an empty strand is a bulge");
        self.loops[l1 + l2] + (l1 as i32 - l2 as i32).abs() * 3
    }

    #[must_use]
    pub fn bulge(&self, l: usize) -> i32 {
        self.bulges[l]
    }

    /// Terminal A/T penalty for the pair `s[i]`/`s[j]`, 0 when not an A/T
    /// pair.
    #[must_use]
    pub fn terminal_at_penalty(&self, s: &[Symbol], i: usize, j: usize) -> i32 {
        if s[i].at_pairs(s[j]) {
            self.terminal_at
        } else {
            0
        }
    }

    /// Hairpin closure for the loop `s[i..=j]` (excluding the closing pair at
    /// `i-1`/`j+1`).
    ///
    /// Lengths 3 and 4 receive the published tri-/tetraloop increments; the
    /// triloop carries the closing A/T penalty and longer loops the terminal
    /// mismatch increment (SantaLucia and Hicks 2004; eq. 8 and 9).
    #[must_use]
    pub fn hairpin(&self, s: &[Symbol], i: usize, j: usize) -> i32 {
        let l = j - i + 1;
        assert!(l > 2, "hairpin loops of length < 3 cannot close");

        match l {
            3 => {
                let bonus = self.increment(&s[i - 1..j + 2]);
                self.hairpins[3] + bonus + self.terminal_at_penalty(s, i - 1, j + 1)
            }
            4 => {
                let bonus = self.increment(&s[i - 1..j + 2]);
                self.hairpins[4] + bonus + self.terminal_mismatch_fold(s, i - 1, j + 1)
            }
            _ => self.hairpins[l] + self.terminal_mismatch_fold(s, i - 1, j + 1),
        }
    }

    fn increment(&self, key: &[Symbol]) -> i32 {
        self.hairpin_increments.get(key).copied().unwrap_or(0)
    }

    /// Multiloop with `free` single-stranded residues and `helices` branches.
    #[must_use]
    pub fn multiloop(&self, free: usize, helices: usize) -> i32 {
        assert!(free < 256);
        let row = helices.saturating_sub(3).min(self.multiloops.len() - 1);
        self.multiloops[row][free]
    }

    /// Dangling end `XY/V`.
    #[must_use]
    pub fn dang_x(&self, x: Symbol, y: Symbol, v: Symbol) -> i32 {
        self.dang_x[x.code2() * 4 + y.code2() + v.code2() * 16]
    }

    /// Dangling end `Y/UV`.
    #[must_use]
    pub fn dang_y(&self, y: Symbol, u: Symbol, v: Symbol) -> i32 {
        self.dang_y[y.code2() + u.code2() * 16 + v.code2() * 4]
    }

    #[must_use]
    pub fn initiation(&self) -> i32 {
        self.initiation
    }

    #[must_use]
    pub fn terminal_at(&self) -> i32 {
        self.terminal_at
    }

    #[must_use]
    pub fn symmetry_correction(&self) -> i32 {
        self.symmetry
    }

    /// Incremental value for a perfect-alignment duplex of two equal-length
    /// unambiguous strands: initiation, stacked dimers, terminal A/T
    /// penalties and symmetry correction.
    #[must_use]
    pub fn duplex(&self, a: &[Symbol], b: &[Symbol]) -> i32 {
        assert!(a.len() > 1);
        assert_eq!(a.len(), b.len());

        let mut r = self.initiation;
        for i in 0..a.len() - 1 {
            r += self.nn(a[i], a[i + 1], b[i], b[i + 1]);
        }
        if a[0].at_pairs(b[0]) {
            r += self.terminal_at;
        }
        if a[a.len() - 1].at_pairs(b[b.len() - 1]) {
            r += self.terminal_at;
        }
        if seq::symbol::reverse_complement(b) == a {
            r += self.symmetry;
        }
        r
    }
}
