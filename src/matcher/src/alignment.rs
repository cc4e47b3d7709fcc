use seq::Symbol;

/// Maximum length of the shorter of the two aligned sequences.
pub const MAX_ALIGN_LENGTH: usize = 4096;

/// Score triplet of the dynamic programming table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Element {
    /// Edit score: +1 match, -1 mismatch, -1 gap; maximized.
    pub s: i32,
    /// Number of matches in the optimal configuration.
    pub m: u32,
    /// Length of the overlap region between the two strings, gaps included.
    pub l: u32,
}

impl Element {
    fn add(&mut self, s: i32, m: u32, l: u32) {
        self.s += s;
        self.m += m;
        self.l += l;
    }
}

const MA: i32 = 1;
const MI: i32 = -1;
const GA: i32 = -1;

/// Modified Needleman-Wunsch global alignment.
///
/// Standard +1/-1/-1 metrics with one modification: gaps on the first and
/// last row of the longer sequence cost zero, so overhangs at either end of
/// the longer string are free. Two IUPAC symbols match iff they overlap.
///
/// ```text
///  --AGAC-TAGTTAC
///    |||| |          M=5     S = -1*2 + 1*5 + -1*1
///  CGAGACGT------
///     L=6            M/L = 5/6 = 83.3%
/// ```
///
/// The scratch column is reused across calls; one `Alignment` per worker.
pub struct Alignment {
    e: Vec<Element>,
}

impl Default for Alignment {
    fn default() -> Self {
        Self::new()
    }
}

impl Alignment {
    #[must_use]
    pub fn new() -> Alignment {
        Alignment { e: vec![Element::default(); MAX_ALIGN_LENGTH] }
    }

    /// Align two sequences, rotating the longer one into the columns.
    ///
    /// # Panics
    /// When both sequences reach [`MAX_ALIGN_LENGTH`].
    pub fn align(&mut self, s1: &[Symbol], s2: &[Symbol]) -> Element {
        if s1.len() < s2.len() {
            self.align_cr(s2, s1)
        } else {
            self.align_cr(s1, s2)
        }
    }

    /// `c` runs along the columns (longer), `r` along the rows (shorter);
    /// one column of state is kept.
    fn align_cr(&mut self, c: &[Symbol], r: &[Symbol]) -> Element {
        assert!(c.len() >= r.len());
        assert!(
            r.len() < MAX_ALIGN_LENGTH,
            "both strings to align are longer than maximum length ({MAX_ALIGN_LENGTH})"
        );
        let (lc, lr) = (c.len(), r.len());

        for (i, e) in self.e[..lr].iter_mut().enumerate() {
            *e = Element { s: (i as i32 + 1) * GA, m: 0, l: 0 };
        }

        for j in 0..lc {
            let mut nw = Element::default();
            let mut n = Element::default();

            for i in 0..lr {
                let w = self.e[i];

                if i < lr - 1 {
                    // horizontal gap; free on the last row
                    self.e[i].add(GA, 0, 1);
                }

                if r[i].matches(c[j]) {
                    nw.add(MA, 1, 1);
                } else {
                    nw.add(MI, 0, 1);
                }
                if self.e[i].s < nw.s {
                    self.e[i] = nw;
                }

                if j < lc - 1 {
                    n.add(GA, 0, 1);
                } else {
                    // do not count edge gaps on the last column
                    n.add(GA, 0, 0);
                }
                if self.e[i].s < n.s {
                    self.e[i] = n;
                }

                n = self.e[i];
                nw = w;
            }
        }

        let result = self.e[lr - 1];
        assert!(result.l > 0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq::symbol::from_ascii_str;

    fn align(s1: &str, s2: &str) -> Element {
        let a = from_ascii_str(s1).unwrap();
        let b = from_ascii_str(s2).unwrap();
        Alignment::new().align(&a, &b)
    }

    #[test]
    fn edge_gaps_are_free() {
        assert_eq!(align("AGACTAGTTAC", "CGAGACGT"), Element { s: 2, m: 5, l: 6 });
        assert_eq!(align("AAAGTCC", "GTCCAA"), Element { s: 2, m: 4, l: 4 });
        assert_eq!(align("GAAAAAAT", "GAAT"), Element { s: 2, m: 3, l: 4 });
    }

    #[test]
    fn mismatch_heavy_pairs() {
        assert_eq!(align("GCATGCT", "GATTACA"), Element { s: 0, m: 4, l: 8 });
        assert_eq!(align("CCAAAAGG", "AATAA"), Element { s: 3, m: 4, l: 5 });
        assert_eq!(align("CAAC", "ATA"), Element { s: 1, m: 2, l: 3 });
        assert_eq!(align("CAGAAC", "ATAA"), Element { s: 2, m: 3, l: 4 });
        assert_eq!(align("CCT", "CCA"), Element { s: 1, m: 2, l: 3 });
        assert_eq!(align("CCACACCT", "CCTGC"), Element { s: 1, m: 3, l: 5 });
        assert_eq!(align("CCACACCT", "ACAC"), Element { s: 4, m: 4, l: 4 });
        assert_eq!(align("TTTATTCCTGCGGGCGCATTT", "CCACACCTAAAAAACTTT"), Element { s: -4, m: 8, l: 20 });
    }

    #[test]
    fn contained_sequence_aligns_fully() {
        let long = concat!(
            "CATTACTGAGTTTATGCTC",
            "TCACGAGCTAACCTCCCACCCGTGTCTATTACATCTTGTTGCTTCGGTGCGCAGCCCGCGGAGGTTTACCTCTAAAGGTCACGTGCCGAGGACGCCATTT",
            "GAACTCTGTATTATATTGCAGTCTGAGAATATAACTTAATTAGTTAAAACTTTCAACAACGGATCTCTTGG",
            "TTCCGGTATCGATGAAGAACGCAGCGAAATGCGATAAATAATGTGAATTGCAGAATTCAGTGAATCATCGAGTCTTTGAACGCACATTGCGCCCC",
            "CTGGTATTCCGGGGGGCATGCCTGTCCGAGCGTCATTGCTGCCCTCAAGCCCGGCTTGTGTGTTGGGTCCTCGTCCCTCCGGGGACAGGCCCGAA",
            "AGGCAATGGCAGTACCGCGTCCGGTCCTCGAGCGTATGGGGCTTTGTCACCCGCTCTGTAGGCCCGGCCGGCGCTCCGCCGACCAACCAAAAACT",
            "ATTTTTCAGGTTGACCTCGGATCAGGTAGGG"
        );
        let inner =
            "TCACGAGCTAACCTCCCACCCGTGTCTATTACATCTTGTTGCTTCGGTGCGCAGCCCGCGGAGGTTTACCTCTAAAGGTCACGTGCCGAGGACGCCATTT";
        assert_eq!(align(long, inner), Element { s: 100, m: 100, l: 100 });
    }

    #[test]
    fn self_alignment_is_total() {
        let s = "ACGGATTTACCGTGCA";
        let e = align(s, s);
        assert_eq!(e.m, s.len() as u32);
        assert_eq!(e.l, s.len() as u32);
        assert_eq!(100.0 * f64::from(e.m) / f64::from(e.l), 100.0);
    }

    #[test]
    fn ambiguity_codes_overlap() {
        // N matches anything; R matches A/G
        let e = align("ACGT", "NCRT");
        assert_eq!(e, Element { s: 4, m: 4, l: 4 });
    }
}
