//! Published nearest-neighbour thermodynamic parameters.
//!
//! Sources:
//! - SantaLucia J Jr, Hicks D. 2004. The Thermodynamics of DNA Structural
//!   Motifs. Annu. Rev. Biophys. 33:415-40
//! - Allawi HT, SantaLucia J Jr. 1997, 1998a-c (internal GT/GA/CT/AC
//!   mismatches)
//! - Peyret N, Seneviratne AP, Allawi HT, SantaLucia J Jr. 1999 (AA, CC, GG,
//!   TT mismatches)
//! - Bommarito S, Peyret N, SantaLucia J Jr. 2000 (dangling ends)
//! - Terminal mismatch values are cited as unpublished (Varma and SantaLucia)
//!   and are taken from DINAMelt; treat them as an external data dependency.
//!
//! Each entry carries `[ΔH (kcal/mol), ΔS (e.u.), ΔG37 (kcal/mol)]`.

pub(crate) const INITIATION: [f64; 3] = [0.2, -5.7, 1.96];
pub(crate) const TERMINAL_AT_PENALTY: [f64; 3] = [2.2, 6.9, 0.05];
pub(crate) const SYMMETRY_CORRECTION: [f64; 3] = [0.0, -1.4, 0.43];

/// Watson/Crick pairs (perfect duplex matches).
pub(crate) const NN_WC: &[(&str, [f64; 3])] = &[
    ("AA/TT", [-7.6, -21.3, -1.00]),
    ("AT/TA", [-7.2, -20.4, -0.88]),
    ("TA/AT", [-7.2, -21.3, -0.58]),
    ("CA/GT", [-8.5, -22.7, -1.45]),
    ("GT/CA", [-8.4, -22.4, -1.44]),
    ("CT/GA", [-7.8, -21.0, -1.28]),
    ("GA/CT", [-8.2, -22.2, -1.30]),
    ("CG/GC", [-10.6, -27.2, -2.17]),
    ("GC/CG", [-9.8, -24.4, -2.24]),
    ("GG/CC", [-8.0, -19.9, -1.84]),
];

/// Single internal mismatches. Double mismatches not specified in
/// (SantaLucia and Hicks 2004; table 2) are left out.
pub(crate) const NN_MISMATCH: &[(&str, [f64; 3])] = &[
    // G/A mismatches (Allawi and SantaLucia 1998a; table 4)
    ("AA/TG", [-0.6, -2.3, 0.14]),
    ("AG/TA", [-0.7, -2.3, 0.02]),
    ("CA/GG", [-0.7, -2.3, 0.03]),
    ("CG/GA", [-4.0, -13.2, 0.11]),
    ("GA/CG", [-0.6, -1.0, -0.25]),
    ("GG/CA", [0.5, 3.2, -0.52]),
    ("TA/AG", [0.7, 0.7, 0.42]),
    ("TG/AA", [3.0, 7.4, 0.74]),
    // G/T mismatches (Allawi and SantaLucia 1997; table 5)
    ("AG/TT", [1.0, 0.9, 0.71]),
    ("AT/TG", [-2.5, -8.3, 0.07]),
    ("CG/GT", [-4.1, -11.7, -0.47]),
    ("CT/GG", [-2.8, -8.0, -0.32]),
    ("GG/CT", [3.3, 10.4, 0.08]),
    ("GT/CG", [-4.4, -12.3, -0.59]),
    ("TG/AT", [-0.1, -1.7, 0.43]),
    ("TT/AG", [-1.3, -5.3, 0.34]),
    // C/T mismatches (Allawi and SantaLucia 1998b; table 4)
    ("AC/TT", [0.7, 0.2, 0.64]),
    ("AT/TC", [-1.2, -6.2, 0.73]),
    ("CC/GT", [-0.8, -4.5, 0.62]),
    ("CT/GC", [-1.5, -6.1, 0.40]),
    ("GC/CT", [2.3, 5.4, 0.62]),
    ("GT/CC", [5.2, 13.5, 0.98]),
    ("TC/AT", [1.2, 0.7, 0.97]),
    ("TT/AC", [1.0, 0.7, 0.75]),
    // A/C mismatches (Allawi and SantaLucia 1998c; table 4)
    ("AA/TC", [2.3, 4.6, 0.88]),
    ("AC/TA", [5.3, 14.6, 0.77]),
    ("CA/GC", [1.9, 3.7, 0.75]),
    ("CC/GA", [0.6, -0.6, 0.79]),
    ("GA/CC", [5.2, 14.2, 0.81]),
    ("GC/CA", [-0.7, -3.8, 0.47]),
    ("TA/AC", [3.4, 8.0, 0.92]),
    ("TC/AA", [7.6, 20.2, 1.33]),
    // AA CC GG TT mismatches (Peyret et al 1999)
    ("AA/TA", [1.2, 1.7, 0.61]),
    ("CA/GA", [-0.9, -4.2, 0.43]),
    ("GA/CA", [-2.9, -9.8, 0.17]),
    ("TA/AA", [4.7, 12.9, 0.69]),
    ("AC/TC", [0.0, -4.4, 1.33]),
    ("CC/GC", [-1.5, -7.2, 0.70]),
    ("GC/CC", [3.6, 8.9, 0.79]),
    ("TC/AC", [6.1, 16.4, 1.05]),
    ("AG/TG", [-3.1, -9.5, -0.13]),
    ("CG/GG", [-4.9, -15.3, -0.11]),
    ("GG/CG", [-6.0, -15.8, -1.11]),
    ("TG/AG", [1.6, 3.6, 0.44]),
    ("AT/TT", [-2.7, -10.8, 0.69]),
    ("CT/GT", [-5.0, -15.8, -0.12]),
    ("GT/CT", [-2.2, -8.4, 0.45]),
    ("TT/AT", [0.2, -1.5, 0.68]),
];

/// Terminal mismatches; values obtained from DINAMelt and DINAFold.
pub(crate) const TERMINAL_MISMATCH: &[(&str, [f64; 3])] = &[
    ("AC/AG", [-8.4, -21.1, -1.9]),
    ("AC/CG", [-6.5, -17.2, -1.2]),
    ("AC/GG", [-10.2, -28.4, -1.4]),
    ("CC/AG", [-6.5, -16.4, -1.5]),
    ("CC/CG", [-4.6, -12.5, -0.8]),
    ("CC/TG", [-8.8, -25.6, -0.9]),
    ("GC/AG", [-7.2, -18.0, -1.6]),
    ("GC/GG", [-9.0, -25.3, -1.2]),
    ("GC/TG", [-9.5, -27.2, -1.1]),
    ("TC/CG", [-4.2, -11.0, -0.8]),
    ("TC/GG", [-7.9, -22.2, -1.0]),
    ("TC/TG", [-8.4, -24.1, -0.9]),
    ("AG/AC", [-9.6, -26.5, -1.4]),
    ("AG/CC", [-6.3, -17.5, -0.9]),
    ("AG/GC", [-6.9, -20.4, -0.6]),
    ("CG/AC", [-9.9, -28.2, -1.2]),
    ("CG/CC", [-6.6, -19.2, -0.7]),
    ("CG/TC", [-9.2, -26.9, -0.9]),
    ("GG/AC", [-9.8, -27.2, -1.4]),
    ("GG/GC", [-7.1, -21.1, -0.6]),
    ("GG/TC", [-9.1, -25.9, -1.1]),
    ("TG/CC", [-7.5, -21.3, -0.9]),
    ("TG/GC", [-8.1, -24.2, -0.6]),
    ("TG/TC", [-10.1, -29.0, -1.1]),
    ("AA/AT", [-0.5, 1.6, -1.0]),
    ("AA/CT", [4.6, 17.1, -0.7]),
    ("AA/GT", [-1.4, -1.2, -1.0]),
    ("CA/AT", [-0.1, 2.6, -0.9]),
    ("CA/CT", [5.0, 18.1, -0.6]),
    ("CA/TT", [3.5, 13.6, -0.7]),
    ("GA/AT", [-1.8, -2.2, -1.1]),
    ("GA/GT", [-2.7, -5.1, -1.1]),
    ("GA/TT", [1.8, 8.8, -0.9]),
    ("TA/CT", [-2.5, -5.1, -0.9]),
    ("TA/GT", [-8.5, -23.5, -1.2]),
    ("TA/TT", [-4.0, -9.6, -1.0]),
    ("TA/AA", [1.1, 5.5, -0.6]),
    ("TA/AC", [-0.1, 0.0, -0.1]),
    ("TA/AG", [4.0, 13.2, -0.1]),
    ("TC/AA", [1.6, 6.7, -0.5]),
    ("TC/AC", [0.0, 0.0, 0.0]), // does not fold in DINAMelt
    ("TC/AT", [4.3, 14.1, -0.1]),
    ("TG/AA", [-2.5, -6.5, -0.5]),
    ("TG/AG", [0.0, 0.0, 0.0]), // does not fold in DINAMelt
    ("TG/AT", [0.2, 0.9, -0.1]),
    ("TT/AC", [0.0, 0.0, 0.0]), // does not fold in DINAMelt
    ("TT/AG", [0.0, 0.0, 0.0]), // does not fold in DINAMelt
    ("TT/AT", [4.3, 14.1, -0.1]),
];

/// Dangling end contributions (Bommarito et al 2000). `AB/C` dangles on the
/// first strand, `A/BC` on the second.
pub(crate) const NN_DANG: &[(&str, [f64; 3])] = &[
    ("AA/T", [0.2, 2.3, -0.51]),
    ("AC/G", [-6.3, -17.1, -0.96]),
    ("AG/C", [-3.7, -10.0, -0.58]),
    ("AT/A", [-2.9, -7.6, -0.50]),
    ("CA/T", [0.6, 3.3, -0.42]),
    ("CC/G", [-4.4, -12.6, -0.52]),
    ("CG/C", [-4.0, -11.9, -0.34]),
    ("CT/A", [-4.1, -13.0, -0.02]),
    ("GA/T", [-1.1, -1.6, -0.62]),
    ("GC/G", [-5.1, -14.0, -0.72]),
    ("GG/C", [-3.9, -10.9, -0.56]),
    ("GT/A", [-4.2, -15.0, 0.48]),
    ("TA/T", [-6.9, -20.0, -0.71]),
    ("TC/G", [-4.0, -10.9, -0.58]),
    ("TG/C", [-4.9, -13.8, -0.61]),
    ("TT/A", [-0.2, -0.5, -0.10]),
    ("A/AT", [-0.7, -0.8, -0.48]),
    ("C/AG", [-2.1, -3.9, -0.92]),
    ("G/AC", [-5.9, -16.5, -0.82]),
    ("T/AA", [-0.5, -1.1, -0.12]),
    ("A/CT", [4.4, 14.9, -0.19]),
    ("C/CG", [-0.2, -0.1, -0.23]),
    ("G/CC", [-2.6, -7.4, -0.31]),
    ("T/CA", [4.7, 14.2, 0.28]),
    ("A/GT", [-1.6, -3.6, -0.50]),
    ("C/GG", [-3.9, -11.2, -0.44]),
    ("G/GC", [-3.2, -10.4, -0.01]),
    ("T/GA", [-4.1, -13.1, -0.01]),
    ("A/TT", [2.9, 10.4, -0.29]),
    ("C/TG", [-4.4, -13.1, -0.35]),
    ("G/TC", [-5.2, -15.0, -0.52]),
    ("T/TA", [-3.8, -12.6, 0.13]),
];

/// Loop penalties by size: `[internal loop, bulge loop, hairpin loop]` ΔG37.
/// Sizes beyond the table use a Jacobson-Stockmayer extrapolation.
pub(crate) const NN_LOOP: &[(usize, [f64; 3])] = &[
    (1, [0.0, 4.0, 0.0]),
    (2, [0.0, 2.9, 0.0]),
    (3, [3.2, 3.1, 3.5]),
    (4, [3.6, 3.2, 3.5]),
    (5, [4.0, 3.3, 3.3]),
    (6, [4.4, 3.5, 4.0]),
    (7, [4.6, 3.7, 4.2]),
    (8, [4.8, 3.9, 4.3]),
    (9, [4.9, 4.1, 4.5]),
    (10, [4.9, 4.3, 4.6]),
    (12, [5.2, 4.5, 5.0]),
    (14, [5.4, 4.8, 5.1]),
    (16, [5.6, 5.0, 5.3]),
    (18, [5.8, 5.2, 5.5]),
    (20, [5.9, 5.3, 5.7]),
    (25, [6.3, 5.6, 6.1]),
    (30, [6.6, 5.9, 6.3]),
];

/// Tri- and tetraloop increments: `[ΔG37, ΔH]`.
pub(crate) const HAIRPIN_INCREMENTS: &[(&str, [f64; 2])] = &[
    ("AGAAT", [-1.5, -1.5]),
    ("AGCAT", [-1.5, -1.5]),
    ("AGGAT", [-1.5, -1.5]),
    ("AGTAT", [-1.5, -1.5]),
    ("CGAAG", [-2.0, -2.0]),
    ("CGCAG", [-2.0, -2.0]),
    ("CGGAG", [-2.0, -2.0]),
    ("CGTAG", [-2.0, -2.0]),
    ("GGAAC", [-2.0, -2.0]),
    ("GGCAC", [-2.0, -2.0]),
    ("GGGAC", [-2.0, -2.0]),
    ("GGTAC", [-2.0, -2.0]),
    ("TGAAA", [-1.5, -1.5]),
    ("TGCAA", [-1.5, -1.5]),
    ("TGGAA", [-1.5, -1.5]),
    ("TGTAA", [-1.5, -1.5]),
    ("AAAAAT", [0.7, 0.5]),
    ("AAAACT", [0.2, 0.7]),
    ("AAACAT", [0.5, 1.0]),
    ("ACTTGT", [-1.3, 0.0]),
    ("AGAAAT", [-1.6, -1.1]),
    ("AGAGAT", [-1.6, -1.1]),
    ("AGATAT", [-2.0, -1.5]),
    ("AGCAAT", [-2.1, -1.6]),
    ("AGCGAT", [-1.6, -1.1]),
    ("AGCTTT", [-0.3, 0.2]),
    ("AGGAAT", [-1.6, -1.1]),
    ("AGGGAT", [-1.6, -1.1]),
    ("AGGGGT", [0.3, 0.5]),
    ("AGTAAT", [-2.1, -1.6]),
    ("AGTGAT", [-1.6, -1.1]),
    ("AGTTCT", [0.3, 0.8]),
    ("ATTCGT", [-0.7, -0.2]),
    ("ATTTGT", [-0.5, 0.0]),
    ("ATTTTT", [-1.0, -0.5]),
    ("CAAAAG", [0.9, 0.5]),
    ("CAAACG", [0.7, 0.7]),
    ("CAACAG", [1.0, 1.0]),
    ("CAACCG", [0.0, 0.0]),
    ("CCTTGG", [-0.8, 0.0]),
    ("CGAAAG", [-1.1, -1.1]),
    ("CGAGAG", [-1.1, -1.1]),
    ("CGATAG", [-1.5, -1.5]),
    ("CGCAAG", [-1.6, -1.6]),
    ("CGCGAG", [-1.1, -1.1]),
    ("CGCTTG", [0.2, 0.2]),
    ("CGGAAG", [-1.1, -1.1]),
    ("CGGGAG", [-1.0, -1.0]),
    ("CGGGGG", [0.8, 0.5]),
    ("CGTAAG", [-1.6, -1.6]),
    ("CGTGAG", [-1.1, -1.1]),
    ("CGTTCG", [0.8, 0.8]),
    ("CTTCGG", [-0.2, -0.2]),
    ("CTTTGG", [0.0, 0.0]),
    ("CTTTTG", [-0.5, -0.5]),
    ("GAAAAC", [1.5, 0.5]),
    ("GAAACC", [0.7, 0.7]),
    ("GAACAC", [1.0, 1.0]),
    ("GCTTGC", [-0.8, 0.0]),
    ("GGAAAC", [-1.1, -1.1]),
    ("GGAGAC", [-1.1, -1.1]),
    ("GGATAC", [-1.6, -1.6]),
    ("GGCAAC", [-1.6, -1.6]),
    ("GGCGAC", [-1.1, -1.1]),
    ("GGCTTC", [0.2, 0.2]),
    ("GGGAAC", [-1.1, -1.1]),
    ("GGGGAC", [-1.1, -1.1]),
    ("GGGGGC", [0.8, 0.5]),
    ("GGTAAC", [-1.6, -1.6]),
    ("GGTGAC", [-1.1, -1.1]),
    ("GGTTCC", [0.8, 0.8]),
    ("GTTCGC", [-0.2, -0.2]),
    ("GTTTGC", [0.0, 0.0]),
    ("GTTTTC", [-0.5, -0.5]),
    ("GAAAAT", [1.5, 0.5]),
    ("GAAACT", [1.0, 1.0]),
    ("GAACAT", [1.0, 1.0]),
    ("GCTTGT", [-0.5, 0.0]),
    ("GGAAAT", [-1.1, -1.1]),
    ("GGAGAT", [-1.1, -1.1]),
    ("GGATAT", [-1.6, -1.6]),
    ("GGCAAT", [-1.6, -1.6]),
    ("GGCGAT", [-1.1, -1.1]),
    ("GGCTTT", [-0.1, -0.1]),
    ("GGGAAT", [-1.1, -1.1]),
    ("GGGGAT", [-1.1, -1.1]),
    ("GGGGGT", [0.8, 0.5]),
    ("GGTAAT", [-1.6, -1.6]),
    ("GGTGAT", [-1.1, -1.1]),
    ("GTATAT", [-0.5, -0.5]),
    ("GTTCGT", [-0.4, -0.4]),
    ("GTTTGT", [-0.4, -0.4]),
    ("GTTTTT", [-0.5, -0.5]),
    ("TAAAAA", [0.4, 0.5]),
    ("TAAACA", [0.2, 0.7]),
    ("TAACAA", [0.5, 1.0]),
    ("TCTTGA", [-1.3, 0.0]),
    ("TGAAAA", [-1.6, -1.1]),
    ("TGAGAA", [-1.6, -1.1]),
    ("TGATAA", [-2.1, -1.6]),
    ("TGCAAA", [-2.1, -1.6]),
    ("TGCGAA", [-1.6, -1.1]),
    ("TGCTTA", [-0.3, 0.2]),
    ("TGGAAA", [-1.6, -1.1]),
    ("TGGGAA", [-1.6, -1.1]),
    ("TGGGGA", [0.3, 0.5]),
    ("TGTAAA", [-2.1, -1.6]),
    ("TGTGAA", [-1.6, -1.1]),
    ("TGTTCA", [0.3, 0.8]),
    ("TTTCGA", [-0.7, -0.2]),
    ("TTTTGA", [-0.5, 0.0]),
    ("TTTTTA", [-1.0, -0.5]),
    ("TAAAAG", [1.0, 0.5]),
    ("TAAACG", [0.5, 1.0]),
    ("TAACAG", [0.5, 1.0]),
    ("TCTTGG", [-1.0, 0.0]),
    ("TGAAAG", [-1.5, -1.0]),
    ("TGAGAG", [-1.5, -1.0]),
    ("TGATAG", [-2.0, -1.5]),
    ("TGCAAG", [-2.0, -1.5]),
    ("TGCGAG", [-1.5, -1.0]),
    ("TGCTTG", [-0.6, -0.1]),
    ("TGGAAG", [-1.5, -1.0]),
    ("TGGGAG", [-1.5, -1.0]),
    ("TGGGGG", [0.3, 0.5]),
    ("TGTAAG", [-2.0, -1.5]),
    ("TGTGAG", [-1.5, -1.0]),
    ("TTTCGG", [-0.9, -0.4]),
    ("TTTTAG", [-1.5, -1.0]),
    ("TTTTGG", [-0.9, -0.4]),
    ("TTTTTG", [-1.0, -0.5]),
];

/// Multiloop ΔG37 by number of helices (3..=7) and single-stranded residues
/// (0..=6). The value +2.6 kcal/mol is added to derive the total penalty; a
/// Jacobson-Stockmayer extrapolation covers larger residue counts.
pub(crate) const NN_MULTILOOP: &[(usize, [f64; 7])] = &[
    (3, [2.0, 0.6, 0.8, 1.0, 1.2, 1.4, 1.6]),
    (4, [-1.0, -0.4, 0.0, 0.4, 0.8, 1.2, 1.6]),
    (5, [2.0, 1.0, 1.2, 1.4, 1.6, 1.8, 2.0]),
    (6, [2.0, 1.2, 1.4, 1.6, 1.8, 2.0, 2.2]),
    (7, [2.0, 1.4, 1.6, 1.8, 2.0, 2.2, 2.4]),
];
