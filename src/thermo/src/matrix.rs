/// Maximum length in nucleotides of a single strand in a folded structure.
pub(crate) const MAX_STRAND: usize = 256;

/// Square dynamic-programming matrix indexed by `(position, relative length)`.
///
/// Rows are circular over the position: cell `(i, j)` only ever depends on
/// cells with positions in `[i, i + j]` and `j < MAX_STRAND`, so a window of
/// `MAX_STRAND` rows suffices for arbitrarily long scans.
pub(crate) struct Sq {
    data: Vec<i32>,
}

impl Sq {
    pub(crate) fn new() -> Sq {
        Sq { data: vec![0; MAX_STRAND * MAX_STRAND] }
    }

    #[inline]
    pub(crate) fn at(&self, i: usize, j: usize) -> i32 {
        self.data[(i % MAX_STRAND) * MAX_STRAND + j]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, v: i32) {
        self.data[(i % MAX_STRAND) * MAX_STRAND + j] = v;
    }
}

/// Minimization matrix for the optimization criterion.
///
/// The value 0 doubles as the "no folded structure" sentinel: a cell holding
/// 0 represents loose single strands, and any closed structure replaces it.
pub(crate) struct SqMin {
    data: Sq,
}

impl SqMin {
    pub(crate) fn new() -> SqMin {
        SqMin { data: Sq::new() }
    }

    #[inline]
    pub(crate) fn at(&self, i: usize, j: usize) -> i32 {
        self.data.at(i, j)
    }

    #[inline]
    pub(crate) fn zero_at(&self, i: usize, j: usize) -> bool {
        self.data.at(i, j) == 0
    }

    /// Overwrite the cell with `a + b` unconditionally (split joins).
    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, a: i32, b: i32) {
        self.data.set(i, j, a + b);
    }

    /// Keep the minimum: store `a + b` when the cell holds no structure yet
    /// or when the candidate improves on it. Returns whether the store
    /// happened.
    #[inline]
    pub(crate) fn copy_less(&mut self, i: usize, j: usize, a: i32, b: i32) -> bool {
        let v = a + b;
        if self.zero_at(i, j) || v < self.data.at(i, j) {
            self.data.set(i, j, v);
            true
        } else {
            false
        }
    }
}
