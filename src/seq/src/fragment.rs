use crate::cover::Cover;
use crate::range::Range;
use crate::{Length, Position, SeqId};

/// A contiguous run from one input sequence loaded into the source buffer.
///
/// This can be a gene from a genome, the reverse complement of a sequence,
/// etc. The universe of the ambiguity cover is the fragment's buffer range.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub sequence: SeqId,
    pub file: String,
    /// Whether this fragment holds the reverse complement of its input run.
    pub reverse_complement: bool,
    /// Ambiguous positions of the fragment.
    ambig: Cover<Position>,
    /// Ambiguity cover amplified by `max_oligo - 1`: every window start whose
    /// oligo can touch an ambiguous base.
    ambig_plus: Cover<Position>,
    /// Unambiguous positions: complement of `ambig` within the fragment.
    ambig_compl: Cover<Position>,
}

impl Fragment {
    #[must_use]
    pub fn new(
        sequence: SeqId,
        file: String,
        ambig: Cover<Position>,
        max_oligo: Length,
        reverse_complement: bool,
    ) -> Fragment {
        let mut ambig_plus = ambig.clone();
        ambig_plus.amplify(Position::from(max_oligo) - 1);
        let ambig_compl = ambig.complement();
        Fragment { sequence, file, reverse_complement, ambig, ambig_plus, ambig_compl }
    }

    pub fn range(&self) -> &Range<Position> {
        self.ambig.universe()
    }

    pub fn ambig(&self) -> &Cover<Position> {
        &self.ambig
    }

    pub fn ambig_plus(&self) -> &Cover<Position> {
        &self.ambig_plus
    }

    pub fn ambig_compl(&self) -> &Cover<Position> {
        &self.ambig_compl
    }

    /// Suffix appended to signature identifiers originating from this
    /// fragment: `"-rc"` for reverse-complement fragments, empty otherwise.
    #[must_use]
    pub fn rc_id(&self) -> &'static str {
        if self.reverse_complement {
            "-rc"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_derive_from_ambiguities() {
        let ambig =
            Cover::from_ranges(Range::new(100, 100), [Range::new(120, 4), Range::new(160, 2)]);
        let f = Fragment::new(0, "test.fasta".into(), ambig, 16, false);

        assert_eq!(*f.range(), Range::from_bounds(100, 200));
        assert_eq!(f.rc_id(), "");

        let compl: Vec<Range<u32>> = f.ambig_compl().iter().copied().collect();
        assert_eq!(
            compl,
            vec![Range::from_bounds(100, 120), Range::from_bounds(124, 160), Range::from_bounds(162, 200)]
        );

        // amplified cover reaches 15 positions left of each ambiguity
        assert!(f.ambig_plus().contains(105));
        assert!(!f.ambig_plus().contains(104));
    }
}
