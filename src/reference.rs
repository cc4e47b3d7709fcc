use anyhow::bail;
use log::warn;

use seq::{Cover, FastaSink, Position, Range, SeqId, Source, Symbol};
use sigtrie::Trie;

/// Confirms the trie against a reference database: buffers reference
/// sequences from the FASTA event stream and walks each batch through the
/// trie, erasing clusters whose species set does not contain the species of
/// a matching reference.
pub(crate) struct ReferenceConfirmer<'a> {
    trie: &'a Trie,
    source: &'a Source,
    threads: usize,
    buffer_size: usize,

    content: Vec<Symbol>,
    refs: Vec<(SeqId, Range<Position>)>,

    cur_name: String,
    cur_file: String,
    cur_lo: Position,
    cur_ambig: Cover<Position>,
    in_fragment: bool,
}

impl<'a> ReferenceConfirmer<'a> {
    pub(crate) fn new(trie: &'a Trie, source: &'a Source, threads: usize) -> ReferenceConfirmer<'a> {
        ReferenceConfirmer {
            trie,
            source,
            threads,
            buffer_size: (threads * 4).max(100),
            content: Vec::new(),
            refs: Vec::new(),
            cur_name: String::new(),
            cur_file: String::new(),
            cur_lo: 0,
            cur_ambig: Cover::new(),
            in_fragment: false,
        }
    }

    fn flush(&mut self) {
        if self.refs.is_empty() {
            return;
        }
        self.trie.confirm(self.source, self.threads, &self.content, &self.refs);
        self.refs.clear();
        self.content.clear(); // reuse the storage for the next batch
    }
}

impl FastaSink for ReferenceConfirmer<'_> {
    fn begin_fragment(&mut self, name: &str, file: &str) {
        assert!(!self.in_fragment);
        self.in_fragment = true;
        self.cur_name = name.split_whitespace().next().unwrap_or("").to_string();
        self.cur_file = file.to_string();
        self.cur_lo = self.content.len() as Position;
        self.cur_ambig = Cover::new();
    }

    fn append_run(&mut self, run: &[Symbol], ambiguous: bool) {
        if ambiguous {
            let start = self.content.len() as Position;
            self.cur_ambig.insert(Range::new(start, run.len() as Position));
        }
        self.content.extend_from_slice(run);
    }

    fn end_fragment(&mut self) -> anyhow::Result<()> {
        assert!(self.in_fragment);
        self.in_fragment = false;

        let le = self.content.len() as Position - self.cur_lo;
        let range = Range::new(self.cur_lo, le);
        let mut ambig = std::mem::take(&mut self.cur_ambig);
        ambig.set_universe(range);

        let name = std::mem::take(&mut self.cur_name);
        let Some(re) = self.source.reference_id(&name) else {
            bail!(
                "cannot find sequence with id: {name} (read in database file {}) \
                 in associated taxonomy file",
                self.cur_file
            );
        };

        // the ambiguity limits of the source apply to the references too
        if self.source.excluded_by_limits(&ambig) {
            warn!("reference sequence {name} excluded because of ambiguities");
            return Ok(());
        }

        self.refs.push((re, range));
        if self.refs.len() > self.buffer_size {
            self.flush();
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.flush();
        Ok(())
    }
}
