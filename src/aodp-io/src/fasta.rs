use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

use seq::{FastaSink, Symbol};

#[derive(Error, Debug)]
pub enum FastaError {
    #[error("{file}:{line}: incorrect nucleotide symbol ('{symbol}')")]
    InvalidSymbol { file: String, line: usize, symbol: char },

    #[error("{file}:{line}: sequence data before the first '>' header")]
    MissingHeader { file: String, line: usize },

    #[error("{file}: empty sequence name")]
    EmptyName { file: String },
}

/// Stream a FASTA file into a sink.
///
/// `>` introduces a header whose first whitespace-delimited token is the
/// sequence name; body lines are case-insensitive IUPAC nucleotides with
/// whitespace ignored. Runs are handed to the sink grouped by ambiguity.
pub fn parse(path: &Path, sink: &mut dyn FastaSink) -> Result<()> {
    let file_name = path.display().to_string();
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("cannot open sequence file ({file_name})"))?,
    );
    debug!("reading FASTA file {file_name}");

    let mut in_fragment = false;
    let mut run: Vec<Symbol> = Vec::new();
    let mut run_ambiguous = false;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("cannot read sequence file ({file_name})"))?;
        let lineno = lineno + 1;

        if let Some(header) = line.strip_prefix('>') {
            if in_fragment {
                flush(sink, &mut run, run_ambiguous);
                sink.end_fragment()?;
            }
            let name = header.split_whitespace().next().unwrap_or("");
            if name.is_empty() {
                return Err(FastaError::EmptyName { file: file_name }.into());
            }
            sink.begin_fragment(name, &file_name);
            in_fragment = true;
            continue;
        }

        for c in line.bytes() {
            if c.is_ascii_whitespace() {
                continue;
            }
            if !in_fragment {
                return Err(FastaError::MissingHeader { file: file_name, line: lineno }.into());
            }
            let Some(sy) = Symbol::from_ascii(c) else {
                return Err(FastaError::InvalidSymbol {
                    file: file_name,
                    line: lineno,
                    symbol: c as char,
                }
                .into());
            };
            if !run.is_empty() && sy.is_ambiguous() != run_ambiguous {
                flush(sink, &mut run, run_ambiguous);
            }
            run_ambiguous = sy.is_ambiguous();
            run.push(sy);
        }
    }

    if in_fragment {
        flush(sink, &mut run, run_ambiguous);
        sink.end_fragment()?;
    }
    sink.finish()
}

fn flush(sink: &mut dyn FastaSink, run: &mut Vec<Symbol>, ambiguous: bool) {
    if !run.is_empty() {
        sink.append_run(run, ambiguous);
        run.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    use seq::Source;

    fn write_fasta(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_multiple_records() {
        let f = write_fasta(">one first record\nACGTacgt\nACGT ACGT\n>two\nGGGGCCCCAAAATTTT\n");
        let mut source = Source::new(8, 16, 0, 0, false);
        parse(f.path(), &mut source).unwrap();

        assert_eq!(source.sequence_count(), 2);
        assert_eq!(source.name_of(0), "one");
        assert_eq!(source.printable(0, 16), "ACGTACGTACGTACGT");
        assert_eq!(source.printable(16, 16), "GGGGCCCCAAAATTTT");
    }

    #[test]
    fn groups_ambiguous_runs() {
        let f = write_fasta(">amb\nACGTNNRYACGTACGTACGT\n");
        let mut source = Source::new(8, 16, 0, 0, false);
        parse(f.path(), &mut source).unwrap();

        let fr = source.fragment(0);
        assert!(fr.ambig().contains(4));
        assert!(fr.ambig().contains(7));
        assert!(!fr.ambig().contains(8));
        assert_eq!(fr.ambig().length(), 4);
    }

    #[test]
    fn rejects_invalid_symbols() {
        let f = write_fasta(">bad\nACGTEACGT\n");
        let mut source = Source::new(8, 16, 0, 0, false);
        let err = parse(f.path(), &mut source).unwrap_err();
        assert!(err.to_string().contains("incorrect nucleotide symbol"));
    }

    #[test]
    fn rejects_headerless_data() {
        let f = write_fasta("ACGT\n");
        let mut source = Source::new(8, 16, 0, 0, false);
        assert!(parse(f.path(), &mut source).is_err());
    }
}
