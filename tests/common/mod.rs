use std::fs;
use std::path::{Path, PathBuf};

use seq::{SeqId, Source, Symbol};

/// Write a FASTA file into `dir` and return its path.
pub fn write_fasta(dir: &Path, name: &str, records: &[(&str, &str)]) -> PathBuf {
    let mut text = String::new();
    for (header, body) in records {
        text.push('>');
        text.push_str(header);
        text.push('\n');
        text.push_str(body);
        text.push('\n');
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

/// Deterministic nucleotide generator (xorshift), for long test sequences.
pub struct NucGen(u64);

impl NucGen {
    pub fn new(state: u64) -> NucGen {
        NucGen(state)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn sequence(&mut self, len: usize) -> String {
        (0..len).map(|_| b"ACGT"[(self.next_u64() % 4) as usize] as char).collect()
    }
}

/// Replace the base at `pos` with a different one.
pub fn mutate(sequence: &str, pos: usize) -> String {
    let mut bytes = sequence.as_bytes().to_vec();
    bytes[pos] = match bytes[pos] {
        b'A' => b'C',
        b'C' => b'G',
        b'G' => b'T',
        _ => b'A',
    };
    String::from_utf8(bytes).unwrap()
}

/// Whether `needle` (ASCII) occurs in any fragment of `seq` with strict
/// symbol equality.
pub fn occurs_in(source: &Source, seq: SeqId, needle: &str) -> bool {
    let needle: Vec<Symbol> = seq::symbol::from_ascii_str(needle).unwrap();
    source.fragments_of(seq).iter().any(|&f| {
        let r = source.fragment(f).range();
        let content = &source.content()[r.lo() as usize..r.hi() as usize];
        content.windows(needle.len()).any(|w| w == needle.as_slice())
    })
}
