use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Output sink shared by the formatters: a buffered file, or standard output
/// for the path `-`.
pub enum Writer {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl Writer {
    pub fn open(path: &Path) -> Result<Writer> {
        if path == Path::new("-") {
            return Ok(Writer::Stdout(io::stdout()));
        }
        let file = File::create(path)
            .with_context(|| format!("cannot open output file ({})", path.display()))?;
        Ok(Writer::File(BufWriter::new(file)))
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Stdout(s) => s.write(buf),
            Writer::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Stdout(s) => s.flush(),
            Writer::File(f) => f.flush(),
        }
    }
}
