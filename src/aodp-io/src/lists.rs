use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a whitespace-separated list of sequence name patterns, as used by
/// the outgroup and isolation files.
pub fn read(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot open list file ({})", path.display()))?;
    Ok(text.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn splits_on_any_whitespace() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "alpha beta\ngamma\t delta\n").unwrap();
        assert_eq!(read(f.path()).unwrap(), vec!["alpha", "beta", "gamma", "delta"]);
    }
}
