use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use seq::Source;

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("{file}:{line}: expected tab-separated <reference-id>\\t<lineage>")]
    MissingField { file: String, line: usize },
}

/// Parse a taxonomy file: one record per line, tab-separated
/// `<reference-id>\t<lineage>`. The final `s__Genus_species...` segment of
/// the lineage determines the species.
pub fn parse(path: &Path, source: &mut Source) -> Result<()> {
    let file = path.display().to_string();
    let reader =
        BufReader::new(File::open(path).with_context(|| format!("cannot open taxonomy file ({file})"))?);

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("cannot read taxonomy file ({file})"))?;
        if line.trim().is_empty() {
            continue;
        }
        let (id, lineage) = line
            .split_once('\t')
            .ok_or(TaxonomyError::MissingField { file: file.clone(), line: lineno + 1 })?;

        let species = species_of(lineage);
        source
            .on_taxonomy_entry(id.trim(), species)
            .with_context(|| format!("cannot parse taxonomy file ({file})"))?;
    }
    Ok(())
}

/// The `Genus_species...` text of the last `s__` lineage segment; empty when
/// the lineage does not encode a species.
fn species_of(lineage: &str) -> &str {
    lineage
        .rsplit(';')
        .map(str::trim)
        .find_map(|segment| segment.strip_prefix("s__"))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn species_extraction() {
        assert_eq!(
            species_of("k__Fungi;p__Ascomycota;s__Anisogramma_anomala_strain1"),
            "Anisogramma_anomala_strain1"
        );
        assert_eq!(species_of("k__Fungi;p__Ascomycota"), "");
        assert_eq!(species_of("s__Ophiostoma_ulmi"), "Ophiostoma_ulmi");
    }

    #[test]
    fn duplicate_reference_ids_are_fatal() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "ref1\tk__Fungi;s__Genus_species").unwrap();
        writeln!(f, "ref1\tk__Fungi;s__Genus_species").unwrap();

        let mut source = Source::new(8, 16, 0, 0, false);
        let err = parse(f.path(), &mut source).unwrap_err();
        assert!(format!("{err:#}").contains("multiple entries"), "{err:#}");
    }

    #[test]
    fn registers_reference_ids() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "ref1\tk__Fungi;s__Genus_species").unwrap();
        writeln!(f, "ref2\tk__Fungi").unwrap();

        let mut source = Source::new(8, 16, 0, 0, false);
        parse(f.path(), &mut source).unwrap();
        assert_eq!(source.reference_id("ref1"), Some(0));
        assert_eq!(source.reference_id("ref2"), Some(1));
        assert_eq!(source.reference_id("ref3"), None);
    }
}
