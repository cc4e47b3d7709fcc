use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("invalid value for --oligo-size ({0})\n ** expecting at least 8")]
    OligoSizeTooSmall(u8),

    #[error("invalid numeric range ({0}-{1})")]
    InvalidRange(u8, u8),

    #[error("invalid value for option --salt ({0})\n*** expecting value between 0.05 and 1.1")]
    InvalidSalt(f64),

    #[error("invalid value for option --strand ({0})\n*** expecting value between 0.01 and 100")]
    InvalidStrand(f64),

    #[error("incompatible options --ambiguous-oligos and --max-melting")]
    AmbiguousWithMelting,

    #[error("--{0} option but no --tree-file specified")]
    MissingTreeFile(&'static str),

    #[error("--taxonomy option, but no --database specified")]
    TaxonomyWithoutDatabase,

    #[error("--database option, but no --taxonomy specified")]
    DatabaseWithoutTaxonomy,

    #[error("incompatible options --basename and --{0}")]
    BasenameConflict(&'static str),

    #[error("incompatible options --clusters and --{0}")]
    ClustersConflict(&'static str),

    #[error("no sequence files specified. Nothing to do.")]
    NoSequenceFiles,

    #[error("no output specified. Nothing to do.")]
    NoOutput,
}
