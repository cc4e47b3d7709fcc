use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot find sequence specified in outgroup file ({0})")]
    OutgroupSequenceNotFound(String),

    #[error("cannot find sequence specified in isolation file ({0})")]
    IsolationSequenceNotFound(String),

    #[error("taxonomy file: multiple entries with the same name ({0})")]
    DuplicateTaxonomyEntry(String),

    #[error("cannot find any fragment at position {0} in the sequence database")]
    NoFragmentAtPosition(u32),
}
