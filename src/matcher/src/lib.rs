pub mod alignment;
pub use alignment::{Alignment, Element, MAX_ALIGN_LENGTH};

pub mod query;
pub use query::MatchQuery;
