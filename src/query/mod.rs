pub mod matcher;
pub mod types;

pub use matcher::{element_matches, first_match, match_elements};
pub use types::{Attribute, Query, QueryValue};
