#![deny(unsafe_code)]

pub mod cid;
pub mod csv_utils;
pub mod error;
pub mod municipality;
pub mod occupation;
pub mod range;

pub use crate::cid::{
    RawCode, build_cause_of_death_lookup, cause_of_death_table, cid9_entries, cid10_entries,
    load_cause_of_death_lookup,
};
pub use crate::error::{Result, StandardsError};
pub use crate::municipality::load_municipality_reference;
pub use crate::occupation::{
    OccupationSources, build_occupation_lookup, load_occupation_lookup, title_case,
};
pub use crate::range::{CategoryLookup, Cid10Code, CodeRange, CodeScheme, expand_titled};
