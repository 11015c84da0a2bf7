//! Record normalization for SUS (Brazilian public-health) datasets.
//!
//! - **datetime**: ordered date-parsing cascades, optional dates, date differences
//! - **remap**: coded value -> label dictionaries
//! - **indicators**: numeric `*field_` columns derived from dimension values
//! - **age**: age, age group and race decoding, numeric placeholders
//! - **join**: reference join with degraded-key fallbacks, one-to-many fan-out
//! - **cause_of_death** / **occupation**: classification lookups joined onto records
//! - **report**: grouped summary of keys that did not match exactly
//! - **sim** / **sivep** / **locations**: the converters built from the above

pub mod age;
pub mod cause_of_death;
pub mod datetime;
pub mod indicators;
pub mod join;
pub mod locations;
pub mod occupation;
pub mod remap;
pub mod report;
pub mod sim;
pub mod sivep;

pub use datetime::{
    DateCascade, DateGranularity, DateReport, DateSource, DateStrategy, OptionalDatePolicy,
    normalize_dates,
};
pub use join::{
    FanOutIndex, JoinReport, KeyResolver, MatchStage, NonExactMatch, UnmatchedFill, fan_out,
    reference_join,
};
pub use locations::{fan_out_locations, patch_locations};
pub use remap::{RemapReport, ValueMap, remap_columns};
pub use report::{UnmatchedKey, unmatched_key_summary};
pub use sim::{SimConfig, SimLookups, SimOutput, SimReport, convert_sim};
pub use sivep::{SivepConfig, SivepOutput, SivepReport, convert_sivep};
