pub mod cache;
pub mod config;
pub mod fips;
pub mod gaps;
pub mod input;
pub mod merge;
pub mod pipeline;
pub mod primary;
pub mod redivis;
pub mod resolver;
pub mod sources;
pub mod types;

pub use config::ResolverConfig;
pub use fips::{CountyLookupTable, translate};
pub use gaps::find_gaps;
pub use merge::merge;
pub use pipeline::{CountyResolver, Resolution};
pub use primary::PrimaryLookup;
pub use resolver::{resolve, resolve_gaps, select_candidate};
pub use sources::{PrimarySource, SecondarySource};
pub use types::{CrosswalkRecord, NOT_AVAILABLE, ResolutionStats, ResolvedZip, ZipRecord};
