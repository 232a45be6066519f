//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - caller answers (`Answer`, `Answers`)
//! - the per-subject record and its cells (`Record`, `Cell`, `Coerced`)
//! - declared feature roles (`FeatureKind`)
//! - geocoding outcomes (`GeoPoint`, `GeocodeResult`)

pub mod types;

pub use types::*;
