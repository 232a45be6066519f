//! Input/output helpers.
//!
//! - answers JSON and reference dataset header ingest (`ingest`)
//! - case exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
