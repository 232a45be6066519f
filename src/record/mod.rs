//! Record assembly: build, encode missingness, coerce.
//!
//! The stages are ordered by their types: `build_record` yields a `Record`,
//! `encode_missingness` consumes it into an `EncodedRecord`, and `coerce`
//! consumes that into the classifier-ready `CoercedRecord`.

pub mod alias;
pub mod builder;
pub mod coerce;
pub mod missingness;

pub use alias::*;
pub use builder::*;
pub use coerce::*;
pub use missingness::*;
