//! Geodesy utilities: map projections and affine pixel transforms.

pub mod affine;
pub mod projection;

pub use affine::*;
pub use projection::*;
