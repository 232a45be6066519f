//! `lyrae` library crate.
//!
//! The binary (`lyrae`) is a thin wrapper around this library so that:
//!
//! - the evaluation pipeline is testable without spawning processes
//! - a form front-end or a service can drive the same engine context
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod io;
pub mod math;
pub mod models;
pub mod record;
pub mod report;
pub mod schema;
pub mod text;
