//! `wdi-harvest` library crate.
//!
//! The binary (`wdi`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes or touching the network
//! - the remote source sits behind a trait (`data::SeriesSource`)
//! - downstream tools can reuse the table and naming code

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod table;
