//! Command-line entry point for `swm` (spec.md §6). Parses arguments,
//! discovers configuration, wires up the external clients, and drives one
//! scan through the workflow manager.

pub mod args;
pub mod config;
pub mod run;

pub use run::run;
