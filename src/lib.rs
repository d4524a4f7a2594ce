//! `swm` -- the Stable Kernel Workflow Manager: a control-plane daemon that
//! drives Ubuntu kernel SRU tracking bugs through the release pipeline
//! (spec.md §1). This crate is a thin root re-exporting the CLI entry
//! point; the engine, tracker model, package-set aggregator, task
//! handlers, and external clients each live in their own crate under
//! `crates/`.

pub use swm_cli::run;
