//! Task handlers (C4, spec.md §4.4): one state machine per workflow task.
//! Each handler is a pure function from a gathered context to a
//! `TaskDecision`; the engine (C5) is responsible for gathering that
//! context from the tracker, catalog, and package-set aggregator, and for
//! applying the decision back to the `Bug`.

pub mod decision;
pub mod prepare_package;
pub mod promote;
pub mod publishing_window;
pub mod security_signoff;
pub mod snap_release;
pub mod testing;

pub use decision::{TaskDecision, TaskResult};
pub use publishing_window::within_publishing_window;
