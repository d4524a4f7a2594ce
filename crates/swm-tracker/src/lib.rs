//! The tracker (`Bug`) model: title/tag/description parsing, SWM
//! properties, phase and reason management (spec.md §3, §4.2).

pub mod bug;
pub mod properties;
pub mod reason;
pub mod tags;
pub mod version;

pub use bug::{Bug, StatusSummary, DEVELOPMENT_WORKFLOW_TASK, STABLE_WORKFLOW_TASK};
pub use properties::SwmProperties;
pub use reason::ReasonKind;
pub use version::{git_tag_candidates, TitleInfo, VersionInfo};
