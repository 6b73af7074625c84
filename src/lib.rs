//! Kiln - idempotent build pipelines
//!
//! Every task checks for its output artifact before doing anything, so a
//! pipeline can be re-run at any time and only redoes what is missing.

pub mod config;
pub mod error;
pub mod event_log;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod tasks;
pub mod toolkit;

pub use config::{BuildConfig, Project};
pub use error::{FixSuggestion, KilnError};
pub use event_log::{Event, EventKind, EventLog};
pub use options::Options;
pub use pipeline::Pipeline;
pub use registry::{TaskFn, TaskRegistry};
pub use tasks::BuildEnv;
pub use toolkit::{create_toolkit, LocalToolkit, MockToolkit, Toolkit};
