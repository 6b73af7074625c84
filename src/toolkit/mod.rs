//! # Build Toolkit
//!
//! The collaborator that does the actual work behind every task.
//!
//! - [`Toolkit`] - Core trait: copy, compile, archive, install, spawn
//! - [`LocalToolkit`] - Real filesystem and external processes
//! - [`MockToolkit`] - Records calls and writes placeholder artifacts
//!
//! Tasks only decide *whether* to call the toolkit; the toolkit decides
//! *how*. Failures are plain `anyhow` errors, the task layer attributes
//! them to the step that made the call.
//!
//! ```rust
//! use kiln::toolkit::create_toolkit;
//! use kiln::config::Commands;
//! use std::path::Path;
//!
//! let mock = create_toolkit("mock", Path::new("."), &Commands::default());
//! assert!(mock.is_ok());
//!
//! let unknown = create_toolkit("remote", Path::new("."), &Commands::default());
//! assert!(unknown.is_err());
//! ```

mod command;
mod local;
mod mock;

pub use command::expand;
pub use local::LocalToolkit;
pub use mock::{MockToolkit, ToolkitCall};

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Commands;
use crate::error::KilnError;

/// Which flavour of archive to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Project classes only
    Thin,
    /// Self-contained, with an entry point
    Uber,
}

/// Package-metadata descriptor written by the `metadata` task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub group: String,
    pub artifact: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default)]
    pub source_dirs: Vec<PathBuf>,
}

pub trait Toolkit {
    /// Toolkit name
    fn name(&self) -> &str;

    /// Remove a directory tree; a missing tree is not an error
    fn delete_tree(&self, path: &Path) -> Result<()>;

    /// Copy the contents of `from` into `to`, creating `to`
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()>;

    /// Compile `sources` into `out`
    fn compile(&self, sources: &[PathBuf], out: &Path, main: Option<&str>) -> Result<()>;

    /// Serialize the descriptor to `path`
    fn write_metadata(&self, descriptor: &PackageDescriptor, path: &Path) -> Result<()>;

    /// Package `dir` into the archive `out`
    fn archive(&self, dir: &Path, out: &Path, kind: ArchiveKind, main: Option<&str>)
        -> Result<()>;

    /// Install `archive` at `dest`; the descriptor goes next to it as `.yaml`
    fn install(&self, archive: &Path, metadata: &Path, dest: &Path) -> Result<()>;

    /// Spawn a process and block until it exits; nonzero exit is an error
    fn run_process(&self, program: &Path, args: &[String]) -> Result<()>;

    /// Number of revisions reachable from HEAD in the repository at `repo`
    fn count_revisions(&self, repo: &Path) -> Result<u64>;
}

/// Create a toolkit by name
pub fn create_toolkit(
    name: &str,
    root: &Path,
    commands: &Commands,
) -> Result<Box<dyn Toolkit>, KilnError> {
    match name {
        "local" => Ok(Box::new(LocalToolkit::new(root, commands.clone()))),
        "mock" => Ok(Box::new(MockToolkit::new())),
        other => Err(KilnError::Config(format!(
            "unknown toolkit '{}' (expected local or mock)",
            other
        ))),
    }
}
