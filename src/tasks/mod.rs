//! # Built-in Tasks
//!
//! Every task follows the same protocol:
//!
//! 1. derive the expected output path (project layout or an options override)
//! 2. if the path exists, skip: the artifact *is* the record of success
//! 3. otherwise do the work through the [`Toolkit`]
//! 4. return the options, possibly with the task's own keys filled in
//!
//! | Task | Marker | Work |
//! |------|--------|------|
//! | `clean` | - | delete the target tree (never skips) |
//! | `stage` | `target/classes` | copy sources and resources |
//! | `compile` | `target/aot` | compile sources |
//! | `metadata` | `target/package.yaml` | write the package descriptor |
//! | `jar` | thin archive | `stage` → `metadata` → package |
//! | `uber` | uber archive | `stage` → `compile` → `metadata` → merge → package |
//! | `install` | archive in local repo | `jar` → install |
//! | `native` | native binary | `uber` → toolchain → native compiler |
//!
//! Composite tasks skip entirely when their final artifact exists. Otherwise
//! each step checks its own marker, so a re-run after a partial failure only
//! redoes the missing steps.

pub mod archive;
pub mod clean;
pub mod compile;
pub mod install;
pub mod metadata;
pub mod native;
pub mod stage;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Project;
use crate::error::KilnError;
use crate::event_log::{EventKind, EventLog};
use crate::options::Options;
use crate::pipeline::{chain, TaskStep};
use crate::toolkit::Toolkit;

pub const CLEAN: &str = "clean";
pub const STAGE: &str = "stage";
pub const COMPILE: &str = "compile";
pub const METADATA: &str = "metadata";
pub const JAR: &str = "jar";
pub const UBER: &str = "uber";
pub const INSTALL: &str = "install";
pub const NATIVE: &str = "native";

/// Everything a task can see besides its options
pub struct BuildEnv {
    pub project: Project,
    pub toolkit: Box<dyn Toolkit>,
    pub events: EventLog,
}

impl BuildEnv {
    pub fn new(project: Project, toolkit: Box<dyn Toolkit>) -> Self {
        Self {
            project,
            toolkit,
            events: EventLog::new(),
        }
    }
}

/// Whether a step did its work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Built,
}

/// Run `action` unless `marker` already exists.
///
/// The action must leave `marker` behind; if it reports success without
/// producing it, the step fails, since the next run would redo the work.
/// A marker left behind by a failed action is removed, so a partial output
/// never passes for a finished one.
pub fn ensure<F>(env: &BuildEnv, step: &str, marker: &Path, action: F) -> Result<Outcome, KilnError>
where
    F: FnOnce(&dyn Toolkit) -> anyhow::Result<()>,
{
    if marker.exists() {
        info!(step, marker = %marker.display(), "up to date, skipping");
        env.events.emit(EventKind::StepSkipped {
            step: Arc::from(step),
            marker: marker.display().to_string(),
        });
        return Ok(Outcome::Skipped);
    }

    info!(step, marker = %marker.display(), "building");
    if let Err(err) = action(env.toolkit.as_ref()) {
        discard_partial(marker);
        return Err(KilnError::delegated(step, err));
    }

    if !marker.exists() {
        return Err(KilnError::DelegatedAction {
            task: step.to_string(),
            message: format!("completed without producing {}", marker.display()),
        });
    }
    env.events.emit(EventKind::StepExecuted {
        step: Arc::from(step),
        marker: Some(marker.display().to_string()),
    });
    Ok(Outcome::Built)
}

fn discard_partial(marker: &Path) {
    let removed = if marker.is_dir() {
        fs::remove_dir_all(marker)
    } else if marker.exists() {
        fs::remove_file(marker)
    } else {
        return;
    };
    match removed {
        Ok(()) => info!(marker = %marker.display(), "removed partial output"),
        Err(e) => warn!(marker = %marker.display(), error = %e, "cannot remove partial output"),
    }
}

/// Run a composite task: skip if `marker` exists, otherwise run `steps`
pub fn composite(
    env: &BuildEnv,
    task: &str,
    marker: &Path,
    steps: &[TaskStep],
    options: Options,
) -> Result<Options, KilnError> {
    if marker.exists() {
        info!(task, marker = %marker.display(), "up to date, skipping");
        env.events.emit(EventKind::StepSkipped {
            step: Arc::from(task),
            marker: marker.display().to_string(),
        });
        return Ok(options);
    }
    chain(env, steps, options)
}


#[cfg(test)]
mod tests {
    use super::testing::env;
    use super::*;
    use std::fs;

    #[test]
    fn ensure_runs_once_then_skips() {
        let (env, tmp, mock) = env();
        let marker = tmp.path().join("target/out.txt");

        let first = ensure(&env, "write", &marker, |tk| {
            tk.write_metadata(
                &crate::toolkit::PackageDescriptor {
                    group: "g".into(),
                    artifact: "a".into(),
                    version: "1".into(),
                    main: None,
                    source_dirs: vec![],
                },
                &marker,
            )
        })
        .unwrap();
        let second = ensure(&env, "write", &marker, |_| unreachable!()).unwrap();

        assert_eq!(first, Outcome::Built);
        assert_eq!(second, Outcome::Skipped);
        assert_eq!(mock.count("write_metadata"), 1);
        assert_eq!(env.events.executed_steps(), vec!["write"]);
        assert_eq!(env.events.skipped_steps(), vec!["write"]);
    }

    #[test]
    fn ensure_fails_when_marker_not_produced() {
        let (env, tmp, _mock) = env();
        let marker = tmp.path().join("never");
        let err = ensure(&env, "lazy", &marker, |_| Ok(())).unwrap_err();
        assert!(matches!(err, KilnError::DelegatedAction { ref task, .. } if task == "lazy"));
    }

    #[test]
    fn ensure_attributes_toolkit_errors_to_step() {
        let (env, tmp, mock) = env();
        mock.fail_on("compile");
        let out = tmp.path().join("target/aot");
        let err = ensure(&env, "compile", &out, |tk| tk.compile(&[], &out, None)).unwrap_err();

        assert_eq!(err.task(), Some("compile"));
        assert!(err.to_string().contains("mock failure in compile"));
        assert!(env.events.executed_steps().is_empty());
    }

    #[test]
    fn failed_action_removes_partial_marker() {
        let (env, tmp, _mock) = env();
        let marker = tmp.path().join("target/aot");

        let err = ensure(&env, "compile", &marker, |_| {
            fs::create_dir_all(marker.join("demo"))?;
            anyhow::bail!("compiler crashed")
        })
        .unwrap_err();

        assert_eq!(err.task(), Some("compile"));
        assert!(!marker.exists());
    }

    #[test]
    fn composite_skips_when_final_marker_exists() {
        fn boom(_: &BuildEnv, _: Options) -> Result<Options, KilnError> {
            panic!("step must not run");
        }
        let (env, tmp, _mock) = env();
        let marker = tmp.path().join("done.jar");
        fs::write(&marker, "x").unwrap();

        composite(&env, "whole", &marker, &[boom], Options::new()).unwrap();
        assert_eq!(env.events.skipped_steps(), vec!["whole"]);
    }
}
