//! Task registry
//!
//! Maps task identifiers to task functions. Filled once at startup so a
//! pipeline can be plain data (CLI arguments, a file) and still be resolved
//! at run time.

use std::collections::BTreeMap;

use crate::error::KilnError;
use crate::options::Options;
use crate::tasks::{self, BuildEnv};

/// A task: takes the current options, returns the next ones
pub type TaskFn = Box<dyn Fn(&BuildEnv, Options) -> Result<Options, KilnError>>;

#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskFn>,
}

impl TaskRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in task
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(tasks::CLEAN, tasks::clean::run);
        registry.register(tasks::STAGE, tasks::stage::run);
        registry.register(tasks::COMPILE, tasks::compile::run);
        registry.register(tasks::METADATA, tasks::metadata::run);
        registry.register(tasks::JAR, tasks::archive::jar);
        registry.register(tasks::UBER, tasks::archive::uber);
        registry.register(tasks::INSTALL, tasks::install::run);
        registry.register(tasks::NATIVE, tasks::native::run);
        registry
    }

    /// Bind `id` to `task`, replacing any previous binding
    pub fn register<F>(&mut self, id: impl Into<String>, task: F)
    where
        F: Fn(&BuildEnv, Options) -> Result<Options, KilnError> + 'static,
    {
        self.tasks.insert(id.into(), Box::new(task));
    }

    /// Look up a task by identifier
    pub fn resolve(&self, id: &str) -> Result<&TaskFn, KilnError> {
        self.tasks.get(id).ok_or_else(|| KilnError::UnknownTask {
            id: id.to_string(),
            available: self.ids(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registers_every_task() {
        let registry = TaskRegistry::builtin();
        assert_eq!(
            registry.ids(),
            vec!["clean", "compile", "install", "jar", "metadata", "native", "stage", "uber"]
        );
    }

    #[test]
    fn resolve_unknown_reports_available() {
        let registry = TaskRegistry::builtin();
        let err = registry.resolve("deploy").err().unwrap();
        match err {
            KilnError::UnknownTask { id, available } => {
                assert_eq!(id, "deploy");
                assert!(available.contains(&"jar".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn register_replaces_binding() {
        let mut registry = TaskRegistry::new();
        registry.register("noop", |_env: &BuildEnv, opts: Options| Ok(opts));
        assert!(registry.contains("noop"));
        assert!(!registry.contains("jar"));

        registry.register("noop", |_env: &BuildEnv, opts: Options| {
            Ok(opts.with("noop.replaced", "yes"))
        });
        assert_eq!(registry.ids().len(), 1);
    }
}
