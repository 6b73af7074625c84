//! Pipeline runner
//!
//! Runs task identifiers strictly left to right, feeding each task the
//! options returned by the previous one. The first failure aborts the run;
//! artifacts produced by earlier tasks stay on disk.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span};

use crate::error::KilnError;
use crate::event_log::EventKind;
use crate::options::Options;
use crate::registry::TaskRegistry;
use crate::tasks::BuildEnv;

/// A step inside a composite task
pub type TaskStep = fn(&BuildEnv, Options) -> Result<Options, KilnError>;

pub struct Pipeline<'a> {
    registry: &'a TaskRegistry,
    env: &'a BuildEnv,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a TaskRegistry, env: &'a BuildEnv) -> Self {
        Self { registry, env }
    }

    /// Run `task_ids` in order, threading `options` through each task.
    ///
    /// An empty list returns `options` unchanged. Identifiers are resolved
    /// one at a time, so tasks before an unknown identifier still run.
    pub fn run<S: AsRef<str>>(
        &self,
        options: Options,
        task_ids: &[S],
    ) -> Result<Options, KilnError> {
        let events = &self.env.events;
        let started = Instant::now();
        events.emit(EventKind::PipelineStarted {
            tasks: task_ids.iter().map(|id| Arc::from(id.as_ref())).collect(),
        });

        let mut current = options;
        for id in task_ids {
            let id = id.as_ref();
            current = match self.run_task(id, current) {
                Ok(next) => next,
                Err(e) => {
                    error!(task = id, error = %e, "pipeline aborted");
                    events.emit(EventKind::PipelineFailed {
                        error: e.to_string(),
                        failed_task: Some(Arc::from(id)),
                    });
                    return Err(e);
                }
            };
        }

        events.emit(EventKind::PipelineCompleted {
            total_duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(current)
    }

    fn run_task(&self, id: &str, options: Options) -> Result<Options, KilnError> {
        let task = self.registry.resolve(id)?;
        let _span = info_span!("task", id).entered();
        let task_id: Arc<str> = Arc::from(id);
        let started = Instant::now();

        self.env.events.emit(EventKind::TaskStarted {
            task_id: Arc::clone(&task_id),
        });
        info!("running");

        match task(self.env, options) {
            Ok(next) => {
                self.env.events.emit(EventKind::TaskCompleted {
                    task_id,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                Ok(next)
            }
            Err(e) => {
                self.env.events.emit(EventKind::TaskFailed {
                    task_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// Run a fixed sub-chain of steps with the same threading as [`Pipeline::run`]
pub fn chain(env: &BuildEnv, steps: &[TaskStep], options: Options) -> Result<Options, KilnError> {
    steps.iter().try_fold(options, |current, step| step(env, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::env;

    fn tag(opts: Options, id: &str) -> Options {
        let trail = opts.get("trace.order").unwrap_or_default().to_string();
        let trail = if trail.is_empty() {
            id.to_string()
        } else {
            format!("{trail},{id}")
        };
        opts.with("trace.order", trail)
    }

    #[test]
    fn empty_pipeline_returns_options_unchanged() {
        let (env, _tmp, _mock) = env();
        let registry = TaskRegistry::new();
        let opts = Options::new().with("keep.me", "1");

        let out = Pipeline::new(&registry, &env)
            .run(opts.clone(), &[] as &[&str])
            .unwrap();
        assert_eq!(out, opts);
    }

    #[test]
    fn chain_threads_options() {
        fn a(_: &BuildEnv, o: Options) -> Result<Options, KilnError> {
            Ok(tag(o, "a"))
        }
        fn b(_: &BuildEnv, o: Options) -> Result<Options, KilnError> {
            Ok(tag(o, "b"))
        }
        let (env, _tmp, _mock) = env();
        let out = chain(&env, &[a, b, a], Options::new()).unwrap();
        assert_eq!(out.get("trace.order"), Some("a,b,a"));
    }

    #[test]
    fn events_record_failure() {
        let (env, _tmp, _mock) = env();
        let mut registry = TaskRegistry::new();
        registry.register("ok", |_: &BuildEnv, o: Options| Ok(o));

        let err = Pipeline::new(&registry, &env)
            .run(Options::new(), &["ok", "missing"])
            .unwrap_err();
        assert!(matches!(err, KilnError::UnknownTask { .. }));

        let last = env.events.events().pop().unwrap();
        assert_eq!(
            last.kind,
            EventKind::PipelineFailed {
                error: err.to_string(),
                failed_task: Some("missing".into()),
            }
        );
        assert_eq!(env.events.filter_task("ok").len(), 2);
    }
}
