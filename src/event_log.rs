//! Pipeline event log
//!
//! Append-only record of what a pipeline did.
//! - Event: envelope with id + timestamp + kind
//! - EventKind: pipeline level, task level, and step level (skip/execute)
//! - EventLog: cheap to clone, clones share the same log

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the pipeline log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // PIPELINE LEVEL
    // ═══════════════════════════════════════════
    PipelineStarted {
        tasks: Vec<Arc<str>>,
    },
    PipelineCompleted {
        total_duration_ms: u64,
    },
    PipelineFailed {
        error: String,
        failed_task: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    TaskStarted {
        task_id: Arc<str>,
    },
    TaskCompleted {
        task_id: Arc<str>,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: Arc<str>,
        error: String,
    },

    // ═══════════════════════════════════════════
    // STEP LEVEL (artifact markers)
    // ═══════════════════════════════════════════
    /// Marker present, work skipped
    StepSkipped {
        step: Arc<str>,
        marker: String,
    },
    /// Delegated work performed
    StepExecuted {
        step: Arc<str>,
        marker: Option<String>,
    },
}

impl EventKind {
    /// Task or step name, if the event is not pipeline-level
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskStarted { task_id }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. } => Some(task_id),
            Self::StepSkipped { step, .. } | Self::StepExecuted { step, .. } => Some(step),
            Self::PipelineStarted { .. }
            | Self::PipelineCompleted { .. }
            | Self::PipelineFailed { .. } => None,
        }
    }

    pub fn is_pipeline_event(&self) -> bool {
        matches!(
            self,
            Self::PipelineStarted { .. }
                | Self::PipelineCompleted { .. }
                | Self::PipelineFailed { .. }
        )
    }
}

/// Append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event, returns its ID
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Events for one task or step
    pub fn filter_task(&self, task_id: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.task_id() == Some(task_id))
            .collect()
    }

    /// Names of steps that performed work, in order
    pub fn executed_steps(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::StepExecuted { step, .. } => Some(step.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Names of steps skipped because their marker existed, in order
    pub fn skipped_steps(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::StepSkipped { step, .. } => Some(step.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_id_extraction() {
        let started = EventKind::TaskStarted {
            task_id: "jar".into(),
        };
        assert_eq!(started.task_id(), Some("jar"));

        let skipped = EventKind::StepSkipped {
            step: "stage".into(),
            marker: "target/classes".into(),
        };
        assert_eq!(skipped.task_id(), Some("stage"));

        let pipeline = EventKind::PipelineStarted { tasks: vec![] };
        assert_eq!(pipeline.task_id(), None);
        assert!(pipeline.is_pipeline_event());
    }

    #[test]
    fn serializes_with_type_tag() {
        let kind = EventKind::StepExecuted {
            step: "metadata".into(),
            marker: Some("target/package.yaml".into()),
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["type"], "step_executed");
        assert_eq!(value["step"], "metadata");
        assert_eq!(value["marker"], "target/package.yaml");
    }

    #[test]
    fn deserializes_from_tagged_json() {
        let value = json!({"type": "task_failed", "task_id": "uber", "error": "boom"});
        let kind: EventKind = serde_json::from_value(value).unwrap();
        assert_eq!(
            kind,
            EventKind::TaskFailed {
                task_id: "uber".into(),
                error: "boom".into()
            }
        );
    }

    #[test]
    fn ids_are_monotonic_and_clones_share() {
        let log = EventLog::new();
        let clone = log.clone();
        let a = log.emit(EventKind::TaskStarted { task_id: "a".into() });
        let b = clone.emit(EventKind::TaskStarted { task_id: "b".into() });

        assert!(b > a);
        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_task("b").len(), 1);
    }

    #[test]
    fn executed_and_skipped_steps_keep_order() {
        let log = EventLog::new();
        log.emit(EventKind::StepSkipped {
            step: "stage".into(),
            marker: "m".into(),
        });
        log.emit(EventKind::StepExecuted {
            step: "metadata".into(),
            marker: None,
        });
        log.emit(EventKind::StepExecuted {
            step: "package-thin".into(),
            marker: None,
        });

        assert_eq!(log.skipped_steps(), vec!["stage"]);
        assert_eq!(log.executed_steps(), vec!["metadata", "package-thin"]);
    }
}
