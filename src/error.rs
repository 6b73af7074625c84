//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum KilnError {
    // ─────────────────────────────────────────────────────────────
    // Pipeline errors (KILN-001 to KILN-030)
    // ─────────────────────────────────────────────────────────────

    #[error("KILN-001: Unknown task '{id}' (available: {})", .available.join(", "))]
    UnknownTask { id: String, available: Vec<String> },

    #[error("KILN-010: Task '{task}' failed: {message}")]
    DelegatedAction { task: String, message: String },

    #[error("KILN-020: Native toolchain unavailable: {reason}")]
    ToolchainUnavailable { reason: String },

    #[error("KILN-030: Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration and I/O
    // ─────────────────────────────────────────────────────────────

    #[error("Config error: {0}")]
    Config(String),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KilnError {
    /// Wrap a toolkit failure, keeping the full context chain in the message
    pub fn delegated(task: &str, err: anyhow::Error) -> Self {
        KilnError::DelegatedAction {
            task: task.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Task identifier the error is attributed to, if any
    pub fn task(&self) -> Option<&str> {
        match self {
            KilnError::UnknownTask { id, .. } => Some(id),
            KilnError::DelegatedAction { task, .. } => Some(task),
            _ => None,
        }
    }
}

impl FixSuggestion for KilnError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            KilnError::UnknownTask { .. } => Some("Run `kiln tasks` to list registered task names"),
            KilnError::DelegatedAction { .. } => {
                Some("Fix the failing step and re-run; completed artifacts are kept")
            }
            KilnError::ToolchainUnavailable { .. } => {
                Some("Point the toolchain home variable (GRAALVM_HOME by default) at a complete install")
            }
            KilnError::InvalidOption { .. } => {
                Some("Use namespaced keys like jar.file=path or mytask.flag=value")
            }
            KilnError::Config(_) => Some("Check kiln.yaml values"),
            KilnError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            KilnError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_task_lists_available() {
        let err = KilnError::UnknownTask {
            id: "jarr".into(),
            available: vec!["clean".into(), "jar".into()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("KILN-001"));
        assert!(msg.contains("'jarr'"));
        assert!(msg.contains("clean, jar"));
        assert_eq!(err.task(), Some("jarr"));
    }

    #[test]
    fn delegated_keeps_context_chain() {
        let source = anyhow::anyhow!("exit status 2").context("archiver failed");
        let err = KilnError::delegated("jar", source);
        let msg = err.to_string();
        assert!(msg.contains("'jar'"));
        assert!(msg.contains("archiver failed: exit status 2"));
    }

    #[test]
    fn errors_carry_suggestions() {
        let errors = [
            KilnError::ToolchainUnavailable { reason: "unset".into() },
            KilnError::Config("bad".into()),
            KilnError::Io(std::io::Error::other("boom")),
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some(), "{err}");
        }
    }
}
