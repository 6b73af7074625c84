//! Pipeline options threaded from task to task
//!
//! Well-known keys are statically named fields. Anything else must be
//! namespaced (`task.key`) and lands in [`Options::extra`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::KilnError;

pub const JAR_FILE: &str = "jar.file";
pub const UBER_FILE: &str = "uber.file";
pub const NATIVE_FILE: &str = "native.file";
pub const NATIVE_ARGS: &str = "native.args";
pub const MAIN: &str = "main";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Thin archive path override
    #[serde(rename = "jar.file", default, skip_serializing_if = "Option::is_none")]
    pub jar_file: Option<PathBuf>,

    /// Uber archive path override
    #[serde(rename = "uber.file", default, skip_serializing_if = "Option::is_none")]
    pub uber_file: Option<PathBuf>,

    /// Native binary path override
    #[serde(rename = "native.file", default, skip_serializing_if = "Option::is_none")]
    pub native_file: Option<PathBuf>,

    /// Extra native compiler arguments
    #[serde(rename = "native.args", default, skip_serializing_if = "Vec::is_empty")]
    pub native_args: Vec<String>,

    /// Entry point override (shared)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Namespaced extension keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key from its textual form (`jar.file=...` on the CLI)
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), KilnError> {
        match key {
            JAR_FILE => self.jar_file = Some(PathBuf::from(value)),
            UBER_FILE => self.uber_file = Some(PathBuf::from(value)),
            NATIVE_FILE => self.native_file = Some(PathBuf::from(value)),
            NATIVE_ARGS => self
                .native_args
                .extend(value.split_whitespace().map(str::to_string)),
            MAIN => self.main = Some(value.to_string()),
            _ => {
                validate_namespaced(key)?;
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Builder form of [`Options::set`] for namespaced extension keys
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Read a namespaced extension key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Parse a `key=value` pair
    pub fn parse_pair(pair: &str) -> Result<(String, String), KilnError> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(KilnError::InvalidOption {
                key: pair.to_string(),
                reason: "expected key=value".to_string(),
            }),
        }
    }

    /// Load options from a YAML file
    pub fn from_yaml(yaml: &str) -> Result<Self, KilnError> {
        let options: Options = serde_yaml::from_str(yaml)?;
        for key in options.extra.keys() {
            validate_namespaced(key)?;
        }
        Ok(options)
    }
}

fn validate_namespaced(key: &str) -> Result<(), KilnError> {
    match key.split_once('.') {
        Some((ns, rest)) if !ns.is_empty() && !rest.is_empty() => Ok(()),
        _ => Err(KilnError::InvalidOption {
            key: key.to_string(),
            reason: "unknown key; extension keys must be namespaced as task.key".to_string(),
        }),
    }
}
