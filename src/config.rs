//! Project configuration (`kiln.yaml`)
//!
//! [`BuildConfig`] is the raw file. [`Project`] is the resolved, immutable
//! form built once per invocation and shared by every task.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KilnError;
use crate::toolkit::Toolkit;

pub const DEFAULT_CONFIG_FILE: &str = "kiln.yaml";

/// Raw configuration as written in `kiln.yaml`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub group: String,
    pub artifact: String,
    /// Explicit version; derived from the revision count when absent
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_version_prefix")]
    pub version_prefix: String,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<PathBuf>,
    #[serde(default = "default_resource_dirs")]
    pub resource_dirs: Vec<PathBuf>,
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,
    #[serde(default)]
    pub local_repo: Option<String>,
    #[serde(default)]
    pub commands: Commands,
    #[serde(default)]
    pub native: NativeConfig,
}

/// External command templates used by the local toolkit
///
/// Placeholders: `{out}`, `{dir}`, `{main}`, and `{sources}` (which expands
/// to one argument per source directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Commands {
    pub compile: Vec<String>,
    pub archive: Vec<String>,
    pub uber_archive: Vec<String>,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            compile: vec![
                "clojure".into(),
                "-M".into(),
                "-e".into(),
                "(binding [*compile-path* \"{out}\"] (compile '{main}))".into(),
            ],
            archive: args(&["jar", "cf", "{out}", "-C", "{dir}", "."]),
            uber_archive: args(&["jar", "cfe", "{out}", "{main}", "-C", "{dir}", "."]),
        }
    }
}

/// Native compilation toolchain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeConfig {
    /// Environment variable holding the toolchain home
    pub home_env: String,
    /// Compiler binary, relative to the toolchain home
    pub binary: PathBuf,
    /// Component installer, relative to the toolchain home
    pub installer: PathBuf,
    /// Component name passed to the installer
    pub component: String,
    /// Output binary name (defaults to the artifact name)
    pub name: Option<String>,
    /// Extra compiler arguments
    pub args: Vec<String>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            home_env: "GRAALVM_HOME".into(),
            binary: PathBuf::from("bin/native-image"),
            installer: PathBuf::from("bin/gu"),
            component: "native-image".into(),
            name: None,
            args: Vec::new(),
        }
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_version_prefix() -> String {
    "0.1".to_string()
}

fn default_source_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

fn default_resource_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("resources")]
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("target")
}

impl BuildConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, KilnError> {
        let yaml = fs::read_to_string(path).map_err(|e| {
            KilnError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, KilnError> {
        let config: BuildConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), KilnError> {
        if self.group.trim().is_empty() {
            return Err(KilnError::Config("group must not be empty".into()));
        }
        if self.artifact.trim().is_empty() || self.artifact.contains(['/', '\\']) {
            return Err(KilnError::Config(format!(
                "invalid artifact name '{}'",
                self.artifact
            )));
        }
        if self.source_dirs.is_empty() {
            return Err(KilnError::Config("source_dirs must not be empty".into()));
        }
        // `clean` deletes this tree, so it has to stay strictly inside the project
        let mut components = self.target_dir.components();
        let inside = components.clone().count() > 0
            && components.all(|c| matches!(c, Component::Normal(_)));
        if !inside {
            return Err(KilnError::Config(format!(
                "target_dir '{}' must be a relative path below the project root",
                self.target_dir.display()
            )));
        }
        Ok(())
    }
}

/// Output directory layout below the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub target: PathBuf,
    /// Staged sources and resources
    pub classes: PathBuf,
    /// Compiled output
    pub aot: PathBuf,
    /// Merged tree packaged into the uber archive
    pub uber: PathBuf,
    /// Package descriptor
    pub metadata: PathBuf,
}

impl Layout {
    fn new(target: PathBuf) -> Self {
        Self {
            classes: target.join("classes"),
            aot: target.join("aot"),
            uber: target.join("uber"),
            metadata: target.join("package.yaml"),
            target,
        }
    }
}

/// Resolved project, immutable for the whole invocation
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub root: PathBuf,
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub main: Option<String>,
    pub source_dirs: Vec<PathBuf>,
    pub resource_dirs: Vec<PathBuf>,
    pub layout: Layout,
    pub local_repo: PathBuf,
    pub commands: Commands,
    pub native: NativeConfig,
}

impl Project {
    /// Resolve paths against `root` and settle the version
    pub fn resolve(
        config: BuildConfig,
        root: &Path,
        toolkit: &dyn Toolkit,
    ) -> Result<Self, KilnError> {
        let version = match config.version {
            Some(v) => v,
            None => {
                let revs = toolkit.count_revisions(root).map_err(|e| {
                    KilnError::Config(format!(
                        "version not set and revision count failed: {:#}",
                        e
                    ))
                })?;
                format!("{}.{}", config.version_prefix, revs)
            }
        };
        debug!(%version, "resolved project version");

        let local_repo = match config.local_repo {
            Some(repo) => expand_home(&repo)?,
            None => dirs::home_dir()
                .map(|home| home.join(".m2").join("repository"))
                .ok_or_else(|| {
                    KilnError::Config("cannot locate home directory; set local_repo".into())
                })?,
        };

        Ok(Self {
            root: root.to_path_buf(),
            group: config.group,
            artifact: config.artifact,
            version,
            main: config.main,
            source_dirs: config.source_dirs.iter().map(|d| root.join(d)).collect(),
            resource_dirs: config.resource_dirs.iter().map(|d| root.join(d)).collect(),
            layout: Layout::new(root.join(&config.target_dir)),
            local_repo: root.join(local_repo),
            commands: config.commands,
            native: config.native,
        })
    }

    /// Resolve a user-supplied path against the project root
    pub fn path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn thin_archive(&self) -> PathBuf {
        self.layout
            .target
            .join(format!("{}-{}.jar", self.artifact, self.version))
    }

    pub fn uber_archive(&self) -> PathBuf {
        self.layout
            .target
            .join(format!("{}-{}-standalone.jar", self.artifact, self.version))
    }

    pub fn native_binary(&self) -> PathBuf {
        let name = self.native.name.as_deref().unwrap_or(&self.artifact);
        self.layout.target.join(name)
    }

    /// Archive location inside the local package repository
    pub fn installed_archive(&self) -> PathBuf {
        let mut dir = self.local_repo.clone();
        dir.extend(self.group.split('.'));
        dir.join(&self.artifact)
            .join(&self.version)
            .join(format!("{}-{}.jar", self.artifact, self.version))
    }
}

fn expand_home(path: &str) -> Result<PathBuf, KilnError> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or_else(|| KilnError::Config(format!("cannot expand '{}'", path))),
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::MockToolkit;

    fn minimal() -> &'static str {
        r#"
group: io.kiln.demo
artifact: demo
local_repo: /tmp/repo
"#
    }

    #[test]
    fn defaults_fill_layout_and_commands() {
        let config = BuildConfig::from_yaml(minimal()).unwrap();
        assert_eq!(config.source_dirs, vec![PathBuf::from("src")]);
        assert_eq!(config.target_dir, PathBuf::from("target"));
        assert_eq!(config.native.home_env, "GRAALVM_HOME");
        assert_eq!(config.commands.archive[0], "jar");
    }

    #[test]
    fn version_derived_from_revision_count() {
        let config = BuildConfig::from_yaml(minimal()).unwrap();
        let toolkit = MockToolkit::new().with_revisions(42);
        let project = Project::resolve(config, Path::new("/work"), &toolkit).unwrap();

        assert_eq!(project.version, "0.1.42");
        assert_eq!(project.thin_archive(), PathBuf::from("/work/target/demo-0.1.42.jar"));
        assert_eq!(
            project.uber_archive(),
            PathBuf::from("/work/target/demo-0.1.42-standalone.jar")
        );
        assert_eq!(project.native_binary(), PathBuf::from("/work/target/demo"));
    }

    #[test]
    fn explicit_version_skips_revision_count() {
        let yaml = format!("{}version: 2.0.0\n", minimal());
        let config = BuildConfig::from_yaml(&yaml).unwrap();
        let toolkit = MockToolkit::new();
        let project = Project::resolve(config, Path::new("/work"), &toolkit).unwrap();

        assert_eq!(project.version, "2.0.0");
        assert_eq!(toolkit.count("count_revisions"), 0);
    }

    #[test]
    fn installed_archive_follows_group_path() {
        let yaml = format!("{}version: 1.0.3\n", minimal());
        let config = BuildConfig::from_yaml(&yaml).unwrap();
        let project = Project::resolve(config, Path::new("/work"), &MockToolkit::new()).unwrap();

        assert_eq!(
            project.installed_archive(),
            PathBuf::from("/tmp/repo/io/kiln/demo/demo/1.0.3/demo-1.0.3.jar")
        );
    }

    #[test]
    fn target_dir_must_stay_inside_project() {
        for bad in ["/", "..", "../out", ".", "/tmp/target"] {
            let yaml = format!("{}target_dir: \"{}\"\n", minimal(), bad);
            let err = BuildConfig::from_yaml(&yaml).unwrap_err();
            assert!(matches!(err, KilnError::Config(_)), "{bad} accepted");
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{}targetdir: out\n", minimal());
        assert!(matches!(
            BuildConfig::from_yaml(&yaml).unwrap_err(),
            KilnError::YamlParse(_)
        ));
    }

    #[test]
    fn empty_artifact_is_rejected() {
        let yaml = "group: g\nartifact: \"\"\n";
        assert!(matches!(
            BuildConfig::from_yaml(yaml).unwrap_err(),
            KilnError::Config(_)
        ));
    }
}
