//! Mock toolkit for testing
//!
//! Writes placeholder artifacts instead of compiling or archiving, so
//! existence checks behave exactly as with the local toolkit. Every call is
//! recorded for assertions. Clones share state.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use super::{ArchiveKind, PackageDescriptor, Toolkit};

/// A recorded toolkit invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitCall {
    pub op: &'static str,
    pub target: PathBuf,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ToolkitCall>,
    failing: HashSet<String>,
    /// program -> file it creates when run
    process_effects: HashMap<PathBuf, PathBuf>,
    revisions: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MockToolkit {
    state: Arc<Mutex<MockState>>,
}

impl MockToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision count reported to version derivation
    pub fn with_revisions(self, revisions: u64) -> Self {
        self.state.lock().revisions = revisions;
        self
    }

    /// Make every call to `op` fail
    pub fn fail_on(&self, op: &str) {
        self.state.lock().failing.insert(op.to_string());
    }

    /// Stop failing `op`
    pub fn recover(&self, op: &str) {
        self.state.lock().failing.remove(op);
    }

    /// Running `program` creates `creates`
    pub fn on_process(&self, program: impl Into<PathBuf>, creates: impl Into<PathBuf>) {
        self.state
            .lock()
            .process_effects
            .insert(program.into(), creates.into());
    }

    /// All recorded calls
    pub fn calls(&self) -> Vec<ToolkitCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls to `op`
    pub fn count(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Recorded ops, in call order
    pub fn ops(&self) -> Vec<&'static str> {
        self.state.lock().calls.iter().map(|c| c.op).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, op: &'static str, target: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(ToolkitCall {
            op,
            target: target.to_path_buf(),
        });
        if state.failing.contains(op) {
            bail!("mock failure in {} for {}", op, target.display());
        }
        Ok(())
    }
}

fn placeholder(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

impl Toolkit for MockToolkit {
    fn name(&self) -> &str {
        "mock"
    }

    fn delete_tree(&self, path: &Path) -> Result<()> {
        self.record("delete_tree", path)?;
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        self.record("copy_tree", to)?;
        fs::create_dir_all(to)?;
        placeholder(
            &to.join(".copied"),
            &format!("{}\n", from.display()),
        )
    }

    fn compile(&self, sources: &[PathBuf], out: &Path, _main: Option<&str>) -> Result<()> {
        self.record("compile", out)?;
        fs::create_dir_all(out)?;
        placeholder(&out.join(".compiled"), &format!("{} sources\n", sources.len()))
    }

    fn write_metadata(&self, descriptor: &PackageDescriptor, path: &Path) -> Result<()> {
        self.record("write_metadata", path)?;
        placeholder(path, &serde_yaml::to_string(descriptor)?)
    }

    fn archive(
        &self,
        dir: &Path,
        out: &Path,
        kind: ArchiveKind,
        main: Option<&str>,
    ) -> Result<()> {
        self.record("archive", out)?;
        if kind == ArchiveKind::Uber && main.is_none() {
            bail!("uber archive needs an entry point");
        }
        placeholder(out, &format!("mock {:?} archive of {}\n", kind, dir.display()))
    }

    fn install(&self, archive: &Path, metadata: &Path, dest: &Path) -> Result<()> {
        self.record("install", dest)?;
        if !archive.exists() {
            bail!("nothing to install: {} is missing", archive.display());
        }
        placeholder(&dest.with_extension("yaml"), &fs::read_to_string(metadata)?)?;
        fs::copy(archive, dest)?;
        Ok(())
    }

    fn run_process(&self, program: &Path, args: &[String]) -> Result<()> {
        self.record("run_process", program)?;
        let effect = self.state.lock().process_effects.get(program).cloned();
        if let Some(created) = effect {
            placeholder(&created, "mock binary\n")?;
        }
        // Compilers conventionally take `-o <output>`
        if let Some(pos) = args.iter().position(|a| a == "-o") {
            if let Some(out) = args.get(pos + 1) {
                placeholder(Path::new(out), "mock output\n")?;
            }
        }
        Ok(())
    }

    fn count_revisions(&self, repo: &Path) -> Result<u64> {
        self.record("count_revisions", repo)?;
        Ok(self.state.lock().revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clones_share_recorded_calls() {
        let tmp = TempDir::new().unwrap();
        let mock = MockToolkit::new();
        let handle = mock.clone();

        mock.compile(&[], &tmp.path().join("aot"), None).unwrap();
        assert_eq!(handle.count("compile"), 1);
        assert_eq!(handle.ops(), vec!["compile"]);
        assert!(tmp.path().join("aot").is_dir());
    }

    #[test]
    fn failing_op_records_but_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("demo.jar");
        let mock = MockToolkit::new();
        mock.fail_on("archive");

        let err = mock
            .archive(tmp.path(), &out, ArchiveKind::Thin, None)
            .unwrap_err();
        assert!(err.to_string().contains("mock failure in archive"));
        assert_eq!(mock.count("archive"), 1);
        assert!(!out.exists());

        mock.recover("archive");
        mock.archive(tmp.path(), &out, ArchiveKind::Thin, None).unwrap();
        assert!(out.is_file());
    }

    #[test]
    fn run_process_honours_output_flag_and_effects() {
        let tmp = TempDir::new().unwrap();
        let installer = tmp.path().join("bin/gu");
        let compiler = tmp.path().join("bin/native-image");
        let out = tmp.path().join("target/app");

        let mock = MockToolkit::new();
        mock.on_process(&installer, &compiler);
        mock.run_process(&installer, &["install".into()]).unwrap();
        assert!(compiler.is_file());

        mock.run_process(&compiler, &["-o".into(), out.display().to_string()])
            .unwrap();
        assert!(out.is_file());
        assert_eq!(mock.count("run_process"), 2);
    }
}
