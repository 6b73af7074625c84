//! Local toolkit: real filesystem operations and external processes
//!
//! Compilation and archiving are driven by the command templates in
//! `kiln.yaml`; everything runs with the project root as working directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use super::{expand, ArchiveKind, PackageDescriptor, Toolkit};
use crate::config::Commands;

pub struct LocalToolkit {
    root: PathBuf,
    commands: Commands,
}

impl LocalToolkit {
    pub fn new(root: &Path, commands: Commands) -> Self {
        Self {
            root: root.to_path_buf(),
            commands,
        }
    }

    fn spawn(&self, argv: &[String]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .context("command template is empty")?;
        self.run_process(Path::new(program), args)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    Ok(())
}

impl Toolkit for LocalToolkit {
    fn name(&self) -> &str {
        "local"
    }

    fn delete_tree(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)
                .with_context(|| format!("cannot delete {}", path.display()))?;
        }
        Ok(())
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        if !from.is_dir() {
            bail!("source directory {} does not exist", from.display());
        }
        fs::create_dir_all(to).with_context(|| format!("cannot create {}", to.display()))?;

        for entry in WalkDir::new(from).min_depth(1) {
            let entry = entry.with_context(|| format!("cannot walk {}", from.display()))?;
            let relative = entry.path().strip_prefix(from)?;
            let dest = to.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)
                    .with_context(|| format!("cannot create {}", dest.display()))?;
            } else {
                fs::copy(entry.path(), &dest).with_context(|| {
                    format!("cannot copy {} to {}", entry.path().display(), dest.display())
                })?;
            }
        }
        debug!(from = %from.display(), to = %to.display(), "copied tree");
        Ok(())
    }

    fn compile(&self, sources: &[PathBuf], out: &Path, main: Option<&str>) -> Result<()> {
        fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;

        let mut vars = HashMap::from([("out", display(out))]);
        if let Some(main) = main {
            vars.insert("main", main.to_string());
        }
        let sources: Vec<String> = sources.iter().map(|s| display(s)).collect();
        let lists = HashMap::from([("sources", sources)]);

        let argv = expand(&self.commands.compile, &vars, &lists).context("compile command")?;
        self.spawn(&argv).context("compilation failed")
    }

    fn write_metadata(&self, descriptor: &PackageDescriptor, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let yaml = serde_yaml::to_string(descriptor)?;
        fs::write(path, yaml).with_context(|| format!("cannot write {}", path.display()))
    }

    fn archive(
        &self,
        dir: &Path,
        out: &Path,
        kind: ArchiveKind,
        main: Option<&str>,
    ) -> Result<()> {
        ensure_parent(out)?;
        let template = match kind {
            ArchiveKind::Thin => &self.commands.archive,
            ArchiveKind::Uber => &self.commands.uber_archive,
        };

        let mut vars = HashMap::from([("out", display(out)), ("dir", display(dir))]);
        if let Some(main) = main {
            vars.insert("main", main.to_string());
        }

        let argv = expand(template, &vars, &HashMap::new()).context("archive command")?;
        self.spawn(&argv)
            .with_context(|| format!("packaging {} failed", out.display()))
    }

    fn install(&self, archive: &Path, metadata: &Path, dest: &Path) -> Result<()> {
        ensure_parent(dest)?;
        fs::copy(metadata, dest.with_extension("yaml"))
            .with_context(|| format!("cannot install {}", metadata.display()))?;
        // Archive last: its presence marks the install as complete
        fs::copy(archive, dest)
            .with_context(|| format!("cannot install {}", archive.display()))?;
        Ok(())
    }

    fn run_process(&self, program: &Path, args: &[String]) -> Result<()> {
        debug!(program = %program.display(), ?args, "spawning");
        let status = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .status()
            .with_context(|| format!("failed to start {}", program.display()))?;

        if !status.success() {
            bail!("{} exited with {}", program.display(), status);
        }
        Ok(())
    }

    fn count_revisions(&self, repo: &Path) -> Result<u64> {
        let output = Command::new("git")
            .args(["rev-list", "HEAD", "--count"])
            .current_dir(repo)
            .output()
            .context("failed to start git")?;

        if !output.status.success() {
            bail!(
                "git rev-list failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let count = String::from_utf8_lossy(&output.stdout).trim().parse()?;
        Ok(count)
    }
}
