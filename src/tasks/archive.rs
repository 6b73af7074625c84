//! `jar` and `uber`: thin and self-contained archives
//!
//! Both are composites. `jar` stages and describes the project, then packs
//! the staging tree. `uber` also compiles, merges staged and compiled output
//! into one tree, and packs that with an entry point.

use std::path::PathBuf;

use super::{compile, composite, ensure, metadata, stage, BuildEnv, JAR, UBER};
use crate::error::KilnError;
use crate::options::Options;
use crate::toolkit::ArchiveKind;

const PACKAGE_THIN: &str = "package-thin";
const PACKAGE_UBER: &str = "package-uber";

/// Thin archive path: `jar.file` override or the project default
pub fn thin_path(env: &BuildEnv, options: &Options) -> PathBuf {
    match &options.jar_file {
        Some(path) => env.project.path(path),
        None => env.project.thin_archive(),
    }
}

/// Uber archive path: `uber.file` override or the project default
pub fn uber_path(env: &BuildEnv, options: &Options) -> PathBuf {
    match &options.uber_file {
        Some(path) => env.project.path(path),
        None => env.project.uber_archive(),
    }
}

pub fn jar(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let out = thin_path(env, &options);
    let mut options = composite(
        env,
        JAR,
        &out,
        &[stage::run, metadata::run, package_thin],
        options,
    )?;
    options.jar_file = Some(out);
    Ok(options)
}

pub fn uber(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let out = uber_path(env, &options);
    let mut options = composite(
        env,
        UBER,
        &out,
        &[stage::run, compile::run, metadata::run, package_uber],
        options,
    )?;
    options.uber_file = Some(out);
    Ok(options)
}

fn package_thin(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let out = thin_path(env, &options);
    let classes = &env.project.layout.classes;

    ensure(env, PACKAGE_THIN, &out, |toolkit| {
        toolkit.archive(classes, &out, ArchiveKind::Thin, None)
    })?;
    Ok(options)
}

fn package_uber(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let out = uber_path(env, &options);
    let layout = &env.project.layout;
    let main = options.main.as_deref().or(env.project.main.as_deref());

    ensure(env, PACKAGE_UBER, &out, |toolkit| {
        toolkit.copy_tree(&layout.classes, &layout.uber)?;
        toolkit.copy_tree(&layout.aot, &layout.uber)?;
        toolkit.archive(&layout.uber, &out, ArchiveKind::Uber, main)
    })?;
    Ok(options)
}
