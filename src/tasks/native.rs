//! `native`: build a native binary from the uber archive
//!
//! The toolchain lives under a home directory named by an environment
//! variable (`GRAALVM_HOME` unless configured otherwise). A missing compiler
//! component is installed once through the toolchain's own installer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::archive::{self, uber_path};
use super::{composite, ensure, BuildEnv, NATIVE};
use crate::error::KilnError;
use crate::event_log::EventKind;
use crate::options::Options;

const TOOLCHAIN: &str = "toolchain";
const NATIVE_IMAGE: &str = "native-image";

/// Native binary path: `native.file` override or the project default
pub fn native_path(env: &BuildEnv, options: &Options) -> PathBuf {
    match &options.native_file {
        Some(path) => env.project.path(path),
        None => env.project.native_binary(),
    }
}

pub fn run(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let out = native_path(env, &options);
    if !out.exists() {
        toolchain_home(env)?;
    }
    let mut options = composite(
        env,
        NATIVE,
        &out,
        &[archive::uber, ensure_toolchain, build_binary],
        options,
    )?;
    options.native_file = Some(out);
    Ok(options)
}

/// Toolchain home directory, checked for existence
pub fn toolchain_home(env: &BuildEnv) -> Result<PathBuf, KilnError> {
    let var = &env.project.native.home_env;
    let home = std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| KilnError::ToolchainUnavailable {
            reason: format!("{} is not set", var),
        })?;

    if !home.is_dir() {
        return Err(KilnError::ToolchainUnavailable {
            reason: format!("{}={} is not a directory", var, home.display()),
        });
    }
    Ok(home)
}

fn ensure_toolchain(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let native = &env.project.native;
    let home = toolchain_home(env)?;
    let compiler = home.join(&native.binary);

    if compiler.exists() {
        env.events.emit(EventKind::StepSkipped {
            step: Arc::from(TOOLCHAIN),
            marker: compiler.display().to_string(),
        });
        return Ok(options);
    }

    let installer = home.join(&native.installer);
    if !installer.exists() {
        return Err(KilnError::ToolchainUnavailable {
            reason: format!(
                "{} is missing and there is no installer at {}",
                compiler.display(),
                installer.display()
            ),
        });
    }

    info!(component = %native.component, "installing toolchain component");
    env.toolkit
        .run_process(&installer, &["install".to_string(), native.component.clone()])
        .map_err(|e| KilnError::delegated(TOOLCHAIN, e))?;

    if !compiler.exists() {
        return Err(KilnError::ToolchainUnavailable {
            reason: format!(
                "{} still missing after installing {}",
                compiler.display(),
                native.component
            ),
        });
    }
    env.events.emit(EventKind::StepExecuted {
        step: Arc::from(TOOLCHAIN),
        marker: Some(compiler.display().to_string()),
    });
    Ok(options)
}

fn build_binary(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let compiler = toolchain_home(env)?.join(&env.project.native.binary);
    let out = native_path(env, &options);

    let mut args = vec![
        "-jar".to_string(),
        uber_path(env, &options).display().to_string(),
        "-o".to_string(),
        out.display().to_string(),
        "--no-fallback".to_string(),
    ];
    args.extend(env.project.native.args.iter().cloned());
    args.extend(options.native_args.iter().cloned());

    ensure(env, NATIVE_IMAGE, &out, |toolkit| {
        toolkit.run_process(&compiler, &args)
    })?;
    Ok(options)
}
