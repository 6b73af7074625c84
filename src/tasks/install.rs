//! `install`: put the thin archive into the local package repository

use super::archive::{self, thin_path};
use super::{composite, ensure, metadata, BuildEnv, INSTALL};
use crate::error::KilnError;
use crate::options::Options;

const INSTALL_ARCHIVE: &str = "install-archive";

pub fn run(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let dest = env.project.installed_archive();
    let jar = thin_path(env, &options);
    let mut options = composite(
        env,
        INSTALL,
        &dest,
        &[archive::jar, metadata::run, install_archive],
        options,
    )?;
    options.jar_file = Some(jar);
    Ok(options)
}

fn install_archive(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let dest = env.project.installed_archive();
    let archive = thin_path(env, &options);
    let metadata = &env.project.layout.metadata;

    ensure(env, INSTALL_ARCHIVE, &dest, |toolkit| {
        toolkit.install(&archive, metadata, &dest)
    })?;
    Ok(options)
}
