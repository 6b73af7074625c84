//! `metadata`: write the package descriptor

use super::{ensure, BuildEnv, METADATA};
use crate::error::KilnError;
use crate::options::Options;
use crate::toolkit::PackageDescriptor;

pub fn run(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let project = &env.project;
    let descriptor = PackageDescriptor {
        group: project.group.clone(),
        artifact: project.artifact.clone(),
        version: project.version.clone(),
        main: options.main.clone().or_else(|| project.main.clone()),
        source_dirs: project
            .source_dirs
            .iter()
            .map(|dir| dir.strip_prefix(&project.root).unwrap_or(dir).to_path_buf())
            .collect(),
    };

    ensure(env, METADATA, &project.layout.metadata, |toolkit| {
        toolkit.write_metadata(&descriptor, &project.layout.metadata)
    })?;
    Ok(options)
}
