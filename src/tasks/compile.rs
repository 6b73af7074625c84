//! `compile`: compile sources into the AOT output directory

use super::{ensure, BuildEnv, COMPILE};
use crate::error::KilnError;
use crate::options::Options;

pub fn run(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let project = &env.project;
    let main = options.main.as_deref().or(project.main.as_deref());

    ensure(env, COMPILE, &project.layout.aot, |toolkit| {
        toolkit.compile(&project.source_dirs, &project.layout.aot, main)
    })?;
    Ok(options)
}
