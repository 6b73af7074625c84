//! `stage`: copy sources and resources into the staging directory

use tracing::debug;

use super::{ensure, BuildEnv, STAGE};
use crate::error::KilnError;
use crate::options::Options;

pub fn run(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let project = &env.project;
    let classes = &project.layout.classes;

    ensure(env, STAGE, classes, |toolkit| {
        for dir in &project.source_dirs {
            toolkit.copy_tree(dir, classes)?;
        }
        for dir in &project.resource_dirs {
            // Resource dirs are optional; source dirs are not
            if dir.is_dir() {
                toolkit.copy_tree(dir, classes)?;
            } else {
                debug!(dir = %dir.display(), "no resource directory");
            }
        }
        Ok(())
    })?;
    Ok(options)
}
