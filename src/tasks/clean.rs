//! `clean`: delete the whole target tree
//!
//! The one task that never skips. Removing the target directory removes
//! every artifact marker below it at once. Outputs redirected outside the
//! target tree through options overrides are left alone.

use std::sync::Arc;

use tracing::info;

use super::{BuildEnv, CLEAN};
use crate::error::KilnError;
use crate::event_log::EventKind;
use crate::options::Options;

pub fn run(env: &BuildEnv, options: Options) -> Result<Options, KilnError> {
    let target = &env.project.layout.target;
    info!(target = %target.display(), "deleting build output");

    env.toolkit
        .delete_tree(target)
        .map_err(|e| KilnError::delegated(CLEAN, e))?;

    env.events.emit(EventKind::StepExecuted {
        step: Arc::from(CLEAN),
        marker: None,
    });
    Ok(options)
}
