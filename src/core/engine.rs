use crate::core::Payload;
use crate::core::error::{Error, Result};
use crate::core::program::Program;
use crate::core::unit::Unit;

/// Folds `payload` through every action of `program`, left to right.
///
/// Each action's output replaces the payload. The first failure aborts the
/// run and is returned as [`Error::ProgramExecution`].
pub(crate) async fn execute(program: &Program, payload: Payload, unit: &Unit) -> Result<Payload> {
    let mut payload = payload;

    for (step_index, action_index, step, action) in program.actions() {
        log::debug!(
            "[{}] {} -> step {} action {} ({})",
            unit.name(),
            program.name,
            step_index,
            action_index,
            action.name.as_deref().unwrap_or("unnamed")
        );

        payload = action
            .method
            .call(payload, unit)
            .await
            .map_err(|source| Error::ProgramExecution {
                program: program.name.clone(),
                step: step_index,
                action: action_index,
                step_name: step.name.clone().unwrap_or_default(),
                action_name: action.name.clone().unwrap_or_default(),
                source,
            })?;
    }

    Ok(payload)
}
