use std::path::Path;

use super::SyncError;
use crate::git::Vcs;

/// Fast-forward to `origin/<branch>`. A failure is classified through the
/// structured conflict query, never by reading the command output.
pub(crate) fn attempt_update(vcs: &dyn Vcs, workdir: &Path, branch: &str) -> Result<String, SyncError> {
    let result = vcs.merge_update(workdir, branch);
    if result.success {
        return Ok(result.output);
    }

    let conflict = vcs.conflict_state(workdir, branch);
    tracing::debug!("Update of {} failed, working tree: {}", workdir.display(), conflict);
    if conflict.is_structural() {
        Err(SyncError::StructuralConflict {
            state: conflict.to_string(),
            output: result.output,
        })
    } else {
        Err(SyncError::NonStructuralUpdateFailure(result.output))
    }
}
