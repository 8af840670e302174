//! Milestone timeline arithmetic.

use crate::error::{ApiError, Result};
use crate::model::Milestone;

/// Patch applied to one milestone of a timeline. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct MilestonePatch {
    pub title: Option<String>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub completed: Option<bool>,
    pub progress: Option<u8>,
}

/// Aggregate project progress: the integer-rounded mean of the milestone
/// progress values. An empty timeline has a defined aggregate of 0.
pub fn aggregate_progress(timeline: &[Milestone]) -> u8 {
    if timeline.is_empty() {
        return 0;
    }
    let sum: u32 = timeline.iter().map(|m| u32::from(m.progress)).sum();
    (f64::from(sum) / timeline.len() as f64).round() as u8
}

/// Replace the milestone matching `milestone_id` in place, leaving the
/// others untouched, and return the recomputed aggregate progress.
///
/// Fails with `not-found` when no milestone has the given id and with
/// `invalid-argument` when the patched progress exceeds 100.
pub fn apply_milestone_patch(
    timeline: &mut [Milestone],
    milestone_id: &str,
    patch: &MilestonePatch,
) -> Result<u8> {
    if let Some(p) = patch.progress {
        if p > 100 {
            return Err(ApiError::InvalidArgument(
                "Milestone progress must be between 0 and 100".into(),
            ));
        }
    }

    let milestone = timeline
        .iter_mut()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| ApiError::NotFound(format!("Milestone '{}' not found", milestone_id)))?;

    if let Some(title) = &patch.title {
        milestone.title = title.clone();
    }
    if let Some(due_date) = patch.due_date {
        milestone.due_date = Some(due_date);
    }
    if let Some(completed) = patch.completed {
        milestone.completed = completed;
    }
    if let Some(progress) = patch.progress {
        milestone.progress = progress;
    }

    Ok(aggregate_progress(timeline))
}
