//! Narrator stage: synthesize narration audio for each narration point.

use serde_json::{json, Value};
use tracing::{info, warn};

use rmk_models::ProjectStatus;
use rmk_queue::{EditingJob, NarratorJob, QueueJob};

use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::{WorkerError, WorkerResult};
use crate::stages::StageOutcome;

pub async fn run(
    ctx: &ProcessingContext,
    job: &NarratorJob,
    progress: &ProgressHandle,
) -> WorkerResult<StageOutcome> {
    let project_id = &job.project_id;
    info!(project_id = %project_id, "starting narration");

    ctx.store
        .transition_project(project_id, ProjectStatus::Narrating, None)
        .await?;
    progress.set(10).await;

    let narrative = ctx
        .store
        .get_narrative(project_id)
        .await?
        .ok_or_else(|| WorkerError::NarrativeMissing(project_id.to_string()))?;

    let points = narrative.narration_points().to_vec();
    let narration_dir = ctx.config.work_dir(project_id).join("narration");

    let mut synthesized = 0usize;
    for (index, point) in points.iter().enumerate() {
        let Some(text) = narration_text(point) else {
            warn!(index, "narration point without usable text, skipping");
            continue;
        };

        let output = narration_dir.join(format!("narration_{:02}.wav", index + 1));
        ctx.synthesizer.synthesize(&text, &output).await?;
        synthesized += 1;

        let pct = 10 + ((index + 1) * 80 / points.len().max(1)) as u8;
        progress.set(pct).await;
    }
    info!(count = synthesized, "narration clips synthesized");

    ctx.store
        .transition_project(project_id, ProjectStatus::Editing, None)
        .await?;

    Ok(StageOutcome {
        result: json!({ "narrations_synthesized": synthesized }),
        next: Some(QueueJob::Editing(EditingJob::new(project_id.clone()))),
    })
}

/// The narration script for a point: the AI's suggestion text.
fn narration_text(point: &Value) -> Option<String> {
    point
        .get("suggestion")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
