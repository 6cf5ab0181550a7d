//! Export stage: encode the final episode and record the artifact.

use serde_json::json;
use tracing::info;

use rmk_models::{Export, ExportKind, ProjectStatus};
use rmk_queue::ExportJob;

use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::WorkerResult;
use crate::stages::StageOutcome;

pub async fn run(
    ctx: &ProcessingContext,
    job: &ExportJob,
    progress: &ProgressHandle,
) -> WorkerResult<StageOutcome> {
    let project_id = &job.project_id;
    info!(project_id = %project_id, "starting export");

    ctx.store
        .transition_project(project_id, ProjectStatus::Exporting, None)
        .await?;
    progress.set(10).await;

    let rough_path = ctx.config.work_dir(project_id).join("episode_rough.mp4");
    let filename = format!("{project_id}_episode.mp4");
    let output = ctx.config.exports_dir().join(&filename);

    ctx.media.encode_episode(&rough_path, &output).await?;
    progress.set(80).await;

    ctx.store
        .add_export(Export::new(
            project_id.clone(),
            ExportKind::Episode,
            filename.clone(),
        ))
        .await?;
    progress.set(90).await;

    ctx.store
        .transition_project(project_id, ProjectStatus::Completed, None)
        .await?;
    info!(project_id = %project_id, filename = %filename, "episode exported");

    Ok(StageOutcome {
        result: json!({ "filename": filename }),
        next: None,
    })
}
