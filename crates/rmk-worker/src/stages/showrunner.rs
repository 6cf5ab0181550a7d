//! Showrunner stage: validated narrative generation.

use serde_json::json;
use tracing::info;

use rmk_ai::{build_showrunner_prompt, generate_narrative, GenerationPolicy, SHOWRUNNER_SYSTEM_PROMPT};
use rmk_models::{Narrative, NarrativeStats, ProjectStatus, TranscriptSegment};
use rmk_queue::{NarratorJob, QueueJob, ShowrunnerJob};

use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::{WorkerError, WorkerResult};
use crate::stages::StageOutcome;

pub async fn run(
    ctx: &ProcessingContext,
    job: &ShowrunnerJob,
    progress: &ProgressHandle,
) -> WorkerResult<StageOutcome> {
    let project_id = &job.project_id;
    info!(project_id = %project_id, "starting narrative generation");

    // Analysis already moved the project here; re-asserting is idempotent.
    ctx.store
        .transition_project(project_id, ProjectStatus::Showrunning, None)
        .await?;
    progress.set(10).await;

    let videos = ctx.store.videos_for_project(project_id).await?;
    let scenes = ctx.store.scenes_by_ids(&job.scene_ids).await?;
    if scenes.is_empty() {
        return Err(WorkerError::stage_failed(format!(
            "no scenes to showrun for project {project_id}"
        )));
    }
    info!(count = scenes.len(), "loaded scenes");
    progress.set(20).await;

    // Rebuild the flat segment list from the per-scene transcripts the
    // analysis stage attached.
    let segments: Vec<TranscriptSegment> = scenes
        .iter()
        .filter_map(|scene| scene.transcript.as_ref())
        .flat_map(|transcript| transcript.segments.iter().cloned())
        .collect();
    info!(count = segments.len(), "loaded transcript segments");
    progress.set(30).await;

    let user_prompt = build_showrunner_prompt(&scenes, &segments, &videos);
    progress.set(40).await;

    // The generation loop owns its own bounded retry budget; the prompt is
    // identical on every attempt.
    let document = generate_narrative(
        ctx.backend.as_ref(),
        SHOWRUNNER_SYSTEM_PROMPT,
        &user_prompt,
        &GenerationPolicy::default(),
    )
    .await?;
    progress.set(70).await;

    ctx.store
        .upsert_narrative(Narrative::new(project_id.clone(), document.clone()))
        .await?;
    let stats = NarrativeStats::from_document(&document);
    info!(
        characters = stats.characters,
        key_moments = stats.key_moments,
        narration_points = stats.narration_points,
        "narrative persisted"
    );
    progress.set(80).await;

    ctx.store
        .transition_project(project_id, ProjectStatus::Narrating, None)
        .await?;

    Ok(StageOutcome {
        result: json!({ "narrative": stats }),
        next: Some(QueueJob::Narrator(NarratorJob::new(project_id.clone()))),
    })
}
