//! Analysis stage: scene detection, transcription, temporal association.

use std::path::Path;

use serde_json::json;
use tracing::info;

use rmk_models::{ProjectStatus, Scene, TranscriptSegment};
use rmk_queue::{AnalysisJob, QueueJob, ShowrunnerJob};

use crate::associate::associate_segments;
use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::{WorkerError, WorkerResult};
use crate::stages::StageOutcome;

pub async fn run(
    ctx: &ProcessingContext,
    job: &AnalysisJob,
    progress: &ProgressHandle,
) -> WorkerResult<StageOutcome> {
    let project_id = &job.project_id;
    info!(project_id = %project_id, "starting analysis");

    ctx.store
        .transition_project(project_id, ProjectStatus::Analyzing, None)
        .await?;
    progress.set(10).await;

    let videos = ctx.store.get_videos(&job.video_ids).await?;
    if videos.is_empty() {
        return Err(WorkerError::NoVideos(project_id.to_string()));
    }
    info!(count = videos.len(), "videos to analyze");

    let mut all_scenes: Vec<Scene> = Vec::new();
    let mut all_segments: Vec<TranscriptSegment> = Vec::new();

    // Detection and transcription are resource-heavy external processes;
    // videos of one project run sequentially to bound peak load.
    for (index, video) in videos.iter().enumerate() {
        let base = 10 + (index * 70 / videos.len()) as u8;
        progress.set(base).await;
        info!(video_id = %video.id, index = index + 1, total = videos.len(), "processing video");

        let video_path = Path::new(&video.path);

        let detected = ctx.detector.detect(video_path).await?;
        let mut scenes = Vec::with_capacity(detected.len());
        for d in &detected {
            let scene = Scene::new(
                video.id.clone(),
                project_id.clone(),
                d.start_time,
                d.end_time,
                d.importance_score,
            )
            .map_err(|e| WorkerError::stage_failed(e.to_string()))?;
            scenes.push(scene);
        }
        ctx.store.insert_scenes(scenes.clone()).await?;
        info!(count = scenes.len(), "scenes detected");
        all_scenes.extend(scenes);

        let audio_path = ctx
            .config
            .temp_dir()
            .join(format!("{}_audio.wav", video.id));
        ctx.media.extract_audio(video_path, &audio_path).await?;

        let raw_segments = ctx.transcriber.transcribe(&audio_path).await?;
        let labeled = ctx.labeler.label(raw_segments);
        tokio::fs::remove_file(&audio_path).await.ok();

        all_segments.extend(labeled.into_iter().map(|segment| TranscriptSegment {
            video_id: video.id.clone(),
            start: segment.start,
            end: segment.end,
            speaker: segment
                .speaker
                .unwrap_or_else(|| "person_1".to_string()),
            text: segment.text,
            emotion: segment.emotion,
            confidence: segment.confidence,
        }));
    }

    progress.set(80).await;
    info!(
        scenes = all_scenes.len(),
        segments = all_segments.len(),
        "associating transcripts with scenes"
    );

    let associations = associate_segments(&all_scenes, &all_segments);
    for association in &associations {
        ctx.store
            .attach_scene_transcript(&association.scene_id, association.transcript.clone())
            .await?;
    }
    progress.set(90).await;

    ctx.store
        .transition_project(project_id, ProjectStatus::Showrunning, None)
        .await?;

    let scene_ids = all_scenes.iter().map(|s| s.id.clone()).collect();
    let next = QueueJob::Showrunner(ShowrunnerJob::new(project_id.clone(), scene_ids));

    Ok(StageOutcome {
        result: json!({
            "scenes_detected": all_scenes.len(),
            "segments_transcribed": all_segments.len(),
            "scenes_with_transcript": associations.len(),
        }),
        next: Some(next),
    })
}
