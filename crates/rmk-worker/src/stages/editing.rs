//! Editing stage: apply the narrative's cut list and assemble the rough episode.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{info, warn};

use rmk_models::{ProjectStatus, Scene};
use rmk_queue::{EditingJob, ExportJob, QueueJob};

use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::{WorkerError, WorkerResult};
use crate::stages::StageOutcome;

/// One range to keep in the episode, in scene order.
#[derive(Debug, Clone, PartialEq)]
struct PlannedCut {
    video_id: String,
    start: f64,
    duration: f64,
}

pub async fn run(
    ctx: &ProcessingContext,
    job: &EditingJob,
    progress: &ProgressHandle,
) -> WorkerResult<StageOutcome> {
    let project_id = &job.project_id;
    info!(project_id = %project_id, "starting edit assembly");

    ctx.store
        .transition_project(project_id, ProjectStatus::Editing, None)
        .await?;
    progress.set(10).await;

    let narrative = ctx
        .store
        .get_narrative(project_id)
        .await?
        .ok_or_else(|| WorkerError::NarrativeMissing(project_id.to_string()))?;
    let scenes = ctx.store.scenes_for_project(project_id).await?;
    let videos = ctx.store.videos_for_project(project_id).await?;
    if scenes.is_empty() {
        return Err(WorkerError::stage_failed(format!(
            "no scenes to edit for project {project_id}"
        )));
    }

    let plan = build_cut_plan(&scenes, narrative.cuts_and_trims());
    if plan.is_empty() {
        return Err(WorkerError::stage_failed(
            "cut list removed every scene".to_string(),
        ));
    }
    info!(kept = plan.len(), total = scenes.len(), "cut plan built");
    progress.set(20).await;

    let paths: HashMap<&str, &str> = videos
        .iter()
        .map(|v| (v.id.as_str(), v.path.as_str()))
        .collect();

    let work_dir = ctx.config.work_dir(project_id);
    let mut clips: Vec<PathBuf> = Vec::with_capacity(plan.len());
    for (index, cut) in plan.iter().enumerate() {
        let source = paths.get(cut.video_id.as_str()).ok_or_else(|| {
            WorkerError::stage_failed(format!("video {} not found for cut", cut.video_id))
        })?;
        let output = work_dir.join(format!("clip_{:03}.mp4", index));
        ctx.media
            .cut_clip(Path::new(source), &output, cut.start, cut.duration)
            .await?;
        clips.push(output);

        let pct = 20 + ((index + 1) * 60 / plan.len()) as u8;
        progress.set(pct).await;
    }

    let rough_path = work_dir.join("episode_rough.mp4");
    ctx.media.assemble(&clips, &rough_path).await?;
    progress.set(90).await;

    ctx.store
        .transition_project(project_id, ProjectStatus::Exporting, None)
        .await?;

    Ok(StageOutcome {
        result: json!({ "clips_cut": clips.len() }),
        next: Some(QueueJob::Export(ExportJob::new(project_id.clone()))),
    })
}

/// Turn scenes plus the narrative's cut instructions into keep-ranges.
///
/// `remove` drops the scene, `trim` narrows it to `[keep_from, keep_to]`,
/// anything else keeps the scene untouched. Unknown scene ids in the cut
/// list are ignored rather than failing the stage.
fn build_cut_plan(scenes: &[Scene], cuts: &[Value]) -> Vec<PlannedCut> {
    let mut removals: Vec<&str> = Vec::new();
    let mut trims: HashMap<&str, (f64, f64)> = HashMap::new();

    for cut in cuts {
        let Some(scene_id) = cut.get("scene_id").and_then(Value::as_str) else {
            continue;
        };
        match cut.get("action").and_then(Value::as_str) {
            Some("remove") => removals.push(scene_id),
            Some("trim") => {
                if let (Some(from), Some(to)) = (
                    cut.get("keep_from").and_then(Value::as_f64),
                    cut.get("keep_to").and_then(Value::as_f64),
                ) {
                    trims.insert(scene_id, (from, to));
                }
            }
            other => {
                if other != Some("split") {
                    warn!(scene_id, action = ?other, "unknown cut action, keeping scene");
                }
            }
        }
    }

    scenes
        .iter()
        .filter(|scene| !removals.contains(&scene.id.as_str()))
        .filter_map(|scene| {
            let (start, end) = match trims.get(scene.id.as_str()) {
                Some(&(from, to)) => (
                    from.max(scene.start_time),
                    to.min(scene.end_time),
                ),
                None => (scene.start_time, scene.end_time),
            };
            if start >= end {
                warn!(scene_id = %scene.id, "trim collapsed scene, dropping");
                return None;
            }
            Some(PlannedCut {
                video_id: scene.video_id.to_string(),
                start,
                duration: end - start,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_models::{ProjectId, VideoId};

    fn scene(video: &VideoId, project: &ProjectId, start: f64, end: f64) -> Scene {
        Scene::new(video.clone(), project.clone(), start, end, 0.5).unwrap()
    }

    #[test]
    fn cut_plan_applies_removals_and_trims() {
        let video = VideoId::new();
        let project = ProjectId::new();
        let scenes = vec![
            scene(&video, &project, 0.0, 30.0),
            scene(&video, &project, 30.0, 60.0),
            scene(&video, &project, 60.0, 90.0),
        ];
        let cuts = vec![
            json!({"scene_id": scenes[0].id.as_str(), "action": "remove", "reason": "slow"}),
            json!({"scene_id": scenes[1].id.as_str(), "action": "trim",
                   "keep_from": 35.0, "keep_to": 50.0}),
        ];

        let plan = build_cut_plan(&scenes, &cuts);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].start, 35.0);
        assert_eq!(plan[0].duration, 15.0);
        // Untouched scene keeps its full range.
        assert_eq!(plan[1].start, 60.0);
        assert_eq!(plan[1].duration, 30.0);
    }

    #[test]
    fn trim_outside_scene_bounds_is_clamped() {
        let video = VideoId::new();
        let project = ProjectId::new();
        let scenes = vec![scene(&video, &project, 10.0, 20.0)];
        let cuts = vec![json!({"scene_id": scenes[0].id.as_str(), "action": "trim",
                               "keep_from": 0.0, "keep_to": 100.0})];

        let plan = build_cut_plan(&scenes, &cuts);
        assert_eq!(plan[0].start, 10.0);
        assert_eq!(plan[0].duration, 10.0);
    }

    #[test]
    fn collapsed_trim_drops_scene() {
        let video = VideoId::new();
        let project = ProjectId::new();
        let scenes = vec![scene(&video, &project, 10.0, 20.0)];
        let cuts = vec![json!({"scene_id": scenes[0].id.as_str(), "action": "trim",
                               "keep_from": 19.0, "keep_to": 12.0})];

        assert!(build_cut_plan(&scenes, &cuts).is_empty());
    }

    #[test]
    fn malformed_cut_entries_are_ignored() {
        let video = VideoId::new();
        let project = ProjectId::new();
        let scenes = vec![scene(&video, &project, 0.0, 10.0)];
        let cuts = vec![json!({"action": "remove"}), json!({"scene_id": "unknown"})];

        let plan = build_cut_plan(&scenes, &cuts);
        assert_eq!(plan.len(), 1);
    }
}
