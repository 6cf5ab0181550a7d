//! Job payloads for the stage queues.
//!
//! Payloads carry identifiers only, never entity data: the executing stage
//! reloads everything it needs from the store, so a redelivered job can
//! never act on stale state.

use serde::{Deserialize, Serialize};

use rmk_models::{JobId, ProjectId, SceneId, Stage, VideoId};

/// Job to analyze a project's uploaded videos: detect scenes, transcribe,
/// associate transcripts. First stage of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub job_id: JobId,
    pub project_id: ProjectId,
    pub video_ids: Vec<VideoId>,
}

impl AnalysisJob {
    pub fn new(project_id: ProjectId, video_ids: Vec<VideoId>) -> Self {
        Self {
            job_id: JobId::new(),
            project_id,
            video_ids,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("analysis:{}", self.project_id)
    }
}

/// Job to generate the narrative document from analyzed scenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowrunnerJob {
    pub job_id: JobId,
    pub project_id: ProjectId,
    pub scene_ids: Vec<SceneId>,
}

impl ShowrunnerJob {
    pub fn new(project_id: ProjectId, scene_ids: Vec<SceneId>) -> Self {
        Self {
            job_id: JobId::new(),
            project_id,
            scene_ids,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("showrunner:{}", self.project_id)
    }
}

/// Job to synthesize narration audio for the narrative's narration points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorJob {
    pub job_id: JobId,
    pub project_id: ProjectId,
}

impl NarratorJob {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            job_id: JobId::new(),
            project_id,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("narrator:{}", self.project_id)
    }
}

/// Job to apply the narrative's cut list and assemble the rough episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditingJob {
    pub job_id: JobId,
    pub project_id: ProjectId,
}

impl EditingJob {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            job_id: JobId::new(),
            project_id,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("editing:{}", self.project_id)
    }
}

/// Job to encode the final episode and record the export artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: JobId,
    pub project_id: ProjectId,
}

impl ExportJob {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            job_id: JobId::new(),
            project_id,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("export:{}", self.project_id)
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    Analysis(AnalysisJob),
    Showrunner(ShowrunnerJob),
    Narrator(NarratorJob),
    Editing(EditingJob),
    Export(ExportJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::Analysis(j) => &j.job_id,
            QueueJob::Showrunner(j) => &j.job_id,
            QueueJob::Narrator(j) => &j.job_id,
            QueueJob::Editing(j) => &j.job_id,
            QueueJob::Export(j) => &j.job_id,
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        match self {
            QueueJob::Analysis(j) => &j.project_id,
            QueueJob::Showrunner(j) => &j.project_id,
            QueueJob::Narrator(j) => &j.project_id,
            QueueJob::Editing(j) => &j.project_id,
            QueueJob::Export(j) => &j.project_id,
        }
    }

    /// Stage this job targets; selects the queue it is stored on.
    pub fn stage(&self) -> Stage {
        match self {
            QueueJob::Analysis(_) => Stage::Analysis,
            QueueJob::Showrunner(_) => Stage::Showrunner,
            QueueJob::Narrator(_) => Stage::Narrator,
            QueueJob::Editing(_) => Stage::Editing,
            QueueJob::Export(_) => Stage::Export,
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::Analysis(j) => j.idempotency_key(),
            QueueJob::Showrunner(j) => j.idempotency_key(),
            QueueJob::Narrator(j) => j.idempotency_key(),
            QueueJob::Editing(j) => j.idempotency_key(),
            QueueJob::Export(j) => j.idempotency_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_job_serde_roundtrip() {
        let job = QueueJob::Showrunner(ShowrunnerJob::new(
            ProjectId::new(),
            vec![SceneId::new(), SceneId::new()],
        ));

        let json = serde_json::to_string(&job).expect("serialize QueueJob");
        assert!(json.contains("\"type\":\"showrunner\""));

        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize QueueJob");
        match decoded {
            QueueJob::Showrunner(j) => {
                assert_eq!(&j.job_id, job.job_id());
                assert_eq!(j.scene_ids.len(), 2);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn stage_matches_variant() {
        let project_id = ProjectId::new();
        assert_eq!(
            QueueJob::Narrator(NarratorJob::new(project_id.clone())).stage(),
            Stage::Narrator
        );
        assert_eq!(
            QueueJob::Export(ExportJob::new(project_id)).stage(),
            Stage::Export
        );
    }
}
