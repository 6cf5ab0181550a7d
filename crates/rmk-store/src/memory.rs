//! In-memory store used by tests and local development.
//!
//! Mirrors the conditional-update semantics of the Redis implementation
//! exactly, so tests exercise the same transition rules the deployed store
//! enforces.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use rmk_models::{
    Export, Narrative, Project, ProjectId, ProjectStatus, Scene, SceneId, SceneTranscript, Video,
    VideoId,
};

use crate::error::{StoreError, StoreResult};
use crate::Store;

#[derive(Default)]
struct Tables {
    projects: HashMap<ProjectId, Project>,
    videos: HashMap<VideoId, Video>,
    scenes: HashMap<SceneId, Scene>,
    narratives: HashMap<ProjectId, Narrative>,
    exports: Vec<Export>,
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_project(&self, project: Project) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.projects.contains_key(&project.id) {
            return Err(StoreError::DuplicateKey(project.id.to_string()));
        }
        tables.projects.insert(project.id.clone(), project);
        Ok(())
    }

    async fn get_project(&self, id: &ProjectId) -> StoreResult<Project> {
        let tables = self.tables.read().await;
        tables
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        let mut projects: Vec<_> = tables.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn transition_project(
        &self,
        id: &ProjectId,
        to: ProjectStatus,
        failure_reason: Option<&str>,
    ) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))?;

        if !project.status.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                from: project.status,
                to,
            });
        }
        if project.status != to {
            project.status = to;
            if to == ProjectStatus::Failed {
                project.failure_reason = failure_reason.map(str::to_string);
            }
            project.updated_at = Utc::now();
        }
        Ok(project.clone())
    }

    async fn request_cancel(&self, id: &ProjectId) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))?;
        if !project.cancel_requested {
            project.cancel_requested = true;
            project.updated_at = Utc::now();
        }
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &ProjectId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(id).is_none() {
            return Err(StoreError::ProjectNotFound(id.to_string()));
        }
        tables.videos.retain(|_, v| &v.project_id != id);
        tables.scenes.retain(|_, s| &s.project_id != id);
        tables.narratives.remove(id);
        tables.exports.retain(|e| &e.project_id != id);
        Ok(())
    }

    async fn add_video(&self, video: Video) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let project = tables
            .projects
            .get_mut(&video.project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(video.project_id.to_string()))?;
        if project.status == ProjectStatus::Created {
            project.status = ProjectStatus::Uploading;
            project.updated_at = Utc::now();
        }
        tables.videos.insert(video.id.clone(), video);
        Ok(())
    }

    async fn videos_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Video>> {
        let tables = self.tables.read().await;
        let mut videos: Vec<_> = tables
            .videos
            .values()
            .filter(|v| &v.project_id == id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(videos)
    }

    async fn get_videos(&self, ids: &[VideoId]) -> StoreResult<Vec<Video>> {
        let tables = self.tables.read().await;
        let mut videos = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(video) = tables.videos.get(id) {
                videos.push(video.clone());
            }
        }
        videos.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(videos)
    }

    async fn insert_scenes(&self, scenes: Vec<Scene>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for scene in scenes {
            tables.scenes.insert(scene.id.clone(), scene);
        }
        Ok(())
    }

    async fn scenes_by_ids(&self, ids: &[SceneId]) -> StoreResult<Vec<Scene>> {
        let tables = self.tables.read().await;
        let mut scenes = Vec::with_capacity(ids.len());
        for id in ids {
            let scene = tables
                .scenes
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::SceneNotFound(id.clone()))?;
            scenes.push(scene);
        }
        scenes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(scenes)
    }

    async fn scenes_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Scene>> {
        let tables = self.tables.read().await;
        let mut scenes: Vec<_> = tables
            .scenes
            .values()
            .filter(|s| &s.project_id == id)
            .cloned()
            .collect();
        scenes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(scenes)
    }

    async fn attach_scene_transcript(
        &self,
        id: &SceneId,
        transcript: SceneTranscript,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let scene = tables
            .scenes
            .get_mut(id)
            .ok_or_else(|| StoreError::SceneNotFound(id.clone()))?;
        match &scene.transcript {
            None => {
                scene.transcript = Some(transcript);
                Ok(())
            }
            Some(existing) if *existing == transcript => Ok(()),
            Some(_) => Err(StoreError::TranscriptConflict(id.clone())),
        }
    }

    async fn upsert_narrative(&self, narrative: Narrative) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .narratives
            .insert(narrative.project_id.clone(), narrative);
        Ok(())
    }

    async fn get_narrative(&self, id: &ProjectId) -> StoreResult<Option<Narrative>> {
        let tables = self.tables.read().await;
        Ok(tables.narratives.get(id).cloned())
    }

    async fn add_export(&self, export: Export) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.exports.push(export);
        Ok(())
    }

    async fn exports_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Export>> {
        let tables = self.tables.read().await;
        let mut exports: Vec<_> = tables
            .exports
            .iter()
            .filter(|e| &e.project_id == id)
            .cloned()
            .collect();
        exports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_models::{StyleTag, VideoProbe};

    fn probe() -> VideoProbe {
        VideoProbe {
            duration_secs: 60.0,
            width: 1280,
            height: 720,
            fps: 30.0,
        }
    }

    #[tokio::test]
    async fn transition_follows_state_machine() {
        let store = MemoryStore::new();
        let project = Project::new("ep1", StyleTag::Dramatic);
        let id = project.id.clone();
        store.create_project(project).await.unwrap();

        // Skipping Uploading is rejected.
        let err = store
            .transition_project(&id, ProjectStatus::Analyzing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));

        store
            .transition_project(&id, ProjectStatus::Uploading, None)
            .await
            .unwrap();
        // Idempotent re-assertion.
        let project = store
            .transition_project(&id, ProjectStatus::Uploading, None)
            .await
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Uploading);

        let failed = store
            .transition_project(&id, ProjectStatus::Failed, Some("detector crashed"))
            .await
            .unwrap();
        assert_eq!(failed.failure_reason.as_deref(), Some("detector crashed"));

        // Terminal is absorbing.
        let err = store
            .transition_project(&id, ProjectStatus::Analyzing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn add_video_moves_created_project_to_uploading() {
        let store = MemoryStore::new();
        let project = Project::new("ep1", StyleTag::Dramatic);
        let id = project.id.clone();
        store.create_project(project).await.unwrap();

        let video = Video::new(id.clone(), "/storage/a.mp4", &probe());
        store.add_video(video).await.unwrap();

        let project = store.get_project(&id).await.unwrap();
        assert_eq!(project.status, ProjectStatus::Uploading);
        assert_eq!(store.videos_for_project(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transcript_attach_is_write_once_idempotent() {
        let store = MemoryStore::new();
        let project = Project::new("ep1", StyleTag::Dramatic);
        let pid = project.id.clone();
        store.create_project(project).await.unwrap();

        let vid = VideoId::new();
        let scene = Scene::new(vid.clone(), pid.clone(), 0.0, 10.0, 0.5).unwrap();
        let sid = scene.id.clone();
        store.insert_scenes(vec![scene]).await.unwrap();

        let transcript = SceneTranscript {
            text: "person_1: hi".into(),
            speakers: std::collections::BTreeSet::from(["person_1".to_string()]),
            emotions: None,
            segments: vec![],
        };
        store
            .attach_scene_transcript(&sid, transcript.clone())
            .await
            .unwrap();
        // Same value again: fine.
        store
            .attach_scene_transcript(&sid, transcript.clone())
            .await
            .unwrap();
        // Different value: conflict.
        let mut other = transcript;
        other.text = "person_2: bye".into();
        let err = store
            .attach_scene_transcript(&sid, other)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TranscriptConflict(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_owned_entities() {
        let store = MemoryStore::new();
        let project = Project::new("ep1", StyleTag::Dramatic);
        let pid = project.id.clone();
        store.create_project(project).await.unwrap();

        let video = Video::new(pid.clone(), "/storage/a.mp4", &probe());
        let vid = video.id.clone();
        store.add_video(video).await.unwrap();
        let scene = Scene::new(vid, pid.clone(), 0.0, 5.0, 0.5).unwrap();
        store.insert_scenes(vec![scene]).await.unwrap();
        store
            .upsert_narrative(Narrative::new(pid.clone(), serde_json::json!({})))
            .await
            .unwrap();

        store.delete_project(&pid).await.unwrap();
        assert!(store.get_project(&pid).await.is_err());
        assert!(store.videos_for_project(&pid).await.unwrap().is_empty());
        assert!(store.scenes_for_project(&pid).await.unwrap().is_empty());
        assert!(store.get_narrative(&pid).await.unwrap().is_none());
    }
}
