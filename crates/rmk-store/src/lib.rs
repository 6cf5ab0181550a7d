//! Persistence layer for the Reality Maker backend.
//!
//! One `Store` trait covers the whole aggregate (projects own videos,
//! scenes, at most one narrative, and exports), so executors and the
//! dispatcher receive a single injected handle. Two implementations:
//! `MemoryStore` for tests and development, `RedisStore` for deployment.

pub mod error;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

use rmk_models::{
    Export, Narrative, Project, ProjectId, ProjectStatus, Scene, SceneId, SceneTranscript, Video,
    VideoId,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Repository surface over the project aggregate.
///
/// `transition_project` is the only status writer and performs a single
/// conditional update keyed by project id: the transition is applied only if
/// it is legal from the current status (see `ProjectStatus::can_transition_to`),
/// which makes concurrent duplicate jobs safe to coalesce.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // Projects
    async fn create_project(&self, project: Project) -> StoreResult<()>;
    async fn get_project(&self, id: &ProjectId) -> StoreResult<Project>;
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    /// Conditionally move a project to `to`. Records `failure_reason` when
    /// `to` is `Failed`. Idempotent when the project is already at `to`.
    async fn transition_project(
        &self,
        id: &ProjectId,
        to: ProjectStatus,
        failure_reason: Option<&str>,
    ) -> StoreResult<Project>;
    /// Mark the project as cancel-requested. New jobs become no-ops;
    /// in-flight work is not interrupted.
    async fn request_cancel(&self, id: &ProjectId) -> StoreResult<Project>;
    /// Delete a project and everything it owns.
    async fn delete_project(&self, id: &ProjectId) -> StoreResult<()>;

    // Videos
    /// Add an uploaded video. Moves a `Created` project to `Uploading`.
    async fn add_video(&self, video: Video) -> StoreResult<()>;
    async fn videos_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Video>>;
    async fn get_videos(&self, ids: &[VideoId]) -> StoreResult<Vec<Video>>;

    // Scenes
    async fn insert_scenes(&self, scenes: Vec<Scene>) -> StoreResult<()>;
    async fn scenes_by_ids(&self, ids: &[SceneId]) -> StoreResult<Vec<Scene>>;
    async fn scenes_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Scene>>;
    /// Attach transcript data to a scene. Write-once: attaching an equal
    /// value again is a no-op, attaching a different one is a conflict.
    async fn attach_scene_transcript(
        &self,
        id: &SceneId,
        transcript: SceneTranscript,
    ) -> StoreResult<()>;

    // Narrative
    /// Create-or-replace the project's narrative. Callers must only pass
    /// documents that passed validation; partially built documents never
    /// reach the store.
    async fn upsert_narrative(&self, narrative: Narrative) -> StoreResult<()>;
    async fn get_narrative(&self, id: &ProjectId) -> StoreResult<Option<Narrative>>;

    // Exports
    async fn add_export(&self, export: Export) -> StoreResult<()>;
    async fn exports_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Export>>;
}
