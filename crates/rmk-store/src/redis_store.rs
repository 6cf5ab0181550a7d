//! Redis-backed store.
//!
//! Entities are JSON documents under `rmk:*` keys with set indexes per
//! project. Status transitions and transcript attachment run as Lua scripts
//! so each is a single conditional update on the server, matching the
//! in-memory store's compare-and-set semantics.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::debug;

use rmk_models::{
    Export, Narrative, Project, ProjectId, ProjectStatus, Scene, SceneId, SceneTranscript, Video,
    VideoId,
};

use crate::error::{StoreError, StoreResult};
use crate::Store;

const PROJECT_INDEX: &str = "rmk:projects";

/// Applies a status transition only when the current status is in the
/// caller-computed allowed set. Returns the stored document.
const TRANSITION_SCRIPT: &str = r#"
local doc = redis.call('GET', KEYS[1])
if not doc then
    return redis.error_reply('NOT_FOUND')
end
local project = cjson.decode(doc)
local allowed = false
for token in string.gmatch(ARGV[2], '[^,]+') do
    if token == project.status then
        allowed = true
    end
end
if not allowed then
    return redis.error_reply('ILLEGAL_FROM:' .. project.status)
end
if project.status ~= ARGV[1] then
    project.status = ARGV[1]
    if ARGV[1] == 'FAILED' and ARGV[3] ~= '' then
        project.failure_reason = ARGV[3]
    end
    project.updated_at = ARGV[4]
    doc = cjson.encode(project)
    redis.call('SET', KEYS[1], doc)
end
return doc
"#;

/// Sets the cancel flag without clobbering concurrent status writes.
const CANCEL_SCRIPT: &str = r#"
local doc = redis.call('GET', KEYS[1])
if not doc then
    return redis.error_reply('NOT_FOUND')
end
local project = cjson.decode(doc)
if not project.cancel_requested then
    project.cancel_requested = true
    project.updated_at = ARGV[1]
    doc = cjson.encode(project)
    redis.call('SET', KEYS[1], doc)
end
return doc
"#;

/// Write-once transcript attach; idempotence keyed on the concatenated text.
const ATTACH_TRANSCRIPT_SCRIPT: &str = r#"
local doc = redis.call('GET', KEYS[1])
if not doc then
    return redis.error_reply('NOT_FOUND')
end
local scene = cjson.decode(doc)
local incoming = cjson.decode(ARGV[1])
if scene.transcript == nil then
    scene.transcript = incoming
    redis.call('SET', KEYS[1], cjson.encode(scene))
    return 'ATTACHED'
end
if scene.transcript.text == incoming.text then
    return 'NOOP'
end
return redis.error_reply('CONFLICT')
"#;

/// Redis-backed store.
pub struct RedisStore {
    client: redis::Client,
    transition: redis::Script,
    cancel: redis::Script,
    attach: redis::Script,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            transition: redis::Script::new(TRANSITION_SCRIPT),
            cancel: redis::Script::new(CANCEL_SCRIPT),
            attach: redis::Script::new(ATTACH_TRANSCRIPT_SCRIPT),
        })
    }

    pub fn from_env() -> StoreResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    async fn conn(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn project_key(id: &ProjectId) -> String {
        format!("rmk:project:{id}")
    }

    fn video_key(id: &VideoId) -> String {
        format!("rmk:video:{id}")
    }

    fn scene_key(id: &SceneId) -> String {
        format!("rmk:scene:{id}")
    }

    fn narrative_key(id: &ProjectId) -> String {
        format!("rmk:narrative:{id}")
    }

    fn project_videos_key(id: &ProjectId) -> String {
        format!("rmk:project:{id}:videos")
    }

    fn project_scenes_key(id: &ProjectId) -> String {
        format!("rmk:project:{id}:scenes")
    }

    fn project_exports_key(id: &ProjectId) -> String {
        format!("rmk:project:{id}:exports")
    }

    /// Non-terminal statuses from which `to` is reachable, plus `to` itself
    /// for idempotent re-assertion. Serialized for the Lua script.
    fn allowed_from(to: ProjectStatus) -> String {
        let mut allowed = Vec::new();
        for from in [
            ProjectStatus::Created,
            ProjectStatus::Uploading,
            ProjectStatus::Analyzing,
            ProjectStatus::Showrunning,
            ProjectStatus::Narrating,
            ProjectStatus::Editing,
            ProjectStatus::Exporting,
        ] {
            if from.can_transition_to(to) {
                allowed.push(from.as_str());
            }
        }
        allowed.join(",")
    }

    fn map_script_error(err: redis::RedisError, id: &ProjectId) -> StoreError {
        let msg = err.to_string();
        if msg.contains("NOT_FOUND") {
            StoreError::ProjectNotFound(id.to_string())
        } else {
            StoreError::Redis(err)
        }
    }

    async fn fetch_many<T: serde::de::DeserializeOwned>(
        &self,
        keys: Vec<String>,
    ) -> StoreResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let docs: Vec<Option<String>> = conn.mget(&keys).await?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs.into_iter().flatten() {
            out.push(serde_json::from_str(&doc)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn create_project(&self, project: Project) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let key = Self::project_key(&project.id);
        let doc = serde_json::to_string(&project)?;
        let created: bool = conn.set_nx(&key, &doc).await?;
        if !created {
            return Err(StoreError::DuplicateKey(project.id.to_string()));
        }
        conn.sadd::<_, _, ()>(PROJECT_INDEX, project.id.as_str())
            .await?;
        debug!(project_id = %project.id, "created project");
        Ok(())
    }

    async fn get_project(&self, id: &ProjectId) -> StoreResult<Project> {
        let mut conn = self.conn().await?;
        let doc: Option<String> = conn.get(Self::project_key(id)).await?;
        match doc {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Err(StoreError::ProjectNotFound(id.to_string())),
        }
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(PROJECT_INDEX).await?;
        let keys = ids
            .iter()
            .map(|id| Self::project_key(&ProjectId::from_string(id.clone())))
            .collect();
        let mut projects: Vec<Project> = self.fetch_many(keys).await?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn transition_project(
        &self,
        id: &ProjectId,
        to: ProjectStatus,
        failure_reason: Option<&str>,
    ) -> StoreResult<Project> {
        let mut conn = self.conn().await?;
        let result: Result<String, redis::RedisError> = self
            .transition
            .key(Self::project_key(id))
            .arg(to.as_str())
            .arg(Self::allowed_from(to))
            .arg(failure_reason.unwrap_or(""))
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok(doc) => Ok(serde_json::from_str(&doc)?),
            Err(err) => {
                let msg = err.to_string();
                if let Some(from) = msg
                    .split("ILLEGAL_FROM:")
                    .nth(1)
                    .and_then(|s| s.split_whitespace().next())
                {
                    let from = serde_json::from_value(serde_json::Value::String(from.to_string()))
                        .unwrap_or(ProjectStatus::Failed);
                    Err(StoreError::IllegalTransition { from, to })
                } else {
                    Err(Self::map_script_error(err, id))
                }
            }
        }
    }

    async fn request_cancel(&self, id: &ProjectId) -> StoreResult<Project> {
        let mut conn = self.conn().await?;
        let result: Result<String, redis::RedisError> = self
            .cancel
            .key(Self::project_key(id))
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await;
        match result {
            Ok(doc) => Ok(serde_json::from_str(&doc)?),
            Err(err) => Err(Self::map_script_error(err, id)),
        }
    }

    async fn delete_project(&self, id: &ProjectId) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let existed: bool = conn.del(Self::project_key(id)).await?;
        if !existed {
            return Err(StoreError::ProjectNotFound(id.to_string()));
        }
        conn.srem::<_, _, ()>(PROJECT_INDEX, id.as_str()).await?;

        let video_ids: Vec<String> = conn.smembers(Self::project_videos_key(id)).await?;
        for vid in &video_ids {
            conn.del::<_, ()>(Self::video_key(&VideoId::from_string(vid.clone())))
                .await?;
        }
        let scene_ids: Vec<String> = conn.smembers(Self::project_scenes_key(id)).await?;
        for sid in &scene_ids {
            conn.del::<_, ()>(Self::scene_key(&SceneId::from_string(sid.clone())))
                .await?;
        }
        conn.del::<_, ()>(Self::project_videos_key(id)).await?;
        conn.del::<_, ()>(Self::project_scenes_key(id)).await?;
        conn.del::<_, ()>(Self::narrative_key(id)).await?;
        conn.del::<_, ()>(Self::project_exports_key(id)).await?;
        debug!(project_id = %id, "deleted project and owned entities");
        Ok(())
    }

    async fn add_video(&self, video: Video) -> StoreResult<()> {
        // Uploading is only entered from Created; re-asserting it for later
        // uploads is idempotent through the same conditional script.
        let project = self.get_project(&video.project_id).await?;
        if project.status == ProjectStatus::Created {
            self.transition_project(&video.project_id, ProjectStatus::Uploading, None)
                .await?;
        }

        let mut conn = self.conn().await?;
        let doc = serde_json::to_string(&video)?;
        conn.set::<_, _, ()>(Self::video_key(&video.id), doc).await?;
        conn.sadd::<_, _, ()>(
            Self::project_videos_key(&video.project_id),
            video.id.as_str(),
        )
        .await?;
        Ok(())
    }

    async fn videos_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Video>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(Self::project_videos_key(id)).await?;
        let keys = ids
            .iter()
            .map(|v| Self::video_key(&VideoId::from_string(v.clone())))
            .collect();
        let mut videos: Vec<Video> = self.fetch_many(keys).await?;
        videos.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(videos)
    }

    async fn get_videos(&self, ids: &[VideoId]) -> StoreResult<Vec<Video>> {
        let keys = ids.iter().map(Self::video_key).collect();
        let mut videos: Vec<Video> = self.fetch_many(keys).await?;
        videos.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(videos)
    }

    async fn insert_scenes(&self, scenes: Vec<Scene>) -> StoreResult<()> {
        if scenes.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let mut pipe = redis::pipe();
        for scene in &scenes {
            pipe.set(Self::scene_key(&scene.id), serde_json::to_string(scene)?);
            pipe.sadd(Self::project_scenes_key(&scene.project_id), scene.id.as_str());
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn scenes_by_ids(&self, ids: &[SceneId]) -> StoreResult<Vec<Scene>> {
        let mut conn = self.conn().await?;
        let mut scenes = Vec::with_capacity(ids.len());
        for id in ids {
            let doc: Option<String> = conn.get(Self::scene_key(id)).await?;
            let doc = doc.ok_or_else(|| StoreError::SceneNotFound(id.clone()))?;
            scenes.push(serde_json::from_str(&doc)?);
        }
        scenes.sort_by(|a: &Scene, b: &Scene| a.start_time.total_cmp(&b.start_time));
        Ok(scenes)
    }

    async fn scenes_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Scene>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(Self::project_scenes_key(id)).await?;
        let keys = ids
            .iter()
            .map(|s| Self::scene_key(&SceneId::from_string(s.clone())))
            .collect();
        let mut scenes: Vec<Scene> = self.fetch_many(keys).await?;
        scenes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(scenes)
    }

    async fn attach_scene_transcript(
        &self,
        id: &SceneId,
        transcript: SceneTranscript,
    ) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let result: Result<String, redis::RedisError> = self
            .attach
            .key(Self::scene_key(id))
            .arg(serde_json::to_string(&transcript)?)
            .invoke_async(&mut conn)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                if msg.contains("CONFLICT") {
                    Err(StoreError::TranscriptConflict(id.clone()))
                } else if msg.contains("NOT_FOUND") {
                    Err(StoreError::SceneNotFound(id.clone()))
                } else {
                    Err(StoreError::Redis(err))
                }
            }
        }
    }

    async fn upsert_narrative(&self, narrative: Narrative) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let doc = serde_json::to_string(&narrative)?;
        conn.set::<_, _, ()>(Self::narrative_key(&narrative.project_id), doc)
            .await?;
        Ok(())
    }

    async fn get_narrative(&self, id: &ProjectId) -> StoreResult<Option<Narrative>> {
        let mut conn = self.conn().await?;
        let doc: Option<String> = conn.get(Self::narrative_key(id)).await?;
        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn add_export(&self, export: Export) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let doc = serde_json::to_string(&export)?;
        conn.rpush::<_, _, ()>(Self::project_exports_key(&export.project_id), doc)
            .await?;
        Ok(())
    }

    async fn exports_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Export>> {
        let mut conn = self.conn().await?;
        let docs: Vec<String> = conn.lrange(Self::project_exports_key(id), 0, -1).await?;
        let mut exports = Vec::with_capacity(docs.len());
        for doc in docs {
            exports.push(serde_json::from_str(&doc)?);
        }
        exports.sort_by(|a: &Export, b: &Export| b.created_at.cmp(&a.created_at));
        Ok(exports)
    }
}
