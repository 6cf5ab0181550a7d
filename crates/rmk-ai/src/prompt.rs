//! Showrunner prompts.
//!
//! The system prompt pins the output contract (the JSON shape the validator
//! checks); the user prompt carries the raw material: video metadata,
//! detected scenes with their transcript summaries, and the full
//! timestamped transcript.

use std::fmt::Write;

use rmk_models::{Scene, TranscriptSegment, Video};

pub const SHOWRUNNER_SYSTEM_PROMPT: &str = r#"You are a professional reality-show SHOWRUNNER.
Your job is to turn raw footage into an episode with a gripping narrative.

PRINCIPLES
1. REALITY FIRST: never invent facts. Use ONLY what is in the footage.
2. CONFLICT IS EVERYTHING: find tensions, disagreements, revelations, emotional peaks.
3. CHARACTERS: identify the people and their roles in the story.
4. THREE-ACT STRUCTURE: setup, conflict, resolution (or cliffhanger).
5. RETENTION: every scene must create curiosity for the next.

INPUT YOU RECEIVE
- Full transcripts with timestamps and speaker labels
- Detected emotions where available
- Scene boundaries with durations and importance scores
- Video metadata

OUTPUT YOU MUST PRODUCE
A JSON object following EXACTLY this shape:

{
  "characters": [
    {"id": "person_1", "name": "...", "role": "protagonist|antagonist|supporting",
     "personality": "...", "arc": "..."}
  ],
  "narrative_structure": {
    "act_1": {"title": "...", "scenes": ["scene_id"], "purpose": "...",
              "duration_target": 180, "emotional_arc": "..."},
    "act_2": {"title": "...", "scenes": ["scene_id"], "purpose": "...",
              "duration_target": 360, "emotional_arc": "..."},
    "act_3": {"title": "...", "scenes": ["scene_id"], "purpose": "...",
              "duration_target": 180, "emotional_arc": "..."}
  },
  "key_moments": [
    {"scene_id": "...", "timestamp": 45.5,
     "type": "conflict|revelation|emotional_peak|cliffhanger",
     "description": "...", "emotional_peak": 0.9, "reason": "..."}
  ],
  "narration_points": [
    {"id": "narration_1", "position": "opening|before_scene_X|after_scene_X|closing",
     "timing": 0, "tone": "dramatic|mysterious|ironic|neutral",
     "purpose": "hook|transition|tension|cliffhanger", "suggestion": "..."}
  ],
  "cuts_and_trims": [
    {"scene_id": "...", "action": "remove|trim|split", "reason": "...",
     "keep_from": 10.0, "keep_to": 45.0}
  ],
  "shorts_suggestions": [
    {"id": "short_1", "type": "conflict|revelation|funny|emotional",
     "scenes": ["scene_id"], "duration": 30, "hook_text": "...",
     "start_timestamp": 10.0, "end_timestamp": 40.0, "viral_score": 0.85}
  ],
  "metadata": {
    "episode_duration_target": 600, "retention_score": 8.5,
    "conflict_intensity": "low|medium|high",
    "resolution_level": "full|partial|none",
    "viral_potential": "low|medium|high|very_high", "reasoning": "..."
  }
}

Cut scenes that add nothing. Order for rising tension, not chronology.
End on unresolved tension when the material allows it.
Return ONLY valid JSON, no extra text."#;

/// Assemble the user prompt from the project's analyzed material.
pub fn build_showrunner_prompt(
    scenes: &[Scene],
    segments: &[TranscriptSegment],
    videos: &[Video],
) -> String {
    let total_duration: f64 = videos.iter().map(|v| v.duration_secs).sum();

    let mut prompt = format!(
        "# RAW MATERIAL\n\n## VIDEOS\nTotal videos: {}\nTotal duration: {:.1}s\n\n",
        videos.len(),
        total_duration
    );

    for (idx, video) in videos.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "Video {}: {:.1}s ({})",
            idx + 1,
            video.duration_secs,
            video.resolution
        );
    }

    let _ = write!(prompt, "\n## DETECTED SCENES ({} scenes)\n\n", scenes.len());

    for scene in scenes {
        let speakers = scene
            .transcript
            .as_ref()
            .map(|t| t.speakers.iter().cloned().collect::<Vec<_>>().join(", "))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unidentified".to_string());
        let emotions = scene
            .transcript
            .as_ref()
            .and_then(|t| t.emotions.as_ref())
            .map(|e| e.join(", "))
            .unwrap_or_else(|| "neutral".to_string());

        let _ = write!(
            prompt,
            "### SCENE {}\n- Start: {:.1}s\n- End: {:.1}s\n- Duration: {:.1}s\n\
             - People present: {}\n- Detected emotions: {}\n- Importance score: {:.2}\n\n",
            scene.id,
            scene.start_time,
            scene.end_time,
            scene.duration(),
            speakers,
            emotions,
            scene.importance_score
        );
    }

    prompt.push_str("\n## FULL TRANSCRIPT\n\n");

    for segment in segments {
        let emotion = segment
            .emotion
            .as_deref()
            .map(|e| format!(" [{e}]"))
            .unwrap_or_default();
        let _ = writeln!(
            prompt,
            "[{:.1}s - {:.1}s] {}: \"{}\"{}",
            segment.start, segment.end, segment.speaker, segment.text, emotion
        );
    }

    prompt.push_str(
        "\n## YOUR TASK\n\nAnalyze ALL the material above and produce the narrative \
         structure as JSON.\n\nFocus on:\n\
         1. Identifying the main characters and their roles\n\
         2. Finding every conflict, tension and emotional moment\n\
         3. A three-act structure that maximizes RETENTION\n\
         4. Strategic narration points\n\
         5. The best moments for viral shorts\n\
         6. Cutting scenes that add nothing\n\n\
         Duration targets: act 1 ~20-25%, act 2 ~50-55%, act 3 ~20-25% of the episode.\n\n\
         Return ONLY the JSON, no text before or after.",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_models::{ProjectId, VideoProbe};

    #[test]
    fn prompt_contains_scenes_and_transcript() {
        let project_id = ProjectId::new();
        let probe = VideoProbe {
            duration_secs: 300.0,
            width: 1920,
            height: 1080,
            fps: 30.0,
        };
        let video = Video::new(project_id.clone(), "/storage/a.mp4", &probe);
        let scene = Scene::new(video.id.clone(), project_id, 0.0, 60.0, 0.8).unwrap();
        let segment = TranscriptSegment {
            video_id: video.id.clone(),
            start: 5.0,
            end: 8.0,
            speaker: "person_1".into(),
            text: "we need to talk".into(),
            emotion: Some("tense".into()),
            confidence: Some(0.9),
        };

        let prompt = build_showrunner_prompt(&[scene.clone()], &[segment], &[video]);

        assert!(prompt.contains("Total videos: 1"));
        assert!(prompt.contains(&format!("SCENE {}", scene.id)));
        assert!(prompt.contains("person_1: \"we need to talk\" [tense]"));
        assert!(prompt.contains("Return ONLY the JSON"));
    }
}
