//! Temporal containment join between scenes and transcript segments.
//!
//! A segment belongs to a scene iff it lies fully inside the scene's time
//! range on the same video. Segments straddling a scene boundary belong to
//! neither side; that asymmetry is the documented policy, not an accident.
//!
//! Pure and deterministic: both inputs are sorted into working order here,
//! so correctness does not depend on callers pre-sorting.

use std::collections::{BTreeSet, HashMap};

use rmk_models::{Scene, SceneId, SceneTranscript, TranscriptSegment, VideoId};

/// Transcript data computed for one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneAssociation {
    pub scene_id: SceneId,
    pub transcript: SceneTranscript,
}

/// Attribute transcript segments to the scenes that fully contain them.
///
/// Returns one association per scene with at least one contained segment,
/// ordered by (video, scene start). Scenes without any contained segment
/// are absent from the result.
pub fn associate_segments(
    scenes: &[Scene],
    segments: &[TranscriptSegment],
) -> Vec<SceneAssociation> {
    // Group both sides by video; times are video-relative, so containment
    // across videos is meaningless.
    let mut segments_by_video: HashMap<&VideoId, Vec<&TranscriptSegment>> = HashMap::new();
    for segment in segments {
        segments_by_video
            .entry(&segment.video_id)
            .or_default()
            .push(segment);
    }
    for group in segments_by_video.values_mut() {
        group.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then(a.end.total_cmp(&b.end))
        });
    }

    let mut scenes_by_video: HashMap<&VideoId, Vec<&Scene>> = HashMap::new();
    for scene in scenes {
        scenes_by_video.entry(&scene.video_id).or_default().push(scene);
    }

    let mut video_ids: Vec<&VideoId> = scenes_by_video.keys().copied().collect();
    video_ids.sort();

    let mut associations = Vec::new();

    for video_id in video_ids {
        let mut video_scenes = scenes_by_video.remove(video_id).unwrap_or_default();
        video_scenes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let video_segments = segments_by_video
            .get(video_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        // Two-pointer sweep: scenes are visited in start order, so the lower
        // bound into the segment list only ever moves forward.
        let mut lo = 0usize;
        for scene in video_scenes {
            while lo < video_segments.len() && video_segments[lo].start < scene.start_time {
                lo += 1;
            }

            let mut contained: Vec<&TranscriptSegment> = Vec::new();
            let mut idx = lo;
            while idx < video_segments.len() && video_segments[idx].start <= scene.end_time {
                let segment = video_segments[idx];
                if segment.end <= scene.end_time {
                    contained.push(segment);
                }
                idx += 1;
            }

            if let Some(transcript) = build_transcript(&contained) {
                associations.push(SceneAssociation {
                    scene_id: scene.id.clone(),
                    transcript,
                });
            }
        }
    }

    associations
}

fn build_transcript(contained: &[&TranscriptSegment]) -> Option<SceneTranscript> {
    if contained.is_empty() {
        return None;
    }

    let text = contained
        .iter()
        .map(|s| format!("{}: {}", s.speaker, s.text))
        .collect::<Vec<_>>()
        .join("\n");

    let speakers: BTreeSet<String> = contained.iter().map(|s| s.speaker.clone()).collect();

    let emotions: Vec<String> = contained
        .iter()
        .filter_map(|s| s.emotion.clone())
        .collect();

    Some(SceneTranscript {
        text,
        speakers,
        // Absent, not empty: persisted scenes without emotion data carry no
        // emotions field at all.
        emotions: if emotions.is_empty() {
            None
        } else {
            Some(emotions)
        },
        segments: contained.iter().map(|s| (*s).clone()).collect(),
    })
}
