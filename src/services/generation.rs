use serde::Deserialize;
use tracing::{debug, warn};

use crate::lesson::{Checkpoint, CheckpointType};
use crate::services::model::ModelService;
use crate::services::{strip_code_fences, transcript, ServiceConfig};

/// The transcript can run to hours of speech; the prompt carries at most
/// this many characters of it.
const TRANSCRIPT_PROMPT_CAP: usize = 10_000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheckpoint {
    #[serde(default)]
    time_seconds: f64,
    #[serde(rename = "type")]
    kind: CheckpointType,
    topic: String,
    question: String,
}

fn transcript_prompt(transcript: &str, video_title: &str) -> String {
    let truncated: String = transcript.chars().take(TRANSCRIPT_PROMPT_CAP).collect();
    format!(
        r#"You are an expert instructional designer. Your job is to create an interactive learning plan from a video transcript.
The video is titled: "{video_title}".
Here is the full transcript:
---
{truncated}...
---
(Transcript may be truncated)

Your task is to analyze this transcript and identify 3 to 5 key learning moments.
For each moment, create a "Checkpoint".

- "type": "quiz" - Ask a specific, short question about the concept that was just explained.
- "type": "project" - (Optional, use 1-2 times for longer videos) Give a small task asking the user to practice what they just saw.

You MUST respond in strict JSON format. Do not use markdown.
The response should be an array of "Checkpoint" objects.

The JSON structure for each object is:
{{
  "id": "string",
  "timeSeconds": number,
  "type": "quiz" | "project",
  "topic": "string",
  "question": "string"
}}

Example Response:
[
  {{ "id": "dyn_cp_1", "timeSeconds": 152, "type": "quiz", "topic": "What is HTML", "question": "In one sentence, what does HTML stand for and what is its main purpose?" }},
  {{ "id": "dyn_cp_2", "timeSeconds": 310, "type": "quiz", "topic": "Basic HTML Tags", "question": "What are the two tags that all content on an HTML page must go inside?" }},
  {{ "id": "dyn_cp_3", "timeSeconds": 900, "type": "project", "topic": "Build a Simple Page", "question": "Create a new 'index.html' file. Add a heading (h1) and a paragraph (p). Upload it to Google Drive and share the link." }}
]

Now, generate the checkpoints for the provided transcript."#
    )
}

fn title_prompt(video_title: &str) -> String {
    format!(
        r#"You are an expert instructional designer. A video transcript was unavailable.
Your job is to create an interactive learning plan based ONLY on the video's title.
The video is titled: "{video_title}".

Your task is to *guess* 3 to 4 logical sub-topics and appropriate timestamps (in seconds) for them.
Assume the video is a standard tutorial, about 10-20 minutes long.

1. Create 3 "quiz" checkpoints. For the "question", ask a specific, high-level question about that topic.
2. Create 1 final "project" checkpoint. For the "question", give a simple task related to the video title.

You MUST respond in strict JSON format. Do not use markdown.

Example for "Learn CSS Grid":
[
  {{ "id": "dyn_cp_1", "timeSeconds": 180, "type": "quiz", "topic": "What is CSS Grid", "question": "What is the main difference between CSS Grid and Flexbox?" }},
  {{ "id": "dyn_cp_2", "timeSeconds": 420, "type": "quiz", "topic": "Grid Template Columns & Rows", "question": "What is the 'fr' unit and how is it used in grid templates?" }},
  {{ "id": "dyn_cp_3", "timeSeconds": 700, "type": "quiz", "topic": "Grid Align & Justify", "question": "What's the difference between 'align-items' and 'justify-content' in a grid?" }},
  {{ "id": "dyn_cp_4", "timeSeconds": 900, "type": "project", "topic": "Build a Simple Grid Layout", "question": "Create a simple 3x2 grid layout. Upload the HTML/CSS to Google Drive and share the link." }}
]

Now, generate the checkpoints for the video titled: "{video_title}"."#
    )
}

/// Parse the model's checkpoint array. Ids are rewritten to a deterministic
/// `dyn_<video>_<index>` form and fractional times floored to whole seconds.
/// Returns None when the output is not the expected JSON.
pub fn parse_generated(text: &str, video_id: &str) -> Option<Vec<Checkpoint>> {
    let cleaned = strip_code_fences(text);
    let raw: Vec<RawCheckpoint> = serde_json::from_str(&cleaned).ok()?;
    Some(
        raw.into_iter()
            .enumerate()
            .map(|(index, cp)| Checkpoint {
                id: format!("dyn_{video_id}_{index}"),
                video_id: video_id.to_string(),
                time_seconds: cp.time_seconds.max(0.0) as u32,
                kind: cp.kind,
                topic: cp.topic,
                question: cp.question,
            })
            .collect(),
    )
}

/// Generate dynamic checkpoints for a video: transcript-based when captions
/// are available, title-based otherwise. Total failure degrades to an empty
/// list and is never an error to the caller.
pub fn generate_checkpoints(cfg: &ServiceConfig, video_id: &str, video_title: &str) -> Vec<Checkpoint> {
    let prompt = match transcript::fetch_transcript(video_id) {
        Ok(segments) => transcript_prompt(&segments.join(" "), video_title),
        Err(err) => {
            warn!(video = video_id, "no transcript ({err}); falling back to title-based generation");
            title_prompt(video_title)
        }
    };

    let model = ModelService::new(cfg);
    match model.generate(&prompt) {
        Ok(text) => match parse_generated(&text, video_id) {
            Some(checkpoints) => {
                debug!(video = video_id, count = checkpoints.len(), "generated checkpoints");
                checkpoints
            }
            None => {
                warn!(video = video_id, "checkpoint generation returned unparseable output");
                Vec::new()
            }
        },
        Err(err) => {
            warn!(video = video_id, "checkpoint generation failed: {err}");
            Vec::new()
        }
    }
}
