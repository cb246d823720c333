pub mod grading;
pub mod schedule;
pub mod watcher;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointType {
    Quiz,
    Project,
}

impl CheckpointType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointType::Quiz => "quiz",
            CheckpointType::Project => "project",
        }
    }
}

/// A scheduled pause point in a video. Ids are unique within one video's
/// schedule; times are consumed in ascending order regardless of authored
/// order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub video_id: String,
    pub time_seconds: u32,
    #[serde(rename = "type")]
    pub kind: CheckpointType,
    pub topic: String,
    pub question: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonSource {
    Curated,
    DynamicSearch,
}

/// Video plus its checkpoint list. `video_data` is immutable once set;
/// `checkpoints` may be replaced wholesale once (empty -> populated) when a
/// dynamic-search lesson's background generation completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonPayload {
    pub video_data: VideoData,
    pub checkpoints: Vec<Checkpoint>,
    pub source: LessonSource,
}
