use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::lesson::VideoData;
use crate::services::ServiceError;

const MAX_VIDEO_ATTEMPTS: u32 = 3;

const RETRY_PROMPT: &str = "That video ID you provided was unavailable, private, \
or region-locked. Please find a *different* one from a popular, active channel.";

const FALLBACK_TEXT: &str = "I'm trying to find a good video for you, but the \
ones I'm finding seem to be unavailable. Can I help with a text explanation instead?";

// Markers can be preceded by commentary the model was told not to emit, so
// they are matched anywhere in the reply, not only as a prefix.
static LESSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"LESSON::([A-Za-z0-9_\-]+)").unwrap());
static VIDEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"YT_VIDEO::\[?([A-Za-z0-9_\-]{5,})\]?").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]*)\*|_([^_\n]*)_").unwrap());

/// What one chat turn resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    Text(String),
    Video(VideoData),
    Lesson(String),
}

/// Raw classification of a model reply, before any validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    Lesson(String),
    Video(String),
    Text,
}

/// Conversation seam: one message in, one raw reply out, history retained
/// across calls so validation retries stay in context.
pub trait ChatModel {
    fn send(&mut self, message: &str) -> Result<String, ServiceError>;
}

/// Availability seam: None uniformly covers nonexistent, private,
/// non-embeddable, unprocessed and region-locked videos.
pub trait VideoLookup {
    fn check(&self, video_id: &str) -> Option<VideoData>;
}

/// Classify a reply by its sentinel markers. The lesson marker takes
/// priority when both appear in the same reply.
pub fn classify(text: &str) -> Classified {
    if let Some(cap) = LESSON_RE.captures(text) {
        return Classified::Lesson(cap[1].to_string());
    }
    if let Some(cap) = VIDEO_RE.captures(text) {
        return Classified::Video(cap[1].to_string());
    }
    Classified::Text
}

/// Strip basic inline emphasis (bold, italics) from model text.
pub fn clean_model_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_bold = BOLD_RE.replace_all(text, "$1");
    let without_italics = ITALIC_RE.replace_all(&without_bold, "$1$2");
    without_italics.trim().to_string()
}

/// Drive one chat turn: send the message, dispatch on the reply's markers,
/// and validate any suggested video with bounded retries. A lesson marker is
/// surfaced immediately with no validation here; lesson resolution does its
/// own availability checking.
pub fn run_turn(
    model: &mut dyn ChatModel,
    videos: &dyn VideoLookup,
    message: &str,
) -> Result<ChatOutcome, ServiceError> {
    let mut current = message.to_string();
    let mut attempts = 0;

    while attempts < MAX_VIDEO_ATTEMPTS {
        let reply = model.send(&current)?;
        match classify(&reply) {
            Classified::Lesson(slug) => {
                debug!(slug = %slug, "lesson marker detected");
                return Ok(ChatOutcome::Lesson(slug));
            }
            Classified::Video(video_id) => match videos.check(&video_id) {
                Some(video_data) => return Ok(ChatOutcome::Video(video_data)),
                None => {
                    debug!(video = %video_id, attempts, "suggested video is dead; re-prompting");
                    attempts += 1;
                    current = RETRY_PROMPT.to_string();
                }
            },
            Classified::Text => return Ok(ChatOutcome::Text(clean_model_text(&reply))),
        }
    }

    Ok(ChatOutcome::Text(FALLBACK_TEXT.to_string()))
}
