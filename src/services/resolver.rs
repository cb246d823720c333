use tracing::{debug, warn};

use crate::curated::CuratedCatalog;
use crate::lesson::{LessonPayload, LessonSource};
use crate::services::model::ModelService;
use crate::services::videos::VideoService;
use crate::services::{ServiceConfig, ServiceError};

fn search_query_prompt(topic_slug: &str) -> String {
    format!(
        r#"You are a YouTube search expert. Find the best YouTube search query for a high-quality, full tutorial video on the topic: "{topic_slug}".
Prioritize the "freeCodeCamp.org" channel.
Respond with ONLY the search query text and nothing else.
For example, if the topic is "CSS Flexbox", a good response would be "css flexbox tutorial freecodecamp".

Topic: "{topic_slug}"
Search Query:"#
    )
}

/// The model sometimes quotes the query it was asked to emit bare.
pub(crate) fn clean_search_query(raw: &str) -> String {
    raw.trim().replace('"', "")
}

/// Resolve a lesson topic to a playable video. Curated topics are preferred
/// and ship with authored checkpoints; anything else falls back to a dynamic
/// search whose checkpoints are generated afterwards, so the payload starts
/// with an empty list.
pub fn resolve_lesson(
    cfg: &ServiceConfig,
    catalog: &CuratedCatalog,
    topic_slug: &str,
) -> Result<LessonPayload, ServiceError> {
    let videos = VideoService::new(&cfg.video_api_key);

    if let Some(topic) = catalog.topic_by_slug(topic_slug) {
        debug!(
            slug = topic_slug,
            video = %topic.video_id,
            course = %topic.course_url,
            "curated topic matched"
        );
        let Some(video_data) = videos.check_availability(&topic.video_id) else {
            warn!(slug = topic_slug, video = %topic.video_id, "curated video is unavailable");
            return Err(ServiceError::Unavailable(
                "Preferred video for this topic is currently unavailable.".to_string(),
            ));
        };
        let checkpoints = catalog.checkpoints_for_video(&video_data.video_id);
        return Ok(LessonPayload {
            video_data,
            checkpoints,
            source: LessonSource::Curated,
        });
    }

    debug!(slug = topic_slug, "no curated topic; falling back to dynamic search");
    let model = ModelService::new(cfg);
    let query = clean_search_query(&model.generate(&search_query_prompt(topic_slug))?);
    debug!(slug = topic_slug, query = %query, "model suggested search query");

    let candidates = videos.search(&query)?;
    if candidates.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "Sorry, I couldn't find any videos for \"{topic_slug}\"."
        )));
    }

    for video_id in &candidates {
        if let Some(video_data) = videos.check_availability(video_id) {
            debug!(slug = topic_slug, video = %video_data.video_id, "dynamic video selected");
            return Ok(LessonPayload {
                video_data,
                checkpoints: Vec::new(),
                source: LessonSource::DynamicSearch,
            });
        }
    }

    Err(ServiceError::NotFound(format!(
        "Sorry, I found videos for \"{topic_slug}\", but none seem to be available for embedding."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_and_whitespace_from_query() {
        assert_eq!(
            clean_search_query("  \"css flexbox tutorial freecodecamp\"\n"),
            "css flexbox tutorial freecodecamp"
        );
        assert_eq!(clean_search_query("plain query"), "plain query");
    }

    #[test]
    fn query_prompt_names_the_topic() {
        let prompt = search_query_prompt("rust ownership");
        assert!(prompt.contains("\"rust ownership\""));
        assert!(prompt.contains("ONLY the search query"));
    }
}
