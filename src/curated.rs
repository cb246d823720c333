use std::fs;

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lesson::Checkpoint;

#[derive(Embed)]
#[folder = "assets/curated/"]
struct CuratedAssets;

/// A topic with a hand-picked video known to be embeddable and to have
/// checkpoints authored against its timeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CuratedTopic {
    pub slug: String,
    pub title: String,
    pub video_id: String,
    /// Course page the video belongs to, kept for reference output.
    #[serde(default)]
    pub course_url: String,
}

/// The curated topic list plus the checkpoints authored for those videos.
/// Loaded once at startup and cloned into worker threads.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CuratedCatalog {
    #[serde(default)]
    pub topics: Vec<CuratedTopic>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

impl CuratedCatalog {
    /// Load the catalog, preferring a user-provided file over the bundled one.
    pub fn load() -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("mentor").join("curated").join("topics.toml");
            if let Ok(content) = fs::read_to_string(&user_path) {
                match toml::from_str::<Self>(&content) {
                    Ok(catalog) => return catalog,
                    Err(err) => {
                        warn!("ignoring invalid user catalog at {}: {err}", user_path.display());
                    }
                }
            }
        }

        if let Some(file) = CuratedAssets::get("topics.toml") {
            if let Ok(content) = std::str::from_utf8(file.data.as_ref()) {
                if let Ok(catalog) = toml::from_str::<Self>(content) {
                    return catalog;
                }
            }
        }

        warn!("bundled curated catalog missing or invalid; lessons fall back to dynamic search");
        Self::default()
    }

    pub fn topic_by_slug(&self, slug: &str) -> Option<&CuratedTopic> {
        self.topics.iter().find(|topic| topic.slug == slug)
    }

    /// Checkpoints authored for one video, in ascending time order.
    pub fn checkpoints_for_video(&self, video_id: &str) -> Vec<Checkpoint> {
        let mut checkpoints: Vec<Checkpoint> = self
            .checkpoints
            .iter()
            .filter(|cp| cp.video_id == video_id)
            .cloned()
            .collect();
        checkpoints.sort_by_key(|cp| cp.time_seconds);
        checkpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::CheckpointType;

    fn catalog_from(toml_text: &str) -> CuratedCatalog {
        toml::from_str(toml_text).unwrap()
    }

    const SAMPLE: &str = r#"
        [[topics]]
        slug = "html_basics"
        title = "HTML Full Course"
        video_id = "dD2EISBDjWM"

        [[checkpoints]]
        id = "html_cp2_quiz"
        video_id = "dD2EISBDjWM"
        time_seconds = 480
        type = "quiz"
        topic = "HTML Headings and Paragraphs"
        question = "Which tag marks a top-level heading?"

        [[checkpoints]]
        id = "html_cp1_quiz"
        video_id = "dD2EISBDjWM"
        time_seconds = 120
        type = "quiz"
        topic = "Introduction to HTML and basic tags"
        question = "What does HTML stand for?"

        [[checkpoints]]
        id = "other_video_cp"
        video_id = "zzzzzzzzzzz"
        time_seconds = 60
        type = "project"
        topic = "Unrelated"
        question = "n/a"
    "#;

    #[test]
    fn finds_topic_by_slug() {
        let catalog = catalog_from(SAMPLE);
        assert_eq!(catalog.topic_by_slug("html_basics").unwrap().video_id, "dD2EISBDjWM");
        assert!(catalog.topic_by_slug("unknown").is_none());
    }

    #[test]
    fn checkpoints_filtered_by_video_and_sorted_by_time() {
        let catalog = catalog_from(SAMPLE);
        let cps = catalog.checkpoints_for_video("dD2EISBDjWM");
        assert_eq!(cps.len(), 2);
        assert_eq!(cps[0].id, "html_cp1_quiz");
        assert_eq!(cps[1].id, "html_cp2_quiz");
        assert_eq!(cps[0].kind, CheckpointType::Quiz);
    }

    #[test]
    fn bundled_catalog_parses() {
        let file = CuratedAssets::get("topics.toml").unwrap();
        let content = std::str::from_utf8(file.data.as_ref()).unwrap();
        let catalog: CuratedCatalog = toml::from_str(content).unwrap();
        assert!(catalog.topic_by_slug("html_basics").is_some());
        assert!(!catalog.checkpoints_for_video("dD2EISBDjWM").is_empty());
    }
}
