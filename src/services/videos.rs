use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::lesson::VideoData;
use crate::router::VideoLookup;
use crate::services::ServiceError;

const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const SEARCH_MAX_RESULTS: u32 = 5;

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    status: VideoStatus,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    privacy_status: String,
    #[serde(default)]
    embeddable: bool,
    upload_status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    region_restriction: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

/// Blocking client for the video-metadata collaborator.
pub struct VideoService {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl VideoService {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.to_string(),
            client,
        }
    }

    /// A video is usable only if public, embeddable, fully processed and not
    /// region-restricted. Every failure cause, including transport errors,
    /// collapses to None so callers treat dead videos uniformly.
    pub fn check_availability(&self, video_id: &str) -> Option<VideoData> {
        if self.api_key.is_empty() {
            warn!("video API key is not set; availability check fails safe");
            return None;
        }

        let result = self
            .client
            .get(VIDEOS_URL)
            .query(&[
                ("part", "snippet,status,contentDetails"),
                ("id", video_id),
                ("key", &self.api_key),
            ])
            .send();

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(video = video_id, status = r.status().as_u16(), "availability check failed");
                return None;
            }
            Err(err) => {
                debug!(video = video_id, "availability check error: {err}");
                return None;
            }
        };

        let parsed: VideoListResponse = response.json().ok()?;
        let video = parsed.items.into_iter().next()?;

        let restricted = video
            .content_details
            .as_ref()
            .is_some_and(|cd| cd.region_restriction.is_some());
        if video.status.privacy_status != "public"
            || !video.status.embeddable
            || video.status.upload_status != "processed"
            || restricted
        {
            debug!(video = video_id, "video is not embeddable or is private/restricted");
            return None;
        }

        let thumbnail_url = video
            .snippet
            .thumbnails
            .high
            .or(video.snippet.thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_default();

        Some(VideoData {
            video_id: video.id,
            title: video.snippet.title,
            thumbnail_url,
        })
    }

    /// Video ids for the top search results, best first.
    pub fn search(&self, query: &str) -> Result<Vec<String>, ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::MissingCredentials("video"));
        }

        let max_results = SEARCH_MAX_RESULTS.to_string();
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", &self.api_key),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: "video search",
                status: status.as_u16(),
            });
        }

        let parsed: SearchResponse = response.json()?;
        Ok(parsed
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect())
    }
}

impl VideoLookup for VideoService {
    fn check(&self, video_id: &str) -> Option<VideoData> {
        self.check_availability(video_id)
    }
}
