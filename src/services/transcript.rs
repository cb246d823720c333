use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::services::ServiceError;

const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Fetch the ordered caption segments for a video. Errors bubble up so the
/// caller can fall back to title-only checkpoint generation.
pub fn fetch_transcript(video_id: &str) -> Result<Vec<String>, ServiceError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default();

    let response = client
        .get(TIMEDTEXT_URL)
        .query(&[("lang", "en"), ("v", video_id)])
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Status {
            service: "transcript",
            status: status.as_u16(),
        });
    }

    let body = response.text()?;
    let segments = parse_segments(&body);
    if segments.is_empty() {
        return Err(ServiceError::Malformed("transcript"));
    }
    debug!(video = video_id, segments = segments.len(), "transcript fetched");
    Ok(segments)
}

/// Extract segment texts from the timedtext XML, in document order.
pub fn parse_segments(xml: &str) -> Vec<String> {
    SEGMENT_RE
        .captures_iter(xml)
        .filter_map(|cap| {
            let text = decode_entities(&TAG_RE.replace_all(&cap[1], " "));
            let trimmed = text.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segments_in_order() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0.5" dur="2.1">welcome to the course</text>
            <text start="2.6" dur="3.0">let&#39;s get started</text>
        </transcript>"#;
        let segments = parse_segments(xml);
        assert_eq!(segments, vec!["welcome to the course", "let's get started"]);
    }

    #[test]
    fn decodes_entities_and_strips_inner_tags() {
        let xml = r#"<transcript><text>a &amp; b <i>then</i> c &quot;d&quot;</text></transcript>"#;
        let segments = parse_segments(xml);
        assert_eq!(segments, vec![r#"a & b  then  c "d""#]);
    }

    #[test]
    fn empty_document_yields_no_segments() {
        assert!(parse_segments("<transcript></transcript>").is_empty());
        assert!(parse_segments("").is_empty());
    }

    #[test]
    fn whitespace_only_segments_are_dropped() {
        let xml = "<transcript><text>  </text><text>real</text></transcript>";
        assert_eq!(parse_segments(xml), vec!["real"]);
    }
}
