use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::router::ChatModel;
use crate::services::{ChatMessage, Role, ServiceConfig, ServiceError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Conversation contract for the chat surface. The greeting has already been
/// shown locally, so the model is told not to re-introduce itself.
pub const MENTOR_SYSTEM_PROMPT: &str = "\
You are a personal AI mentor. Your goal is to help users discover skills, \
create learning paths, and monetize their talents.

Your first message (the greeting) has already been sent to the user. This is \
the user's first *reply*. **DO NOT introduce yourself again.** Just continue \
the conversation naturally.

**Be concise and impactful.** Keep your responses short and to the point, but \
maintain a friendly, \"chill\" tone. Avoid long, wordy paragraphs.

**IMPORTANT VIDEO RULES:**
1. When you believe a YouTube video is helpful, you MUST respond with the \
following special format AND nothing else: `YT_VIDEO::[VIDEO_ID]`
2. **NEVER** invent a video ID.
3. Try to suggest videos from popular, well-known, and active channels (like \
freeCodeCamp, The Net Ninja, Fireship, etc.). These videos are less likely to \
be unavailable.

**LESSON RULE:** when the user wants to be taught a topic as a guided lesson, \
respond with `LESSON::topic_slug` (lowercase, underscores) and nothing else.

Otherwise, just respond with helpful, conversational text.";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    #[serde(rename = "system_instruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Blocking client for the text-generation collaborator.
pub struct ModelService {
    api_key: String,
    model_name: String,
    client: reqwest::blocking::Client,
}

impl ModelService {
    pub fn new(cfg: &ServiceConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            api_key: cfg.model_api_key.clone(),
            model_name: cfg.model_name.clone(),
            client,
        }
    }

    /// Single-shot prompt with no system instruction or history. Used by
    /// search-query suggestion, checkpoint generation and grading.
    pub fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let contents = vec![Content {
            role: Some("user"),
            parts: vec![Part { text: prompt }],
        }];
        self.request(None, contents)
    }

    /// Full conversational call: system instruction plus prior turns.
    pub fn generate_chat(
        &self,
        system: &str,
        history: &[ChatMessage],
    ) -> Result<String, ServiceError> {
        let contents = history
            .iter()
            .map(|msg| Content {
                role: Some(match msg.role {
                    Role::User => "user",
                    Role::Model => "model",
                }),
                parts: vec![Part { text: &msg.content }],
            })
            .collect();
        self.request(Some(system), contents)
    }

    fn request(
        &self,
        system: Option<&str>,
        contents: Vec<Content<'_>>,
    ) -> Result<String, ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::MissingCredentials("model"));
        }

        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model_name, self.api_key
        );
        let body = GenerateRequest {
            system_instruction: system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self.client.post(&url).json(&body).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: "model",
                status: status.as_u16(),
            });
        }

        let parsed: GenerateResponse = response.json()?;
        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ServiceError::Malformed("model"));
        }
        debug!(chars = text.len(), "model reply received");
        Ok(text)
    }
}

/// Stateful chat turn: replays prior history, appends the new user message,
/// and records the model reply so router retries share one conversation.
pub struct ModelConversation {
    service: ModelService,
    history: Vec<ChatMessage>,
}

impl ModelConversation {
    pub fn new(cfg: &ServiceConfig, history: Vec<ChatMessage>) -> Self {
        Self {
            service: ModelService::new(cfg),
            history,
        }
    }
}

impl ChatModel for ModelConversation {
    fn send(&mut self, message: &str) -> Result<String, ServiceError> {
        self.history.push(ChatMessage {
            role: Role::User,
            content: message.to_string(),
        });
        let reply = self
            .service
            .generate_chat(MENTOR_SYSTEM_PROMPT, &self.history)?;
        self.history.push(ChatMessage {
            role: Role::Model,
            content: reply.clone(),
        });
        Ok(reply)
    }
}
