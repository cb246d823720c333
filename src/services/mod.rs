pub mod generation;
pub mod grader;
pub mod model;
pub mod resolver;
pub mod transcript;
pub mod videos;

use std::sync::mpsc::Sender;
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::curated::CuratedCatalog;
use crate::event::AppEvent;
use crate::lesson::grading::{SubmitRequest, Verdict};
use crate::lesson::{Checkpoint, LessonPayload};
use crate::player::{self, Player};
use crate::router::{self, ChatOutcome};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} API key is not configured")]
    MissingCredentials(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("malformed response from {0}")]
    Malformed(&'static str),
    /// A curated video that should exist is not embeddable right now.
    #[error("{0}")]
    Unavailable(String),
    /// Dynamic search produced nothing usable.
    #[error("{0}")]
    NotFound(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Credentials and model selection snapshot handed to worker threads.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub model_api_key: String,
    pub video_api_key: String,
    pub model_name: String,
}

impl ServiceConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_api_key: config.model_api_key.clone(),
            video_api_key: config.video_api_key.clone(),
            model_name: config.model_name.clone(),
        }
    }
}

/// Results delivered from worker threads back into the event loop. Every
/// variant carries the turn/generation it was spawned for; the app drops
/// events whose tag no longer matches the live session.
pub enum ServiceEvent {
    ChatReply {
        turn: u64,
        outcome: Result<ChatOutcome, ServiceError>,
    },
    LessonResolved {
        generation: u64,
        outcome: Result<LessonPayload, ServiceError>,
    },
    CheckpointsGenerated {
        generation: u64,
        video_id: String,
        checkpoints: Vec<Checkpoint>,
    },
    GradeReturned {
        generation: u64,
        outcome: Result<Verdict, ServiceError>,
    },
    PlayerLaunched {
        generation: u64,
        payload: LessonPayload,
        outcome: anyhow::Result<Box<dyn Player>>,
    },
}

/// The model wraps structured output in markdown fences often enough that
/// both JSON-returning calls strip them before parsing.
pub(crate) fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Run one chat turn off the event loop: model call, marker classification,
/// bounded video validation retries.
pub fn spawn_chat_turn(
    tx: Sender<AppEvent>,
    cfg: ServiceConfig,
    history: Vec<ChatMessage>,
    message: String,
    turn: u64,
) {
    thread::spawn(move || {
        debug!(turn, "chat turn started");
        let videos = videos::VideoService::new(&cfg.video_api_key);
        let mut conversation = model::ModelConversation::new(&cfg, history);
        let outcome = router::run_turn(&mut conversation, &videos, &message);
        let _ = tx.send(AppEvent::Service(ServiceEvent::ChatReply { turn, outcome }));
    });
}

pub fn spawn_lesson_resolution(
    tx: Sender<AppEvent>,
    cfg: ServiceConfig,
    catalog: CuratedCatalog,
    topic_slug: String,
    generation: u64,
) {
    thread::spawn(move || {
        debug!(generation, slug = %topic_slug, "lesson resolution started");
        let outcome = resolver::resolve_lesson(&cfg, &catalog, &topic_slug);
        let _ = tx.send(AppEvent::Service(ServiceEvent::LessonResolved {
            generation,
            outcome,
        }));
    });
}

pub fn spawn_checkpoint_generation(
    tx: Sender<AppEvent>,
    cfg: ServiceConfig,
    video_id: String,
    video_title: String,
    generation: u64,
) {
    thread::spawn(move || {
        debug!(generation, video = %video_id, "checkpoint generation started");
        let checkpoints = generation::generate_checkpoints(&cfg, &video_id, &video_title);
        let _ = tx.send(AppEvent::Service(ServiceEvent::CheckpointsGenerated {
            generation,
            video_id,
            checkpoints,
        }));
    });
}

/// Launch the external video player off the event loop; waiting for its IPC
/// socket can take seconds while the stream resolves.
pub fn spawn_player_launch(
    tx: Sender<AppEvent>,
    player_command: String,
    payload: LessonPayload,
    generation: u64,
) {
    thread::spawn(move || {
        debug!(generation, video = %payload.video_data.video_id, "player launch started");
        let outcome = player::launch_session(&player_command, &payload.video_data.video_id);
        let _ = tx.send(AppEvent::Service(ServiceEvent::PlayerLaunched {
            generation,
            payload,
            outcome,
        }));
    });
}

pub fn spawn_grading(
    tx: Sender<AppEvent>,
    cfg: ServiceConfig,
    request: SubmitRequest,
    generation: u64,
) {
    thread::spawn(move || {
        debug!(generation, checkpoint = %request.checkpoint_id, "grading started");
        let outcome = grader::grade(&cfg, &request);
        let _ = tx.send(AppEvent::Service(ServiceEvent::GradeReturned {
            generation,
            outcome,
        }));
    });
}
