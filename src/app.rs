use std::collections::BTreeSet;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::Config;
use crate::curated::CuratedCatalog;
use crate::event::AppEvent;
use crate::lesson::grading::{GradingSession, GradingState};
use crate::lesson::schedule;
use crate::lesson::watcher::{PlaybackWatcher, WatcherEvent};
use crate::lesson::{Checkpoint, CheckpointType, LessonPayload, LessonSource, VideoData};
use crate::player::{Player, PlayerState};
use crate::router::ChatOutcome;
use crate::services::{self, ChatMessage, Role, ServiceConfig, ServiceEvent};
use crate::store::ProgressStore;
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

const GREETING: &str = "Welcome! What would you like to explore first?";
const CONNECTION_ERROR_TEXT: &str =
    "Sorry, I'm having trouble connecting right now. Please try again later.";
/// How chat history records a video card, since the transcript sent back to
/// the model is plain text.
const VIDEO_EMBED_PLACEHOLDER: &str = "[Video Embed]";

const LESSON_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// One entry in the rendered transcript. `Notice` lines are app-originated
/// status (lesson events), styled apart from model text.
pub enum ChatItem {
    User(String),
    Model(String),
    VideoCard(VideoData),
    Notice(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradingFocus {
    Answer,
    Link,
}

/// Checkpoint modal state. The editors live here rather than in the session
/// so a failed attempt keeps the entered text through try-again.
pub struct GradingModal {
    pub session: GradingSession,
    pub answer: LineInput,
    pub link: LineInput,
    pub focus: GradingFocus,
}

impl GradingModal {
    fn new(session: GradingSession) -> Self {
        Self {
            session,
            answer: LineInput::new(""),
            link: LineInput::new(""),
            focus: GradingFocus::Answer,
        }
    }

    pub fn has_link_field(&self) -> bool {
        self.session.checkpoint.kind == CheckpointType::Project
    }
}

pub struct ActiveLesson {
    pub payload: LessonPayload,
    pub player: Box<dyn Player>,
    pub watcher: PlaybackWatcher,
    /// Derived view: ascending by time, completed excluded. Rebuilt whenever
    /// the checkpoint list or completed set changes.
    pub schedule: Vec<Checkpoint>,
    pub completed: BTreeSet<String>,
    pub generation: u64,
    pub position: u32,
    pub player_state: PlayerState,
}

pub struct App {
    pub config: Config,
    pub theme: &'static Theme,
    pub chat_items: Vec<ChatItem>,
    pub chat_input: LineInput,
    pub awaiting_reply: bool,
    pub active_lesson: Option<ActiveLesson>,
    pub grading: Option<GradingModal>,
    pub should_quit: bool,
    history: Vec<ChatMessage>,
    progress: ProgressStore,
    curated: CuratedCatalog,
    tx: Sender<AppEvent>,
    /// Tag for the chat turn in flight; replies for older turns are dropped.
    turn: u64,
    /// Tag for the live lesson; bumped on every open/close so resolution,
    /// checkpoint generation and player launches for a dead lesson are
    /// dropped.
    lesson_generation: u64,
    /// Tag for the grading session; bumped per modal so a verdict can only
    /// apply to the session that requested it.
    grading_tag: u64,
    last_lesson_tick: Instant,
}

impl App {
    pub fn new(config: Config, progress: ProgressStore, tx: Sender<AppEvent>) -> Self {
        let loaded_theme = Theme::load(&config.theme).unwrap_or_default();
        let theme: &'static Theme = Box::leak(Box::new(loaded_theme));
        let curated = CuratedCatalog::load();

        Self {
            config,
            theme,
            chat_items: vec![ChatItem::Model(GREETING.to_string())],
            chat_input: LineInput::new(""),
            awaiting_reply: false,
            active_lesson: None,
            grading: None,
            should_quit: false,
            history: Vec::new(),
            progress,
            curated,
            tx,
            turn: 0,
            lesson_generation: 0,
            grading_tag: 0,
            last_lesson_tick: Instant::now(),
        }
    }

    fn service_config(&self) -> ServiceConfig {
        ServiceConfig::from_config(&self.config)
    }

    // --- Chat ---

    pub fn submit_chat(&mut self) {
        let message = self.chat_input.value().trim().to_string();
        if message.is_empty() || self.awaiting_reply {
            return;
        }
        self.chat_input = LineInput::new("");
        self.chat_items.push(ChatItem::User(message.clone()));

        self.turn += 1;
        services::spawn_chat_turn(
            self.tx.clone(),
            self.service_config(),
            self.history.clone(),
            message.clone(),
            self.turn,
        );
        self.history.push(ChatMessage {
            role: Role::User,
            content: message,
        });
        self.awaiting_reply = true;
    }

    // --- Service results ---

    pub fn on_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::ChatReply { turn, outcome } => self.on_chat_reply(turn, outcome),
            ServiceEvent::LessonResolved {
                generation,
                outcome,
            } => self.on_lesson_resolved(generation, outcome),
            ServiceEvent::CheckpointsGenerated {
                generation,
                video_id,
                checkpoints,
            } => self.apply_generated_checkpoints(generation, &video_id, checkpoints),
            ServiceEvent::GradeReturned {
                generation,
                outcome,
            } => {
                match self.grading.as_mut() {
                    Some(modal) if modal.session.generation == generation => {
                        modal.session.apply_verdict(outcome);
                    }
                    _ => debug!(generation, "dropping verdict for closed grading session"),
                }
            }
            ServiceEvent::PlayerLaunched {
                generation,
                payload,
                outcome,
            } => self.on_player_launched(generation, payload, outcome),
        }
    }

    fn on_chat_reply(
        &mut self,
        turn: u64,
        outcome: Result<ChatOutcome, services::ServiceError>,
    ) {
        if turn != self.turn {
            debug!(turn, current = self.turn, "dropping stale chat reply");
            return;
        }
        self.awaiting_reply = false;
        match outcome {
            Ok(ChatOutcome::Text(text)) => {
                self.history.push(ChatMessage {
                    role: Role::Model,
                    content: text.clone(),
                });
                self.chat_items.push(ChatItem::Model(text));
            }
            Ok(ChatOutcome::Video(video_data)) => {
                self.history.push(ChatMessage {
                    role: Role::Model,
                    content: VIDEO_EMBED_PLACEHOLDER.to_string(),
                });
                self.chat_items.push(ChatItem::VideoCard(video_data));
            }
            Ok(ChatOutcome::Lesson(slug)) => {
                // Resolution keeps the typing indicator on until the payload
                // or an error comes back.
                self.awaiting_reply = true;
                self.begin_lesson(&slug);
            }
            Err(err) => {
                warn!("chat turn failed: {err}");
                self.chat_items
                    .push(ChatItem::Model(CONNECTION_ERROR_TEXT.to_string()));
            }
        }
    }

    // --- Lesson orchestration ---

    fn begin_lesson(&mut self, topic_slug: &str) {
        self.lesson_generation += 1;
        services::spawn_lesson_resolution(
            self.tx.clone(),
            self.service_config(),
            self.curated.clone(),
            topic_slug.to_string(),
            self.lesson_generation,
        );
    }

    fn on_lesson_resolved(
        &mut self,
        generation: u64,
        outcome: Result<LessonPayload, services::ServiceError>,
    ) {
        if generation != self.lesson_generation {
            debug!(generation, "dropping stale lesson resolution");
            return;
        }
        match outcome {
            Ok(payload) => {
                // Launching can block for seconds while the stream resolves;
                // the typing indicator stays on until the player reports in.
                services::spawn_player_launch(
                    self.tx.clone(),
                    self.config.player_command.clone(),
                    payload,
                    self.lesson_generation,
                );
            }
            Err(err) => {
                self.awaiting_reply = false;
                self.chat_items.push(ChatItem::Model(format!(
                    "Sorry, I had trouble finding that lesson: {err}"
                )));
            }
        }
    }

    fn on_player_launched(
        &mut self,
        generation: u64,
        payload: LessonPayload,
        outcome: anyhow::Result<Box<dyn Player>>,
    ) {
        if generation != self.lesson_generation {
            // Dropping the box tears the session down off the event loop.
            debug!(generation, "dropping player for closed lesson");
            return;
        }
        self.awaiting_reply = false;
        match outcome {
            Ok(player) => {
                let confirmation = format!(
                    "Great! I've loaded the lesson: \"{}\". The player is now active. Let's start!",
                    payload.video_data.title
                );
                self.history.push(ChatMessage {
                    role: Role::Model,
                    content: confirmation.clone(),
                });
                self.chat_items.push(ChatItem::Model(confirmation));
                self.install_lesson(payload, player);
            }
            Err(err) => {
                warn!("player launch failed: {err:#}");
                self.chat_items.push(ChatItem::Notice(format!(
                    "Couldn't start the video player: {err}"
                )));
            }
        }
    }

    /// Wire a resolved payload and a running player into the live lesson
    /// slot: restore progress, derive the schedule, schedule the resume seek,
    /// and kick off background checkpoint generation for dynamic lessons.
    fn install_lesson(&mut self, payload: LessonPayload, player: Box<dyn Player>) {
        self.close_lesson();

        let video_id = payload.video_data.video_id.clone();
        let record = self.progress.load(&video_id);
        let completed = record.completed_checkpoint_ids;
        let derived = schedule::derive(&payload.checkpoints, &completed);

        let mut watcher = PlaybackWatcher::new(&video_id);
        watcher.begin(record.last_time_seconds);

        if payload.source == LessonSource::DynamicSearch && payload.checkpoints.is_empty() {
            services::spawn_checkpoint_generation(
                self.tx.clone(),
                self.service_config(),
                video_id,
                payload.video_data.title.clone(),
                self.lesson_generation,
            );
        }

        self.active_lesson = Some(ActiveLesson {
            payload,
            player,
            watcher,
            schedule: derived,
            completed,
            generation: self.lesson_generation,
            position: record.last_time_seconds,
            player_state: PlayerState::Loading,
        });
        self.last_lesson_tick = Instant::now();
    }

    /// Hot-swap reconciliation for background-generated checkpoints: the new
    /// list replaces the old wholesale and the schedule is re-derived, but
    /// the watcher's triggered set and the video identity are untouched.
    /// Stale generations, other videos and empty results are all ignored.
    pub fn apply_generated_checkpoints(
        &mut self,
        generation: u64,
        video_id: &str,
        checkpoints: Vec<Checkpoint>,
    ) {
        let Some(lesson) = self.active_lesson.as_mut() else {
            debug!("dropping generated checkpoints: no active lesson");
            return;
        };
        if lesson.generation != generation || lesson.payload.video_data.video_id != video_id {
            debug!(generation, "dropping generated checkpoints for stale lesson");
            return;
        }
        if checkpoints.is_empty() {
            debug!(video = video_id, "checkpoint generation came back empty; keeping lesson as-is");
            return;
        }
        lesson.payload.checkpoints = checkpoints;
        lesson.schedule = schedule::derive(&lesson.payload.checkpoints, &lesson.completed);
        self.chat_items.push(ChatItem::Notice(
            "Lesson plan generated! I've created a custom learning plan for this video.".to_string(),
        ));
    }

    pub fn close_lesson(&mut self) {
        if self.active_lesson.take().is_some() {
            // Invalidate any in-flight results tagged for the old lesson.
            self.lesson_generation += 1;
            self.grading = None;
        }
    }

    pub fn toggle_playback(&mut self) {
        let Some(lesson) = self.active_lesson.as_mut() else {
            return;
        };
        let result = match lesson.player.state() {
            PlayerState::Playing => lesson.player.pause(),
            _ => lesson.player.play(),
        };
        if let Err(err) = result {
            warn!("playback toggle failed: {err:#}");
        }
    }

    /// Called on every event-loop tick (100ms); does lesson work at a
    /// 1-second cadence.
    pub fn tick(&mut self) {
        if self.active_lesson.is_none() {
            return;
        }
        if self.last_lesson_tick.elapsed() < LESSON_TICK_INTERVAL {
            return;
        }
        self.last_lesson_tick = Instant::now();
        self.lesson_tick();
    }

    fn lesson_tick(&mut self) {
        let Some(lesson) = self.active_lesson.as_mut() else {
            return;
        };
        // While the checkpoint modal is up the player is paused; skip
        // sampling so the watcher stays idle.
        if self.grading.is_some() {
            return;
        }

        let state = lesson.player.state();
        lesson.player_state = state;
        lesson.watcher.sync_player_state(state);

        let events = lesson
            .watcher
            .tick(lesson.player.as_mut(), &lesson.schedule);
        for event in events {
            match event {
                WatcherEvent::TimeUpdate(seconds) => {
                    lesson.position = seconds;
                    self.progress
                        .save_time(&lesson.payload.video_data.video_id, seconds);
                }
                WatcherEvent::CheckpointReached(checkpoint) => {
                    debug!(checkpoint = %checkpoint.id, "checkpoint reached");
                    self.grading_tag += 1;
                    self.grading = Some(GradingModal::new(GradingSession::new(
                        checkpoint,
                        self.grading_tag,
                    )));
                }
            }
        }
    }

    // --- Grading ---

    pub fn submit_grading(&mut self) {
        let cfg = self.service_config();
        let tx = self.tx.clone();
        let Some(modal) = self.grading.as_mut() else {
            return;
        };
        let answer = modal.answer.value().to_string();
        let link = modal.link.value().to_string();
        if let Some(request) = modal.session.begin_submit(&answer, &link) {
            services::spawn_grading(tx, cfg, request, modal.session.generation);
        }
    }

    pub fn retry_grading(&mut self) {
        if let Some(modal) = self.grading.as_mut() {
            modal.session.try_again();
        }
    }

    /// Close the modal. A passed session marks the checkpoint complete,
    /// re-derives the schedule and resumes playback; anything else just
    /// dismisses (the video stays paused, Ctrl+P resumes).
    pub fn close_grading(&mut self) {
        let Some(modal) = self.grading.take() else {
            return;
        };
        if modal.session.state() != GradingState::Passed {
            return;
        }
        let checkpoint_id = modal.session.checkpoint.id.clone();
        if let Some(lesson) = self.active_lesson.as_mut() {
            let video_id = lesson.payload.video_data.video_id.clone();
            self.progress.mark_completed(&video_id, &checkpoint_id);
            lesson.completed.insert(checkpoint_id);
            lesson.schedule = schedule::derive(&lesson.payload.checkpoints, &lesson.completed);
            if let Err(err) = lesson.player.play() {
                warn!("resume after checkpoint failed: {err:#}");
            }
            self.chat_items.push(ChatItem::Notice(
                "Checkpoint cleared! Great job, let's continue.".to_string(),
            ));
        }
    }
}
