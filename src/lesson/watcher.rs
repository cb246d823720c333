use std::collections::HashSet;

use tracing::warn;

use crate::lesson::Checkpoint;
use crate::player::{Player, PlayerState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Watching,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatcherEvent {
    /// Sampled playhead position, reported once per tick while watching.
    TimeUpdate(u32),
    /// Fired at most once per checkpoint id per playback session. The player
    /// has already been paused when this is emitted.
    CheckpointReached(Checkpoint),
}

/// Polls the player position while it is playing and fires the next
/// untriggered checkpoint crossing. The triggered set is transient: it
/// survives checkpoint-list hot swaps but resets when the video identity
/// changes. Distinct from the persisted completed set, which survives
/// fail/skip and reload.
pub struct PlaybackWatcher {
    video_id: String,
    state: WatcherState,
    triggered: HashSet<String>,
    pending_resume: Option<u32>,
}

impl PlaybackWatcher {
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            state: WatcherState::Idle,
            triggered: HashSet::new(),
            pending_resume: None,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn has_triggered(&self, checkpoint_id: &str) -> bool {
        self.triggered.contains(checkpoint_id)
    }

    /// Record a saved resume position. The seek is applied on the first
    /// watching tick, once the player has a loaded stream to seek in; a
    /// seek issued while the stream is still resolving would be rejected.
    pub fn begin(&mut self, resume_time: u32) {
        self.pending_resume = (resume_time > 0).then_some(resume_time);
    }

    /// Follow player state transitions: playing starts the watch, anything
    /// else (paused, ended, still loading) stops it.
    pub fn sync_player_state(&mut self, player_state: PlayerState) {
        self.state = match player_state {
            PlayerState::Playing => WatcherState::Watching,
            _ => WatcherState::Idle,
        };
    }

    /// Switch to a different video. A changed identity discards the
    /// triggered set and any in-progress watching.
    pub fn set_video(&mut self, video_id: &str) {
        if self.video_id != video_id {
            self.video_id = video_id.to_string();
            self.triggered.clear();
            self.pending_resume = None;
            self.state = WatcherState::Idle;
        }
    }

    /// One 1-second poll: report the position and fire the first schedule
    /// entry whose time has been crossed. `schedule` is the derived view
    /// (ascending, completed excluded); the watcher always targets its first
    /// untriggered entry, so checkpoints can never fire out of order.
    pub fn tick(&mut self, player: &mut dyn Player, schedule: &[Checkpoint]) -> Vec<WatcherEvent> {
        if self.state != WatcherState::Watching {
            return Vec::new();
        }
        if let Some(resume) = self.pending_resume.take() {
            if let Err(err) = player.seek(resume) {
                warn!("resume seek failed: {err:#}");
            }
            // Report the resume point; sampling starts next tick so the
            // seek can land first.
            return vec![WatcherEvent::TimeUpdate(resume)];
        }
        let Some(position) = player.current_position() else {
            return Vec::new();
        };

        let mut events = vec![WatcherEvent::TimeUpdate(position)];

        let next = schedule.iter().find(|cp| !self.triggered.contains(&cp.id));
        if let Some(cp) = next {
            if position >= cp.time_seconds {
                if let Err(err) = player.pause() {
                    warn!(checkpoint = %cp.id, "failed to pause player: {err:#}");
                }
                self.state = WatcherState::Idle;
                self.triggered.insert(cp.id.clone());
                events.push(WatcherEvent::CheckpointReached(cp.clone()));
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::CheckpointType;
    use anyhow::Result;

    /// Scripted player: positions are consumed one per tick.
    struct FakePlayer {
        positions: Vec<u32>,
        cursor: usize,
        state: PlayerState,
        pause_calls: u32,
        seeked_to: Option<u32>,
    }

    impl FakePlayer {
        fn playing(positions: Vec<u32>) -> Self {
            Self {
                positions,
                cursor: 0,
                state: PlayerState::Playing,
                pause_calls: 0,
                seeked_to: None,
            }
        }
    }

    impl Player for FakePlayer {
        fn play(&mut self) -> Result<()> {
            self.state = PlayerState::Playing;
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.state = PlayerState::Paused;
            self.pause_calls += 1;
            Ok(())
        }

        fn seek(&mut self, seconds: u32) -> Result<()> {
            self.seeked_to = Some(seconds);
            Ok(())
        }

        fn current_position(&mut self) -> Option<u32> {
            let pos = self.positions.get(self.cursor).copied();
            if pos.is_some() {
                self.cursor += 1;
            }
            pos
        }

        fn state(&mut self) -> PlayerState {
            self.state
        }
    }

    fn cp(id: &str, time: u32) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            video_id: "vid".to_string(),
            time_seconds: time,
            kind: CheckpointType::Quiz,
            topic: String::new(),
            question: String::new(),
        }
    }

    fn fired(events: &[WatcherEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                WatcherEvent::CheckpointReached(cp) => Some(cp.id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn positions_crossing_checkpoints_fire_once_each_in_order() {
        // Schedule a@10, b@30; positions 5, 12, 20, 31.
        let schedule = vec![cp("a", 10), cp("b", 30)];
        let mut player = FakePlayer::playing(vec![5, 12, 20, 31]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Playing);

        let mut all_fired = Vec::new();
        for _ in 0..4 {
            let events = watcher.tick(&mut player, &schedule);
            all_fired.extend(fired(&events));
            // Firing pauses; the owner resumes after the checkpoint passes.
            watcher.sync_player_state(PlayerState::Playing);
        }

        assert_eq!(all_fired, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(player.pause_calls, 2);
    }

    #[test]
    fn never_refires_after_resume_past_checkpoint() {
        let schedule = vec![cp("a", 10)];
        let mut player = FakePlayer::playing(vec![12, 15, 20]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Playing);

        let first = watcher.tick(&mut player, &schedule);
        assert_eq!(fired(&first), vec!["a".to_string()]);

        // Resumed playback keeps sampling positions beyond the checkpoint.
        watcher.sync_player_state(PlayerState::Playing);
        for _ in 0..2 {
            let events = watcher.tick(&mut player, &schedule);
            assert!(fired(&events).is_empty());
        }
    }

    #[test]
    fn time_updates_reported_every_watching_tick() {
        let schedule: Vec<Checkpoint> = Vec::new();
        let mut player = FakePlayer::playing(vec![1, 2, 3]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Playing);

        let mut times = Vec::new();
        for _ in 0..3 {
            for event in watcher.tick(&mut player, &schedule) {
                if let WatcherEvent::TimeUpdate(t) = event {
                    times.push(t);
                }
            }
        }
        assert_eq!(times, vec![1, 2, 3]);
    }

    #[test]
    fn idle_watcher_does_nothing() {
        let schedule = vec![cp("a", 0)];
        let mut player = FakePlayer::playing(vec![5]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Paused);

        assert!(watcher.tick(&mut player, &schedule).is_empty());
        assert_eq!(player.pause_calls, 0);
    }

    #[test]
    fn hot_swapped_schedule_does_not_reset_triggered() {
        let mut player = FakePlayer::playing(vec![12, 13]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Playing);

        let events = watcher.tick(&mut player, &[cp("a", 10)]);
        assert_eq!(fired(&events), vec!["a".to_string()]);

        // The list is extended in place; "a" stays triggered.
        watcher.sync_player_state(PlayerState::Playing);
        let extended = vec![cp("a", 10), cp("b", 300)];
        let events = watcher.tick(&mut player, &extended);
        assert!(fired(&events).is_empty());
        assert!(watcher.has_triggered("a"));
    }

    #[test]
    fn video_identity_change_resets_triggered_and_goes_idle() {
        let mut player = FakePlayer::playing(vec![12]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Playing);
        watcher.tick(&mut player, &[cp("a", 10)]);
        assert!(watcher.has_triggered("a"));

        watcher.set_video("other");
        assert!(!watcher.has_triggered("a"));
        assert_eq!(watcher.state(), WatcherState::Idle);

        // Same id is a no-op.
        watcher.sync_player_state(PlayerState::Playing);
        watcher.set_video("other");
        assert_eq!(watcher.state(), WatcherState::Watching);
    }

    #[test]
    fn resume_seek_waits_for_first_watching_tick() {
        let schedule: Vec<Checkpoint> = Vec::new();
        let mut player = FakePlayer::playing(vec![205]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.begin(200);

        // Still loading: no tick runs, so no seek is issued yet.
        watcher.sync_player_state(PlayerState::Loading);
        assert!(watcher.tick(&mut player, &schedule).is_empty());
        assert_eq!(player.seeked_to, None);

        // First watching tick applies the seek and reports the resume point.
        watcher.sync_player_state(PlayerState::Playing);
        let events = watcher.tick(&mut player, &schedule);
        assert_eq!(player.seeked_to, Some(200));
        assert_eq!(events, vec![WatcherEvent::TimeUpdate(200)]);

        // Sampling resumes on the next tick.
        let events = watcher.tick(&mut player, &schedule);
        assert_eq!(events, vec![WatcherEvent::TimeUpdate(205)]);
    }

    #[test]
    fn zero_resume_time_schedules_no_seek() {
        let schedule: Vec<Checkpoint> = Vec::new();
        let mut player = FakePlayer::playing(vec![1]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.begin(0);

        watcher.sync_player_state(PlayerState::Playing);
        let events = watcher.tick(&mut player, &schedule);
        assert_eq!(player.seeked_to, None);
        assert_eq!(events, vec![WatcherEvent::TimeUpdate(1)]);
    }

    #[test]
    fn pending_resume_cleared_on_video_change() {
        let schedule: Vec<Checkpoint> = Vec::new();
        let mut player = FakePlayer::playing(vec![3]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.begin(90);

        watcher.set_video("other");
        watcher.sync_player_state(PlayerState::Playing);
        let events = watcher.tick(&mut player, &schedule);
        assert_eq!(player.seeked_to, None);
        assert_eq!(events, vec![WatcherEvent::TimeUpdate(3)]);
    }

    #[test]
    fn missing_position_is_skipped_without_events() {
        let schedule = vec![cp("a", 0)];
        let mut player = FakePlayer::playing(vec![]);
        let mut watcher = PlaybackWatcher::new("vid");
        watcher.sync_player_state(PlayerState::Playing);
        assert!(watcher.tick(&mut player, &schedule).is_empty());
    }
}
