#[cfg(unix)]
pub mod mpv;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tracing::{debug, warn};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
const COMMAND_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Narrow surface the playback watcher needs from a video player. The
/// production implementation drives an external mpv process; tests drive a
/// scripted fake.
pub trait Player: Send {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn seek(&mut self, seconds: u32) -> Result<()>;
    /// Current playhead in whole seconds (floor of continuous time), or None
    /// while the player has no position yet.
    fn current_position(&mut self) -> Option<u32>;
    fn state(&mut self) -> PlayerState;
}

enum PlayerCommand {
    Play,
    Pause,
    Seek(u32),
}

#[derive(Clone, Copy)]
struct PlayerSnapshot {
    state: PlayerState,
    position: Option<u32>,
}

/// Front half of a player session. Commands go down a channel to a worker
/// thread that owns the real player; observed state comes back through a
/// shared snapshot, so reads never touch the player's IPC from the caller's
/// thread.
pub struct PlayerHandle {
    commands: Sender<PlayerCommand>,
    snapshot: Arc<Mutex<PlayerSnapshot>>,
}

impl PlayerHandle {
    pub fn spawn(backend: Box<dyn Player>) -> Self {
        let (commands, rx) = mpsc::channel();
        let snapshot = Arc::new(Mutex::new(PlayerSnapshot {
            state: PlayerState::Loading,
            position: None,
        }));
        let shared = Arc::clone(&snapshot);
        thread::spawn(move || run_session(backend, rx, shared));
        Self { commands, snapshot }
    }

    fn read(&self) -> PlayerSnapshot {
        self.snapshot.lock().map(|s| *s).unwrap_or(PlayerSnapshot {
            state: PlayerState::Loading,
            position: None,
        })
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("player session has ended"))
    }
}

impl Player for PlayerHandle {
    fn play(&mut self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    fn seek(&mut self, seconds: u32) -> Result<()> {
        self.send(PlayerCommand::Seek(seconds))
    }

    fn current_position(&mut self) -> Option<u32> {
        self.read().position
    }

    fn state(&mut self) -> PlayerState {
        self.read().state
    }
}

/// Session worker: execute queued commands against the real player and keep
/// the shared snapshot fresh. Exits when the handle is dropped, which drops
/// the backend and with it the external process.
fn run_session(
    mut backend: Box<dyn Player>,
    commands: Receiver<PlayerCommand>,
    shared: Arc<Mutex<PlayerSnapshot>>,
) {
    let mut next_sample = Instant::now();
    loop {
        match commands.recv_timeout(COMMAND_POLL) {
            Ok(command) => {
                let result = match command {
                    PlayerCommand::Play => backend.play(),
                    PlayerCommand::Pause => backend.pause(),
                    PlayerCommand::Seek(seconds) => backend.seek(seconds),
                };
                if let Err(err) = result {
                    warn!("player command failed: {err:#}");
                }
                // Resample right away so the snapshot reflects the command.
                next_sample = Instant::now();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("player session closing");
                return;
            }
        }
        if Instant::now() >= next_sample {
            let state = backend.state();
            let position = backend.current_position();
            if let Ok(mut snapshot) = shared.lock() {
                *snapshot = PlayerSnapshot { state, position };
            }
            next_sample = Instant::now() + SAMPLE_INTERVAL;
        }
    }
}

#[cfg(unix)]
fn native_player(player_command: &str, video_id: &str) -> Result<Box<dyn Player>> {
    Ok(Box::new(mpv::MpvPlayer::launch(player_command, video_id)?))
}

#[cfg(not(unix))]
fn native_player(_player_command: &str, _video_id: &str) -> Result<Box<dyn Player>> {
    anyhow::bail!("no video player backend on this platform")
}

/// Launch the external player and wrap it in a worker-thread session, so
/// IPC round trips never run on the caller's thread.
pub fn launch_session(player_command: &str, video_id: &str) -> Result<Box<dyn Player>> {
    let backend = native_player(player_command, video_id)?;
    Ok(Box::new(PlayerHandle::spawn(backend)))
}
