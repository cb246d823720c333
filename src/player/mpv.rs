use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::player::{Player, PlayerState};

#[cfg(not(test))]
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
#[cfg(test)]
const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// External mpv process driven over its JSON IPC socket. mpv resolves the
/// YouTube URL itself (via yt-dlp), so this side only issues property and
/// seek commands.
pub struct MpvPlayer {
    child: Child,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    socket_path: PathBuf,
    request_id: u64,
}

impl MpvPlayer {
    pub fn launch(player_command: &str, video_id: &str) -> Result<Self> {
        let socket_path = std::env::temp_dir().join(format!(
            "mentor-mpv-{}-{}.sock",
            std::process::id(),
            video_id
        ));
        let _ = std::fs::remove_file(&socket_path);

        let url = format!("https://www.youtube.com/watch?v={video_id}");
        let mut child = Command::new(player_command)
            .arg("--no-terminal")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--force-window=yes")
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("could not launch player command '{player_command}'"))?;

        let (stream, writer) = match Self::open_ipc(&socket_path) {
            Ok(pair) => pair,
            Err(err) => {
                // Self was never built, so Drop will not reap the child.
                let _ = child.kill();
                let _ = child.wait();
                let _ = std::fs::remove_file(&socket_path);
                return Err(err);
            }
        };
        debug!(video = video_id, socket = %socket_path.display(), "player launched");

        Ok(Self {
            child,
            reader: BufReader::new(stream),
            writer,
            socket_path,
            request_id: 0,
        })
    }

    fn open_ipc(socket_path: &Path) -> Result<(UnixStream, UnixStream)> {
        let stream = Self::connect(socket_path)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        let writer = stream.try_clone()?;
        Ok((stream, writer))
    }

    /// The socket appears only once mpv has started up; poll until it
    /// accepts a connection.
    fn connect(socket_path: &Path) -> Result<UnixStream> {
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        loop {
            match UnixStream::connect(socket_path) {
                Ok(stream) => return Ok(stream),
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(err) => {
                    bail!("player IPC socket never came up: {err}");
                }
            }
        }
    }

    /// Issue one IPC command and wait for its tagged response, skipping any
    /// asynchronous event lines interleaved on the socket.
    fn command(&mut self, args: Value) -> Result<Value> {
        self.request_id += 1;
        let request_id = self.request_id;
        let request = json!({ "command": args, "request_id": request_id });

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut buf = String::new();
        while Instant::now() < deadline {
            buf.clear();
            match self.reader.read_line(&mut buf) {
                Ok(0) => bail!("player IPC socket closed"),
                Ok(_) => {
                    let Ok(reply) = serde_json::from_str::<Value>(&buf) else {
                        continue;
                    };
                    if reply.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                        continue;
                    }
                    if reply.get("error").and_then(Value::as_str) != Some("success") {
                        bail!("player rejected command: {}", buf.trim());
                    }
                    return Ok(reply.get("data").cloned().unwrap_or(Value::Null));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(err) => return Err(err.into()),
            }
        }
        bail!("player did not answer in time");
    }

    fn get_property(&mut self, name: &str) -> Result<Value> {
        self.command(json!(["get_property", name]))
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.command(json!(["set_property", name, value]))?;
        Ok(())
    }
}

impl Player for MpvPlayer {
    fn play(&mut self) -> Result<()> {
        self.set_property("pause", json!(false))
    }

    fn pause(&mut self) -> Result<()> {
        self.set_property("pause", json!(true))
    }

    fn seek(&mut self, seconds: u32) -> Result<()> {
        self.command(json!(["seek", seconds, "absolute"]))?;
        Ok(())
    }

    fn current_position(&mut self) -> Option<u32> {
        match self.get_property("time-pos") {
            Ok(value) => value.as_f64().map(|secs| secs.max(0.0) as u32),
            Err(_) => None,
        }
    }

    fn state(&mut self) -> PlayerState {
        if let Ok(Some(true)) = self.get_property("eof-reached").map(|v| v.as_bool()) {
            return PlayerState::Ended;
        }
        match self.get_property("pause").map(|v| v.as_bool()) {
            Ok(Some(true)) => PlayerState::Paused,
            Ok(Some(false)) => {
                // No playhead yet means mpv is still resolving the stream.
                if self.current_position().is_some() {
                    PlayerState::Playing
                } else {
                    PlayerState::Loading
                }
            }
            _ => PlayerState::Loading,
        }
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        if self.command(json!(["quit"])).is_err() {
            if let Err(err) = self.child.kill() {
                warn!("could not stop player process: {err}");
            }
        }
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
