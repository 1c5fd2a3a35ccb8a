use super::protocol::{Command as Wire, LineBuffer, Notification};
use super::{Backend, TrackEvent};
use crate::config::BackendSettings;
use crate::error::BackendError;
use std::fs;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 4096;
const REAP_TIMEOUT: Duration = Duration::from_millis(500);
const REAP_POLL: Duration = Duration::from_millis(10);

struct Channel {
    stream: UnixStream,
    buffer: LineBuffer,
    /// Encoded commands the non-blocking socket has not taken yet.
    outbox: Vec<u8>,
}

impl Channel {
    fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            buffer: LineBuffer::default(),
            outbox: Vec::new(),
        }
    }

    /// Writes as much of the outbox as the socket accepts without blocking.
    fn flush(&mut self) -> io::Result<()> {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(written) => {
                    self.outbox.drain(..written);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

pub struct MpvBackend {
    child: Option<Child>,
    channel: Option<Channel>,
    socket_path: Option<PathBuf>,
}

impl MpvBackend {
    /// Launches the engine in idle mode and connects to its IPC socket.
    pub fn start(settings: &BackendSettings) -> Result<Self, BackendError> {
        let socket = settings.socket_path.clone();
        remove_stale_socket(&socket);

        let child = Command::new(&settings.executable)
            .arg(format!("--input-ipc-server={}", socket.display()))
            .arg("--idle")
            .arg("--no-terminal")
            .args(&settings.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BackendError::Launch {
                executable: settings.executable.clone(),
                source,
            })?;
        info!(
            pid = child.id(),
            executable = %settings.executable.display(),
            socket = %socket.display(),
            "playback engine spawned"
        );

        // Dropping `backend` on any error below kills the engine again.
        let mut backend = Self {
            child: Some(child),
            channel: None,
            socket_path: Some(socket.clone()),
        };

        let timeout = settings.startup_timeout();
        let interval = settings.retry_interval();
        backend.wait_for_endpoint(&socket, timeout, interval)?;
        let stream = backend.connect(&socket, timeout, interval)?;
        stream
            .set_nonblocking(true)
            .map_err(|source| BackendError::ConnectTimeout {
                socket: socket.clone(),
                timeout,
                source,
            })?;

        backend.channel = Some(Channel::new(stream));
        info!("connected to playback engine");
        Ok(backend)
    }

    fn wait_for_endpoint(
        &mut self,
        socket: &Path,
        timeout: Duration,
        interval: Duration,
    ) -> Result<(), BackendError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.check_alive()?;
            if socket.exists() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BackendError::EndpointTimeout {
                    socket: socket.to_path_buf(),
                    timeout,
                });
            }
            thread::sleep(interval);
        }
    }

    fn connect(
        &mut self,
        socket: &Path,
        timeout: Duration,
        interval: Duration,
    ) -> Result<UnixStream, BackendError> {
        let deadline = Instant::now() + timeout;
        loop {
            match UnixStream::connect(socket) {
                Ok(stream) => return Ok(stream),
                Err(source) if Instant::now() >= deadline => {
                    return Err(BackendError::ConnectTimeout {
                        socket: socket.to_path_buf(),
                        timeout,
                        source,
                    });
                }
                Err(err) => debug!(error = %err, "engine socket not accepting yet"),
            }
            self.check_alive()?;
            thread::sleep(interval);
        }
    }

    fn check_alive(&mut self) -> Result<(), BackendError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                Err(BackendError::ExitedEarly { status })
            }
            Ok(None) => Ok(()),
            Err(err) => {
                debug!(error = %err, "unable to query engine status");
                Ok(())
            }
        }
    }

    fn send(&mut self, command: Wire<'_>) {
        let Some(channel) = self.channel.as_mut() else {
            debug!(?command, "engine disconnected, dropping command");
            return;
        };
        channel.outbox.extend_from_slice(command.encode().as_bytes());
        if let Err(err) = channel.flush() {
            // Degrades on the next poll.
            warn!(error = %err, ?command, "failed to send command to engine");
        }
    }

    fn degrade(&mut self, source: io::Error) -> BackendError {
        self.channel = None;
        warn!(error = %source, "playback engine channel lost");
        BackendError::ChannelDegraded { source }
    }

    /// Wraps an already connected socket, with no engine process behind it.
    #[cfg(test)]
    pub(crate) fn from_stream(stream: UnixStream) -> Self {
        stream.set_nonblocking(true).expect("nonblocking");
        Self {
            child: None,
            channel: Some(Channel::new(stream)),
            socket_path: None,
        }
    }
}

impl Backend for MpvBackend {
    fn load(&mut self, location: &Path) {
        self.send(Wire::Load(location));
    }

    fn toggle_pause(&mut self) {
        self.send(Wire::TogglePause);
    }

    fn seek(&mut self, delta_seconds: i32) {
        self.send(Wire::Seek(delta_seconds));
    }

    fn set_volume(&mut self, delta_percent: i32) {
        self.send(Wire::AddVolume(delta_percent));
    }

    fn poll_notification(&mut self) -> Result<TrackEvent, BackendError> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(TrackEvent::NoEvent);
        };
        if let Err(err) = channel.flush() {
            return Err(self.degrade(err));
        }

        let mut chunk = [0u8; READ_CHUNK];
        match channel.stream.read(&mut chunk) {
            Ok(0) => Err(self.degrade(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "engine closed its socket",
            ))),
            Ok(read) => Ok(classify(&channel.buffer.push(&chunk[..read]))),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(TrackEvent::NoEvent)
            }
            Err(err) => Err(self.degrade(err)),
        }
    }

    fn notification_fd(&self) -> Option<RawFd> {
        self.channel
            .as_ref()
            .map(|channel| channel.stream.as_raw_fd())
    }

    fn terminate(&mut self) {
        self.channel = None;
        if let Some(mut child) = self.child.take() {
            stop_child(&mut child);
        }
        if let Some(socket) = self.socket_path.take() {
            remove_stale_socket(&socket);
        }
    }
}

impl Drop for MpvBackend {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn classify(notifications: &[Notification]) -> TrackEvent {
    let mut event = TrackEvent::NoEvent;
    for notification in notifications {
        debug!(?notification, "engine notification");
        if notification.is_natural_end() {
            event = TrackEvent::TrackFinishedNaturally;
        }
    }
    event
}

fn stop_child(child: &mut Child) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(%status, "engine already exited");
        return;
    }

    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: the child has not been reaped, so the pid still names it.
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
        let deadline = Instant::now() + REAP_TIMEOUT;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(%status, "playback engine stopped");
                    return;
                }
                Ok(None) => thread::sleep(REAP_POLL),
                Err(_) => break,
            }
        }
    }

    warn!("playback engine ignored SIGTERM, killing it");
    if let Err(err) = child.kill() {
        debug!(error = %err, "kill failed");
    }
    let _ = child.wait();
}

fn remove_stale_socket(path: &Path) {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            if let Err(err) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %err, "unable to remove socket");
            }
        }
        Ok(_) => warn!(path = %path.display(), "socket path exists and is not a socket"),
        Err(_) => {}
    }
}
