pub mod mpv;
pub mod protocol;

use crate::error::BackendError;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

pub use mpv::MpvBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    NoEvent,
    TrackFinishedNaturally,
}

/// Control channel to the playback engine. Commands are fire-and-forget;
/// the caller's state is authoritative.
pub trait Backend {
    fn load(&mut self, location: &Path);
    fn toggle_pause(&mut self);
    fn seek(&mut self, delta_seconds: i32);
    fn set_volume(&mut self, delta_percent: i32);
    /// Single read of whatever the channel has buffered.
    fn poll_notification(&mut self) -> Result<TrackEvent, BackendError>;
    /// Descriptor to wait on, or `None` once the channel is gone.
    fn notification_fd(&self) -> Option<RawFd>;
    fn terminate(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Load(PathBuf),
    TogglePause,
    Seek(i32),
    Volume(i32),
}

/// In-memory backend: records every command and hands out queued events.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub sent: Vec<Sent>,
    pub pending: VecDeque<Result<TrackEvent, BackendError>>,
    pub terminated: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: TrackEvent) {
        self.pending.push_back(Ok(event));
    }

    pub fn push_error(&mut self, err: BackendError) {
        self.pending.push_back(Err(err));
    }

    pub fn loads(&self) -> Vec<&Path> {
        self.sent
            .iter()
            .filter_map(|sent| match sent {
                Sent::Load(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl Backend for RecordingBackend {
    fn load(&mut self, location: &Path) {
        self.sent.push(Sent::Load(location.to_path_buf()));
    }

    fn toggle_pause(&mut self) {
        self.sent.push(Sent::TogglePause);
    }

    fn seek(&mut self, delta_seconds: i32) {
        self.sent.push(Sent::Seek(delta_seconds));
    }

    fn set_volume(&mut self, delta_percent: i32) {
        self.sent.push(Sent::Volume(delta_percent));
    }

    fn poll_notification(&mut self) -> Result<TrackEvent, BackendError> {
        self.pending.pop_front().unwrap_or(Ok(TrackEvent::NoEvent))
    }

    fn notification_fd(&self) -> Option<RawFd> {
        None
    }

    fn terminate(&mut self) {
        self.terminated += 1;
    }
}
