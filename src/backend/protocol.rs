use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::warn;

const END_FILE: &str = "end-file";
const REASON_EOF: &str = "eof";
/// Longest partial line kept while waiting for its newline.
pub const MAX_PENDING: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Load(&'a Path),
    TogglePause,
    Seek(i32),
    AddVolume(i32),
}

impl Command<'_> {
    /// Newline-terminated JSON lines understood by mpv's IPC server.
    pub fn encode(&self) -> String {
        let lines = match self {
            Self::Load(location) => vec![
                json!({ "command": ["loadfile", location.to_string_lossy(), "replace"] }),
                json!({ "command": ["set_property", "pause", false] }),
            ],
            Self::TogglePause => vec![json!({ "command": ["cycle", "pause"] })],
            Self::Seek(seconds) => vec![json!({ "command": ["seek", seconds, "relative"] })],
            Self::AddVolume(percent) => vec![json!({ "command": ["add", "volume", percent] })],
        };

        let mut out = String::new();
        for line in lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EndFile { reason: String },
    Other { event: String },
    Reply,
}

impl Notification {
    pub fn parse(line: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Raw {
            event: Option<String>,
            reason: Option<String>,
        }

        let raw: Raw = serde_json::from_str(line).ok()?;
        Some(match raw.event {
            Some(event) if event == END_FILE => Self::EndFile {
                reason: raw.reason.unwrap_or_default(),
            },
            Some(event) => Self::Other { event },
            None => Self::Reply,
        })
    }

    pub fn is_natural_end(&self) -> bool {
        matches!(self, Self::EndFile { reason } if reason == REASON_EOF)
    }
}

/// Reassembles newline-delimited messages from arbitrary read chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Notification> {
        self.pending.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if let Some(notification) = Notification::parse(text) {
                out.push(notification);
            }
        }

        if self.pending.len() > MAX_PENDING {
            warn!(bytes = self.pending.len(), "discarding unterminated engine output");
            self.pending.clear();
        }
        out
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
