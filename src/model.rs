use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Manual,
    Autoplay,
    Shuffle,
}

impl PlaybackMode {
    /// Shuffle wins over autoplay, autoplay over manual.
    pub fn resolve(shuffle: bool, autoplay: bool) -> Self {
        if shuffle {
            Self::Shuffle
        } else if autoplay {
            Self::Autoplay
        } else {
            Self::Manual
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Autoplay => "autoplay",
            Self::Shuffle => "shuffle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub location: PathBuf,
}

impl Track {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}
