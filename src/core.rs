use crate::backend::Backend;
use crate::library::Catalog;
use crate::model::{PlaybackMode, PlayerStatus};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// A permutation of catalog indices and the position currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleOrder {
    order: Vec<usize>,
    pos: usize,
}

impl ShuffleOrder {
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn current(&self) -> Option<usize> {
        self.order.get(self.pos).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Playing(usize),
    NoMoreTracks,
    Unchanged,
}

pub struct PlayerState {
    is_playing: bool,
    is_paused: bool,
    autoplay: bool,
    shuffle: Option<ShuffleOrder>,
    current_index: Option<usize>,
    rng: SmallRng,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self::with_rng(rand::make_rng::<SmallRng>())
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            autoplay: false,
            shuffle: None,
            current_index: None,
            rng,
        }
    }

    pub fn status(&self) -> PlayerStatus {
        match (self.is_playing, self.is_paused) {
            (false, _) => PlayerStatus::Idle,
            (true, false) => PlayerStatus::Playing,
            (true, true) => PlayerStatus::Paused,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode::resolve(self.shuffle.is_some(), self.autoplay)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn shuffle(&self) -> Option<&ShuffleOrder> {
        self.shuffle.as_ref()
    }

    /// Loads `index` and starts playing it. An index past the end of the
    /// catalog stops playback instead. Indices are unsigned, so callers
    /// stepping backwards clamp at 0 with `saturating_sub`.
    pub fn play_at(
        &mut self,
        index: usize,
        catalog: &Catalog,
        backend: &mut dyn Backend,
    ) -> PlayerStatus {
        let Some(track) = catalog.get(index) else {
            debug!(index, len = catalog.len(), "index past the end, stopping");
            self.stop();
            return self.status();
        };

        backend.load(&track.location);
        self.current_index = Some(index);
        self.is_playing = true;
        self.is_paused = false;
        self.status()
    }

    /// Sent even while idle; the engine ignores a pause toggle with nothing loaded.
    pub fn toggle_pause(&mut self, backend: &mut dyn Backend) {
        self.is_paused = !self.is_paused;
        backend.toggle_pause();
    }

    pub fn toggle_autoplay(&mut self) -> bool {
        self.autoplay = !self.autoplay;
        self.autoplay
    }

    /// Draws a fresh permutation of `0..len` and returns the index to play
    /// first. An empty catalog leaves shuffle mode off.
    pub fn enter_shuffle(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            self.shuffle = None;
            return None;
        }

        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        let shuffle = ShuffleOrder { order, pos: 0 };
        let first = shuffle.current();
        self.shuffle = Some(shuffle);
        first
    }

    /// Applies the end-of-track policy after the engine reports a natural end.
    pub fn advance_for_eof(&mut self, catalog: &Catalog, backend: &mut dyn Backend) -> PlayerStatus {
        match self.mode() {
            PlaybackMode::Shuffle => {
                let next = self.shuffle.as_mut().and_then(|shuffle| {
                    shuffle.pos += 1;
                    shuffle.current()
                });
                match next {
                    Some(index) => self.play_at(index, catalog, backend),
                    None => {
                        self.shuffle = None;
                        self.autoplay = false;
                        self.stop();
                        self.status()
                    }
                }
            }
            PlaybackMode::Autoplay => match self.current_index {
                Some(current) => self.play_at(current + 1, catalog, backend),
                None => {
                    self.stop();
                    self.status()
                }
            },
            PlaybackMode::Manual => {
                self.is_playing = false;
                self.status()
            }
        }
    }

    pub fn next(&mut self, catalog: &Catalog, backend: &mut dyn Backend) -> Skip {
        let candidate = match self.shuffle.as_mut() {
            Some(shuffle) => {
                if shuffle.pos + 1 >= shuffle.len() {
                    return Skip::NoMoreTracks;
                }
                shuffle.pos += 1;
                shuffle.current()
            }
            None => match self.current_index {
                Some(current) if current + 1 < catalog.len() => Some(current + 1),
                Some(_) => return Skip::NoMoreTracks,
                None if catalog.is_empty() => return Skip::NoMoreTracks,
                None => Some(0),
            },
        };

        match candidate {
            Some(index) => {
                self.play_at(index, catalog, backend);
                Skip::Playing(index)
            }
            None => Skip::Unchanged,
        }
    }

    pub fn prev(&mut self, catalog: &Catalog, backend: &mut dyn Backend) -> Skip {
        let candidate = match self.shuffle.as_mut() {
            Some(shuffle) => {
                shuffle.pos = shuffle.pos.saturating_sub(1);
                shuffle.current()
            }
            None => self.current_index.map(|current| current.saturating_sub(1)),
        };

        match candidate {
            Some(index) if index < catalog.len() => {
                self.play_at(index, catalog, backend);
                Skip::Playing(index)
            }
            _ => Skip::Unchanged,
        }
    }

    fn stop(&mut self) {
        self.is_playing = false;
        self.is_paused = false;
    }
}
