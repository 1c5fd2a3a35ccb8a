use crate::error::ScanError;
use crate::model::Track;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    /// Walks `root` recursively and returns every regular file as a track,
    /// sorted by file name in byte order. Directories whose name starts
    /// with a dot are skipped and symbolic links are not followed.
    pub fn scan(root: &Path) -> Result<Self, ScanError> {
        fs::read_dir(root).map_err(|source| ScanError {
            root: root.to_path_buf(),
            source,
        })?;

        let mut tracks = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            tracks.push(Track {
                name: entry.file_name().to_string_lossy().into_owned(),
                location: entry.into_path(),
            });
        }

        let catalog = Self::from_tracks(tracks);
        info!(root = %root.display(), tracks = catalog.len(), "catalog built");
        Ok(catalog)
    }

    pub fn from_tracks(mut tracks: Vec<Track>) -> Self {
        tracks.sort_by(|a, b| a.name.cmp(&b.name));
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}
