/// Track feed for External mode
use crate::expand::{ElementExpander, Elements};
use std::path::{Path, PathBuf};
use twindeck_core::{PlaylistEntry, TrackFeed};

/// Where an external feed draws its tracks from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalSource {
    /// An m3u/m3u8/pls playlist or cue sheet
    PlaylistFile(PathBuf),
    /// A directory, walked two levels deep
    Directory(PathBuf),
}

impl ExternalSource {
    /// The backing path
    pub fn path(&self) -> &Path {
        match self {
            ExternalSource::PlaylistFile(path) | ExternalSource::Directory(path) => path,
        }
    }
}

/// Endless feed over an external playlist or directory.
///
/// When the source runs dry it is re-read once; only when that yields
/// nothing either does the feed report exhaustion.
pub struct ExternalPlaylist {
    source: ExternalSource,
    expander: ElementExpander,
    elements: Elements,
}

impl ExternalPlaylist {
    /// Bind a feed to `source`
    pub fn new(source: ExternalSource, expander: ElementExpander) -> Self {
        let elements = expander.elements(&[source.path().to_path_buf()]);
        Self {
            source,
            expander,
            elements,
        }
    }

    /// The bound source
    pub fn source(&self) -> &ExternalSource {
        &self.source
    }
}

impl TrackFeed for ExternalPlaylist {
    fn next_entry(&mut self) -> Option<PlaylistEntry> {
        if let Some(entry) = self.elements.next() {
            return Some(entry);
        }
        tracing::debug!("Re-reading external source {}", self.source.path().display());
        self.elements = self.expander.elements(&[self.source.path().to_path_buf()]);
        self.elements.next()
    }
}
