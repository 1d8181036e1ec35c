/// Collaborator traits for Twindeck
use crate::error::Result;
use crate::types::{PlaylistEntry, ReplayGain};
use std::path::Path;

/// What a metadata collaborator knows about one media file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    /// Playing time in seconds
    pub length_secs: f64,

    /// Title tag, empty when missing
    pub title: String,

    /// Artist tag, empty when missing
    pub artist: String,

    /// Album tag, empty when missing
    pub album: String,

    /// Normalised replaygain
    pub replaygain: ReplayGain,
}

/// Metadata reader trait
///
/// Implementers read tags and playing time from media files.
pub trait MetadataReader: Send + Sync {
    /// Read metadata from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or its format is unsupported
    fn read(&self, path: &Path) -> Result<MediaInfo>;
}

/// Turns a filename or URI into a playlist row.
///
/// Resolution never fails: unreadable input yields `PlaylistEntry::Invalid`.
pub trait EntryResolver: Send + Sync {
    /// Resolve one filename or `file://` URI
    fn resolve(&self, filename: &str) -> PlaylistEntry;
}

/// Source of tracks for External mode.
pub trait TrackFeed: Send {
    /// Next resolved entry, or `None` once the source has no more audio files
    fn next_entry(&mut self) -> Option<PlaylistEntry>;
}
