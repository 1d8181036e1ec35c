/// Filename resolution into playlist rows
use crate::formats::{is_cuesheet, is_supported_media};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use twindeck_core::types::escape_markup;
use twindeck_core::{EntryResolver, MediaInfo, MetadataReader, PlaylistEntry, TrackEntry};
use twindeck_cuesheet::cuesheet_entry;

/// Hosts a `file://` URI may name and still refer to this machine
const LOCAL_HOSTS: [&str; 5] = ["", "localhost", "127.0.0.1", "::1", "[::1]"];

/// Convert a filename or `file:` URI into a local path.
///
/// Returns `Err` with the decoded path when the URI names a remote host.
pub fn local_path(filename: &str) -> Result<PathBuf, PathBuf> {
    if let Some(rest) = filename.strip_prefix("file://") {
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let decoded = url::Url::parse(&format!("file:///{path}"))
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(format!("/{path}")));
        if LOCAL_HOSTS.contains(&host) {
            Ok(decoded)
        } else {
            Err(decoded)
        }
    } else if let Some(rest) = filename.strip_prefix("file:") {
        Ok(PathBuf::from(rest))
    } else {
        Ok(PathBuf::from(filename))
    }
}

/// Resolves filenames through a [`MetadataReader`], handling cue sheets.
#[derive(Clone)]
pub struct MediaResolver {
    reader: Arc<dyn MetadataReader>,
}

impl MediaResolver {
    /// Create a resolver on top of `reader`
    pub fn new(reader: Arc<dyn MetadataReader>) -> Self {
        Self { reader }
    }

    /// The underlying reader
    pub fn reader(&self) -> &dyn MetadataReader {
        self.reader.as_ref()
    }

    /// Resolve a local path
    pub fn resolve_path(&self, path: &Path) -> PlaylistEntry {
        let filename = path.to_string_lossy().into_owned();
        if !(is_supported_media(path) || is_cuesheet(path)) || !path.is_file() {
            return PlaylistEntry::invalid(filename);
        }

        if is_cuesheet(path) {
            if let Ok(mut entry) = cuesheet_entry(path, self.reader()) {
                if let Some(track) = entry.as_track_mut() {
                    track.uuid = uuid::Uuid::new_v4().to_string();
                }
                return entry;
            }
        }

        match self.reader.read(path) {
            Ok(info) => PlaylistEntry::track(track_entry(filename, path, info)),
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", filename, e);
                PlaylistEntry::invalid(filename)
            }
        }
    }
}

impl EntryResolver for MediaResolver {
    fn resolve(&self, filename: &str) -> PlaylistEntry {
        match local_path(filename) {
            Ok(path) => self.resolve_path(&path),
            Err(remote) => PlaylistEntry::invalid(remote.to_string_lossy()),
        }
    }
}

/// Name used when tags are missing: the file stem without a leading track number
fn fallback_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ' || c == '-')
        .to_string()
}

fn track_entry(filename: String, path: &Path, info: MediaInfo) -> TrackEntry {
    let mut entry = TrackEntry::new(filename);
    entry.length_seconds = if info.length_secs < 1.0 {
        1
    } else {
        info.length_secs as i64
    };
    entry.replaygain = info.replaygain;
    entry.uuid = uuid::Uuid::new_v4().to_string();

    let display = match (info.artist.is_empty(), info.title.is_empty(), info.album.is_empty()) {
        (false, false, false) if info.album.contains('(') => {
            Some(format!("{} - {} - [{}]", info.artist, info.title, info.album))
        }
        (false, false, false) => Some(format!("{} - {} - ({})", info.artist, info.title, info.album)),
        (false, false, true) => Some(format!("{} - {}", info.artist, info.title)),
        _ => None,
    };

    if let Some(display) = display {
        entry.display_markup = escape_markup(&display);
        entry.meta_text = display;
        entry.title = info.title;
    } else {
        let name = fallback_name(path);
        entry.display_markup = format!(
            "<span foreground=\"dark red\">(Bad Tag)</span> {}",
            escape_markup(&name)
        );
        entry.meta_text = name.clone();
        entry.title = name;
    }
    entry.artist = info.artist;
    entry.album = info.album;
    entry
}
