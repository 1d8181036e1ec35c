/// Recognised file extensions
use std::path::Path;

/// Audio extensions the mixer can play
pub const MEDIA_EXTENSIONS: [&str; 17] = [
    "mp3", "mp2", "ogg", "oga", "spx", "opus", "flac", "wav", "aiff", "au", "aac", "mp4", "m4a",
    "m4b", "wma", "ape", "mpc",
];

/// Cue sheet extensions
const CUESHEET_EXTENSIONS: [&str; 2] = ["cue", "txt"];

/// Playlist file extensions that expand into entries
const PLAYLIST_EXTENSIONS: [&str; 3] = ["m3u", "m3u8", "pls"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn has_extension(path: &Path, list: &[&str]) -> bool {
    extension(path).is_some_and(|ext| list.contains(&ext.as_str()))
}

/// Playable audio file (by extension)
pub fn is_supported_media(path: &Path) -> bool {
    has_extension(path, &MEDIA_EXTENSIONS)
}

/// Cue sheet (by extension)
pub fn is_cuesheet(path: &Path) -> bool {
    has_extension(path, &CUESHEET_EXTENSIONS)
}

/// m3u / m3u8 / pls playlist (by extension)
pub fn is_playlist_file(path: &Path) -> bool {
    has_extension(path, &PLAYLIST_EXTENSIONS)
}
