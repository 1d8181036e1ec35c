//! Playlist rows

use crate::types::{ControlEntry, ControlMarker, CueSheetIndex, ReplayGain, CONTROL_LENGTH};
use std::borrow::Cow;

/// A resolved media file (optionally backed by a cue sheet).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    /// Pango-style markup shown in the playlist
    pub display_markup: String,

    /// Absolute path of the media file or cue sheet
    pub filename: String,

    /// Playing time in seconds
    pub length_seconds: i64,

    /// Metadata text sent to streams (`artist - title`)
    pub meta_text: String,

    /// Character encoding of `meta_text`
    pub encoding: String,

    /// Title tag
    pub title: String,

    /// Artist tag
    pub artist: String,

    /// Gain to apply at playback
    pub replaygain: ReplayGain,

    /// Sub-track index for cue-sheet-backed entries
    pub cuesheet: Option<CueSheetIndex>,

    /// Album tag
    pub album: String,

    /// Unique row identifier
    pub uuid: String,
}

impl TrackEntry {
    /// Create a track entry with only a filename set; the rest is filled in by the resolver
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            display_markup: String::new(),
            filename: filename.into(),
            length_seconds: 0,
            meta_text: String::new(),
            encoding: "utf-8".to_string(),
            title: String::new(),
            artist: String::new(),
            replaygain: ReplayGain::DEFAULT,
            cuesheet: None,
            album: String::new(),
            uuid: String::new(),
        }
    }
}

/// One playlist row.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEntry {
    /// Playable media
    Track(Box<TrackEntry>),
    /// Non-audio directive
    Control(ControlEntry),
    /// A file that could not be resolved; the filename is kept for display
    Invalid {
        /// Original filename or URI
        filename: String,
    },
}

impl PlaylistEntry {
    /// Wrap a resolved track
    pub fn track(entry: TrackEntry) -> Self {
        PlaylistEntry::Track(Box::new(entry))
    }

    /// A control row without payload
    pub fn control(marker: ControlMarker) -> Self {
        PlaylistEntry::Control(ControlEntry::new(marker))
    }

    /// The poisoned entry for `filename`
    pub fn invalid(filename: impl Into<String>) -> Self {
        PlaylistEntry::Invalid {
            filename: filename.into(),
        }
    }

    /// False only for the poisoned entry
    pub fn is_valid(&self) -> bool {
        !matches!(self, PlaylistEntry::Invalid { .. })
    }

    /// Whether this is a control row
    pub fn is_control(&self) -> bool {
        matches!(self, PlaylistEntry::Control(_))
    }

    /// Whether this row can be handed to the mixer
    pub fn is_playable(&self) -> bool {
        matches!(self, PlaylistEntry::Track(_))
    }

    /// The directive of a control row
    pub fn control_marker(&self) -> Option<ControlMarker> {
        match self {
            PlaylistEntry::Control(control) => Some(control.marker),
            _ => None,
        }
    }

    /// The track of a media row
    pub fn as_track(&self) -> Option<&TrackEntry> {
        match self {
            PlaylistEntry::Track(track) => Some(track),
            _ => None,
        }
    }

    /// Mutable access to the track of a media row
    pub fn as_track_mut(&mut self) -> Option<&mut TrackEntry> {
        match self {
            PlaylistEntry::Track(track) => Some(track),
            _ => None,
        }
    }

    /// Filename; empty for control rows
    pub fn filename(&self) -> &str {
        match self {
            PlaylistEntry::Track(track) => &track.filename,
            PlaylistEntry::Control(_) => "",
            PlaylistEntry::Invalid { filename } => filename,
        }
    }

    /// Length in seconds; [`CONTROL_LENGTH`] for control rows
    pub fn length_seconds(&self) -> i64 {
        match self {
            PlaylistEntry::Track(track) => track.length_seconds,
            PlaylistEntry::Control(_) => CONTROL_LENGTH,
            PlaylistEntry::Invalid { .. } => 0,
        }
    }

    /// Markup shown in the playlist
    pub fn display_markup(&self) -> Cow<'_, str> {
        match self {
            PlaylistEntry::Track(track) => Cow::Borrowed(&track.display_markup),
            PlaylistEntry::Control(control) => Cow::Owned(control.marker.markup()),
            PlaylistEntry::Invalid { filename } => {
                Cow::Owned(format!("<s>{}</s>", escape_markup(filename)))
            }
        }
    }

    /// Gain of a media row, the default otherwise
    pub fn replaygain(&self) -> ReplayGain {
        self.as_track()
            .map(|t| t.replaygain)
            .unwrap_or(ReplayGain::DEFAULT)
    }

    /// Cue sheet index of a cue-sheet-backed row
    pub fn cuesheet(&self) -> Option<&CueSheetIndex> {
        self.as_track().and_then(|t| t.cuesheet.as_ref())
    }

    /// Mutable cue sheet index of a cue-sheet-backed row
    pub fn cuesheet_mut(&mut self) -> Option<&mut CueSheetIndex> {
        self.as_track_mut().and_then(|t| t.cuesheet.as_mut())
    }

    /// Copy of the row with "now playing" emphasis removed
    pub fn without_emphasis(&self) -> Self {
        let mut copy = self.clone();
        if let PlaylistEntry::Track(track) = &mut copy {
            track.display_markup = strip_emphasis(&track.display_markup).to_string();
        }
        copy
    }
}

/// Escape text for inclusion in markup
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove the bold emphasis that marks the playing row
pub fn strip_emphasis(markup: &str) -> &str {
    markup
        .strip_prefix("<b>")
        .and_then(|s| s.strip_suffix("</b>"))
        .unwrap_or(markup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_track(name: &str) -> PlaylistEntry {
        let mut track = TrackEntry::new(format!("/music/{name}.mp3"));
        track.display_markup = format!("<b>Artist - {name}</b>");
        track.length_seconds = 200;
        PlaylistEntry::track(track)
    }

    #[test]
    fn test_invalid_is_falsy_and_keeps_name() {
        let entry = PlaylistEntry::invalid("/gone/a&b.mp3");
        assert!(!entry.is_valid());
        assert!(!entry.is_playable());
        assert_eq!(entry.filename(), "/gone/a&b.mp3");
        assert_eq!(entry.display_markup(), "<s>/gone/a&amp;b.mp3</s>");
    }

    #[test]
    fn test_control_row_shape() {
        let entry = PlaylistEntry::control(ControlMarker::Crossfade);
        assert!(entry.is_valid());
        assert!(entry.is_control());
        assert_eq!(entry.filename(), "");
        assert_eq!(entry.length_seconds(), CONTROL_LENGTH);
        assert_eq!(entry.display_markup(), ">crossfade");
    }

    #[test]
    fn test_without_emphasis() {
        let entry = create_test_track("Song").without_emphasis();
        assert_eq!(entry.display_markup(), "Artist - Song");
        assert_eq!(strip_emphasis("plain"), "plain");
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(escape_markup("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
    }
}
