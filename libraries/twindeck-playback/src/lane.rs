//! Lane state
//!
//! A lane is one playlist plus the bookkeeping for the row it is playing:
//! selection cursor, mixer context, progress figures, current cue sheet
//! element and the crossfade scheduler. Mixer traffic lives in
//! [`Console`](crate::Console); this module only keeps state consistent.

use crate::error::{PlaybackError, Result};
use crate::mixer::ContextId;
use crate::policy::Trigger;
use crate::scheduler::CrossfadeScheduler;
use std::fmt;
use std::path::PathBuf;
use twindeck_core::{FadeMode, LaneRole, PlaylistEntry, PlaylistMode, TrackFeed};

/// Per-lane settings persisted in the session file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaneSettings {
    /// Playlist mode
    pub mode: PlaylistMode,
    /// Early fade preference
    pub fade: FadeMode,
    /// Lane is routed to the stream
    pub stream: bool,
    /// Lane is routed to the DJ monitor
    pub listen: bool,
    /// Monitor routing is forced on
    pub force: bool,
    /// Progress display: 0 elapsed, 1 remaining
    pub digiprogress_type: u8,
    /// Format index used when saving the playlist
    pub plsave_filetype: u32,
    /// Playlist save dialog was left open
    pub plsave_open: bool,
    /// Folder last used for playlist saves
    pub plsave_folder: Option<String>,
    /// Playlist file bound to External mode
    pub extlist: Option<PathBuf>,
    /// Directory bound to External mode
    pub extdir: Option<PathBuf>,
}

/// What the lane is playing, for stream metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NowPlaying {
    /// File handed to the mixer
    pub filename: String,
    /// Title (cue sheet element title when inside a cue sheet)
    pub title: String,
    /// Artist
    pub artist: String,
    /// Album
    pub album: String,
}

/// One playback lane.
pub struct Lane {
    role: LaneRole,
    playlist: Vec<PlaylistEntry>,
    /// Persisted settings
    pub settings: LaneSettings,
    selected: Option<usize>,
    playing: Option<usize>,
    pub(crate) context_id: ContextId,
    pub(crate) music_filename: String,
    pub(crate) stop_figure: i64,
    pub(crate) elapsed: i64,
    pub(crate) element: Option<usize>,
    pub(crate) gain_db: f64,
    pub(crate) speed: f64,
    pub(crate) deferred: Option<Trigger>,
    pub(crate) immediate_end: bool,
    pub(crate) scheduler: CrossfadeScheduler,
    external: Option<Box<dyn TrackFeed>>,
}

impl Lane {
    /// Create an empty lane
    pub fn new(role: LaneRole) -> Self {
        Self {
            role,
            playlist: Vec::new(),
            settings: LaneSettings::default(),
            selected: None,
            playing: None,
            context_id: ContextId::default(),
            music_filename: String::new(),
            stop_figure: 0,
            elapsed: 0,
            element: None,
            gain_db: 0.0,
            speed: 1.0,
            deferred: None,
            immediate_end: false,
            scheduler: CrossfadeScheduler::new(),
            external: None,
        }
    }

    /// The lane's role
    pub fn role(&self) -> LaneRole {
        self.role
    }

    /// The lane's rows
    pub fn playlist(&self) -> &[PlaylistEntry] {
        &self.playlist
    }

    /// Selected row
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Move the selection; out-of-range rows clear it
    pub fn select(&mut self, row: Option<usize>) {
        self.selected = row.filter(|&r| r < self.playlist.len());
    }

    /// Row being played
    pub fn playing(&self) -> Option<usize> {
        self.playing
    }

    /// Whether a row is being played
    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    /// Mixer context of the current track
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Seconds played according to the last tick
    pub fn elapsed(&self) -> i64 {
        self.elapsed
    }

    /// Playback speed factor
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change the playback speed factor
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Gain sent with the last start
    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    /// Countdown flags of the current track
    pub fn scheduler(&self) -> &CrossfadeScheduler {
        &self.scheduler
    }

    /// Row of the cue sheet element being played
    pub fn cue_element(&self) -> Option<usize> {
        self.element
    }

    /// Playlist mode
    pub fn mode(&self) -> PlaylistMode {
        self.settings.mode
    }

    /// Change the playlist mode
    ///
    /// # Errors
    ///
    /// The interlude lane has no partner for Alternate, Fade Over and
    /// Random Hop.
    pub fn set_mode(&mut self, mode: PlaylistMode) -> Result<()> {
        if !self.role.supports(mode) {
            return Err(PlaybackError::InvalidOperation(format!(
                "{mode} is not available on the {} lane",
                self.role
            )));
        }
        self.settings.mode = mode;
        Ok(())
    }

    /// Bind the source External mode pulls from
    pub fn set_external(&mut self, feed: Box<dyn TrackFeed>) {
        self.external = Some(feed);
    }

    /// Next entry from the External mode source
    pub fn next_external(&mut self) -> Option<PlaylistEntry> {
        self.external.as_mut()?.next_entry()
    }

    /// Append a row
    pub fn push(&mut self, entry: PlaylistEntry) {
        self.playlist.push(entry);
    }

    /// Insert rows at `at`, keeping the selection and playing row on the same entries
    pub fn insert_rows(&mut self, at: usize, rows: Vec<PlaylistEntry>) {
        let at = at.min(self.playlist.len());
        let count = rows.len();
        let shift = |row: Option<usize>| row.map(|r| if r >= at { r + count } else { r });
        self.selected = shift(self.selected);
        self.playing = shift(self.playing);
        self.playlist.splice(at..at, rows);
    }

    /// Remove a row; the caller stops the lane first if it is the playing row
    pub fn remove(&mut self, row: usize) -> Option<PlaylistEntry> {
        if row >= self.playlist.len() {
            return None;
        }
        let unshift = |cursor: Option<usize>| match cursor {
            Some(r) if r == row => None,
            Some(r) if r > row => Some(r - 1),
            other => other,
        };
        self.selected = unshift(self.selected);
        self.playing = unshift(self.playing);
        Some(self.playlist.remove(row))
    }

    /// Replace a row in place
    pub fn replace(&mut self, row: usize, entry: PlaylistEntry) {
        if let Some(slot) = self.playlist.get_mut(row) {
            *slot = entry;
        }
    }

    /// Replace the whole playlist; the lane must not be playing
    pub fn set_playlist(&mut self, entries: Vec<PlaylistEntry>) {
        self.playlist = entries;
        self.selected = None;
        self.playing = None;
    }

    /// Take the whole playlist, leaving the lane empty
    pub fn take_playlist(&mut self) -> Vec<PlaylistEntry> {
        self.selected = None;
        self.playing = None;
        std::mem::take(&mut self.playlist)
    }

    /// Rows with the "now playing" emphasis removed
    pub fn plain_rows(&self) -> Vec<PlaylistEntry> {
        self.playlist.iter().map(PlaylistEntry::without_emphasis).collect()
    }

    /// Metadata of what the lane is playing
    pub fn now_playing(&self) -> Option<NowPlaying> {
        let row = self.playing?;
        let track = self.playlist.get(row)?.as_track()?;
        let element = self
            .element
            .and_then(|e| track.cuesheet.as_ref()?.tracks().get(e));
        Some(match element {
            Some(element) => NowPlaying {
                filename: self.music_filename.clone(),
                title: element.title.clone(),
                artist: element.performer.clone(),
                album: element.album.clone(),
            },
            None => NowPlaying {
                filename: self.music_filename.clone(),
                title: track.title.clone(),
                artist: track.artist.clone(),
                album: track.album.clone(),
            },
        })
    }

    /// Seconds left in the current track
    pub fn remaining(&self) -> i64 {
        let Some(row) = self.playing else {
            return 0;
        };
        match self.playlist.get(row).and_then(PlaylistEntry::cuesheet) {
            Some(cuesheet) => cuesheet.time_remaining(self.elapsed as f64) as i64,
            None => self.stop_figure - self.elapsed,
        }
    }

    pub(crate) fn playlist_mut(&mut self) -> &mut Vec<PlaylistEntry> {
        &mut self.playlist
    }

    /// Mark `row` as playing and embolden it
    pub(crate) fn begin(&mut self, row: usize) {
        self.playing = Some(row);
        self.scheduler.reset();
        self.deferred = None;
        self.immediate_end = false;
        if let Some(track) = self.playlist.get_mut(row).and_then(PlaylistEntry::as_track_mut) {
            if !track.display_markup.starts_with("<b>") {
                track.display_markup = format!("<b>{}</b>", track.display_markup);
            }
        }
    }

    /// Clear the playing row, its emphasis and every per-track figure
    pub(crate) fn finish(&mut self) -> Option<usize> {
        let row = self.playing.take()?;
        if let Some(entry) = self.playlist.get_mut(row) {
            if let Some(cuesheet) = entry.cuesheet_mut() {
                cuesheet.non_playing();
            }
            if let Some(track) = entry.as_track_mut() {
                track.display_markup =
                    twindeck_core::types::strip_emphasis(&track.display_markup).to_string();
            }
        }
        self.elapsed = 0;
        self.element = None;
        self.deferred = None;
        self.immediate_end = false;
        self.scheduler.reset();
        Some(row)
    }
}

impl fmt::Debug for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lane")
            .field("role", &self.role)
            .field("rows", &self.playlist.len())
            .field("selected", &self.selected)
            .field("playing", &self.playing)
            .field("mode", &self.settings.mode)
            .field("context_id", &self.context_id)
            .field("external", &self.external.is_some())
            .finish()
    }
}
