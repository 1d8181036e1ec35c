//! Session files
//!
//! One lane per file: `key=value` settings lines, one `pe=` line per
//! playlist row and an optional `select=` line. Rows are packed as a run of
//! `<type><length>:<payload>` fields where the length counts characters:
//!
//! ```text
//! pe=s5:Intros30:/music/intro.mp3i2:42s0:s5:utf-8...
//! ```
//!
//! Cue sheet fields (`c`) hold one `t<length>:` record per element, each a
//! run of packed fields of its own. Nothing is ever evaluated.
//!
//! Loading never fails on a bad row. The row becomes a
//! [`PlaybackError::SessionCorruption`] warning and its file is queued for
//! re-resolution; every row after it is queued too so that playlist order
//! survives.

use crate::error::{PlaybackError, Result};
use crate::lane::{Lane, LaneSettings};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use twindeck_core::{
    ControlEntry, ControlMarker, CueSheetIndex, CueSheetTrack, EntryResolver, FadeMode,
    PlaylistEntry, PlaylistMode, ReplayGain, TrackEntry,
};

const STRUCK_OPEN: &str = "<s>";
const STRUCK_CLOSE: &str = "</s>";

/// A row that still needs work after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRow {
    /// Resolve this filename again
    Resolve(String),
    /// Decoded fine, but queued behind a row that needs resolving
    Ready(PlaylistEntry),
}

/// Everything read back from one session file.
#[derive(Debug, Default)]
pub struct SessionLoad {
    /// Lane settings
    pub settings: LaneSettings,
    /// Rows decoded directly
    pub entries: Vec<PlaylistEntry>,
    /// Selected row
    pub select: Option<usize>,
    /// Rows queued behind the first one that needs resolving, in order
    pub pending: Vec<PendingRow>,
    /// Problems met while loading
    pub warnings: Vec<PlaybackError>,
}

impl SessionLoad {
    /// Resolve the queued rows and return the complete playlist
    pub fn resolve_pending(&mut self, resolver: &dyn EntryResolver) -> Vec<PlaylistEntry> {
        let mut entries = std::mem::take(&mut self.entries);
        for row in self.pending.drain(..) {
            match row {
                PendingRow::Ready(entry) => entries.push(entry),
                PendingRow::Resolve(filename) => {
                    let entry = resolver.resolve(&filename);
                    if !entry.is_valid() {
                        tracing::warn!(%filename, "file missing or type unsupported");
                    }
                    entries.push(entry);
                }
            }
        }
        entries
    }

    /// Install the settings and rows into a lane
    pub fn apply(mut self, lane: &mut Lane, resolver: &dyn EntryResolver) -> Vec<PlaybackError> {
        let entries = self.resolve_pending(resolver);
        lane.settings = self.settings;
        if !lane.role().supports(lane.settings.mode) {
            self.warnings.push(PlaybackError::corrupt(format!(
                "{} is not available on the {} lane",
                lane.settings.mode,
                lane.role()
            )));
            lane.settings.mode = PlaylistMode::default();
        }
        lane.set_playlist(entries);
        lane.select(self.select);
        self.warnings
    }
}

// ===== Writing =====

/// Render a lane's settings, rows and selection
pub fn write_session(
    settings: &LaneSettings,
    entries: &[PlaylistEntry],
    select: Option<usize>,
) -> String {
    let mut out = String::new();
    if let Some(extlist) = &settings.extlist {
        let _ = writeln!(out, "extlist={}", extlist.display());
    }
    if let Some(extdir) = &settings.extdir {
        let _ = writeln!(out, "extdir={}", extdir.display());
    }
    let _ = writeln!(out, "digiprogress_type={}", settings.digiprogress_type);
    let _ = writeln!(out, "stream_button={}", u8::from(settings.stream));
    let _ = writeln!(out, "listen_button={}", u8::from(settings.listen));
    let _ = writeln!(out, "force_button={}", u8::from(settings.force));
    let _ = writeln!(out, "playlist_mode={}", settings.mode.index());
    let _ = writeln!(out, "plsave_filetype={}", settings.plsave_filetype);
    let _ = writeln!(out, "plsave_open={}", u8::from(settings.plsave_open));
    let _ = writeln!(out, "fade_mode={}", settings.fade.index());
    if let Some(folder) = &settings.plsave_folder {
        let _ = writeln!(out, "plsave_folder={folder}");
    }
    for entry in entries {
        let _ = writeln!(out, "pe={}", marshall(entry));
    }
    if let Some(row) = select {
        let _ = writeln!(out, "select={row}");
    }
    out
}

/// Write a lane to `path`
pub fn save_session(path: &Path, lane: &Lane) -> Result<()> {
    let text = write_session(&lane.settings, lane.playlist(), lane.selected());
    fs::write(path, text)?;
    tracing::debug!(path = %path.display(), rows = lane.playlist().len(), "session saved");
    Ok(())
}

/// Pack one row; "now playing" emphasis is dropped
pub fn marshall(entry: &PlaylistEntry) -> String {
    let mut packer = Packer::default();
    match entry {
        PlaylistEntry::Track(track) => {
            packer
                .text(twindeck_core::types::strip_emphasis(&track.display_markup))
                .text(&track.filename)
                .int(track.length_seconds)
                .text(&track.meta_text)
                .text(&track.encoding)
                .text(&track.title)
                .text(&track.artist)
                .text(&track.replaygain.to_string());
            match &track.cuesheet {
                Some(cuesheet) => packer.cuesheet(cuesheet),
                None => packer.null(),
            };
            packer.text(&track.album).text(&track.uuid);
        }
        PlaylistEntry::Control(control) => {
            packer
                .text(&control.marker.markup())
                .text("")
                .int(twindeck_core::types::CONTROL_LENGTH)
                .text(&control.meta_text)
                .text(&control.encoding)
                .text("")
                .text("")
                .text(&ReplayGain::DEFAULT.to_string())
                .null()
                .text("")
                .text("");
        }
        PlaylistEntry::Invalid { filename } => {
            packer
                .text(&format!("{STRUCK_OPEN}{filename}{STRUCK_CLOSE}"))
                .text(filename)
                .int(0)
                .text("")
                .text("")
                .text("")
                .text("")
                .text(&ReplayGain::DEFAULT.to_string())
                .null()
                .text("")
                .text("");
        }
    }
    packer.finish()
}

#[derive(Default)]
struct Packer {
    out: String,
}

impl Packer {
    fn field(&mut self, kind: char, payload: &str) -> &mut Self {
        let _ = write!(self.out, "{kind}{}:{payload}", payload.chars().count());
        self
    }

    fn text(&mut self, value: &str) -> &mut Self {
        self.field('s', value)
    }

    fn int(&mut self, value: i64) -> &mut Self {
        self.field('i', &value.to_string())
    }

    fn null(&mut self) -> &mut Self {
        self.field('n', "None")
    }

    fn cuesheet(&mut self, cuesheet: &CueSheetIndex) -> &mut Self {
        let mut records = Packer::default();
        for track in cuesheet.tracks() {
            let mut fields = Packer::default();
            fields
                .text(&track.pathname)
                .int(i64::from(track.playable))
                .int(i64::from(track.track_number))
                .int(i64::from(track.index_number))
                .text(&track.performer)
                .text(&track.title)
                .int(track.offset as i64)
                .int(track.duration as i64)
                .text(&track.replaygain.to_string())
                .text(&track.album);
            records.field('t', &fields.finish());
        }
        self.field('c', &records.finish())
    }

    fn finish(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

// ===== Reading =====

/// Read a session file; a missing file is an empty session
///
/// Bytes that are not UTF-8 are replaced and reported as a warning. Rows
/// they damage are requeued like any other damaged row.
pub fn load_session(path: &Path) -> Result<SessionLoad> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no session file");
            return Ok(SessionLoad::default());
        }
        Err(e) => return Err(e.into()),
    };
    let text = String::from_utf8_lossy(&data);
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut load = read_session(&text, base_dir);
    if matches!(text, Cow::Owned(_)) {
        tracing::warn!(path = %path.display(), "session file is not valid UTF-8");
        load.warnings
            .push(PlaybackError::corrupt("session file is not valid UTF-8"));
    }
    Ok(load)
}

/// Parse session text; relative filenames are taken from `base_dir`
pub fn read_session(text: &str, base_dir: &Path) -> SessionLoad {
    let mut load = SessionLoad::default();

    for (number, line) in text.lines().enumerate() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key == "pe" {
            read_row(&mut load, value, base_dir, number + 1);
            continue;
        }
        if let Err(e) = read_setting(&mut load, key, value) {
            tracing::warn!(line = number + 1, error = %e, "bad session setting");
            load.warnings.push(e);
        }
    }

    if !load.pending.is_empty() {
        tracing::warn!(
            queued = load.pending.len(),
            "stored playlist data is not compatible with this version, files queued for rescanning"
        );
    }
    load
}

fn read_setting(load: &mut SessionLoad, key: &str, value: &str) -> Result<()> {
    let settings = &mut load.settings;
    match key {
        "extlist" => settings.extlist = Some(PathBuf::from(value)),
        "extdir" => settings.extdir = Some(PathBuf::from(value)),
        "digiprogress_type" => settings.digiprogress_type = parse_number(key, value)?,
        "stream_button" => settings.stream = parse_flag(key, value)?,
        "listen_button" => settings.listen = parse_flag(key, value)?,
        "force_button" => settings.force = parse_flag(key, value)?,
        "playlist_mode" => {
            settings.mode = PlaylistMode::from_index(parse_number(key, value)?)
                .ok_or_else(|| bad_setting(key, value))?;
        }
        "plsave_filetype" => settings.plsave_filetype = parse_number(key, value)?,
        "plsave_open" => settings.plsave_open = parse_flag(key, value)?,
        "plsave_folder" => settings.plsave_folder = Some(value.to_string()),
        "fade_mode" => {
            settings.fade = FadeMode::from_index(parse_number(key, value)?)
                .ok_or_else(|| bad_setting(key, value))?;
        }
        "select" => load.select = Some(parse_number(key, value)?),
        _ => tracing::debug!(key, "ignoring unknown session key"),
    }
    Ok(())
}

fn bad_setting(key: &str, value: &str) -> PlaybackError {
    PlaybackError::corrupt(format!("bad value for {key}: {value:?}"))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| bad_setting(key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(bad_setting(key, value)),
    }
}

fn read_row(load: &mut SessionLoad, packed: &str, base_dir: &Path, line: usize) {
    let queueing = !load.pending.is_empty();
    match decode_row(packed, base_dir) {
        Ok(Decoded::Entry(entry)) if queueing => load.pending.push(PendingRow::Ready(entry)),
        Ok(Decoded::Entry(entry)) => load.entries.push(entry),
        Ok(Decoded::Struck(filename)) => {
            tracing::debug!(%filename, "queueing unresolved row");
            load.pending.push(PendingRow::Resolve(filename));
        }
        Ok(Decoded::UnknownControl(markup)) => {
            tracing::warn!(line, %markup, "skipping unknown playlist control");
        }
        Err(e) => {
            tracing::warn!(line, error = %e, "invalid session entry");
            match leading_filename(packed, base_dir) {
                Some(filename) => load.pending.push(PendingRow::Resolve(filename)),
                None => tracing::warn!(line, "entry lost, no filename could be recovered"),
            }
            load.warnings.push(e);
        }
    }
}

enum Decoded {
    Entry(PlaylistEntry),
    Struck(String),
    UnknownControl(String),
}

/// Unpack one row
///
/// # Errors
///
/// Returns [`PlaybackError::SessionCorruption`] for malformed or truncated
/// input and for control rows this version does not know.
pub fn unmarshall(packed: &str, base_dir: &Path) -> Result<PlaylistEntry> {
    match decode_row(packed, base_dir)? {
        Decoded::Entry(entry) => Ok(entry),
        Decoded::Struck(filename) => Ok(PlaylistEntry::invalid(filename)),
        Decoded::UnknownControl(markup) => Err(PlaybackError::corrupt(format!(
            "unknown playlist control {markup}"
        ))),
    }
}

fn decode_row(packed: &str, base_dir: &Path) -> Result<Decoded> {
    let mut fields = Fields::new(packed);
    let markup = fields.text()?;
    let filename = fields.text()?;
    let length_seconds = fields.int()?;
    let meta_text = fields.text()?;
    let encoding = fields.text()?;
    let title = fields.text()?;
    let artist = fields.text()?;
    let replaygain = parse_gain(fields.text()?)?;
    let cuesheet = fields.cuesheet(base_dir)?;
    let album = fields.text()?;
    let uuid = fields.text()?;
    fields.end()?;

    if markup.starts_with(twindeck_core::types::CONTROL_SIGIL) {
        let Some(marker) = ControlMarker::from_markup(markup) else {
            return Ok(Decoded::UnknownControl(markup.to_string()));
        };
        return Ok(Decoded::Entry(PlaylistEntry::Control(ControlEntry {
            marker,
            meta_text: meta_text.to_string(),
            encoding: encoding.to_string(),
        })));
    }

    let filename = absolute(filename, base_dir);
    if markup.starts_with(STRUCK_OPEN) {
        return Ok(Decoded::Struck(filename));
    }

    Ok(Decoded::Entry(PlaylistEntry::track(TrackEntry {
        display_markup: twindeck_core::types::strip_emphasis(markup).to_string(),
        filename,
        length_seconds,
        meta_text: meta_text.to_string(),
        encoding: encoding.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        replaygain,
        cuesheet,
        album: album.to_string(),
        uuid: uuid.to_string(),
    })))
}

/// The filename field of a row that failed to decode, when it can be read
fn leading_filename(packed: &str, base_dir: &Path) -> Option<String> {
    let mut fields = Fields::new(packed);
    fields.text().ok()?;
    let filename = fields.text().ok()?;
    if filename.is_empty() {
        return None;
    }
    Some(absolute(filename, base_dir))
}

/// Rows saved relative to the session directory (hard links) become absolute
fn absolute(filename: &str, base_dir: &Path) -> String {
    if filename.is_empty() || Path::new(filename).is_absolute() {
        return filename.to_string();
    }
    base_dir.join(filename).to_string_lossy().into_owned()
}

fn parse_gain(text: &str) -> Result<ReplayGain> {
    text.parse()
        .map_err(|_| PlaybackError::corrupt(format!("bad replaygain field {text:?}")))
}

/// Cursor over packed fields
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn new(packed: &'a str) -> Self {
        Self {
            rest: packed.trim_end_matches(['\r', '\n']),
        }
    }

    fn next(&mut self) -> Result<(char, &'a str)> {
        let mut chars = self.rest.chars();
        let kind = chars
            .next()
            .ok_or_else(|| PlaybackError::corrupt("entry is truncated"))?;
        let after_kind = chars.as_str();
        let (count, body) = after_kind
            .split_once(':')
            .ok_or_else(|| PlaybackError::corrupt("field length is not terminated"))?;
        let count: usize = count
            .parse()
            .map_err(|_| PlaybackError::corrupt(format!("bad field length {count:?}")))?;

        let split = match body.char_indices().nth(count) {
            Some((at, _)) => at,
            None if body.chars().count() == count => body.len(),
            None => return Err(PlaybackError::corrupt("field runs past the end of the entry")),
        };
        let (payload, rest) = body.split_at(split);
        self.rest = rest;
        Ok((kind, payload))
    }

    fn expect(&mut self, want: char) -> Result<&'a str> {
        let (kind, payload) = self.next()?;
        if kind != want {
            return Err(PlaybackError::corrupt(format!(
                "expected a '{want}' field, found '{kind}'"
            )));
        }
        Ok(payload)
    }

    fn text(&mut self) -> Result<&'a str> {
        self.expect('s')
    }

    fn int(&mut self) -> Result<i64> {
        let payload = self.expect('i')?;
        payload
            .parse()
            .map_err(|_| PlaybackError::corrupt(format!("bad integer field {payload:?}")))
    }

    fn unsigned<T: TryFrom<i64>>(&mut self) -> Result<T> {
        let value = self.int()?;
        T::try_from(value).map_err(|_| PlaybackError::corrupt(format!("{value} is out of range")))
    }

    fn flag(&mut self) -> Result<bool> {
        match self.int()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(PlaybackError::corrupt(format!("bad flag field {other}"))),
        }
    }

    fn cuesheet(&mut self, base_dir: &Path) -> Result<Option<CueSheetIndex>> {
        let (kind, payload) = self.next()?;
        match kind {
            'n' => Ok(None),
            'c' => {
                let mut records = Fields::new(payload);
                let mut tracks = Vec::new();
                while !records.rest.is_empty() {
                    let mut fields = Fields::new(records.expect('t')?);
                    tracks.push(fields.cue_track(base_dir)?);
                    fields.end()?;
                }
                Ok(Some(CueSheetIndex::new(tracks)))
            }
            other => Err(PlaybackError::corrupt(format!(
                "expected a cue sheet field, found '{other}'"
            ))),
        }
    }

    fn cue_track(&mut self, base_dir: &Path) -> Result<CueSheetTrack> {
        Ok(CueSheetTrack {
            pathname: absolute(self.text()?, base_dir),
            playable: self.flag()?,
            track_number: self.unsigned()?,
            index_number: self.unsigned()?,
            performer: self.text()?.to_string(),
            title: self.text()?.to_string(),
            offset: self.unsigned()?,
            duration: self.unsigned()?,
            replaygain: parse_gain(self.text()?)?,
            album: self.text()?.to_string(),
        })
    }

    fn end(&self) -> Result<()> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(PlaybackError::corrupt("trailing data after the last field"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_track() -> PlaylistEntry {
        let mut track = TrackEntry::new("/music/ünïcode – song.flac");
        track.display_markup = "Artist - Sóng".to_string();
        track.length_seconds = 215;
        track.meta_text = "Artist - Sóng".to_string();
        track.title = "Sóng".to_string();
        track.artist = "Artist".to_string();
        track.replaygain = "-3.5 R128".parse().unwrap();
        track.album = "Album: with colons".to_string();
        track.uuid = "4b8d3c1e".to_string();
        PlaylistEntry::track(track)
    }

    #[test]
    fn test_field_lengths_count_chars() {
        let packed = marshall(&create_test_track());
        assert!(packed.contains("s26:/music/ünïcode – song.flac"));
        assert!(packed.contains("i3:215"));
        assert!(packed.contains("n4:None"));
    }

    #[test]
    fn test_emphasis_not_saved() {
        let mut entry = create_test_track();
        if let Some(track) = entry.as_track_mut() {
            track.display_markup = "<b>Artist - Sóng</b>".to_string();
        }
        let decoded = unmarshall(&marshall(&entry), Path::new("/")).unwrap();
        assert_eq!(decoded.display_markup(), "Artist - Sóng");
    }

    #[test]
    fn test_control_row() {
        let packed = marshall(&PlaylistEntry::control(ControlMarker::Transfer));
        assert!(packed.starts_with("s9:>transfer"));
        assert!(packed.contains("i3:-11"));
        let decoded = unmarshall(&packed, Path::new("/")).unwrap();
        assert_eq!(decoded.control_marker(), Some(ControlMarker::Transfer));
    }

    #[test]
    fn test_truncated_field() {
        let packed = marshall(&create_test_track());
        let cut = &packed[..packed.len() - 3];
        assert!(matches!(
            unmarshall(cut, Path::new("/")),
            Err(PlaybackError::SessionCorruption(_))
        ));
    }

    #[test]
    fn test_wrong_field_type() {
        assert!(unmarshall("i1:5", Path::new("/")).is_err());
        assert!(unmarshall("sX:abc", Path::new("/")).is_err());
        assert!(unmarshall("", Path::new("/")).is_err());
    }

    #[test]
    fn test_relative_filename() {
        let mut track = TrackEntry::new("links/abc.mp3");
        track.display_markup = "abc".to_string();
        let packed = marshall(&PlaylistEntry::track(track));
        let decoded = unmarshall(&packed, Path::new("/home/dj/.config/twindeck")).unwrap();
        assert_eq!(decoded.filename(), "/home/dj/.config/twindeck/links/abc.mp3");
    }

    #[test]
    fn test_settings_parse() {
        let text = "extdir=/srv/music\ndigiprogress_type=1\nstream_button=0\n\
                    listen_button=1\nforce_button=1\nplaylist_mode=3\nfade_mode=2\n\
                    plsave_folder=/tmp/lists\nselect=0\n";
        let load = read_session(text, Path::new("/"));
        let settings = &load.settings;

        assert_eq!(settings.extdir.as_deref(), Some(Path::new("/srv/music")));
        assert_eq!(settings.digiprogress_type, 1);
        assert!(!settings.stream);
        assert!(settings.listen);
        assert!(settings.force);
        assert_eq!(settings.mode, PlaylistMode::from_index(3).unwrap());
        assert_eq!(settings.fade, FadeMode::Ten);
        assert_eq!(settings.plsave_folder.as_deref(), Some("/tmp/lists"));
        assert_eq!(load.select, Some(0));
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn test_bad_setting_is_a_warning() {
        let load = read_session("playlist_mode=42\nstream_button=yes\nlisten_button=1\n", Path::new("/"));
        assert_eq!(load.warnings.len(), 2);
        assert_eq!(load.settings.mode, PlaylistMode::default());
        assert!(load.settings.listen);
    }

    #[test]
    fn test_unknown_control_skipped() {
        let packed = marshall(&PlaylistEntry::control(ControlMarker::Crossfade))
            .replacen("s10:>crossfade", "s8:>unknown", 1);
        let load = read_session(&format!("pe={packed}\n"), Path::new("/"));
        assert!(load.entries.is_empty());
        assert!(load.pending.is_empty());
    }
}
