//! Runtime view of a cue sheet: playable sub-tracks and a playing cursor

use crate::types::ReplayGain;
use crossbeam_channel::Sender;
use std::fmt;

/// Cue sheet time unit: frames per second
pub const FRAMES_PER_SECOND: u64 = 75;

/// One (track, index) element of a cue sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CueSheetTrack {
    /// Absolute path of the media file, empty when the file could not be resolved
    pub pathname: String,

    /// Whether the element can be played
    pub playable: bool,

    /// Track number (1-based)
    pub track_number: u32,

    /// Index number (0 = pregap, 1 = start of track, 2.. = sub-index)
    pub index_number: u32,

    /// Performer for display
    pub performer: String,

    /// Title for display
    pub title: String,

    /// Start offset within the file, in frames
    pub offset: u64,

    /// Length in frames
    pub duration: u64,

    /// Gain of the containing file
    pub replaygain: ReplayGain,

    /// Album for display
    pub album: String,
}

impl CueSheetTrack {
    /// First frame after this element
    pub fn end(&self) -> u64 {
        self.offset + self.duration
    }
}

/// Change notification sent to index observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueIndexEvent {
    /// The playing cursor moved; rows `previous` and `current` need redrawing
    PlayingChanged {
        /// Row playing before the change
        previous: Option<usize>,
        /// Row playing now
        current: Option<usize>,
    },
}

/// Ordered cue sheet elements plus the "currently playing" cursor.
///
/// The cursor is a cache recomputed by [`element`](Self::element) and
/// cleared by [`non_playing`](Self::non_playing); observers registered
/// with [`subscribe`](Self::subscribe) hear about every change.
#[derive(Default)]
pub struct CueSheetIndex {
    tracks: Vec<CueSheetTrack>,
    playing: Option<usize>,
    observers: Vec<Sender<CueIndexEvent>>,
}

impl CueSheetIndex {
    /// Create an index over `tracks`, in play order
    pub fn new(tracks: Vec<CueSheetTrack>) -> Self {
        Self {
            tracks,
            playing: None,
            observers: Vec::new(),
        }
    }

    /// All elements
    pub fn tracks(&self) -> &[CueSheetTrack] {
        &self.tracks
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the index has no elements
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Row of the element last returned by [`element`](Self::element)
    pub fn playing_index(&self) -> Option<usize> {
        self.playing
    }

    /// Register for cursor change notifications
    pub fn subscribe(&mut self, observer: Sender<CueIndexEvent>) {
        self.observers.push(observer);
    }

    /// Row of the first playable element that has not ended at `offset_secs`
    ///
    /// Updates the playing cursor and notifies observers when it moves.
    pub fn element_index(&mut self, offset_secs: f64) -> Option<usize> {
        let point = offset_secs * FRAMES_PER_SECOND as f64;
        let found = self
            .tracks
            .iter()
            .position(|t| t.playable && point < t.end() as f64);

        if let Some(row) = found {
            if self.playing != Some(row) {
                let previous = self.playing.replace(row);
                self.notify(CueIndexEvent::PlayingChanged {
                    previous,
                    current: Some(row),
                });
            }
        }
        found
    }

    /// The element playing at `offset_secs` into the file
    pub fn element(&mut self, offset_secs: f64) -> Option<&CueSheetTrack> {
        let row = self.element_index(offset_secs)?;
        self.tracks.get(row)
    }

    /// The element following `track`, if any
    pub fn next_element(&self, track: &CueSheetTrack) -> Option<&CueSheetTrack> {
        let row = self.tracks.iter().position(|t| t == track)?;
        self.tracks.get(row + 1)
    }

    /// Seconds of playable material left after `offset_secs`
    pub fn time_remaining(&self, offset_secs: f64) -> f64 {
        let point = offset_secs * FRAMES_PER_SECOND as f64;
        let frames: f64 = self
            .tracks
            .iter()
            .filter(|t| point < t.end() as f64 && t.playable)
            .map(|t| {
                if point > t.offset as f64 {
                    t.end() as f64 - point
                } else {
                    t.duration as f64
                }
            })
            .sum();
        frames / FRAMES_PER_SECOND as f64
    }

    /// Clear the playing cursor
    pub fn non_playing(&mut self) {
        let previous = self.playing.take();
        self.notify(CueIndexEvent::PlayingChanged {
            previous,
            current: None,
        });
    }

    /// Sum of all playable durations, in frames
    pub fn total_frames(&self) -> u64 {
        self.tracks
            .iter()
            .filter(|t| t.playable)
            .map(|t| t.duration)
            .sum()
    }

    fn notify(&mut self, event: CueIndexEvent) {
        self.observers.retain(|tx| tx.send(event).is_ok());
    }
}

impl Clone for CueSheetIndex {
    fn clone(&self) -> Self {
        Self {
            tracks: self.tracks.clone(),
            playing: self.playing,
            observers: Vec::new(),
        }
    }
}

impl PartialEq for CueSheetIndex {
    fn eq(&self, other: &Self) -> bool {
        self.tracks == other.tracks
    }
}

impl fmt::Debug for CueSheetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CueSheetIndex")
            .field("tracks", &self.tracks)
            .field("playing", &self.playing)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn create_test_element(track: u32, offset_secs: u64, duration_secs: u64) -> CueSheetTrack {
        CueSheetTrack {
            pathname: "/music/live.wav".to_string(),
            playable: true,
            track_number: track,
            index_number: 1,
            performer: "Band".to_string(),
            title: format!("Song {track}"),
            offset: offset_secs * FRAMES_PER_SECOND,
            duration: duration_secs * FRAMES_PER_SECOND,
            replaygain: ReplayGain::DEFAULT,
            album: "Live".to_string(),
        }
    }

    fn create_test_index() -> CueSheetIndex {
        CueSheetIndex::new(vec![
            create_test_element(1, 0, 180),
            create_test_element(2, 180, 60),
        ])
    }

    #[test]
    fn test_element_lookup() {
        let mut index = create_test_index();
        assert_eq!(index.element(0.0).map(|t| t.track_number), Some(1));
        assert_eq!(index.element(179.9).map(|t| t.track_number), Some(1));
        assert_eq!(index.element(180.0).map(|t| t.track_number), Some(2));
        assert_eq!(index.playing_index(), Some(1));
        assert!(index.element(240.0).is_none());
        assert_eq!(index.playing_index(), Some(1), "cursor kept past the end");
    }

    #[test]
    fn test_element_skips_unplayable() {
        let mut tracks = vec![create_test_element(1, 0, 180), create_test_element(2, 180, 60)];
        tracks[0].playable = false;
        let mut index = CueSheetIndex::new(tracks);
        assert_eq!(index.element(10.0).map(|t| t.track_number), Some(2));
    }

    #[test]
    fn test_next_element() {
        let index = create_test_index();
        let first = index.tracks()[0].clone();
        let second = index.tracks()[1].clone();
        assert_eq!(index.next_element(&first), Some(&second));
        assert_eq!(index.next_element(&second), None);
    }

    #[test]
    fn test_time_remaining() {
        let index = create_test_index();
        assert_eq!(index.time_remaining(0.0), 240.0);
        assert_eq!(index.time_remaining(100.0), 140.0);
        assert_eq!(index.time_remaining(200.0), 40.0);
        assert_eq!(index.time_remaining(240.0), 0.0);
        assert_eq!(index.time_remaining(500.0), 0.0);
    }

    #[test]
    fn test_observers_hear_cursor_moves() {
        let mut index = create_test_index();
        let (tx, rx) = unbounded();
        index.subscribe(tx);

        index.element(1.0);
        index.element(2.0);
        index.element(200.0);
        index.non_playing();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                CueIndexEvent::PlayingChanged { previous: None, current: Some(0) },
                CueIndexEvent::PlayingChanged { previous: Some(0), current: Some(1) },
                CueIndexEvent::PlayingChanged { previous: Some(1), current: None },
            ]
        );
        assert_eq!(index.playing_index(), None);
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let mut index = create_test_index();
        let (tx, rx) = unbounded();
        index.subscribe(tx);
        drop(rx);
        index.element(1.0);
        assert!(format!("{index:?}").contains("observers: 0"));
    }

    #[test]
    fn test_clone_drops_observers_but_compares_equal() {
        let mut index = create_test_index();
        let (tx, _rx) = unbounded();
        index.subscribe(tx);
        let copy = index.clone();
        assert_eq!(copy, index);
        assert_eq!(index.total_frames(), 240 * FRAMES_PER_SECOND);
    }
}
