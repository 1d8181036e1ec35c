//! Last-played timestamps
//!
//! Two maps are kept: one for plays that reached a live stream or recorder,
//! one for everything else. Random mode consults whichever matches the
//! current broadcast state so offline previewing does not starve the air.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Per-path last-played times, split by broadcast state
#[derive(Debug, Clone, Default)]
pub struct PlayHistory {
    /// Plays heard on a stream or recording
    online: HashMap<String, DateTime<Utc>>,

    /// Plays nobody outside the studio heard
    offline: HashMap<String, DateTime<Utc>>,
}

impl PlayHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` was playing at `at`
    pub fn record(&mut self, path: &str, online: bool, at: DateTime<Utc>) {
        if path.is_empty() {
            return;
        }
        self.map_mut(online).insert(path.to_string(), at);
    }

    /// Record that `path` is playing now
    pub fn record_now(&mut self, path: &str, online: bool) {
        self.record(path, online, Utc::now());
    }

    /// When `path` last played, if ever
    pub fn last_played(&self, path: &str, online: bool) -> Option<DateTime<Utc>> {
        self.map(online).get(path).copied()
    }

    /// The map selected by broadcast state
    pub fn map(&self, online: bool) -> &HashMap<String, DateTime<Utc>> {
        if online {
            &self.online
        } else {
            &self.offline
        }
    }

    fn map_mut(&mut self, online: bool) -> &mut HashMap<String, DateTime<Utc>> {
        if online {
            &mut self.online
        } else {
            &mut self.offline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_are_separate() {
        let mut history = PlayHistory::new();
        history.record_now("/music/a.mp3", true);

        assert!(history.last_played("/music/a.mp3", true).is_some());
        assert!(history.last_played("/music/a.mp3", false).is_none());
    }

    #[test]
    fn test_empty_path_ignored() {
        let mut history = PlayHistory::new();
        history.record_now("", false);
        assert!(history.map(false).is_empty());
    }

    #[test]
    fn test_later_record_wins() {
        let mut history = PlayHistory::new();
        let early = DateTime::<Utc>::from_timestamp(1_000, 0).unwrap();
        let late = DateTime::<Utc>::from_timestamp(2_000, 0).unwrap();
        history.record("/a.ogg", false, early);
        history.record("/a.ogg", false, late);
        assert_eq!(history.last_played("/a.ogg", false), Some(late));
    }
}
