//! Mixer request/response client
//!
//! The mixer is an external process that decodes and mixes audio. It
//! speaks a line protocol: a request is a target line followed by
//! `KEY=value` lines and `ACTN=<action>` / `end`; replies are read line by
//! line until a terminator. An empty read means the mixer is gone, which is
//! reported as [`ContextId::FAILED`] or [`PlaybackError::Protocol`], never a
//! hang.

use crate::error::{PlaybackError, Result};
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};
use twindeck_core::{FadeMode, LaneRole};

/// Reply the mixer sends when it crashed mid-request
const SEGFAULT_LINE: &str = "Segmentation Fault\n";

/// Identifier the mixer assigns to each playback start.
///
/// Odd ids mean the track started; even ids mean the mixer was already at
/// end of track when asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContextId(pub i64);

impl ContextId {
    /// Start request failed
    pub const FAILED: ContextId = ContextId(-1);

    /// Whether the start request failed
    pub fn is_failed(self) -> bool {
        self == Self::FAILED
    }

    /// Whether playback is underway
    pub fn is_running(self) -> bool {
        !self.is_failed() && self.0 & 1 == 1
    }

    /// Whether the mixer started at end of track
    pub fn ended_immediately(self) -> bool {
        self.0 & 1 == 0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A start request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest<'a> {
    /// Lane to play on
    pub lane: LaneRole,
    /// File handed to the decoder
    pub path: &'a str,
    /// Start position in seconds
    pub seek_secs: i64,
    /// Track length in seconds
    pub size_secs: i64,
    /// Playback gain in dB
    pub gain_db: f64,
}

/// Per-lane state reported by a levels request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LaneStatus {
    /// Seconds played
    pub elapsed: i64,
    /// Decoder running
    pub playing: bool,
    /// Audio above the silence threshold
    pub signal: bool,
    /// Context the mixer is in
    pub context_id: ContextId,
    /// Decoder ran out of audio
    pub runout: bool,
    /// Seconds of trailing silence
    pub silence: f64,
}

/// Raw `key=value` pairs from a levels request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixerLevels {
    values: HashMap<String, String>,
}

impl MixerLevels {
    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Status of one lane; missing keys read as zero
    pub fn lane(&self, lane: LaneRole) -> LaneStatus {
        let name = lane.name();
        let int = |key: &str| -> i64 {
            self.get(&format!("{name}_{key}"))
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };
        LaneStatus {
            elapsed: int("elapsed"),
            playing: int("playing") != 0,
            signal: int("signal") != 0,
            context_id: ContextId(int("cid")),
            runout: int("audio_runout") != 0,
            silence: self
                .get(&format!("{name}_silence"))
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0.0),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MixerLevels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Operations the console needs from the mixer.
pub trait MixerLink {
    /// Start a track; never blocks past a disconnect
    fn play(&mut self, request: &PlayRequest<'_>) -> ContextId;

    /// Restart the lane's decoder at a new position in `path`
    fn restart(&mut self, lane: LaneRole, path: &str, seek_secs: i64) -> ContextId;

    /// Stop the lane's decoder
    fn stop(&mut self, lane: LaneRole) -> Result<()>;

    /// Set the fade used when the lane next stops
    fn set_fade(&mut self, lane: LaneRole, fade: FadeMode) -> Result<()>;

    /// Poll playback positions and signal levels
    fn levels(&mut self) -> Result<MixerLevels>;
}

/// Mixer client over any line reader/writer pair (usually a child's stdio).
pub struct MixerClient<R, W> {
    reader: R,
    writer: W,
    prefix: String,
    target: String,
}

impl<R: BufRead, W: Write> MixerClient<R, W> {
    /// Create a client; `prefix` tags informational replies, `target`
    /// names the mixer subsystem every request goes to
    pub fn new(reader: R, writer: W, prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            prefix: prefix.into(),
            target: target.into(),
        }
    }

    /// Send one request block
    pub fn request(&mut self, body: &str) -> Result<()> {
        write!(self.writer, "{}\n{body}", self.target)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read one reply line; empty on disconnect
    pub fn read_line(&mut self) -> String {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(_) if line == SEGFAULT_LINE => {
                tracing::error!("mixer reports a segmentation fault");
                String::new()
            }
            Ok(_) => line,
            Err(e) => {
                tracing::error!(error = %e, "mixer read failed");
                String::new()
            }
        }
    }

    fn read_context_id(&mut self) -> ContextId {
        loop {
            let line = self.read_line();
            if line.is_empty() {
                return ContextId::FAILED;
            }
            if let Some(id) = line.strip_prefix("context_id=") {
                return id.trim().parse().map(ContextId).unwrap_or(ContextId::FAILED);
            }
        }
    }
}

impl<R: BufRead, W: Write> MixerLink for MixerClient<R, W> {
    fn play(&mut self, request: &PlayRequest<'_>) -> ContextId {
        let body = format!(
            "PLRP={}\nSEEK={}\nSIZE={}\nRGDB={:.6}\nACTN=playnoflush{}\nend\n",
            request.path,
            request.seek_secs,
            request.size_secs,
            request.gain_db,
            request.lane.name()
        );
        if let Err(e) = self.request(&body) {
            tracing::error!(error = %e, "mixer write failed");
            return ContextId::FAILED;
        }
        self.read_context_id()
    }

    fn restart(&mut self, lane: LaneRole, path: &str, seek_secs: i64) -> ContextId {
        let body = format!("PLRP={path}\nSEEK={seek_secs}\nACTN=play{}\nend\n", lane.name());
        if let Err(e) = self.request(&body) {
            tracing::error!(error = %e, "mixer write failed");
            return ContextId::FAILED;
        }
        self.read_context_id()
    }

    fn stop(&mut self, lane: LaneRole) -> Result<()> {
        self.request(&format!("ACTN=stop{}\nend\n", lane.name()))
    }

    fn set_fade(&mut self, lane: LaneRole, fade: FadeMode) -> Result<()> {
        self.request(&format!(
            "FADE={}\nACTN=fademode_{}\nend\n",
            fade.mixer_code(),
            lane.name()
        ))
    }

    fn levels(&mut self) -> Result<MixerLevels> {
        self.request("ACTN=requestlevels\nend\n")?;
        let mut levels = MixerLevels::default();
        loop {
            let line = self.read_line();
            if line.is_empty() {
                return Err(PlaybackError::protocol("mixer disconnected during levels request"));
            }
            let line = line.trim_end();
            if line == "end" {
                return Ok(levels);
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    levels.values.insert(key.to_string(), value.to_string());
                }
                None => tracing::debug!(line, "mixer says"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use twindeck_core::Deck;

    fn create_test_client(replies: &str) -> MixerClient<Cursor<Vec<u8>>, Vec<u8>> {
        MixerClient::new(
            Cursor::new(replies.as_bytes().to_vec()),
            Vec::new(),
            "idjcmixer",
            "mx",
        )
    }

    fn sent(client: &MixerClient<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(client.writer.clone()).unwrap()
    }

    #[test]
    fn test_context_id_parity() {
        assert!(ContextId(7).is_running());
        assert!(ContextId(8).ended_immediately());
        assert!(!ContextId::FAILED.is_running());
        assert!(ContextId::FAILED.is_failed());
    }

    #[test]
    fn test_play_request_format() {
        let mut client = create_test_client("some chatter\ncontext_id=13\n");
        let request = PlayRequest {
            lane: LaneRole::Primary(Deck::Left),
            path: "/music/a.mp3",
            seek_secs: 0,
            size_secs: 200,
            gain_db: -2.5,
        };

        assert_eq!(client.play(&request), ContextId(13));
        assert_eq!(
            sent(&client),
            "mx\nPLRP=/music/a.mp3\nSEEK=0\nSIZE=200\nRGDB=-2.500000\nACTN=playnoflushleft\nend\n"
        );
    }

    #[test]
    fn test_play_disconnect_is_failure() {
        let mut client = create_test_client("chatter\n");
        let request = PlayRequest {
            lane: LaneRole::Interlude,
            path: "/music/a.mp3",
            seek_secs: 0,
            size_secs: 1,
            gain_db: 0.0,
        };
        assert_eq!(client.play(&request), ContextId::FAILED);
    }

    #[test]
    fn test_segfault_is_disconnect() {
        let mut client = create_test_client("Segmentation Fault\ncontext_id=3\n");
        let id = client.restart(LaneRole::Primary(Deck::Right), "/a.wav", 12);
        assert_eq!(id, ContextId::FAILED);
        assert!(sent(&client).ends_with("PLRP=/a.wav\nSEEK=12\nACTN=playright\nend\n"));
    }

    #[test]
    fn test_fade_and_stop() {
        let mut client = create_test_client("");
        client
            .set_fade(LaneRole::Primary(Deck::Left), FadeMode::Splice)
            .unwrap();
        client.stop(LaneRole::Interlude).unwrap();
        assert_eq!(
            sent(&client),
            "mx\nFADE=4\nACTN=fademode_left\nend\nmx\nACTN=stopinterlude\nend\n"
        );
    }

    #[test]
    fn test_levels() {
        let mut client = create_test_client(
            "left_elapsed=42\nleft_cid=5\nleft_signal=1\nleft_audio_runout=0\nnoise\nright_silence=2.5\nend\n",
        );
        let levels = client.levels().unwrap();
        let left = levels.lane(LaneRole::Primary(Deck::Left));
        assert_eq!(left.elapsed, 42);
        assert_eq!(left.context_id, ContextId(5));
        assert!(left.signal);
        assert!(!left.runout);
        assert_eq!(levels.lane(LaneRole::Primary(Deck::Right)).silence, 2.5);
    }

    #[test]
    fn test_levels_disconnect() {
        let mut client = create_test_client("left_elapsed=1\n");
        assert!(matches!(client.levels(), Err(PlaybackError::Protocol(_))));
    }
}
