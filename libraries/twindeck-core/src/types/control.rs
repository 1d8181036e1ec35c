//! Control markers: non-audio playlist rows that steer PlayAll mode

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of a control row's display markup
pub const CONTROL_SIGIL: char = '>';

/// Length sentinel stored for control rows
pub const CONTROL_LENGTH: i64 = -11;

/// Directive carried by a control row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMarker {
    /// Stop the lane
    Stop,
    /// Stop the lane (second stop style)
    Stop2,
    /// Stop the lane and start the paired lane
    Transfer,
    /// Stop the lane at the end of a crossfade
    Crossfade,
    /// Timed announcement over microphones
    Announcement,
    /// Restart from the first row
    JumpToTop,
    /// Halt all live streams
    StopStreaming,
    /// Halt all recorders
    StopRecording,
    /// Next transition fades over five seconds
    Fade5,
    /// Next transition fades over ten seconds
    Fade10,
    /// Next transition is a hard cut
    FadeNone,
    /// Reset the lane's playback speed
    NormalSpeed,
}

impl ControlMarker {
    /// Every marker in menu order
    pub const ALL: [ControlMarker; 12] = [
        ControlMarker::Stop,
        ControlMarker::Stop2,
        ControlMarker::Transfer,
        ControlMarker::Crossfade,
        ControlMarker::Announcement,
        ControlMarker::JumpToTop,
        ControlMarker::StopStreaming,
        ControlMarker::StopRecording,
        ControlMarker::Fade5,
        ControlMarker::Fade10,
        ControlMarker::FadeNone,
        ControlMarker::NormalSpeed,
    ];

    /// Name stored after the sigil in session files
    pub fn wire_name(self) -> &'static str {
        match self {
            ControlMarker::Stop => "stopplayer",
            ControlMarker::Stop2 => "stopplayer2",
            ControlMarker::Transfer => "transfer",
            ControlMarker::Crossfade => "crossfade",
            ControlMarker::Announcement => "announcement",
            ControlMarker::JumpToTop => "jumptotop",
            ControlMarker::StopStreaming => "stopstreaming",
            ControlMarker::StopRecording => "stoprecording",
            ControlMarker::Fade5 => "fade5",
            ControlMarker::Fade10 => "fade10",
            ControlMarker::FadeNone => "fadenone",
            ControlMarker::NormalSpeed => "normalspeed",
        }
    }

    /// Display markup of a control row
    pub fn markup(self) -> String {
        format!("{CONTROL_SIGIL}{}", self.wire_name())
    }

    /// Recognise the display markup of a control row, ignoring `<b>` emphasis
    pub fn from_markup(markup: &str) -> Option<Self> {
        let plain = markup
            .strip_prefix("<b>")
            .and_then(|s| s.strip_suffix("</b>"))
            .unwrap_or(markup);
        plain.strip_prefix(CONTROL_SIGIL)?.parse().ok()
    }

    /// Markers that halt the lane
    pub fn is_stop(self) -> bool {
        matches!(
            self,
            ControlMarker::Stop | ControlMarker::Stop2 | ControlMarker::Announcement
        )
    }

    /// Markers that end a contiguous play block
    pub fn ends_block(self) -> bool {
        matches!(
            self,
            ControlMarker::Stop
                | ControlMarker::Stop2
                | ControlMarker::Transfer
                | ControlMarker::Crossfade
                | ControlMarker::Announcement
                | ControlMarker::JumpToTop
        )
    }
}

impl fmt::Display for ControlMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ControlMarker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let marker = match s.trim().to_ascii_lowercase().as_str() {
            "stopplayer" | "stop" => ControlMarker::Stop,
            "stopplayer2" | "stop2" => ControlMarker::Stop2,
            "transfer" => ControlMarker::Transfer,
            "crossfade" => ControlMarker::Crossfade,
            "announcement" => ControlMarker::Announcement,
            "jumptotop" | "jump-to-top" => ControlMarker::JumpToTop,
            "stopstreaming" | "stop-streaming" => ControlMarker::StopStreaming,
            "stoprecording" | "stop-recording" => ControlMarker::StopRecording,
            "fade5" | "fade-5" => ControlMarker::Fade5,
            "fade10" | "fade-10" => ControlMarker::Fade10,
            "fadenone" | "fade-none" => ControlMarker::FadeNone,
            "normalspeed" | "normal-speed" => ControlMarker::NormalSpeed,
            other => return Err(format!("unknown control marker: {other}")),
        };
        Ok(marker)
    }
}

/// A control row in a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEntry {
    /// The directive
    pub marker: ControlMarker,

    /// Announcement countdown as `00MMSS`, empty otherwise
    pub meta_text: String,

    /// Announcement text, form-url-encoded, empty otherwise
    pub encoding: String,
}

impl ControlEntry {
    /// Create a control row without payload
    pub fn new(marker: ControlMarker) -> Self {
        Self {
            marker,
            meta_text: String::new(),
            encoding: String::new(),
        }
    }

    /// Create an announcement row
    pub fn announcement(announcement: &Announcement) -> Self {
        Self {
            marker: ControlMarker::Announcement,
            meta_text: announcement.meta_text(),
            encoding: announcement.encoded_message(),
        }
    }

    /// Decode the announcement payload, if this is an announcement row
    pub fn as_announcement(&self) -> Option<Announcement> {
        if self.marker != ControlMarker::Announcement {
            return None;
        }
        Some(Announcement::decode(&self.meta_text, &self.encoding))
    }
}

/// Announcement payload: a countdown and the text shown to the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Announcement {
    /// Countdown length in seconds, 0 for none
    pub countdown_secs: u32,

    /// Text read out by the presenter
    pub message: String,
}

impl Announcement {
    /// `00MMSS` countdown field
    pub fn meta_text(&self) -> String {
        format!(
            "00{:02}{:02}",
            (self.countdown_secs / 60).min(99),
            self.countdown_secs % 60
        )
    }

    /// Message in form-url-encoded form
    pub fn encoded_message(&self) -> String {
        url::form_urlencoded::byte_serialize(self.message.as_bytes()).collect()
    }

    /// Decode the stored fields; malformed countdowns read as 0
    pub fn decode(meta_text: &str, encoding: &str) -> Self {
        let countdown_secs = if meta_text.len() == 6 && meta_text.is_ascii() {
            let minutes: u32 = meta_text[2..4].parse().unwrap_or(0);
            let seconds: u32 = meta_text[4..6].parse().unwrap_or(0);
            minutes * 60 + seconds
        } else {
            0
        };
        let message = url::form_urlencoded::parse(format!("m={encoding}").as_bytes())
            .next()
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        Self {
            countdown_secs,
            message,
        }
    }
}
