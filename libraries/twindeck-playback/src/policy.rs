//! End-of-track policy
//!
//! Decides what a lane does when its track ends or a skip is requested.
//! The engine is a pure function of the playlist, the playing row, the
//! playlist mode and the lane's role; it returns a [`Decision`] that the
//! console carries out against the mixer and the paired lane.
//!
//! Control rows are only interpreted in Play All mode. In every other mode
//! traversal skips over them.

use twindeck_core::{
    ControlMarker, Deck, FadeMode, LaneRole, PlaylistEntry, PlaylistMode,
};

/// Why the policy engine is being consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The mixer ran out of audio
    EndOfTrack,
    /// A silence killer cut the track short
    Silence,
    /// A fade preference ended the track early
    EarlyFade,
    /// The mixer could not start the row (missing file or control row)
    StartFailed,
    /// The operator asked for the next track
    Skip,
}

/// What happens to the lane itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfTrackAction {
    /// Stop; optionally park the selection on a row
    Stop {
        /// Row to select afterwards
        select: Option<usize>,
    },
    /// Stop and select `row`, starting it when `play` is set
    AdvanceTo {
        /// Row to select
        row: usize,
        /// Start playback of `row`
        play: bool,
    },
    /// Like `AdvanceTo`, after wrapping around the end of the playlist
    AdvanceToFirst {
        /// First non-control row
        row: usize,
        /// Start playback of `row`
        play: bool,
    },
    /// Stop, let the random selector pick a row, then play it
    PlayRandom,
    /// Stop and replace `row` with the external feed's next entry, then play it
    RequestExternalNext {
        /// Row being replaced
        row: usize,
    },
}

/// A side effect carried out around the lane action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Reset this lane's playback speed
    ResetSpeed,
    /// Send a fade mode to the mixer for this lane
    SetFade(FadeMode),
    /// Auto-open microphones for a stop marker
    OpenMicrophone(ControlMarker),
    /// Open the announcement dialog for the row
    OpenAnnouncement {
        /// Announcement row
        row: usize,
    },
    /// Move the crossfader fully toward a deck
    PassCrossfader(Deck),
    /// Start the paired lane on its selected row
    StartPaired,
    /// Run the paired lane's policy in the given mode
    DelegatePaired(PlaylistMode),
    /// Halt every stream
    StopStreaming,
    /// Halt every recorder
    StopRecording,
}

/// Result of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Effects applied before the lane action
    pub before: Vec<Effect>,
    /// The lane action
    pub action: EndOfTrackAction,
    /// Effects applied after the lane action
    pub after: Vec<Effect>,
}

impl Decision {
    fn new(action: EndOfTrackAction) -> Self {
        Self {
            before: Vec::new(),
            action,
            after: Vec::new(),
        }
    }

    fn before(mut self, effect: Effect) -> Self {
        self.before.push(effect);
        self
    }

    fn after(mut self, effect: Effect) -> Self {
        self.after.push(effect);
        self
    }

    fn stop(select: Option<usize>) -> Self {
        Self::new(EndOfTrackAction::Stop { select })
    }
}

/// Everything the engine looks at.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    /// The lane's rows
    pub playlist: &'a [PlaylistEntry],
    /// Row that was playing
    pub playing: Option<usize>,
    /// Active playlist mode
    pub mode: PlaylistMode,
    /// Which lane is asking
    pub role: LaneRole,
    /// Crossfader position, 0 (left) to 100 (right)
    pub crossfader: u8,
    /// Why the engine is consulted
    pub trigger: Trigger,
}

/// Decide what the lane does next
pub fn decide(input: &PolicyInput<'_>) -> Decision {
    // random picks need no playing row, Random Hop relies on this
    if input.mode == PlaylistMode::Random {
        return Decision::new(EndOfTrackAction::PlayRandom);
    }

    let Some(playing) = input.playing.filter(|&row| row < input.playlist.len()) else {
        tracing::warn!(lane = %input.role, "end of track policy invoked on an idle lane");
        return Decision::stop(None);
    };

    if !input.role.supports(input.mode) {
        tracing::warn!(lane = %input.role, mode = %input.mode, "mode needs a paired lane, stopping");
        return Decision::stop(None);
    }

    tracing::debug!(
        lane = %input.role,
        mode = %input.mode,
        trigger = ?input.trigger,
        row = playing,
        "end of track policy"
    );

    let playlist = input.playlist;
    match input.mode {
        PlaylistMode::Manual => Decision::stop(None),
        PlaylistMode::PlayAll => {
            if playlist[playing].is_control() {
                return interpret_control(input, playing);
            }
            let next = playing + 1;
            match playlist.get(next) {
                Some(entry) if entry.is_control() => interpret_control(input, next),
                Some(_) => Decision::new(EndOfTrackAction::AdvanceTo {
                    row: next,
                    play: true,
                }),
                None => Decision::stop(Some(0)),
            }
        }
        PlaylistMode::LoopAll | PlaylistMode::CueUp | PlaylistMode::FadeOver => {
            let play = input.mode == PlaylistMode::LoopAll;
            if let Some(row) = next_real_track(playlist, playing) {
                Decision::new(EndOfTrackAction::AdvanceTo { row, play })
            } else if let Some(row) = first_real_track(playlist) {
                Decision::new(EndOfTrackAction::AdvanceToFirst { row, play })
            } else {
                Decision::stop(Some(0))
            }
        }
        PlaylistMode::Random => Decision::new(EndOfTrackAction::PlayRandom),
        PlaylistMode::External => {
            Decision::new(EndOfTrackAction::RequestExternalNext { row: playing })
        }
        PlaylistMode::Alternate | PlaylistMode::RandomHop => {
            let select = next_real_track(playlist, playing)
                .or_else(|| first_real_track(playlist))
                .unwrap_or(0);
            let Some(deck) = input.role.deck() else {
                return Decision::stop(Some(select));
            };
            let handoff = if input.mode == PlaylistMode::Alternate {
                Effect::StartPaired
            } else {
                Effect::DelegatePaired(PlaylistMode::Random)
            };
            Decision::stop(Some(select))
                .after(Effect::PassCrossfader(deck.other()))
                .after(handoff)
        }
    }
}

/// Apply the control row at `row` (Play All only)
fn interpret_control(input: &PolicyInput<'_>, row: usize) -> Decision {
    let playlist = input.playlist;
    let Some(marker) = playlist[row].control_marker() else {
        return Decision::stop(None);
    };
    tracing::info!(lane = %input.role, %marker, row, "playlist control");

    let after_marker = if row + 1 < playlist.len() {
        Some(row + 1)
    } else {
        None
    };
    // "next" semantics: play the following row, park on the top when there is none
    let advance = || match after_marker {
        Some(next) => Decision::new(EndOfTrackAction::AdvanceTo {
            row: next,
            play: true,
        }),
        None => Decision::stop(Some(0)),
    };
    let deck = input.role.deck();

    match marker {
        ControlMarker::NormalSpeed => advance().before(Effect::ResetSpeed),
        ControlMarker::Stop | ControlMarker::Stop2 => {
            let decision = Decision::stop(Some(after_marker.unwrap_or(0)));
            match deck {
                Some(deck) if deck.dominates(input.crossfader) => {
                    decision.before(Effect::OpenMicrophone(marker))
                }
                _ => decision,
            }
        }
        ControlMarker::JumpToTop => Decision::new(EndOfTrackAction::AdvanceToFirst {
            row: 0,
            play: true,
        }),
        ControlMarker::Announcement => Decision::stop(Some(after_marker.unwrap_or(0)))
            .before(Effect::OpenAnnouncement { row }),
        ControlMarker::Crossfade => {
            let decision = Decision::stop(Some(after_marker.unwrap_or(0)));
            match deck {
                Some(deck) => decision.after(Effect::PassCrossfader(deck.other())),
                None => decision,
            }
        }
        ControlMarker::StopStreaming => advance().after(Effect::StopStreaming),
        ControlMarker::StopRecording => advance().after(Effect::StopRecording),
        ControlMarker::Transfer => {
            let decision = Decision::stop(Some(after_marker.unwrap_or(0)));
            match deck {
                Some(deck) => decision
                    .before(Effect::PassCrossfader(deck.other()))
                    .before(Effect::StartPaired),
                None => decision,
            }
        }
        ControlMarker::Fade5 => advance()
            .before(Effect::SetFade(FadeMode::Five))
            .after(Effect::SetFade(FadeMode::None)),
        ControlMarker::Fade10 => advance()
            .before(Effect::SetFade(FadeMode::Ten))
            .after(Effect::SetFade(FadeMode::None)),
        ControlMarker::FadeNone => advance().after(Effect::SetFade(FadeMode::None)),
    }
}

/// First non-control row after `row`
pub fn next_real_track(playlist: &[PlaylistEntry], row: usize) -> Option<usize> {
    playlist
        .iter()
        .enumerate()
        .skip(row + 1)
        .find(|(_, entry)| !entry.is_control())
        .map(|(i, _)| i)
}

/// First non-control row
pub fn first_real_track(playlist: &[PlaylistEntry]) -> Option<usize> {
    playlist.iter().position(|entry| !entry.is_control())
}

/// Scan the control rows following `row` until one decides the outcome
fn scan_markers(
    playlist: &[PlaylistEntry],
    row: usize,
    at_end: bool,
    decide: impl Fn(ControlMarker) -> Option<bool>,
) -> bool {
    for entry in playlist.iter().skip(row + 1) {
        let Some(marker) = entry.control_marker() else {
            return false;
        };
        if let Some(outcome) = decide(marker) {
            return outcome;
        }
    }
    at_end
}

/// Whether the lane will stop after `row` (DJ alarm lookahead)
pub fn stop_inspect(playlist: &[PlaylistEntry], row: usize) -> bool {
    scan_markers(playlist, row, true, |marker| match marker {
        ControlMarker::Stop | ControlMarker::Stop2 | ControlMarker::Announcement => Some(true),
        ControlMarker::Transfer | ControlMarker::Crossfade | ControlMarker::JumpToTop => {
            Some(false)
        }
        _ => None,
    })
}

/// Whether a crossfade marker follows `row` before any stopping marker
pub fn fade_inspect(playlist: &[PlaylistEntry], row: usize) -> bool {
    scan_markers(playlist, row, false, |marker| match marker {
        ControlMarker::Crossfade => Some(true),
        ControlMarker::Transfer
        | ControlMarker::Stop
        | ControlMarker::Stop2
        | ControlMarker::Announcement
        | ControlMarker::JumpToTop => Some(false),
        _ => None,
    })
}

/// Whether the playlist ends or streaming stops after `row` (Play All only)
pub fn eos_inspect(playlist: &[PlaylistEntry], row: usize, mode: PlaylistMode) -> bool {
    if mode != PlaylistMode::PlayAll {
        return false;
    }
    scan_markers(playlist, row, true, |marker| match marker {
        ControlMarker::StopStreaming => Some(true),
        ControlMarker::Transfer | ControlMarker::Crossfade => Some(false),
        _ => None,
    })
}

/// Seconds of audio from `row` to the end of its block
///
/// In Play All mode the block ends at the first stopping marker and a
/// `>normalspeed` row resets `speed` for the rows after it.
pub fn block_time(
    playlist: &[PlaylistEntry],
    row: usize,
    mode: PlaylistMode,
    mut speed: f64,
) -> i64 {
    let use_controls = mode.interprets_controls();
    let mut size = 0;
    for entry in playlist.iter().skip(row) {
        if let Some(marker) = entry.control_marker() {
            if use_controls {
                if marker.ends_block() {
                    break;
                }
                if marker == ControlMarker::NormalSpeed {
                    speed = 1.0;
                }
            }
            continue;
        }
        let length = match entry.cuesheet() {
            Some(cuesheet) => cuesheet.time_remaining(0.0),
            None => entry.length_seconds().max(0) as f64,
        };
        size += (length / speed) as i64;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use twindeck_core::TrackEntry;

    fn track(name: &str, length: i64) -> PlaylistEntry {
        let mut entry = TrackEntry::new(format!("/music/{name}.mp3"));
        entry.length_seconds = length;
        PlaylistEntry::track(entry)
    }

    fn control(marker: ControlMarker) -> PlaylistEntry {
        PlaylistEntry::control(marker)
    }

    #[test]
    fn test_real_track_traversal() {
        let playlist = vec![
            control(ControlMarker::Stop),
            track("a", 10),
            control(ControlMarker::Fade5),
            track("b", 10),
        ];
        assert_eq!(first_real_track(&playlist), Some(1));
        assert_eq!(next_real_track(&playlist, 1), Some(3));
        assert_eq!(next_real_track(&playlist, 3), None);
    }

    #[test]
    fn test_stop_inspect() {
        let playlist = vec![
            track("a", 10),
            control(ControlMarker::Fade5),
            control(ControlMarker::Stop2),
            track("b", 10),
            control(ControlMarker::Transfer),
        ];
        assert!(stop_inspect(&playlist, 0));
        assert!(!stop_inspect(&playlist, 3));
        assert!(stop_inspect(&playlist, 4));
    }

    #[test]
    fn test_fade_inspect() {
        let playlist = vec![
            track("a", 10),
            control(ControlMarker::NormalSpeed),
            control(ControlMarker::Crossfade),
            track("b", 10),
            control(ControlMarker::Stop),
            control(ControlMarker::Crossfade),
        ];
        assert!(fade_inspect(&playlist, 0));
        assert!(!fade_inspect(&playlist, 3));
        assert!(!fade_inspect(&playlist, 5));
    }

    #[test]
    fn test_eos_inspect() {
        let playlist = vec![
            track("a", 10),
            control(ControlMarker::StopStreaming),
            track("b", 10),
            control(ControlMarker::Crossfade),
            track("c", 10),
        ];
        assert!(eos_inspect(&playlist, 0, PlaylistMode::PlayAll));
        assert!(!eos_inspect(&playlist, 2, PlaylistMode::PlayAll));
        assert!(eos_inspect(&playlist, 4, PlaylistMode::PlayAll));
        assert!(!eos_inspect(&playlist, 4, PlaylistMode::LoopAll));
    }

    #[test]
    fn test_block_time_stops_at_marker() {
        let playlist = vec![
            track("a", 100),
            track("b", 50),
            control(ControlMarker::Stop),
            track("c", 30),
        ];
        assert_eq!(block_time(&playlist, 0, PlaylistMode::PlayAll, 1.0), 150);
        assert_eq!(block_time(&playlist, 0, PlaylistMode::Manual, 1.0), 180);
    }

    #[test]
    fn test_block_time_normal_speed() {
        let playlist = vec![
            track("a", 100),
            control(ControlMarker::NormalSpeed),
            track("b", 100),
        ];
        assert_eq!(block_time(&playlist, 0, PlaylistMode::PlayAll, 2.0), 150);
    }
}
