//! Lanes, playlist modes and fade modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two primary playback lanes feeding the crossfader.
///
/// Holding a `Deck` is what allows lane-to-lane operations: the interlude
/// lane has none, so paired operations cannot be expressed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deck {
    /// Left lane, crossfader position 0
    Left,
    /// Right lane, crossfader position 100
    Right,
}

impl Deck {
    /// The paired lane
    pub fn other(self) -> Self {
        match self {
            Deck::Left => Deck::Right,
            Deck::Right => Deck::Left,
        }
    }

    /// Lane name used in mixer actions (`playleft`, `stopright`, ...)
    pub fn name(self) -> &'static str {
        match self {
            Deck::Left => "left",
            Deck::Right => "right",
        }
    }

    /// Whether this lane feeds the dominant side at crossfader position `position` (0..=100)
    pub fn dominates(self, position: u8) -> bool {
        match self {
            Deck::Left => position < 50,
            Deck::Right => position >= 50,
        }
    }

    /// Whether this lane is audible at all at crossfader position `position`
    pub fn audible(self, position: u8) -> bool {
        match self {
            Deck::Left => position < 90,
            Deck::Right => position > 10,
        }
    }
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The role a lane plays in the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneRole {
    /// One of the two crossfaded lanes
    Primary(Deck),
    /// Background music lane, outside the crossfader
    Interlude,
}

impl LaneRole {
    /// The deck for primary lanes
    pub fn deck(self) -> Option<Deck> {
        match self {
            LaneRole::Primary(deck) => Some(deck),
            LaneRole::Interlude => None,
        }
    }

    /// Mixer name of the lane
    pub fn name(self) -> &'static str {
        match self {
            LaneRole::Primary(deck) => deck.name(),
            LaneRole::Interlude => "interlude",
        }
    }

    /// Whether a lane in this role may run `mode`
    pub fn supports(self, mode: PlaylistMode) -> bool {
        match self {
            LaneRole::Primary(_) => true,
            LaneRole::Interlude => !mode.requires_pair(),
        }
    }
}

impl fmt::Display for LaneRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// End-of-track behaviour of a lane.
///
/// The discriminant order is the persisted `playlist_mode` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistMode {
    /// Advance sequentially, interpreting control markers
    #[default]
    PlayAll,
    /// Advance and wrap to the first track
    LoopAll,
    /// History-aware random choice
    Random,
    /// Stop after every track
    Manual,
    /// Select the next track without playing it
    CueUp,
    /// Pull tracks from an external playlist or directory
    External,
    /// Hand over to the paired lane at end of track
    Alternate,
    /// Crossfade into the paired lane
    FadeOver,
    /// Hand over to the paired lane running Random
    RandomHop,
}

impl PlaylistMode {
    /// All modes in persisted index order
    pub const ALL: [PlaylistMode; 9] = [
        PlaylistMode::PlayAll,
        PlaylistMode::LoopAll,
        PlaylistMode::Random,
        PlaylistMode::Manual,
        PlaylistMode::CueUp,
        PlaylistMode::External,
        PlaylistMode::Alternate,
        PlaylistMode::FadeOver,
        PlaylistMode::RandomHop,
    ];

    /// Persisted index of the mode
    pub fn index(self) -> usize {
        self as usize
    }

    /// Mode for a persisted index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human readable name
    pub fn as_str(self) -> &'static str {
        match self {
            PlaylistMode::PlayAll => "Play All",
            PlaylistMode::LoopAll => "Loop All",
            PlaylistMode::Random => "Random",
            PlaylistMode::Manual => "Manual",
            PlaylistMode::CueUp => "Cue Up",
            PlaylistMode::External => "External",
            PlaylistMode::Alternate => "Alternate",
            PlaylistMode::FadeOver => "Fade Over",
            PlaylistMode::RandomHop => "Random Hop",
        }
    }

    /// Modes that operate on the paired lane
    pub fn requires_pair(self) -> bool {
        matches!(
            self,
            PlaylistMode::Alternate | PlaylistMode::FadeOver | PlaylistMode::RandomHop
        )
    }

    /// Only PlayAll acts on control markers
    pub fn interprets_controls(self) -> bool {
        self == PlaylistMode::PlayAll
    }

    /// Modes in which the lane's fade preference never triggers an early advance
    pub fn suppresses_early_fade(self) -> bool {
        matches!(
            self,
            PlaylistMode::Manual
                | PlaylistMode::CueUp
                | PlaylistMode::Alternate
                | PlaylistMode::FadeOver
                | PlaylistMode::RandomHop
        )
    }
}

impl fmt::Display for PlaylistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaylistMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|mode| {
                mode.as_str()
                    .chars()
                    .filter(|c| *c != ' ')
                    .flat_map(char::to_lowercase)
                    .eq(key.chars())
            })
            .ok_or_else(|| format!("unknown playlist mode: {s}"))
    }
}

/// Crossfade length requested from the mixer when a track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeMode {
    /// Hard cut
    #[default]
    None,
    /// Five second fade
    Five,
    /// Ten second fade
    Ten,
    /// Seamless jump between cue sheet elements
    Splice,
}

impl FadeMode {
    /// Fade mode for the persisted `fade_mode` index (0..=2)
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(FadeMode::None),
            1 => Some(FadeMode::Five),
            2 => Some(FadeMode::Ten),
            _ => None,
        }
    }

    /// Persisted index; `Splice` is never persisted and maps to 0
    pub fn index(self) -> usize {
        match self {
            FadeMode::None | FadeMode::Splice => 0,
            FadeMode::Five => 1,
            FadeMode::Ten => 2,
        }
    }

    /// Value sent in the mixer `FADE=` field
    pub fn mixer_code(self) -> u8 {
        match self {
            FadeMode::None => 0,
            FadeMode::Five => 1,
            FadeMode::Ten => 2,
            FadeMode::Splice => 4,
        }
    }

    /// Seconds before end of track at which the fade starts
    pub fn lead_seconds(self) -> Option<i64> {
        match self {
            FadeMode::Five => Some(5),
            FadeMode::Ten => Some(10),
            FadeMode::None | FadeMode::Splice => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_index_round_trip() {
        for (i, mode) in PlaylistMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
            assert_eq!(PlaylistMode::from_index(i), Some(*mode));
        }
        assert_eq!(PlaylistMode::from_index(9), None);
    }

    #[test]
    fn test_mode_parse_is_lenient() {
        assert_eq!("fade over".parse::<PlaylistMode>(), Ok(PlaylistMode::FadeOver));
        assert_eq!("random_hop".parse::<PlaylistMode>(), Ok(PlaylistMode::RandomHop));
        assert_eq!("Play-All".parse::<PlaylistMode>(), Ok(PlaylistMode::PlayAll));
        assert!("shuffle".parse::<PlaylistMode>().is_err());
    }

    #[test]
    fn test_interlude_refuses_paired_modes() {
        assert!(!LaneRole::Interlude.supports(PlaylistMode::Alternate));
        assert!(!LaneRole::Interlude.supports(PlaylistMode::RandomHop));
        assert!(LaneRole::Interlude.supports(PlaylistMode::LoopAll));
        assert!(LaneRole::Primary(Deck::Left).supports(PlaylistMode::FadeOver));
    }

    #[test]
    fn test_crossfader_dominance() {
        assert!(Deck::Left.dominates(0));
        assert!(Deck::Left.dominates(49));
        assert!(!Deck::Left.dominates(50));
        assert!(Deck::Right.dominates(50));
        assert!(Deck::Right.audible(11));
        assert!(!Deck::Right.audible(10));
    }

    #[test]
    fn test_fade_mode_codes() {
        assert_eq!(FadeMode::from_index(2), Some(FadeMode::Ten));
        assert_eq!(FadeMode::Splice.mixer_code(), 4);
        assert_eq!(FadeMode::Splice.index(), 0);
        assert_eq!(FadeMode::Five.lead_seconds(), Some(5));
    }
}
