/// Core domain types for Twindeck
mod control;
mod cuesheet;
mod entry;
mod lane;
mod replaygain;

pub use control::{Announcement, ControlEntry, ControlMarker, CONTROL_LENGTH, CONTROL_SIGIL};
pub use cuesheet::{CueIndexEvent, CueSheetIndex, CueSheetTrack, FRAMES_PER_SECOND};
pub use entry::{escape_markup, strip_emphasis, PlaylistEntry, TrackEntry};
pub use lane::{Deck, FadeMode, LaneRole, PlaylistMode};
pub use replaygain::{GainKind, ReplayGain};
