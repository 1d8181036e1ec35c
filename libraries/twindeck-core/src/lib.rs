//! Twindeck Core
//!
//! Shared domain types, collaborator traits, and error handling for the
//! Twindeck playback console.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `PlaylistEntry`, `ControlMarker`, `CueSheetIndex`, `ReplayGain`,
//!   lane roles, playlist modes and fade modes
//! - **Collaborator Traits**: `MetadataReader`, `EntryResolver`, `TrackFeed`
//! - **Error Handling**: Unified `DeckError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use twindeck_core::types::{ControlMarker, PlaylistEntry, PlaylistMode};
//!
//! let marker = PlaylistEntry::control(ControlMarker::Crossfade);
//! assert!(marker.is_control());
//! assert_eq!(PlaylistMode::from_index(1), Some(PlaylistMode::LoopAll));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{DeckError, Result};
pub use traits::{EntryResolver, MediaInfo, MetadataReader, TrackFeed};

pub use types::{
    // Playlist rows
    Announcement, ControlEntry, ControlMarker, PlaylistEntry, TrackEntry,
    // Cue sheets
    CueIndexEvent, CueSheetIndex, CueSheetTrack, FRAMES_PER_SECOND,
    // Gain
    GainKind, ReplayGain,
    // Lanes
    Deck, FadeMode, LaneRole, PlaylistMode,
};
