//! Twindeck - Playback Core
//!
//! The playlist-playback core of the Twindeck console: two crossfaded
//! lanes, an interlude lane and the rules deciding what plays next.
//!
//! This crate provides:
//! - End-of-track policy engine (nine playlist modes, twelve control rows)
//! - Random selector weighted toward least recently played tracks
//! - Crossfade scheduler (paired start, crossfader pass, DJ alarm, silence killer)
//! - Lane state and the [`Console`] tying lanes to the mixer
//! - Session file reader/writer
//! - Request/response client for the external mixer process
//!
//! # Architecture
//!
//! Policy decisions are pure: [`policy::decide`] looks at a playlist, the
//! playing row, the mode and the lane role and returns a [`Decision`]. The
//! [`Console`] carries decisions out through a [`MixerLink`], so tests drive
//! it with a scripted mixer and the binary with [`MixerClient`] over the
//! mixer's pipes. Nothing here spawns threads; the caller owns the tick.
//!
//! # Example: Play All with a crossfade marker
//!
//! ```rust
//! use twindeck_core::{ControlMarker, Deck, LaneRole, PlaylistEntry, PlaylistMode, TrackEntry};
//! use twindeck_playback::{decide, Effect, EndOfTrackAction, PolicyInput, Trigger};
//!
//! let playlist = vec![
//!     PlaylistEntry::track(TrackEntry::new("/music/a.flac")),
//!     PlaylistEntry::control(ControlMarker::Crossfade),
//!     PlaylistEntry::track(TrackEntry::new("/music/b.flac")),
//! ];
//!
//! let decision = decide(&PolicyInput {
//!     playlist: &playlist,
//!     playing: Some(0),
//!     mode: PlaylistMode::PlayAll,
//!     role: LaneRole::Primary(Deck::Left),
//!     crossfader: 0,
//!     trigger: Trigger::EndOfTrack,
//! });
//!
//! assert_eq!(decision.action, EndOfTrackAction::Stop { select: Some(2) });
//! assert_eq!(decision.after, vec![Effect::PassCrossfader(Deck::Right)]);
//! ```
//!
//! # Example: Sessions
//!
//! ```rust
//! use std::path::Path;
//! use twindeck_core::{ControlMarker, PlaylistEntry};
//! use twindeck_playback::{session, LaneSettings};
//!
//! let rows = vec![PlaylistEntry::control(ControlMarker::Stop)];
//! let text = session::write_session(&LaneSettings::default(), &rows, Some(0));
//! let load = session::read_session(&text, Path::new("/"));
//!
//! assert_eq!(load.entries, rows);
//! assert_eq!(load.select, Some(0));
//! ```

mod console;
mod error;
mod history;
mod lane;
pub mod mixer;
pub mod policy;
mod prefs;
pub mod random;
pub mod scheduler;
pub mod session;

// Public exports
pub use console::{Console, ConsoleEvent, CopyDestination, DJ_ALARM_DELAY};
pub use error::{PlaybackError, Result};
pub use history::PlayHistory;
pub use lane::{Lane, LaneSettings, NowPlaying};
pub use mixer::{ContextId, LaneStatus, MixerClient, MixerLevels, MixerLink, PlayRequest};
pub use policy::{decide, Decision, Effect, EndOfTrackAction, PolicyInput, Trigger};
pub use prefs::DeckPreferences;
pub use random::select_random;
pub use scheduler::{Countdown, CrossfadeScheduler, SchedulerEvent};
pub use session::{PendingRow, SessionLoad};
