//! Twindeck cue sheet support
//!
//! Parses cue sheets into per-track segment maps and turns them into
//! [`CueSheetIndex`](twindeck_core::CueSheetIndex) values backed by real
//! media files.
//!
//! # Example
//!
//! ```rust
//! use twindeck_cuesheet::parse_lines;
//!
//! let sheet = [
//!     "FILE \"live.wav\" WAVE",
//!     "  TRACK 01 AUDIO",
//!     "    INDEX 01 00:00:00",
//!     "  TRACK 02 AUDIO",
//!     "    INDEX 01 03:00:00",
//! ];
//! let segments = parse_lines(sheet).unwrap();
//! assert_eq!(segments.track_count(), 2);
//! assert_eq!(segments.track(2).unwrap().indices[&1].offset, 180 * 75);
//! ```

#![forbid(unsafe_code)]

mod builder;
mod error;
mod parser;
mod tokenizer;

pub use builder::{build_index, cuesheet_entry, BuiltCueSheet};
pub use error::{CueSheetError, Result};
pub use parser::{parse_bytes, parse_file, parse_lines, CueSegments, IndexPoint, TrackSegment};
pub use tokenizer::{decode_line, tokenize};
