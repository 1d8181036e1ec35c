//! Twindeck Metadata
//!
//! Turns filenames, playlist files and directories into playlist rows.
//!
//! This crate provides:
//! - Tag and length reading through lofty, with ReplayGain normalisation
//! - Filename / `file://` URI resolution into `PlaylistEntry` values
//! - Playlist file (m3u, m3u8, pls), cue sheet and directory expansion
//! - The external playlist feed used by External mode
//!
//! # Example
//!
//! ```rust,no_run
//! use twindeck_metadata::{LoftyMetadataReader, MediaResolver};
//! use twindeck_core::EntryResolver;
//! use std::sync::Arc;
//!
//! let resolver = MediaResolver::new(Arc::new(LoftyMetadataReader::new()));
//! let entry = resolver.resolve("file:///music/song.mp3");
//! if entry.is_valid() {
//!     println!("{}", entry.display_markup());
//! }
//! ```

mod error;
mod expand;
mod external;
mod formats;
mod reader;
mod resolver;

pub use error::{MetadataError, Result};
pub use expand::{Elements, ElementExpander};
pub use external::{ExternalPlaylist, ExternalSource};
pub use formats::{is_cuesheet, is_playlist_file, is_supported_media, MEDIA_EXTENSIONS};
pub use reader::LoftyMetadataReader;
pub use resolver::{local_path, MediaResolver};
