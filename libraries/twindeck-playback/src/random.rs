//! Random mode track selection
//!
//! Not a uniform shuffle: a pool of rows is drawn and the least recently
//! played candidate in the pool wins. Over a long session this breaks up
//! any apparent play order without replaying a track too soon.

use crate::error::{PlaybackError, Result};
use chrono::{DateTime, Utc};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::collections::HashMap;
use twindeck_core::PlaylistEntry;

/// Smallest pool drawn per attempt
pub const MIN_POOL: usize = 10;

/// Largest pool drawn per attempt
pub const MAX_POOL: usize = 50;

/// Draws without a playable candidate before falling back to a full scan
const MAX_DRAWS: usize = 64;

/// Number of rows drawn per attempt for a playlist of `len` rows
pub fn pool_size(len: usize) -> usize {
    (len / 10).clamp(MIN_POOL, MAX_POOL).min(len)
}

/// Pick the row to play next in Random mode
///
/// `played` maps filenames to their last-played time; rows missing from
/// the map count as never played. Control rows and invalid rows are never
/// chosen.
///
/// # Errors
///
/// [`PlaybackError::EmptyPlaylist`] when no row is playable.
pub fn select_random<R: Rng + ?Sized>(
    entries: &[PlaylistEntry],
    played: &HashMap<String, DateTime<Utc>>,
    rng: &mut R,
) -> Result<usize> {
    if !entries.iter().any(PlaylistEntry::is_playable) {
        tracing::warn!("cannot select from an empty playlist");
        return Err(PlaybackError::EmptyPlaylist);
    }

    let pool = pool_size(entries.len());
    for _ in 0..MAX_DRAWS {
        let drawn: Vec<usize> = index::sample(rng, entries.len(), pool).into_vec();
        if let Some(row) = least_recent(entries, played, &drawn, rng) {
            return Ok(row);
        }
    }

    // Sparse playlists (mostly control rows) can miss every draw
    let all: Vec<usize> = (0..entries.len()).collect();
    least_recent(entries, played, &all, rng).ok_or(PlaybackError::EmptyPlaylist)
}

fn least_recent<R: Rng + ?Sized>(
    entries: &[PlaylistEntry],
    played: &HashMap<String, DateTime<Utc>>,
    rows: &[usize],
    rng: &mut R,
) -> Option<usize> {
    let stamped: Vec<(Option<DateTime<Utc>>, usize)> = rows
        .iter()
        .filter(|&&row| entries[row].is_playable())
        .map(|&row| (played.get(entries[row].filename()).copied(), row))
        .collect();

    let oldest = stamped.iter().map(|(stamp, _)| *stamp).min()?;
    let tied: Vec<usize> = stamped
        .iter()
        .filter(|(stamp, _)| *stamp == oldest)
        .map(|(_, row)| *row)
        .collect();
    tied.choose(rng).copied()
}
