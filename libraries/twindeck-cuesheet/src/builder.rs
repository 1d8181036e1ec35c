//! Turn parsed segments into a playable index and a playlist row

use crate::error::Result;
use crate::parser::{parse_file, CueSegments};
use std::path::Path;
use twindeck_core::types::escape_markup;
use twindeck_core::{
    CueSheetIndex, CueSheetTrack, MediaInfo, MetadataReader, PlaylistEntry, ReplayGain,
    TrackEntry, FRAMES_PER_SECOND,
};

/// A cue sheet resolved against real media.
#[derive(Debug, Clone)]
pub struct BuiltCueSheet {
    /// Elements with computed durations
    pub index: CueSheetIndex,
    /// Sum of the lengths of all resolved files, in frames
    pub total_frames: u64,
    /// Sheet-global performer
    pub performer: String,
    /// Sheet-global title
    pub title: String,
    /// Highest track number
    pub track_count: u32,
}

/// Resolve every file the sheet references and compute element durations.
///
/// Files are looked up relative to `base_dir`. An element's duration runs
/// to the next index of its track, else index 0 of the next track, else
/// index 1 of the next track, else the end of its file. Elements in files
/// that cannot be read are kept but marked unplayable with zero length.
pub fn build_index(
    segments: &CueSegments,
    base_dir: &Path,
    reader: &dyn MetadataReader,
) -> BuiltCueSheet {
    let global = segments.global();
    let global_performer = global.performer.join(", ");
    let global_title = global.title.join(", ");

    let mut elements = Vec::new();
    let mut current_file: Option<&str> = None;
    let mut pathname = String::new();
    let mut media = MediaInfo::default();
    let mut file_frames = 0u64;
    let mut total_frames = 0u64;

    for (number, segment) in segments.tracks() {
        let mut performer = segment.performer.join(", ");
        let mut title = segment.title.join(", ");
        let album = if segment.album.is_empty() {
            global_title.clone()
        } else {
            segment.album.join(", ")
        };

        for (&index_number, point) in &segment.indices {
            if current_file != Some(point.file.as_str()) {
                current_file = Some(point.file.as_str());
                let path = base_dir.join(&point.file);
                match reader.read(&path) {
                    Ok(info) => {
                        pathname = path.to_string_lossy().into_owned();
                        file_frames = (info.length_secs * FRAMES_PER_SECOND as f64) as u64;
                        total_frames += file_frames;
                        media = info;
                    }
                    Err(e) => {
                        tracing::warn!("Cue sheet file {} unavailable: {}", path.display(), e);
                        pathname.clear();
                        file_frames = 0;
                        media = MediaInfo::default();
                    }
                }
            }

            if performer.is_empty() {
                performer = first_non_empty(&media.artist, &global_performer);
            }
            if title.is_empty() {
                title = first_non_empty(&media.title, &global_title);
            }

            let next_offset = segment
                .indices
                .get(&(index_number + 1))
                .or_else(|| {
                    segments
                        .track(number + 1)
                        .and_then(|next| next.indices.get(&0).or_else(|| next.indices.get(&1)))
                })
                .map_or(file_frames, |p| p.offset);
            let next_offset = if next_offset == 0 { file_frames } else { next_offset };

            let (offset, duration) = if file_frames == 0 {
                (0, 0)
            } else {
                (point.offset, next_offset.saturating_sub(point.offset))
            };

            elements.push(CueSheetTrack {
                pathname: pathname.clone(),
                playable: !pathname.is_empty(),
                track_number: number,
                index_number,
                performer: performer.clone(),
                title: title.clone(),
                offset,
                duration,
                replaygain: if pathname.is_empty() {
                    ReplayGain::DEFAULT
                } else {
                    media.replaygain
                },
                album: album.clone(),
            });
        }
    }

    BuiltCueSheet {
        index: CueSheetIndex::new(elements),
        total_frames,
        performer: global_performer,
        title: global_title,
        track_count: segments.track_count(),
    }
}

fn first_non_empty(preferred: &str, fallback: &str) -> String {
    if preferred.is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}

/// Parse the cue sheet at `path` and wrap it in a playlist row.
///
/// # Errors
/// Returns the parse error; callers fall back to plain media handling.
pub fn cuesheet_entry(path: &Path, reader: &dyn MetadataReader) -> Result<PlaylistEntry> {
    let segments = parse_file(path).map_err(|e| {
        tracing::warn!("Failed reading cue sheet {}: {}", path.display(), e);
        e
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let built = build_index(&segments, base_dir, reader);

    let summary = format!("{} Audio Tracks", built.track_count);
    let metadata = if !built.performer.is_empty() && !built.title.is_empty() {
        if built.title.contains(['(', ')']) {
            format!("{} - {} - [{}]", built.performer, summary, built.title)
        } else {
            format!("{} - {} - ({})", built.performer, summary, built.title)
        }
    } else {
        format!(
            "{} - {}",
            first_non_empty(&built.performer, &built.title),
            summary
        )
    };

    let mut entry = TrackEntry::new(path.to_string_lossy());
    entry.display_markup = format!(
        "<span foreground=\"dark green\">(Cue sheet)</span>{}",
        escape_markup(&metadata)
    );
    entry.length_seconds = (built.total_frames / FRAMES_PER_SECOND + 1) as i64;
    entry.meta_text = metadata;
    entry.title = built.title;
    entry.artist = built.performer;
    entry.cuesheet = Some(built.index);
    Ok(PlaylistEntry::track(entry))
}
