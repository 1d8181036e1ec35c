//! Property-based tests for the cue sheet parser and index builder

use proptest::prelude::*;
use std::path::Path;
use twindeck_core::{DeckError, MediaInfo, MetadataReader, FRAMES_PER_SECOND};
use twindeck_cuesheet::{build_index, parse_lines};

// ===== Helpers =====

struct FixedLength(f64);

impl MetadataReader for FixedLength {
    fn read(&self, path: &Path) -> twindeck_core::Result<MediaInfo> {
        if path.ends_with("set.wav") {
            Ok(MediaInfo {
                length_secs: self.0,
                ..MediaInfo::default()
            })
        } else {
            Err(DeckError::metadata("unexpected file"))
        }
    }
}

fn stamp(frames: u64) -> String {
    let mm = frames / (FRAMES_PER_SECOND * 60);
    let ss = frames / FRAMES_PER_SECOND % 60;
    let ff = frames % FRAMES_PER_SECOND;
    format!("{mm:02}:{ss:02}:{ff:02}")
}

/// A well-formed single-file sheet: per track a gap before INDEX 01, an
/// optional INDEX 00 inside that gap and an optional INDEX 02 after it
fn arbitrary_sheet() -> impl Strategy<Value = (Vec<String>, u64)> {
    prop::collection::vec((10u64..20_000, any::<bool>(), any::<bool>()), 1..12).prop_map(
        |tracks| {
            let mut lines = vec!["FILE set.wav WAVE".to_string()];
            let mut at = 0u64;
            for (i, (gap, pregap, subindex)) in tracks.iter().enumerate() {
                lines.push(format!("TRACK {:02} AUDIO", i + 1));
                if i == 0 {
                    lines.push("INDEX 01 00:00:00".to_string());
                } else {
                    if *pregap {
                        lines.push(format!("INDEX 00 {}", stamp(at + gap / 2)));
                    }
                    at += gap;
                    lines.push(format!("INDEX 01 {}", stamp(at)));
                }
                if *subindex {
                    at += 5;
                    lines.push(format!("INDEX 02 {}", stamp(at)));
                }
            }
            (lines, at)
        },
    )
}

// ===== Property Tests =====

proptest! {
    /// Property: well-formed sheets parse and offsets never go backwards within a track
    #[test]
    fn offsets_non_decreasing((lines, _) in arbitrary_sheet()) {
        let segments = parse_lines(&lines).unwrap();
        for (_, track) in segments.tracks() {
            let offsets: Vec<u64> = track.indices.values().map(|p| p.offset).collect();
            prop_assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(track.indices.contains_key(&1));
        }
    }

    /// Property: playable durations cover the whole file
    #[test]
    fn durations_sum_to_file_length((lines, last) in arbitrary_sheet(), tail in 1u64..600) {
        let segments = parse_lines(&lines).unwrap();
        let length_secs = (last / FRAMES_PER_SECOND + tail) as f64;
        let built = build_index(&segments, Path::new("/m"), &FixedLength(length_secs));
        prop_assert_eq!(
            built.index.total_frames(),
            (length_secs * FRAMES_PER_SECOND as f64) as u64
        );
    }

    /// Property: a frame field above 74 is always rejected
    #[test]
    fn frame_field_out_of_range_fails(ff in 75u64..100) {
        let lines = [
            "FILE set.wav WAVE".to_string(),
            "TRACK 01 AUDIO".to_string(),
            "INDEX 01 00:00:00".to_string(),
            "TRACK 02 AUDIO".to_string(),
            format!("INDEX 01 01:00:{ff}"),
        ];
        let err = parse_lines(&lines).unwrap_err();
        prop_assert_eq!(err.line, Some(5));
    }
}
