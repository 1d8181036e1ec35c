//! Property-based tests for the cue sheet index
//!
//! Uses proptest to check remaining-time and cursor invariants over
//! randomly laid out sub-tracks.

use proptest::prelude::*;
use twindeck_core::{CueSheetIndex, CueSheetTrack, ReplayGain, FRAMES_PER_SECOND};

// ===== Helpers =====

/// Contiguous elements built from (duration, playable) pairs
fn build_index(layout: &[(u64, bool)]) -> CueSheetIndex {
    let mut offset = 0;
    let tracks = layout
        .iter()
        .enumerate()
        .map(|(i, &(duration, playable))| {
            let track = CueSheetTrack {
                pathname: if playable { "/music/set.flac".to_string() } else { String::new() },
                playable,
                track_number: i as u32 + 1,
                index_number: 1,
                performer: String::new(),
                title: String::new(),
                offset,
                duration,
                replaygain: ReplayGain::DEFAULT,
                album: String::new(),
            };
            offset += duration;
            track
        })
        .collect();
    CueSheetIndex::new(tracks)
}

fn arbitrary_layout() -> impl Strategy<Value = Vec<(u64, bool)>> {
    prop::collection::vec((1u64..20_000, prop::bool::weighted(0.8)), 1..20)
}

// ===== Property Tests =====

proptest! {
    /// Property: time remaining never grows as the play point advances
    #[test]
    fn time_remaining_is_non_increasing(
        layout in arbitrary_layout(),
        points in prop::collection::vec(0.0f64..5_000.0, 2..40)
    ) {
        let index = build_index(&layout);
        let mut points = points;
        points.sort_by(f64::total_cmp);

        let mut last = f64::INFINITY;
        for point in points {
            let remaining = index.time_remaining(point);
            prop_assert!(remaining <= last + 1e-9, "remaining grew at {}", point);
            prop_assert!(remaining >= 0.0);
            last = remaining;
        }
    }

    /// Property: nothing remains once the last playable element has ended
    #[test]
    fn time_remaining_reaches_zero(layout in arbitrary_layout()) {
        let index = build_index(&layout);
        let end = index
            .tracks()
            .iter()
            .filter(|t| t.playable)
            .map(CueSheetTrack::end)
            .max()
            .unwrap_or(0);
        let at_end = end as f64 / FRAMES_PER_SECOND as f64;
        prop_assert_eq!(index.time_remaining(at_end), 0.0);
        prop_assert!(
            (index.time_remaining(0.0) - index.total_frames() as f64 / FRAMES_PER_SECOND as f64).abs() < 1e-9
        );
    }

    /// Property: element() only ever reports playable elements containing the point
    #[test]
    fn element_contains_point(layout in arbitrary_layout(), point in 0.0f64..5_000.0) {
        let mut index = build_index(&layout);
        if let Some(track) = index.element(point) {
            let frames = point * FRAMES_PER_SECOND as f64;
            prop_assert!(track.playable);
            prop_assert!(frames < track.end() as f64);
        }
    }
}
