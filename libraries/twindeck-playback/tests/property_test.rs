//! Property-based tests for the playback core
//!
//! Uses proptest to check scheduler, selector and session invariants
//! across many random inputs.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use twindeck_core::{PlaylistEntry, TrackEntry};
use twindeck_playback::mixer::ContextId;
use twindeck_playback::session::{marshall, unmarshall};
use twindeck_playback::{select_random, Countdown, CrossfadeScheduler, SchedulerEvent};

// ===== Helpers =====

fn arbitrary_track() -> impl Strategy<Value = PlaylistEntry> {
    (
        "/[a-z0-9/ü]{1,40}\\.(mp3|flac|ogg)", // filename
        "[A-Za-z0-9 .,:;ü–()-]{0,40}",        // title
        "[A-Za-z0-9 .,ï-]{0,20}",             // artist
        -1i64..36000,                         // length
        "[a-f0-9-]{0,36}",                    // uuid
    )
        .prop_map(|(filename, title, artist, length, uuid)| {
            let mut track = TrackEntry::new(filename);
            track.display_markup = format!("{artist} - {title}");
            track.meta_text = format!("{artist} - {title}");
            track.title = title;
            track.artist = artist;
            track.length_seconds = length;
            track.uuid = uuid;
            PlaylistEntry::track(track)
        })
}

fn create_test_playlist(len: usize) -> Vec<PlaylistEntry> {
    (0..len)
        .map(|i| PlaylistEntry::track(TrackEntry::new(format!("/music/{i:03}.mp3"))))
        .collect()
}

// ===== Property Tests =====

proptest! {
    /// Property: each hand-over action fires at most once per track
    #[test]
    fn scheduler_fires_once_per_track(
        ticks in prop::collection::vec((-5i64..30, any::<bool>()), 1..100)
    ) {
        let mut scheduler = CrossfadeScheduler::new();
        let mut started = 0;
        let mut moved = 0;

        for (crosstime, silent) in ticks {
            let mut events = scheduler.countdown(&Countdown {
                context_id: ContextId(7),
                remaining: crosstime + 5,
                crosstime,
                length_secs: 300.0,
                crossfade_armed: true,
                alarm_eligible: true,
            });
            events.extend(scheduler.observe_signal(!silent, 60, true, true));

            started += events.iter().filter(|e| **e == SchedulerEvent::StartPaired).count();
            moved += events.iter().filter(|e| **e == SchedulerEvent::MoveCrossfader).count();
        }

        prop_assert!(started <= 1, "paired lane started {} times", started);
        prop_assert!(moved <= 1, "crossfader moved {} times", moved);
    }

    /// Property: the alarm sounds once per context id
    #[test]
    fn alarm_once_per_context(repeats in 1usize..20) {
        let mut scheduler = CrossfadeScheduler::new();
        let countdown = Countdown {
            context_id: ContextId(11),
            remaining: 10,
            crosstime: 50,
            length_secs: 120.0,
            crossfade_armed: false,
            alarm_eligible: true,
        };

        let alarms: usize = (0..repeats)
            .map(|_| {
                scheduler.reset();
                scheduler
                    .countdown(&countdown)
                    .iter()
                    .filter(|e| **e == SchedulerEvent::SoundAlarm)
                    .count()
            })
            .sum();
        prop_assert_eq!(alarms, 1);
    }

    /// Property: rows survive a session round trip unchanged
    #[test]
    fn session_row_round_trip(entry in arbitrary_track()) {
        let packed = marshall(&entry);
        prop_assert!(!packed.contains('\n'));
        let restored = unmarshall(&packed, Path::new("/")).unwrap();
        prop_assert_eq!(restored, entry);
    }

    /// Property: recently played tracks lose to never played ones
    #[test]
    fn random_skips_recently_played(seed in any::<u64>(), played in prop::collection::hash_set(0usize..100, 10)) {
        let playlist = create_test_playlist(100);
        let now = Utc::now();
        let history: HashMap<String, _> = played
            .iter()
            .map(|&row| (playlist[row].filename().to_string(), now - Duration::seconds(row as i64)))
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let row = select_random(&playlist, &history, &mut rng).unwrap();

        prop_assert!(row < playlist.len());
        prop_assert!(!played.contains(&row), "picked recently played row {}", row);
    }

    /// Property: the selector only lands on playable rows
    #[test]
    fn random_avoids_unplayable(seed in any::<u64>(), kinds in prop::collection::vec(0u8..3, 1..60)) {
        let playlist: Vec<PlaylistEntry> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| match kind {
                0 => PlaylistEntry::track(TrackEntry::new(format!("/music/{i}.mp3"))),
                1 => PlaylistEntry::control(twindeck_core::ControlMarker::Stop),
                _ => PlaylistEntry::invalid(format!("/music/{i}.gone")),
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        match select_random(&playlist, &HashMap::new(), &mut rng) {
            Ok(row) => prop_assert!(playlist[row].is_playable()),
            Err(_) => prop_assert!(!playlist.iter().any(PlaylistEntry::is_playable)),
        }
    }
}
