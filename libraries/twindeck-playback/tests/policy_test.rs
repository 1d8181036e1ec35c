//! End-of-track policy tests
//!
//! One scenario per playlist mode and per control row.

use twindeck_core::{
    ControlMarker, Deck, FadeMode, LaneRole, PlaylistEntry, PlaylistMode, TrackEntry,
};
use twindeck_playback::{decide, Decision, Effect, EndOfTrackAction, PolicyInput, Trigger};

// ===== Test Helpers =====

const LEFT: LaneRole = LaneRole::Primary(Deck::Left);

fn track(name: &str) -> PlaylistEntry {
    let mut entry = TrackEntry::new(format!("/music/{name}.mp3"));
    entry.length_seconds = 120;
    PlaylistEntry::track(entry)
}

fn control(marker: ControlMarker) -> PlaylistEntry {
    PlaylistEntry::control(marker)
}

fn decide_for(
    playlist: &[PlaylistEntry],
    playing: usize,
    mode: PlaylistMode,
    role: LaneRole,
) -> Decision {
    decide(&PolicyInput {
        playlist,
        playing: Some(playing),
        mode,
        role,
        crossfader: 0,
        trigger: Trigger::EndOfTrack,
    })
}

/// Play All end of track on row 0 of `[A, marker, B]`
fn marker_decision(marker: ControlMarker) -> Decision {
    let playlist = [track("a"), control(marker), track("b")];
    decide_for(&playlist, 0, PlaylistMode::PlayAll, LEFT)
}

fn stop_at(select: Option<usize>) -> EndOfTrackAction {
    EndOfTrackAction::Stop { select }
}

// ===== Modes =====

#[test]
fn test_manual_stops() {
    let playlist = [track("a"), track("b")];
    let decision = decide_for(&playlist, 0, PlaylistMode::Manual, LEFT);
    assert_eq!(decision.action, stop_at(None));
    assert!(decision.before.is_empty() && decision.after.is_empty());
}

#[test]
fn test_loop_all_wraps_past_controls() {
    let playlist = [
        control(ControlMarker::Stop),
        track("a"),
        track("b"),
        control(ControlMarker::Transfer),
    ];
    let decision = decide_for(&playlist, 1, PlaylistMode::LoopAll, LEFT);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceTo { row: 2, play: true }
    );

    let decision = decide_for(&playlist, 2, PlaylistMode::LoopAll, LEFT);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceToFirst { row: 1, play: true }
    );
}

#[test]
fn test_cue_up_selects_without_playing() {
    let playlist = [track("a"), control(ControlMarker::Stop), track("b")];
    let decision = decide_for(&playlist, 0, PlaylistMode::CueUp, LEFT);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceTo { row: 2, play: false }
    );
}

#[test]
fn test_fade_over_only_selects() {
    let playlist = [track("a"), track("b")];
    let decision = decide_for(&playlist, 1, PlaylistMode::FadeOver, LEFT);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceToFirst { row: 0, play: false }
    );
    assert!(decision.after.is_empty());
}

#[test]
fn test_all_control_playlist_parks_on_top() {
    let playlist = [control(ControlMarker::Stop), control(ControlMarker::Crossfade)];
    let decision = decide_for(&playlist, 0, PlaylistMode::LoopAll, LEFT);
    assert_eq!(decision.action, stop_at(Some(0)));
}

#[test]
fn test_random_and_external() {
    let playlist = [track("a"), track("b")];
    assert_eq!(
        decide_for(&playlist, 0, PlaylistMode::Random, LEFT).action,
        EndOfTrackAction::PlayRandom
    );
    assert_eq!(
        decide_for(&playlist, 1, PlaylistMode::External, LEFT).action,
        EndOfTrackAction::RequestExternalNext { row: 1 }
    );
}

#[test]
fn test_random_needs_no_playing_row() {
    let playlist = [track("a")];
    let decision = decide(&PolicyInput {
        playlist: &playlist,
        playing: None,
        mode: PlaylistMode::Random,
        role: LEFT,
        crossfader: 0,
        trigger: Trigger::Skip,
    });
    assert_eq!(decision.action, EndOfTrackAction::PlayRandom);
}

#[test]
fn test_idle_lane_stops() {
    let playlist = [track("a")];
    let decision = decide(&PolicyInput {
        playlist: &playlist,
        playing: None,
        mode: PlaylistMode::PlayAll,
        role: LEFT,
        crossfader: 0,
        trigger: Trigger::EndOfTrack,
    });
    assert_eq!(decision.action, stop_at(None));
}

#[test]
fn test_alternate_hands_over() {
    let playlist = [track("a"), control(ControlMarker::Stop), track("b")];
    let decision = decide_for(&playlist, 0, PlaylistMode::Alternate, LaneRole::Primary(Deck::Right));
    assert_eq!(decision.action, stop_at(Some(2)));
    assert_eq!(
        decision.after,
        [Effect::PassCrossfader(Deck::Left), Effect::StartPaired]
    );
}

#[test]
fn test_random_hop_delegates() {
    let playlist = [track("a"), track("b")];
    let decision = decide_for(&playlist, 1, PlaylistMode::RandomHop, LEFT);
    assert_eq!(decision.action, stop_at(Some(0)));
    assert_eq!(
        decision.after,
        [
            Effect::PassCrossfader(Deck::Right),
            Effect::DelegatePaired(PlaylistMode::Random)
        ]
    );
}

#[test]
fn test_interlude_cannot_pair() {
    let playlist = [track("a"), track("b")];
    let decision = decide_for(&playlist, 0, PlaylistMode::Alternate, LaneRole::Interlude);
    assert_eq!(decision.action, stop_at(None));
    assert!(decision.after.is_empty());
}

#[test]
fn test_controls_ignored_outside_play_all() {
    let playlist = [track("a"), control(ControlMarker::JumpToTop), track("b")];
    let decision = decide_for(&playlist, 0, PlaylistMode::LoopAll, LEFT);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceTo { row: 2, play: true }
    );
}

// ===== Control rows =====

#[test]
fn test_crossfade_marker() {
    let decision = marker_decision(ControlMarker::Crossfade);
    assert_eq!(decision.action, stop_at(Some(2)));
    assert_eq!(decision.after, [Effect::PassCrossfader(Deck::Right)]);
}

#[test]
fn test_stop_markers() {
    for marker in [ControlMarker::Stop, ControlMarker::Stop2] {
        let decision = marker_decision(marker);
        assert_eq!(decision.action, stop_at(Some(2)));
        assert_eq!(decision.before, [Effect::OpenMicrophone(marker)]);
    }
}

#[test]
fn test_stop_marker_when_right_is_dominant() {
    let playlist = [track("a"), control(ControlMarker::Stop)];
    let decision = decide(&PolicyInput {
        playlist: &playlist,
        playing: Some(0),
        mode: PlaylistMode::PlayAll,
        role: LEFT,
        crossfader: 75,
        trigger: Trigger::EndOfTrack,
    });
    assert_eq!(decision.action, stop_at(Some(0)));
    assert!(decision.before.is_empty());
}

#[test]
fn test_transfer_marker() {
    let decision = marker_decision(ControlMarker::Transfer);
    assert_eq!(decision.action, stop_at(Some(2)));
    assert_eq!(
        decision.before,
        [Effect::PassCrossfader(Deck::Right), Effect::StartPaired]
    );
}

#[test]
fn test_announcement_marker() {
    let decision = marker_decision(ControlMarker::Announcement);
    assert_eq!(decision.action, stop_at(Some(2)));
    assert_eq!(decision.before, [Effect::OpenAnnouncement { row: 1 }]);
}

#[test]
fn test_jump_to_top_marker() {
    let decision = marker_decision(ControlMarker::JumpToTop);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceToFirst { row: 0, play: true }
    );
}

#[test]
fn test_broadcast_markers_keep_playing() {
    for (marker, effect) in [
        (ControlMarker::StopStreaming, Effect::StopStreaming),
        (ControlMarker::StopRecording, Effect::StopRecording),
    ] {
        let decision = marker_decision(marker);
        assert_eq!(
            decision.action,
            EndOfTrackAction::AdvanceTo { row: 2, play: true }
        );
        assert_eq!(decision.after, [effect]);
    }
}

#[test]
fn test_fade_markers() {
    let decision = marker_decision(ControlMarker::Fade5);
    assert_eq!(decision.before, [Effect::SetFade(FadeMode::Five)]);
    assert_eq!(decision.after, [Effect::SetFade(FadeMode::None)]);

    let decision = marker_decision(ControlMarker::Fade10);
    assert_eq!(decision.before, [Effect::SetFade(FadeMode::Ten)]);

    let decision = marker_decision(ControlMarker::FadeNone);
    assert!(decision.before.is_empty());
    assert_eq!(decision.after, [Effect::SetFade(FadeMode::None)]);
    assert_eq!(
        decision.action,
        EndOfTrackAction::AdvanceTo { row: 2, play: true }
    );
}

#[test]
fn test_normal_speed_marker() {
    let decision = marker_decision(ControlMarker::NormalSpeed);
    assert_eq!(decision.before, [Effect::ResetSpeed]);
}

#[test]
fn test_marker_as_last_row() {
    let playlist = [track("a"), control(ControlMarker::Fade5)];
    let decision = decide_for(&playlist, 0, PlaylistMode::PlayAll, LEFT);
    assert_eq!(decision.action, stop_at(Some(0)));
}

#[test]
fn test_playing_control_row_is_interpreted() {
    let playlist = [control(ControlMarker::Crossfade), track("a")];
    let decision = decide_for(&playlist, 0, PlaylistMode::PlayAll, LEFT);
    assert_eq!(decision.action, stop_at(Some(1)));
    assert_eq!(decision.after, [Effect::PassCrossfader(Deck::Right)]);
}
