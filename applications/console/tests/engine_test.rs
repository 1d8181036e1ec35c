//! Console thread tests
//!
//! Drives the actor thread with a scripted mixer and checks the session
//! files it leaves behind.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use twindeck_console::config::SessionSettings;
use twindeck_console::{restore_sessions, save_sessions, Command, Engine};
use twindeck_core::{Deck, FadeMode, LaneRole, PlaylistEntry, PlaylistMode, TrackEntry};
use twindeck_metadata::{LoftyMetadataReader, MediaResolver};
use twindeck_playback::session::load_session;
use twindeck_playback::{
    Console, ContextId, DeckPreferences, MixerLevels, MixerLink, PlayRequest,
};

// ===== Test Helpers =====

const LEFT: LaneRole = LaneRole::Primary(Deck::Left);
const RIGHT: LaneRole = LaneRole::Primary(Deck::Right);

/// Mixer that accepts everything and records requests
#[derive(Clone, Default)]
struct StubMixer {
    log: Arc<Mutex<Vec<String>>>,
    issued: i64,
}

impl StubMixer {
    fn push(&self, line: String) {
        self.log.lock().unwrap().push(line);
    }
}

impl MixerLink for StubMixer {
    fn play(&mut self, request: &PlayRequest<'_>) -> ContextId {
        self.push(format!("play {}", request.lane));
        self.issued += 2;
        ContextId(self.issued - 1)
    }

    fn restart(&mut self, lane: LaneRole, _path: &str, _seek_secs: i64) -> ContextId {
        self.push(format!("restart {lane}"));
        self.issued += 2;
        ContextId(self.issued - 1)
    }

    fn stop(&mut self, lane: LaneRole) -> twindeck_playback::Result<()> {
        self.push(format!("stop {lane}"));
        Ok(())
    }

    fn set_fade(&mut self, lane: LaneRole, fade: FadeMode) -> twindeck_playback::Result<()> {
        self.push(format!("fade {lane} {fade:?}"));
        Ok(())
    }

    fn levels(&mut self) -> twindeck_playback::Result<MixerLevels> {
        Ok(MixerLevels::default())
    }
}

fn create_test_sessions(dir: &TempDir) -> SessionSettings {
    SessionSettings {
        directory: dir.path().join("session"),
        ..SessionSettings::default()
    }
}

fn create_test_track(dir: &TempDir, name: &str) -> PlaylistEntry {
    let path = dir.path().join(format!("{name}.mp3"));
    fs::write(&path, b"").unwrap();
    let mut track = TrackEntry::new(path.to_string_lossy());
    track.display_markup = name.to_string();
    track.length_seconds = 200;
    PlaylistEntry::track(track)
}

/// A tick long enough that no progress tick fires during a test
const IDLE_TICK: Duration = Duration::from_secs(3600);

// ===== Tests =====

#[test]
fn test_commands_reach_console_and_sessions_are_saved() {
    let dir = TempDir::new().unwrap();
    let sessions = create_test_sessions(&dir);
    let mixer = StubMixer::default();
    let log = Arc::clone(&mixer.log);

    let rows = vec![create_test_track(&dir, "a"), create_test_track(&dir, "b")];
    let mut console = Console::new(mixer, DeckPreferences::default());
    console.lane_mut(LEFT).set_playlist(rows.clone());

    let engine = Engine::spawn(console, sessions.clone(), IDLE_TICK).unwrap();
    engine.send(Command::Select(LEFT, 1)).unwrap();
    engine.send(Command::Mode(LEFT, PlaylistMode::LoopAll)).unwrap();
    engine.send(Command::Play(LEFT)).unwrap();
    engine.send(Command::Crossfader(30)).unwrap();
    let console = engine.shutdown().unwrap();

    assert_eq!(console.crossfader(), 30);
    assert!(!console.lane(LEFT).is_playing());
    let log = log.lock().unwrap().clone();
    assert!(log.contains(&"play left".to_string()));
    assert!(log.contains(&"stop left".to_string()));

    let load = load_session(&sessions.path(LEFT)).unwrap();
    assert_eq!(load.entries, rows);
    assert_eq!(load.settings.mode, PlaylistMode::LoopAll);
    assert_eq!(load.select, Some(1));
    assert!(sessions.path(RIGHT).exists());
    assert!(sessions.path(LaneRole::Interlude).exists());
}

#[test]
fn test_bad_rows_and_modes_are_ignored() {
    let dir = TempDir::new().unwrap();
    let mut sessions = create_test_sessions(&dir);
    sessions.save_on_exit = false;

    let console = Console::new(StubMixer::default(), DeckPreferences::default());
    let engine = Engine::spawn(console, sessions.clone(), IDLE_TICK).unwrap();
    engine.send(Command::Select(RIGHT, 12)).unwrap();
    engine
        .send(Command::Mode(LaneRole::Interlude, PlaylistMode::Alternate))
        .unwrap();
    let console = engine.shutdown().unwrap();

    assert_eq!(console.lane(RIGHT).selected(), None);
    assert_ne!(console.lane(LaneRole::Interlude).mode(), PlaylistMode::Alternate);
    assert!(!sessions.directory.exists());
}

#[test]
fn test_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let sessions = create_test_sessions(&dir);
    let rows = vec![
        create_test_track(&dir, "a"),
        PlaylistEntry::control(twindeck_core::ControlMarker::Transfer),
    ];

    let mut console = Console::new(StubMixer::default(), DeckPreferences::default());
    console.lane_mut(RIGHT).set_playlist(rows.clone());
    save_sessions(&console, &sessions).unwrap();

    let resolver = MediaResolver::new(Arc::new(LoftyMetadataReader::new()));
    let mut restored = Console::new(StubMixer::default(), DeckPreferences::default());
    restore_sessions(&mut restored, &sessions, &resolver);

    assert_eq!(restored.lane(RIGHT).playlist(), rows.as_slice());
    assert!(restored.lane(LEFT).playlist().is_empty());
}

#[test]
fn test_unreadable_session_leaves_lane_empty() {
    let dir = TempDir::new().unwrap();
    let sessions = create_test_sessions(&dir);
    let rows = vec![create_test_track(&dir, "a")];

    let mut console = Console::new(StubMixer::default(), DeckPreferences::default());
    console.lane_mut(RIGHT).set_playlist(rows.clone());
    save_sessions(&console, &sessions).unwrap();

    // a directory where the left session file should be cannot be read
    fs::remove_file(sessions.path(LEFT)).unwrap();
    fs::create_dir(sessions.path(LEFT)).unwrap();
    fs::write(
        sessions.path(LaneRole::Interlude),
        b"playlist_mode=1\nplsave_folder=/m\xfcsica\n",
    )
    .unwrap();

    let resolver = MediaResolver::new(Arc::new(LoftyMetadataReader::new()));
    let mut restored = Console::new(StubMixer::default(), DeckPreferences::default());
    restore_sessions(&mut restored, &sessions, &resolver);

    assert!(restored.lane(LEFT).playlist().is_empty());
    assert_eq!(restored.lane(RIGHT).playlist(), rows.as_slice());
    assert_eq!(
        restored.lane(LaneRole::Interlude).mode(),
        PlaylistMode::LoopAll
    );
}

#[test]
fn test_skip_moves_to_next_row() {
    let dir = TempDir::new().unwrap();
    let mut sessions = create_test_sessions(&dir);
    sessions.save_on_exit = false;
    let mixer = StubMixer::default();
    let log = Arc::clone(&mixer.log);

    let rows = vec![create_test_track(&dir, "a"), create_test_track(&dir, "b")];
    let mut console = Console::new(mixer, DeckPreferences::default());
    console.lane_mut(LEFT).set_playlist(rows);
    console.set_mode(LEFT, PlaylistMode::PlayAll).unwrap();

    let engine = Engine::spawn(console, sessions, IDLE_TICK).unwrap();
    engine.send(Command::Play(LEFT)).unwrap();
    engine.send(Command::Skip(LEFT)).unwrap();
    engine.send(Command::Skip(RIGHT)).unwrap();
    let console = engine.shutdown().unwrap();

    let plays = log
        .lock()
        .unwrap()
        .iter()
        .filter(|line| *line == "play left")
        .count();
    assert_eq!(plays, 2);
    assert_eq!(console.lane(LEFT).selected(), Some(1));
    assert!(log.lock().unwrap().iter().all(|line| line != "play right"));
}

#[test]
fn test_send_after_shutdown_fails() {
    let dir = TempDir::new().unwrap();
    let mut sessions = create_test_sessions(&dir);
    sessions.save_on_exit = false;

    let console = Console::new(StubMixer::default(), DeckPreferences::default());
    let engine = Engine::spawn(console, sessions, IDLE_TICK).unwrap();
    engine.send(Command::Shutdown).unwrap();
    // a second shutdown only finds the thread already gone
    assert!(engine.shutdown().is_ok());
}
