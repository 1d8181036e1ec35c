//! Console actor thread
//!
//! One thread owns the [`Console`] and with it every lane. The progress
//! timer and operator commands reach it as messages:
//!
//! ```text
//!   stdin / signals              console thread
//!        │                            │
//!        │  Command::Play(left)       │ select! { tick, command }
//!        │───────────────────────────>│ levels() -> tick_all()
//!        │                            │ drain_events() -> log
//!        │  Command::Shutdown         │
//!        │───────────────────────────>│ save sessions, hand the console back
//! ```

use crate::config::SessionSettings;
use crate::error::{ConsoleError, Result};
use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use twindeck_core::{Deck, LaneRole, PlaylistMode};
use twindeck_metadata::{ElementExpander, ExternalPlaylist, ExternalSource, MediaResolver};
use twindeck_playback::session::{load_session, save_session};
use twindeck_playback::{Console, ConsoleEvent, MixerLink};

const LANES: [LaneRole; 3] = [
    LaneRole::Primary(Deck::Left),
    LaneRole::Primary(Deck::Right),
    LaneRole::Interlude,
];

/// Operator requests for the console thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play(LaneRole),
    Stop(LaneRole),
    Next(LaneRole),
    Previous(LaneRole),
    Skip(LaneRole),
    Select(LaneRole, usize),
    Mode(LaneRole, PlaylistMode),
    Crossfader(u8),
    AnnouncementDone(LaneRole),
    Exchange,
    Shutdown,
}

fn parse_lane(word: Option<&str>) -> std::result::Result<LaneRole, String> {
    match word {
        Some("left") => Ok(LaneRole::Primary(Deck::Left)),
        Some("right") => Ok(LaneRole::Primary(Deck::Right)),
        Some("interlude") => Ok(LaneRole::Interlude),
        Some(other) => Err(format!("unknown lane: {other}")),
        None => Err("missing lane".to_string()),
    }
}

impl FromStr for Command {
    type Err = String;

    /// Parse a line such as `play left`, `select right 4` or `mode left loop all`
    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or("empty command")?;
        let command = match verb {
            "play" => Command::Play(parse_lane(words.next())?),
            "stop" => Command::Stop(parse_lane(words.next())?),
            "next" => Command::Next(parse_lane(words.next())?),
            "prev" | "previous" => Command::Previous(parse_lane(words.next())?),
            "skip" => Command::Skip(parse_lane(words.next())?),
            "done" => Command::AnnouncementDone(parse_lane(words.next())?),
            "select" => {
                let lane = parse_lane(words.next())?;
                let row = words
                    .next()
                    .ok_or("missing row")?
                    .parse()
                    .map_err(|e| format!("bad row: {e}"))?;
                Command::Select(lane, row)
            }
            "mode" => {
                let lane = parse_lane(words.next())?;
                let mode = words.collect::<Vec<_>>().join(" ").parse()?;
                return Ok(Command::Mode(lane, mode));
            }
            "crossfader" | "xf" => {
                let position: u8 = words
                    .next()
                    .ok_or("missing position")?
                    .parse()
                    .map_err(|e| format!("bad position: {e}"))?;
                Command::Crossfader(position.min(100))
            }
            "exchange" => Command::Exchange,
            "quit" | "exit" => Command::Shutdown,
            other => return Err(format!("unknown command: {other}")),
        };
        if let Some(extra) = words.next() {
            return Err(format!("unexpected argument: {extra}"));
        }
        Ok(command)
    }
}

/// Handle to the running console thread.
pub struct Engine<M: MixerLink> {
    commands: Sender<Command>,
    handle: JoinHandle<Console<M>>,
}

impl<M: MixerLink + Send + 'static> Engine<M> {
    /// Move `console` onto its own thread, ticking every `interval`
    pub fn spawn(console: Console<M>, sessions: SessionSettings, interval: Duration) -> Result<Self> {
        let (commands, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("twindeck-console".to_string())
            .spawn(move || run(console, &receiver, &sessions, interval))?;
        Ok(Self { commands, handle })
    }

    /// Queue a command
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ConsoleError::Disconnected)
    }

    /// Stop the thread, saving sessions if configured, and return the console
    pub fn shutdown(self) -> Result<Console<M>> {
        // the thread may already have exited on its own
        let _ = self.commands.send(Command::Shutdown);
        self.handle.join().map_err(|_| ConsoleError::Panicked)
    }
}

fn run<M: MixerLink>(
    mut console: Console<M>,
    commands: &Receiver<Command>,
    sessions: &SessionSettings,
    interval: Duration,
) -> Console<M> {
    tracing::info!("Console thread started (tick {}ms)", interval.as_millis());
    let ticker = tick(interval);

    loop {
        select! {
            recv(ticker) -> _ => {
                match console.mixer_mut().levels() {
                    Ok(levels) => console.tick_all(&levels),
                    Err(e) => tracing::warn!("Mixer levels unavailable: {}", e),
                }
            }
            recv(commands) -> command => match command {
                Ok(Command::Shutdown) | Err(_) => break,
                Ok(command) => apply(&mut console, command),
            },
        }
        log_events(&mut console);
    }

    for role in LANES {
        console.stop(role);
    }
    log_events(&mut console);

    if sessions.save_on_exit {
        if let Err(e) = save_sessions(&console, sessions) {
            tracing::error!("Failed to save sessions: {}", e);
        }
    }
    tracing::info!("Console thread stopped");
    console
}

fn apply<M: MixerLink>(console: &mut Console<M>, command: Command) {
    tracing::debug!(?command, "console command");
    match command {
        Command::Play(role) => {
            console.play(role);
        }
        Command::Stop(role) => console.stop(role),
        Command::Next(role) => console.next(role),
        Command::Previous(role) => console.previous(role),
        Command::Skip(role) => console.skip(role),
        Command::Select(role, row) => {
            if row < console.lane(role).playlist().len() {
                console.select(role, Some(row));
            } else {
                tracing::warn!(lane = %role, row, "no such row");
            }
        }
        Command::Mode(role, mode) => {
            if let Err(e) = console.set_mode(role, mode) {
                tracing::warn!(lane = %role, "{}", e);
            }
        }
        Command::Crossfader(position) => console.set_crossfader(position),
        Command::AnnouncementDone(role) => console.announcement_done(role),
        Command::Exchange => console.exchange_playlists(),
        Command::Shutdown => {}
    }
}

fn log_events<M: MixerLink>(console: &mut Console<M>) {
    for event in console.drain_events() {
        match event {
            ConsoleEvent::Started {
                lane,
                row,
                context_id,
            } => tracing::info!(%lane, row, %context_id, "Started"),
            ConsoleEvent::NowPlaying { lane, info } => {
                tracing::info!(%lane, "Now playing: {} - {}", info.artist, info.title);
            }
            ConsoleEvent::StartFailed { lane, filename } => {
                tracing::warn!(%lane, "Mixer could not start {}", filename);
            }
            ConsoleEvent::DjAlarm { deck, sound } => {
                tracing::warn!(%deck, sound, "Ten seconds to stop");
            }
            ConsoleEvent::MicrophoneOpen { marker } => {
                tracing::info!(%marker, "Microphones open");
            }
            ConsoleEvent::Announcement {
                lane,
                announcement,
                ..
            } => tracing::info!(
                %lane,
                countdown = announcement.countdown_secs,
                "Announcement: {}",
                announcement.message
            ),
            ConsoleEvent::StopStreaming => tracing::warn!("Playlist requests stream stop"),
            ConsoleEvent::StopRecording => tracing::warn!("Playlist requests recorder stop"),
            ConsoleEvent::ExternalExhausted { lane } => {
                tracing::warn!(%lane, "External playlist exhausted");
            }
            ConsoleEvent::EmptyPlaylist { lane } => {
                tracing::warn!(%lane, "Nothing to play");
            }
            other => tracing::debug!(event = ?other, "console event"),
        }
    }
}

/// Load every lane's session file into `console`
///
/// Damaged rows are logged and skipped. A lane whose file cannot be read
/// at all starts empty. A lane left in External mode gets its feed rebuilt
/// from the saved playlist file or directory.
pub fn restore_sessions<M: MixerLink>(
    console: &mut Console<M>,
    sessions: &SessionSettings,
    resolver: &MediaResolver,
) {
    for role in LANES {
        let path = sessions.path(role);
        let load = match load_session(&path) {
            Ok(load) => load,
            Err(e) => {
                tracing::warn!(lane = %role, "Cannot read {}: {}", path.display(), e);
                continue;
            }
        };
        let lane = console.lane_mut(role);
        for warning in load.apply(lane, resolver) {
            tracing::warn!(lane = %role, "{}: {}", path.display(), warning);
        }

        let source = external_source(
            lane.settings.extlist.as_deref(),
            lane.settings.extdir.as_deref(),
        );
        if let Some(source) = source {
            tracing::info!(lane = %role, "External source {}", source.path().display());
            let feed = ExternalPlaylist::new(source, ElementExpander::new(resolver.clone()));
            lane.set_external(Box::new(feed));
        }
        tracing::info!(
            lane = %role,
            rows = lane.playlist().len(),
            mode = %lane.mode(),
            "Session restored"
        );
    }
}

fn external_source(extlist: Option<&Path>, extdir: Option<&Path>) -> Option<ExternalSource> {
    if let Some(path) = extlist.filter(|path| path.is_file()) {
        return Some(ExternalSource::PlaylistFile(path.to_path_buf()));
    }
    extdir
        .filter(|path| path.is_dir())
        .map(|path| ExternalSource::Directory(path.to_path_buf()))
}

/// Write every lane's session file
pub fn save_sessions<M: MixerLink>(console: &Console<M>, sessions: &SessionSettings) -> Result<()> {
    fs::create_dir_all(&sessions.directory)?;
    for role in LANES {
        save_session(&sessions.path(role), console.lane(role))?;
    }
    tracing::info!("Sessions saved to {}", sessions.directory.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT: LaneRole = LaneRole::Primary(Deck::Left);

    #[test]
    fn test_parse_commands() {
        assert_eq!("play left".parse(), Ok(Command::Play(LEFT)));
        assert_eq!(
            "  select interlude 4 ".parse(),
            Ok(Command::Select(LaneRole::Interlude, 4))
        );
        assert_eq!("xf 250".parse(), Ok(Command::Crossfader(100)));
        assert_eq!(
            "mode right loop all".parse(),
            Ok(Command::Mode(LaneRole::Primary(Deck::Right), PlaylistMode::LoopAll))
        );
        assert_eq!("skip right".parse(), Ok(Command::Skip(LaneRole::Primary(Deck::Right))));
        assert_eq!("quit".parse(), Ok(Command::Shutdown));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Command>().is_err());
        assert!("play".parse::<Command>().is_err());
        assert!("play middle".parse::<Command>().is_err());
        assert!("stop left now".parse::<Command>().is_err());
        assert!("select left x".parse::<Command>().is_err());
        assert!("mode left sideways".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }
}
