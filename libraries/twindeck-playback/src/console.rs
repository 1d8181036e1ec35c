//! The two-lane console
//!
//! Owns the left, right and interlude lanes, the crossfader and the play
//! history, and drives the mixer. Every operation runs to completion on the
//! caller's thread; notifications for the outside world (UI, stream
//! metadata, microphone control) queue up as [`ConsoleEvent`]s and are
//! collected with [`Console::drain_events`].

use crate::history::PlayHistory;
use crate::lane::{Lane, NowPlaying};
use crate::mixer::{ContextId, LaneStatus, MixerLevels, MixerLink, PlayRequest};
use crate::policy::{self, Decision, Effect, EndOfTrackAction, PolicyInput, Trigger};
use crate::prefs::DeckPreferences;
use crate::random;
use crate::scheduler::{Countdown, SchedulerEvent};
use std::path::Path;
use std::time::{Duration, Instant};
use twindeck_core::{
    Announcement, ControlMarker, Deck, FadeMode, LaneRole, PlaylistEntry, PlaylistMode,
    FRAMES_PER_SECOND,
};

/// Policy evaluations allowed per call before giving up on a chain of
/// immediately ending rows
const MAX_SETTLE_ROUNDS: usize = 64;

/// Delay between reaching the alarm point and sounding the DJ alarm
pub const DJ_ALARM_DELAY: Duration = Duration::from_secs(1);

/// Every lane role, left first
const LANES: [LaneRole; 3] = [
    LaneRole::Primary(Deck::Left),
    LaneRole::Primary(Deck::Right),
    LaneRole::Interlude,
];

/// Notifications produced by console operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// A row started
    Started {
        /// Lane
        lane: LaneRole,
        /// Row started
        row: usize,
        /// Mixer context
        context_id: ContextId,
    },
    /// The mixer could not start a row
    StartFailed {
        /// Lane
        lane: LaneRole,
        /// File that failed
        filename: String,
    },
    /// A lane stopped
    Stopped {
        /// Lane
        lane: LaneRole,
    },
    /// The selection cursor moved
    SelectionChanged {
        /// Lane
        lane: LaneRole,
        /// New selection
        row: Option<usize>,
    },
    /// Stream metadata changed
    NowPlaying {
        /// Lane
        lane: LaneRole,
        /// What is playing
        info: NowPlaying,
    },
    /// The crossfader moved
    CrossfaderMoved {
        /// New position, 0 (left) to 100 (right)
        position: u8,
    },
    /// Microphones should open for a stop marker
    MicrophoneOpen {
        /// `Stop` or `Stop2`
        marker: ControlMarker,
    },
    /// Microphones should close after an announcement
    MicrophonesClosed,
    /// Show the announcement dialog
    Announcement {
        /// Lane
        lane: LaneRole,
        /// Announcement row
        row: usize,
        /// Countdown and text
        announcement: Announcement,
    },
    /// Halt every stream
    StopStreaming,
    /// Halt every recorder
    StopRecording,
    /// Ten seconds left before the lane stops
    DjAlarm {
        /// Deck that is ending
        deck: Deck,
        /// Sound the alarm as well as notifying
        sound: bool,
    },
    /// Playback speed reset by a `>normalspeed` row
    SpeedReset {
        /// Lane
        lane: LaneRole,
    },
    /// External mode has nothing more to play
    ExternalExhausted {
        /// Lane
        lane: LaneRole,
    },
    /// Random mode found nothing to play
    EmptyPlaylist {
        /// Lane
        lane: LaneRole,
    },
}

/// Where copied rows land in the paired lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDestination {
    /// Before the first row
    Start,
    /// After the last row
    End,
    /// Before the paired lane's selection
    Before,
    /// After the paired lane's selection
    After,
}

/// Two crossfaded lanes, an interlude lane and the mixer behind them.
pub struct Console<M: MixerLink> {
    mixer: M,
    left: Lane,
    right: Lane,
    interlude: Lane,
    crossfader: u8,
    prefs: DeckPreferences,
    history: PlayHistory,
    streaming: bool,
    recording: bool,
    pending_events: Vec<ConsoleEvent>,
    pending_alarms: Vec<PendingAlarm>,
}

/// A DJ alarm waiting for its delay to run out
#[derive(Debug, Clone, Copy)]
struct PendingAlarm {
    deck: Deck,
    sound: bool,
    due: Instant,
}

impl<M: MixerLink> Console<M> {
    /// Create a console with empty lanes and the crossfader fully left
    pub fn new(mixer: M, prefs: DeckPreferences) -> Self {
        Self {
            mixer,
            left: Lane::new(LaneRole::Primary(Deck::Left)),
            right: Lane::new(LaneRole::Primary(Deck::Right)),
            interlude: Lane::new(LaneRole::Interlude),
            crossfader: 0,
            prefs,
            history: PlayHistory::new(),
            streaming: false,
            recording: false,
            pending_events: Vec::new(),
            pending_alarms: Vec::new(),
        }
    }

    /// A lane
    pub fn lane(&self, role: LaneRole) -> &Lane {
        match role {
            LaneRole::Primary(Deck::Left) => &self.left,
            LaneRole::Primary(Deck::Right) => &self.right,
            LaneRole::Interlude => &self.interlude,
        }
    }

    /// A lane, mutably
    pub fn lane_mut(&mut self, role: LaneRole) -> &mut Lane {
        match role {
            LaneRole::Primary(Deck::Left) => &mut self.left,
            LaneRole::Primary(Deck::Right) => &mut self.right,
            LaneRole::Interlude => &mut self.interlude,
        }
    }

    /// The mixer link
    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    /// The mixer link, mutably (for levels polling)
    pub fn mixer_mut(&mut self) -> &mut M {
        &mut self.mixer
    }

    /// Preferences
    pub fn prefs(&self) -> &DeckPreferences {
        &self.prefs
    }

    /// Replace the preferences
    pub fn set_prefs(&mut self, prefs: DeckPreferences) {
        self.prefs = prefs;
    }

    /// Crossfader position, 0 (left) to 100 (right)
    pub fn crossfader(&self) -> u8 {
        self.crossfader
    }

    /// Move the crossfader
    pub fn set_crossfader(&mut self, position: u8) {
        self.crossfader = position.min(100);
    }

    /// Last-played history
    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    /// Tell the console whether streams or recorders are running
    pub fn set_broadcast(&mut self, streaming: bool, recording: bool) {
        self.streaming = streaming;
        self.recording = recording;
    }

    /// Take the queued notifications
    pub fn drain_events(&mut self) -> Vec<ConsoleEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn emit(&mut self, event: ConsoleEvent) {
        self.pending_events.push(event);
    }

    /// Whether a stream or recorder is running, which picks the history map
    /// for random selection
    fn broadcasting(&self) -> bool {
        self.streaming || self.recording
    }

    /// Whether plays on this lane are heard on air
    fn on_air(&self, role: LaneRole) -> bool {
        let routed = self.lane(role).settings.stream && (self.streaming || self.recording);
        match role {
            LaneRole::Primary(deck) => routed && deck.audible(self.crossfader),
            LaneRole::Interlude => routed,
        }
    }

    /// Select a row on a lane
    pub fn select(&mut self, role: LaneRole, row: Option<usize>) {
        let lane = self.lane_mut(role);
        lane.select(row);
        let row = lane.selected();
        self.emit(ConsoleEvent::SelectionChanged { lane: role, row });
    }

    /// Play button: start the selected row unless the lane is already playing
    pub fn play(&mut self, role: LaneRole) -> bool {
        if self.lane(role).is_playing() {
            return true;
        }
        let started = self.startup(role);
        if !started {
            self.shutdown(role, false);
        }
        self.settle();
        started
    }

    /// Stop button
    pub fn stop(&mut self, role: LaneRole) {
        self.shutdown(role, false);
    }

    /// Next button: play the row after the playing one, or stop at the end
    pub fn next(&mut self, role: LaneRole) {
        let lane = self.lane(role);
        let Some(playing) = lane.playing() else {
            return;
        };
        if playing + 1 >= lane.playlist().len() {
            self.shutdown(role, false);
            return;
        }
        self.select(role, Some(playing + 1));
        self.restart_selected(role);
    }

    /// Previous button: play the row before the playing one
    pub fn previous(&mut self, role: LaneRole) {
        let Some(playing) = self.lane(role).playing() else {
            return;
        };
        self.select(role, Some(playing.saturating_sub(1)));
        self.restart_selected(role);
    }

    /// Skip request: consult the policy engine as if the track had ended
    pub fn skip(&mut self, role: LaneRole) {
        if self.lane(role).is_playing() {
            self.run_policy(role, Trigger::Skip);
            self.settle();
        }
    }

    fn restart_selected(&mut self, role: LaneRole) {
        self.shutdown(role, false);
        if !self.startup(role) {
            self.shutdown(role, false);
        }
        self.settle();
    }

    /// Change a lane's playlist mode
    pub fn set_mode(&mut self, role: LaneRole, mode: PlaylistMode) -> crate::Result<()> {
        self.lane_mut(role).set_mode(mode)
    }

    /// The announcement dialog closed: microphones off, continue with the selection
    pub fn announcement_done(&mut self, role: LaneRole) {
        self.emit(ConsoleEvent::MicrophonesClosed);
        let lane = self.lane(role);
        if !lane.is_playing() && lane.selected().is_some() {
            self.play(role);
        }
    }

    /// Copy a deck's rows into the paired deck's playlist
    pub fn copy_playlist(&mut self, from: Deck, dest: CopyDestination) {
        let rows = self.lane(LaneRole::Primary(from)).plain_rows();
        let target = self.lane_mut(LaneRole::Primary(from.other()));
        let at = match dest {
            CopyDestination::Start => 0,
            CopyDestination::End => target.playlist().len(),
            CopyDestination::Before => target.selected().unwrap_or(target.playlist().len()),
            CopyDestination::After => target.selected().map_or(0, |row| row + 1),
        };
        tracing::debug!(%from, ?dest, rows = rows.len(), "copying playlist");
        target.insert_rows(at, rows);
    }

    /// Copy a deck's rows to the paired deck, then stop and clear the source
    pub fn transfer_playlist(&mut self, from: Deck, dest: CopyDestination) {
        self.copy_playlist(from, dest);
        let role = LaneRole::Primary(from);
        self.shutdown(role, false);
        self.lane_mut(role).set_playlist(Vec::new());
    }

    /// Stop both decks and swap their playlists
    pub fn exchange_playlists(&mut self) {
        let left = LaneRole::Primary(Deck::Left);
        let right = LaneRole::Primary(Deck::Right);
        self.shutdown(left, false);
        self.shutdown(right, false);
        let left_rows = self.left.take_playlist();
        let right_rows = self.right.take_playlist();
        self.left.set_playlist(right_rows);
        self.right.set_playlist(left_rows);
    }

    /// Run one progress tick on every lane from a levels reply
    pub fn tick_all(&mut self, levels: &MixerLevels) {
        for role in LANES {
            self.tick(role, &levels.lane(role));
        }
    }

    /// Progress tick for one lane
    pub fn tick(&mut self, role: LaneRole, status: &LaneStatus) {
        self.sound_due_alarms(Instant::now());
        if let Some(trigger) = self.lane_mut(role).deferred.take() {
            self.run_policy(role, trigger);
            self.settle();
            return;
        }
        let lane = self.lane(role);
        let Some(playing) = lane.playing() else {
            return;
        };
        if !lane.context_id().is_running() {
            return;
        }

        let mode = lane.mode();
        let crossfade_armed = self.crossfade_armed(role);

        if self.quiet_ending(role, status) {
            tracing::info!(lane = %role, "termination by quiet ending");
            let events = self.lane_mut(role).scheduler.hand_over_now(crossfade_armed);
            self.apply_scheduler_events(role, &events);
            self.run_policy(role, Trigger::Silence);
            self.settle();
            return;
        }

        if status.runout && status.context_id > self.lane(role).context_id() {
            tracing::info!(lane = %role, "termination due to end of track");
            self.run_policy(role, Trigger::EndOfTrack);
            self.settle();
            return;
        }

        let killer = self.prefs.advanced_features && self.prefs.bonus_killer;
        let events = self.lane_mut(role).scheduler.observe_signal(
            status.signal,
            status.elapsed,
            killer,
            crossfade_armed,
        );
        if events.contains(&SchedulerEvent::SilenceEnd) {
            self.apply_scheduler_events(role, &events);
            self.run_policy(role, Trigger::Silence);
            self.settle();
            return;
        }

        if status.elapsed != self.lane(role).elapsed() {
            let online = self.on_air(role);
            let filename = self.lane(role).music_filename.clone();
            self.history.record_now(&filename, online);
        }
        self.lane_mut(role).elapsed = status.elapsed;

        let Some(remaining) = self.track_remaining(role, playing) else {
            self.settle();
            return;
        };

        if self.early_fade(role, playing, remaining) {
            self.settle();
            return;
        }

        let lane = self.lane(role);
        let Some(deck) = role.deck() else {
            return;
        };
        let alarm_mode = match mode {
            PlaylistMode::Manual | PlaylistMode::CueUp => true,
            PlaylistMode::PlayAll => policy::stop_inspect(lane.playlist(), playing),
            _ => false,
        };
        let countdown = Countdown {
            context_id: lane.context_id(),
            remaining,
            crosstime: lane.stop_figure - self.prefs.crossfade_lead_secs - lane.elapsed(),
            length_secs: lane.stop_figure.max(0) as f64,
            crossfade_armed,
            alarm_eligible: deck.dominates(self.crossfader) && alarm_mode,
        };
        let events = self.lane_mut(role).scheduler.countdown(&countdown);
        self.apply_scheduler_events(role, &events);
        self.settle();
    }

    /// Fade Over, or Play All with a crossfade marker coming up
    fn crossfade_armed(&self, role: LaneRole) -> bool {
        if role.deck().is_none() {
            return false;
        }
        let lane = self.lane(role);
        match (lane.mode(), lane.playing()) {
            (PlaylistMode::FadeOver, _) => true,
            (PlaylistMode::PlayAll, Some(row)) => policy::fade_inspect(lane.playlist(), row),
            _ => false,
        }
    }

    /// The quiet-ending silence killer
    fn quiet_ending(&self, role: LaneRole, status: &LaneStatus) -> bool {
        let lane = self.lane(role);
        let Some(row) = lane.playing() else {
            return false;
        };
        let upper = lane.stop_figure as f64;
        self.prefs.advanced_features
            && self.prefs.silence_killer
            && upper - (lane.elapsed() as f64) < self.prefs.quiet_ending_secs
            && upper > 10.0
            && !status.signal
            && status.context_id == ContextId(lane.context_id().0 + 1)
            && !policy::eos_inspect(lane.playlist(), row, lane.mode())
    }

    /// Seconds left, following cue sheet element changes
    ///
    /// `None` when the tick was consumed by a cue sheet jump.
    fn track_remaining(&mut self, role: LaneRole, playing: usize) -> Option<i64> {
        let lane = self.lane_mut(role);
        let elapsed = lane.elapsed();
        let previous = lane.element;
        let stop_figure = lane.stop_figure;
        let Some(cuesheet) = lane
            .playlist_mut()
            .get_mut(playing)
            .and_then(PlaylistEntry::cuesheet_mut)
        else {
            return Some(stop_figure - elapsed);
        };
        let remaining = cuesheet.time_remaining(elapsed as f64) as i64;
        let current = cuesheet.element_index((elapsed + 1) as f64);
        let offset = current.and_then(|e| cuesheet.tracks().get(e)).map(|t| t.offset);
        if current == previous {
            return Some(remaining);
        }

        tracing::debug!(lane = %role, ?previous, ?current, "cue sheet bump");
        let continuous = matches!((previous, current), (Some(p), Some(c)) if c == p + 1);
        if continuous {
            self.lane_mut(role).element = current;
            if let Some(info) = self.lane(role).now_playing() {
                self.emit(ConsoleEvent::NowPlaying { lane: role, info });
            }
            return Some(remaining);
        }

        tracing::debug!(lane = %role, "cue sheet discontinuous");
        self.set_fade(role, FadeMode::Splice);
        match offset {
            Some(offset) => {
                let seek = ((offset + FRAMES_PER_SECOND / 2 + 1) / FRAMES_PER_SECOND) as i64;
                if !self.restart(role, seek) {
                    self.lane_mut(role).deferred = Some(Trigger::StartFailed);
                }
            }
            None => self.run_policy(role, Trigger::EndOfTrack),
        }
        self.set_fade(role, FadeMode::None);
        None
    }

    /// Early fades and `>fade5`/`>fade10` skip-overs; true when the tick was consumed
    fn early_fade(&mut self, role: LaneRole, playing: usize, remaining: i64) -> bool {
        if !(remaining == 5 || remaining == 10)
            || self.lane(role).scheduler.crossfade_started()
            || self.prefs.simple_mixer
        {
            return false;
        }

        let lane = self.lane(role);
        let mode = lane.mode();
        let next_marker = lane
            .playlist()
            .get(playing + 1)
            .and_then(PlaylistEntry::control_marker);

        if let (PlaylistMode::PlayAll, Some(marker)) = (mode, next_marker) {
            let fade = match (remaining, marker) {
                (5, ControlMarker::Fade5) => FadeMode::Five,
                (10, ControlMarker::Fade10) => FadeMode::Ten,
                _ => return false,
            };
            tracing::info!(lane = %role, %marker, "fading over marker");
            self.set_fade(role, fade);
            self.shutdown(role, false);
            if playing + 2 < self.lane(role).playlist().len() {
                self.select(role, Some(playing + 2));
                if !self.startup(role) {
                    self.shutdown(role, false);
                }
            } else {
                self.select(role, Some(0));
            }
            self.set_fade(role, FadeMode::None);
            return true;
        }

        let fade = lane.settings.fade;
        let is_last = playing + 1 >= lane.playlist().len();
        if fade.lead_seconds() != Some(remaining)
            || mode.suppresses_early_fade()
            || (mode == PlaylistMode::PlayAll && is_last)
        {
            return false;
        }
        self.set_fade(role, fade);
        self.run_policy(role, Trigger::EarlyFade);
        self.set_fade(role, FadeMode::None);
        true
    }

    fn apply_scheduler_events(&mut self, role: LaneRole, events: &[SchedulerEvent]) {
        let Some(deck) = role.deck() else {
            return;
        };
        for event in events {
            match event {
                SchedulerEvent::StartPaired => {
                    self.play(LaneRole::Primary(deck.other()));
                }
                SchedulerEvent::MoveCrossfader => self.pass_crossfader(deck.other()),
                SchedulerEvent::SoundAlarm => {
                    tracing::debug!(%deck, "DJ alarm scheduled");
                    self.pending_alarms.push(PendingAlarm {
                        deck,
                        sound: self.prefs.dj_alarm,
                        due: Instant::now() + DJ_ALARM_DELAY,
                    });
                }
                SchedulerEvent::SilenceEnd => {}
            }
        }
    }

    /// Whether a DJ alarm is waiting to sound
    pub fn alarm_pending(&self) -> bool {
        !self.pending_alarms.is_empty()
    }

    fn sound_due_alarms(&mut self, now: Instant) {
        if self.pending_alarms.is_empty() {
            return;
        }
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending_alarms
            .drain(..)
            .partition(|alarm| alarm.due <= now);
        self.pending_alarms = waiting;
        for alarm in due {
            tracing::info!(deck = %alarm.deck, "DJ alarm");
            self.emit(ConsoleEvent::DjAlarm {
                deck: alarm.deck,
                sound: alarm.sound,
            });
        }
    }

    /// Move the crossfader fully toward `deck`
    pub fn pass_crossfader(&mut self, deck: Deck) {
        let position = match deck {
            Deck::Left => 0,
            Deck::Right => 100,
        };
        if self.crossfader != position {
            self.crossfader = position;
            self.emit(ConsoleEvent::CrossfaderMoved { position });
        }
    }

    fn set_fade(&mut self, role: LaneRole, fade: FadeMode) {
        let fade = if self.prefs.simple_mixer {
            FadeMode::None
        } else {
            fade
        };
        if let Err(e) = self.mixer.set_fade(role, fade) {
            tracing::warn!(lane = %role, error = %e, "fade mode request failed");
        }
    }

    /// Evaluate the policy for the lane's playing row and carry it out
    fn run_policy(&mut self, role: LaneRole, trigger: Trigger) {
        let mode = self.lane(role).mode();
        self.run_policy_as(role, mode, trigger);
    }

    fn run_policy_as(&mut self, role: LaneRole, mode: PlaylistMode, trigger: Trigger) {
        let lane = self.lane(role);
        let decision = policy::decide(&PolicyInput {
            playlist: lane.playlist(),
            playing: lane.playing(),
            mode,
            role,
            crossfader: self.crossfader,
            trigger,
        });
        let gapless = trigger == Trigger::EndOfTrack;
        self.execute(role, decision, gapless);
    }

    fn execute(&mut self, role: LaneRole, decision: Decision, gapless: bool) {
        for effect in decision.before {
            self.apply_effect(role, effect);
        }

        match decision.action {
            EndOfTrackAction::Stop { select } => {
                self.shutdown(role, gapless);
                if select.is_some() {
                    self.select(role, select);
                }
            }
            EndOfTrackAction::AdvanceTo { row, play }
            | EndOfTrackAction::AdvanceToFirst { row, play } => {
                self.shutdown(role, gapless);
                self.select(role, Some(row));
                if play && !self.startup(role) {
                    self.shutdown(role, false);
                }
            }
            EndOfTrackAction::PlayRandom => {
                self.shutdown(role, gapless);
                self.play_random(role);
            }
            EndOfTrackAction::RequestExternalNext { row } => {
                self.shutdown(role, gapless);
                match self.lane_mut(role).next_external() {
                    Some(entry) => {
                        self.lane_mut(role).replace(row, entry);
                        self.select(role, Some(row));
                        if !self.startup(role) {
                            self.shutdown(role, false);
                        }
                    }
                    None => {
                        tracing::info!(lane = %role, "playlist or directory has no more audio files, stopping");
                        self.emit(ConsoleEvent::ExternalExhausted { lane: role });
                    }
                }
            }
        }

        for effect in decision.after {
            self.apply_effect(role, effect);
        }
    }

    fn play_random(&mut self, role: LaneRole) {
        let online = self.broadcasting();
        let choice = random::select_random(
            self.lane(role).playlist(),
            self.history.map(online),
            &mut rand::thread_rng(),
        );
        match choice {
            Ok(row) => {
                self.select(role, Some(row));
                if !self.startup(role) {
                    self.shutdown(role, false);
                }
            }
            Err(_) => self.emit(ConsoleEvent::EmptyPlaylist { lane: role }),
        }
    }

    fn apply_effect(&mut self, role: LaneRole, effect: Effect) {
        match effect {
            Effect::ResetSpeed => {
                self.lane_mut(role).set_speed(1.0);
                self.emit(ConsoleEvent::SpeedReset { lane: role });
            }
            Effect::SetFade(fade) => self.set_fade(role, fade),
            Effect::OpenMicrophone(marker) => self.emit(ConsoleEvent::MicrophoneOpen { marker }),
            Effect::OpenAnnouncement { row } => {
                let announcement = self.lane(role).playlist().get(row).and_then(|entry| match entry {
                    PlaylistEntry::Control(control) => control.as_announcement(),
                    _ => None,
                });
                if let Some(announcement) = announcement {
                    self.emit(ConsoleEvent::Announcement {
                        lane: role,
                        row,
                        announcement,
                    });
                }
            }
            Effect::PassCrossfader(deck) => self.pass_crossfader(deck),
            Effect::StartPaired => {
                if let Some(deck) = role.deck() {
                    self.play(LaneRole::Primary(deck.other()));
                }
            }
            Effect::DelegatePaired(mode) => {
                if let Some(deck) = role.deck() {
                    self.run_policy_as(LaneRole::Primary(deck.other()), mode, Trigger::Skip);
                }
            }
            Effect::StopStreaming => {
                self.streaming = false;
                self.emit(ConsoleEvent::StopStreaming);
            }
            Effect::StopRecording => {
                self.recording = false;
                self.emit(ConsoleEvent::StopRecording);
            }
        }
    }

    /// Start the selected row (row 0 when nothing is selected)
    ///
    /// Returns false only when there is nothing to start. A row the mixer
    /// cannot play still counts as started: the failure is handled by the
    /// policy engine on the next tick.
    fn startup(&mut self, role: LaneRole) -> bool {
        let prefs = self.prefs.clone();
        let lane = self.lane_mut(role);
        if lane.playlist().is_empty() {
            tracing::info!(lane = %role, "playlist is empty");
            return false;
        }
        let row = lane.selected().unwrap_or(0);
        if lane.selected().is_none() {
            lane.select(Some(row));
        }

        let entry = &lane.playlist()[row];
        let playable = entry.is_playable();
        let length = entry.length_seconds();
        let run_time = length.max(0);
        let mut filename = entry.filename().to_string();
        let mut replaygain = entry.replaygain();
        let mut start_time = if Path::new(&filename).is_file() {
            0
        } else {
            run_time
        };

        lane.begin(row);
        lane.stop_figure = length;
        lane.element = None;

        if let Some(cuesheet) = lane.playlist_mut()[row].cuesheet_mut() {
            let element = cuesheet.element_index(start_time as f64);
            if let Some(track) = element.and_then(|e| cuesheet.tracks().get(e)) {
                let frames = track.offset.max(start_time as u64 * FRAMES_PER_SECOND);
                start_time = (frames / FRAMES_PER_SECOND) as i64;
                filename = track.pathname.clone();
                replaygain = track.replaygain;
            }
            lane.element = element;
        }

        lane.music_filename = filename.clone();
        lane.elapsed = start_time;
        lane.gain_db = prefs.playback_gain(replaygain);
        let gain_db = lane.gain_db;

        let context_id = if playable && !filename.is_empty() {
            self.mixer.play(&PlayRequest {
                lane: role,
                path: &filename,
                seek_secs: start_time,
                size_secs: run_time,
                gain_db,
            })
        } else {
            tracing::debug!(lane = %role, row, "skipping play for empty filename");
            ContextId::FAILED
        };

        let online = self.broadcasting();
        self.history.record_now(&filename, online);
        let lane = self.lane_mut(role);
        lane.context_id = context_id;

        if context_id.is_failed() {
            tracing::warn!(lane = %role, %filename, "player startup was unsuccessful");
            lane.deferred = Some(Trigger::StartFailed);
            if playable {
                self.emit(ConsoleEvent::StartFailed {
                    lane: role,
                    filename,
                });
            }
        } else {
            tracing::info!(lane = %role, %context_id, "player context id");
            if context_id.ended_immediately() {
                lane.immediate_end = true;
            }
            if let Some(info) = lane.now_playing() {
                self.emit(ConsoleEvent::NowPlaying { lane: role, info });
            }
        }
        self.emit(ConsoleEvent::Started {
            lane: role,
            row,
            context_id,
        });
        true
    }

    /// Restart the mixer inside the current cue sheet at `seek` seconds
    fn restart(&mut self, role: LaneRole, seek: i64) -> bool {
        let prefs = self.prefs.clone();
        let lane = self.lane_mut(role);
        let Some(playing) = lane.playing() else {
            return false;
        };
        let stop_figure = lane.stop_figure;
        let mut start_time = seek;
        let mut filename = lane.music_filename.clone();

        if let Some(cuesheet) = lane.playlist_mut()[playing].cuesheet_mut() {
            cuesheet.non_playing();
            match cuesheet.element_index(seek as f64) {
                Some(e) => {
                    let track = &cuesheet.tracks()[e];
                    let frames = track.offset.max(seek as u64 * FRAMES_PER_SECOND);
                    start_time = (frames / FRAMES_PER_SECOND) as i64;
                    filename = track.pathname.clone();
                    let gain = prefs.playback_gain(track.replaygain);
                    lane.element = Some(e);
                    lane.gain_db = gain;
                }
                None => {
                    let last = cuesheet.len().checked_sub(1);
                    lane.element = last;
                    start_time = stop_figure;
                }
            }
        }
        lane.music_filename = filename.clone();
        lane.elapsed = start_time;

        let context_id = self.mixer.restart(role, &filename, start_time);
        if context_id.is_failed() {
            tracing::warn!(lane = %role, %filename, "player restart was unsuccessful");
            return false;
        }
        let lane = self.lane_mut(role);
        lane.context_id = context_id;
        if let Some(info) = lane.now_playing() {
            self.emit(ConsoleEvent::NowPlaying { lane: role, info });
        }
        true
    }

    /// Stop the lane; `gapless` skips the mixer stop when the track ran out by itself
    fn shutdown(&mut self, role: LaneRole, gapless: bool) {
        if self.lane_mut(role).finish().is_none() {
            return;
        }
        if !gapless {
            if let Err(e) = self.mixer.stop(role) {
                tracing::warn!(lane = %role, error = %e, "stop request failed");
            }
        }
        self.emit(ConsoleEvent::Stopped { lane: role });
    }

    /// Run the policy for lanes whose mixer start ended immediately
    fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let Some(role) = LANES.into_iter().find(|&r| self.lane(r).immediate_end) else {
                return;
            };
            self.lane_mut(role).immediate_end = false;
            self.run_policy(role, Trigger::EndOfTrack);
        }
        tracing::warn!("tracks keep ending as they start, giving up");
        for role in LANES {
            if self.lane(role).immediate_end {
                self.shutdown(role, false);
            }
        }
    }
}

impl<M: MixerLink> std::fmt::Debug for Console<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("interlude", &self.interlude)
            .field("crossfader", &self.crossfader)
            .finish()
    }
}
