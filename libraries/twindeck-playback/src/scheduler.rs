//! Crossfade scheduler
//!
//! Fires the timed cross-lane actions of one lane: starting the paired
//! lane, passing the crossfader, sounding the DJ alarm and cutting a track
//! that has gone silent. Each action fires at most once per track instance;
//! [`CrossfadeScheduler::reset`] re-arms them when a new track starts.

use crate::mixer::ContextId;

/// Consecutive silent ticks before the mid-track silence killer fires
pub const SILENCE_TICKS: u32 = 120;

/// Elapsed seconds before the mid-track silence killer may fire
pub const SILENCE_MIN_ELAPSED: i64 = 15;

/// Remaining seconds at which the DJ alarm sounds
pub const ALARM_REMAINING: i64 = 10;

/// Tracks this short never sound the alarm
pub const ALARM_MIN_LENGTH: f64 = 11.0;

/// An action due on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Start the paired lane
    StartPaired,
    /// Pass the crossfader to the paired lane
    MoveCrossfader,
    /// Sound the DJ alarm for this lane
    SoundAlarm,
    /// Treat the silence as end of track
    SilenceEnd,
}

/// Countdown state for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    /// Context of the running track
    pub context_id: ContextId,
    /// Whole seconds until the track's stop point
    pub remaining: i64,
    /// Seconds until the crossfade should start (stop point minus lead minus elapsed)
    pub crosstime: i64,
    /// Track length in seconds
    pub length_secs: f64,
    /// The track ends in a crossfade (Fade Over, or a crossfade marker ahead)
    pub crossfade_armed: bool,
    /// The lane is dominant and its mode warrants an alarm
    pub alarm_eligible: bool,
}

/// Once-only action flags for one lane.
#[derive(Debug, Clone, Default)]
pub struct CrossfadeScheduler {
    other_lane_started: bool,
    crossfade_started: bool,
    silence_ticks: u32,
    alarm_context: Option<ContextId>,
}

impl CrossfadeScheduler {
    /// Create a scheduler with nothing fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arm for a new track
    ///
    /// The alarm is keyed on the context id and needs no reset.
    pub fn reset(&mut self) {
        self.other_lane_started = false;
        self.crossfade_started = false;
        self.silence_ticks = 0;
    }

    /// Whether the paired lane was started for this track
    pub fn other_lane_started(&self) -> bool {
        self.other_lane_started
    }

    /// Whether the crossfader was passed for this track
    pub fn crossfade_started(&self) -> bool {
        self.crossfade_started
    }

    /// Consecutive silent ticks so far
    pub fn silence_ticks(&self) -> u32 {
        self.silence_ticks
    }

    /// Count silence; fires the hand-over and [`SchedulerEvent::SilenceEnd`]
    /// once the mid-track killer's thresholds are met
    pub fn observe_signal(
        &mut self,
        signal: bool,
        elapsed: i64,
        killer_enabled: bool,
        crossfade_armed: bool,
    ) -> Vec<SchedulerEvent> {
        if signal {
            self.silence_ticks = 0;
            return Vec::new();
        }
        self.silence_ticks = self.silence_ticks.saturating_add(1);
        if killer_enabled && self.silence_ticks >= SILENCE_TICKS && elapsed > SILENCE_MIN_ELAPSED {
            tracing::info!(elapsed, "termination due to excessive silence");
            let mut events = self.hand_over_now(crossfade_armed);
            events.push(SchedulerEvent::SilenceEnd);
            return events;
        }
        Vec::new()
    }

    /// Fire whatever part of the hand-over has not happened yet
    pub fn hand_over_now(&mut self, crossfade_armed: bool) -> Vec<SchedulerEvent> {
        if !crossfade_armed {
            return Vec::new();
        }
        let mut events = Vec::new();
        if !self.other_lane_started {
            self.other_lane_started = true;
            events.push(SchedulerEvent::StartPaired);
        }
        if !self.crossfade_started {
            self.crossfade_started = true;
            events.push(SchedulerEvent::MoveCrossfader);
        }
        events
    }

    /// Check the alarm and crossfade thresholds
    pub fn countdown(&mut self, countdown: &Countdown) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();

        if countdown.remaining == ALARM_REMAINING
            && countdown.length_secs > ALARM_MIN_LENGTH
            && countdown.alarm_eligible
            && self.alarm_context != Some(countdown.context_id)
        {
            self.alarm_context = Some(countdown.context_id);
            events.push(SchedulerEvent::SoundAlarm);
        }

        if countdown.crossfade_armed {
            if !self.other_lane_started && countdown.crosstime <= 1 {
                self.other_lane_started = true;
                events.push(SchedulerEvent::StartPaired);
            }
            if !self.crossfade_started && countdown.crosstime <= 0 {
                self.crossfade_started = true;
                events.push(SchedulerEvent::MoveCrossfader);
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_countdown(remaining: i64) -> Countdown {
        Countdown {
            context_id: ContextId(3),
            remaining,
            crosstime: remaining,
            length_secs: 200.0,
            crossfade_armed: true,
            alarm_eligible: false,
        }
    }

    #[test]
    fn test_crossfade_thresholds() {
        let mut scheduler = CrossfadeScheduler::new();

        assert!(scheduler.countdown(&create_test_countdown(5)).is_empty());
        assert_eq!(
            scheduler.countdown(&create_test_countdown(1)),
            vec![SchedulerEvent::StartPaired]
        );
        assert_eq!(
            scheduler.countdown(&create_test_countdown(0)),
            vec![SchedulerEvent::MoveCrossfader]
        );
        assert!(scheduler.countdown(&create_test_countdown(-1)).is_empty());
    }

    #[test]
    fn test_late_tick_fires_both() {
        let mut scheduler = CrossfadeScheduler::new();
        assert_eq!(
            scheduler.countdown(&create_test_countdown(-2)),
            vec![SchedulerEvent::StartPaired, SchedulerEvent::MoveCrossfader]
        );
    }

    #[test]
    fn test_unarmed_never_fires() {
        let mut scheduler = CrossfadeScheduler::new();
        let countdown = Countdown {
            crossfade_armed: false,
            ..create_test_countdown(0)
        };
        assert!(scheduler.countdown(&countdown).is_empty());
        assert!(!scheduler.other_lane_started());
    }

    #[test]
    fn test_reset_rearms() {
        let mut scheduler = CrossfadeScheduler::new();
        scheduler.countdown(&create_test_countdown(0));
        assert!(scheduler.crossfade_started());

        scheduler.reset();
        assert!(!scheduler.crossfade_started());
        assert!(!scheduler.other_lane_started());
    }

    #[test]
    fn test_alarm_once_per_context() {
        let mut scheduler = CrossfadeScheduler::new();
        let countdown = Countdown {
            alarm_eligible: true,
            crossfade_armed: false,
            ..create_test_countdown(10)
        };

        assert_eq!(scheduler.countdown(&countdown), vec![SchedulerEvent::SoundAlarm]);
        assert!(scheduler.countdown(&countdown).is_empty());

        // survives a reset, but a new context sounds again
        scheduler.reset();
        assert!(scheduler.countdown(&countdown).is_empty());
        let next = Countdown {
            context_id: ContextId(5),
            ..countdown
        };
        assert_eq!(scheduler.countdown(&next), vec![SchedulerEvent::SoundAlarm]);
    }

    #[test]
    fn test_alarm_skips_short_tracks() {
        let mut scheduler = CrossfadeScheduler::new();
        let countdown = Countdown {
            alarm_eligible: true,
            length_secs: 11.0,
            ..create_test_countdown(10)
        };
        assert!(!scheduler.countdown(&countdown).contains(&SchedulerEvent::SoundAlarm));
    }

    #[test]
    fn test_silence_killer() {
        let mut scheduler = CrossfadeScheduler::new();
        for _ in 0..SILENCE_TICKS - 1 {
            assert!(scheduler.observe_signal(false, 30, true, false).is_empty());
        }
        assert_eq!(
            scheduler.observe_signal(false, 30, true, false),
            vec![SchedulerEvent::SilenceEnd]
        );
    }

    #[test]
    fn test_silence_needs_elapsed_time() {
        let mut scheduler = CrossfadeScheduler::new();
        for _ in 0..SILENCE_TICKS * 2 {
            assert!(scheduler.observe_signal(false, 15, true, true).is_empty());
        }
    }

    #[test]
    fn test_signal_resets_silence() {
        let mut scheduler = CrossfadeScheduler::new();
        for _ in 0..SILENCE_TICKS - 1 {
            scheduler.observe_signal(false, 30, true, false);
        }
        scheduler.observe_signal(true, 30, true, false);
        assert_eq!(scheduler.silence_ticks(), 0);
        assert!(scheduler.observe_signal(false, 30, true, false).is_empty());
    }

    #[test]
    fn test_silence_hands_over_when_armed() {
        let mut scheduler = CrossfadeScheduler::new();
        scheduler.countdown(&create_test_countdown(1));
        for _ in 0..SILENCE_TICKS - 1 {
            scheduler.observe_signal(false, 30, true, true);
        }
        assert_eq!(
            scheduler.observe_signal(false, 30, true, true),
            vec![SchedulerEvent::MoveCrossfader, SchedulerEvent::SilenceEnd]
        );
    }
}
