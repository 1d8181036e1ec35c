/// Console-wide playback preferences
use serde::{Deserialize, Serialize};
use twindeck_core::{GainKind, ReplayGain};

/// Preferences consulted by the policy engine, scheduler and gain logic.
///
/// Deserialised from the `[playback]` section of the console
/// configuration; every field has a default so a partial section works.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeckPreferences {
    /// Progress tick cadence in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seconds before the end at which a scheduled crossfade starts
    #[serde(default)]
    pub crossfade_lead_secs: i64,

    /// Master switch for the silence killers
    #[serde(default = "default_true")]
    pub advanced_features: bool,

    /// Trim quiet track endings
    #[serde(default = "default_true")]
    pub silence_killer: bool,

    /// End tracks containing long passages of silence
    #[serde(default)]
    pub bonus_killer: bool,

    /// Seconds before the end at which a quiet ending may be cut
    #[serde(default = "default_quiet_ending_secs")]
    pub quiet_ending_secs: f64,

    /// Sound the DJ alarm (the notification is sent either way)
    #[serde(default)]
    pub dj_alarm: bool,

    /// Mixer without crossfade support: fade requests are sent as 0
    #[serde(default)]
    pub simple_mixer: bool,

    /// Apply ReplayGain at playback
    #[serde(default = "default_true")]
    pub rg_adjust: bool,

    /// Gain for files without a ReplayGain tag (dB)
    #[serde(default = "default_rg_default_gain")]
    pub rg_default_gain: f64,

    /// Added to RG-tagged files (dB)
    #[serde(default)]
    pub rg_boost: f64,

    /// Added to R128-tagged files (dB)
    #[serde(default = "default_r128_boost")]
    pub r128_boost: f64,

    /// Added to every file (dB)
    #[serde(default)]
    pub all_boost: f64,
}

impl DeckPreferences {
    /// Final playback gain in dB for a row's ReplayGain value
    pub fn playback_gain(&self, replaygain: ReplayGain) -> f64 {
        if !self.rg_adjust {
            return 0.0;
        }
        let boost = match replaygain.kind {
            GainKind::Default => self.rg_default_gain,
            GainKind::Rg => self.rg_boost,
            GainKind::R128 => self.r128_boost,
        };
        replaygain.gain_db + boost + self.all_boost
    }
}

impl Default for DeckPreferences {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            crossfade_lead_secs: 0,
            advanced_features: true,
            silence_killer: true,
            bonus_killer: false,
            quiet_ending_secs: default_quiet_ending_secs(),
            dj_alarm: false,
            simple_mixer: false,
            rg_adjust: true,
            rg_default_gain: default_rg_default_gain(),
            rg_boost: 0.0,
            r128_boost: default_r128_boost(),
            all_boost: 0.0,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_quiet_ending_secs() -> f64 {
    5.0
}

fn default_rg_default_gain() -> f64 {
    -8.0
}

fn default_r128_boost() -> f64 {
    4.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_per_kind() {
        let prefs = DeckPreferences {
            rg_default_gain: -8.0,
            rg_boost: 6.0,
            r128_boost: 4.0,
            all_boost: 1.0,
            ..Default::default()
        };

        assert_eq!(prefs.playback_gain(ReplayGain::DEFAULT), -7.0);
        assert_eq!(prefs.playback_gain(ReplayGain::new(-3.0, GainKind::Rg)), 4.0);
        assert_eq!(prefs.playback_gain(ReplayGain::new(-2.0, GainKind::R128)), 3.0);
    }

    #[test]
    fn test_gain_disabled() {
        let prefs = DeckPreferences {
            rg_adjust: false,
            ..Default::default()
        };
        assert_eq!(prefs.playback_gain(ReplayGain::new(-3.0, GainKind::Rg)), 0.0);
    }
}
