//! ReplayGain values as carried on playlist rows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loudness reference of a gain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GainKind {
    /// No tag: the console's default gain applies
    #[default]
    Default,
    /// Classic ReplayGain (89 dB reference)
    Rg,
    /// EBU R128 (-23 LUFS reference)
    R128,
}

impl GainKind {
    /// Suffix used in the textual form
    pub fn as_str(self) -> &'static str {
        match self {
            GainKind::Default => "DEFAULT",
            GainKind::Rg => "RG",
            GainKind::R128 => "R128",
        }
    }
}

/// A gain adjustment in dB with its loudness reference.
///
/// The textual form is `"<dB> <KIND>"`, e.g. `"0 DEFAULT"` or `"-6.5 RG"`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplayGain {
    /// Gain in dB
    pub gain_db: f64,

    /// Reference the gain was measured against
    pub kind: GainKind,
}

impl ReplayGain {
    /// The untagged default, `"0 DEFAULT"`
    pub const DEFAULT: ReplayGain = ReplayGain {
        gain_db: 0.0,
        kind: GainKind::Default,
    };

    /// Create a tagged gain
    pub fn new(gain_db: f64, kind: GainKind) -> Self {
        Self { gain_db, kind }
    }

    /// Whether this is the untagged default
    pub fn is_default(&self) -> bool {
        self.kind == GainKind::Default
    }

    /// Normalise a `REPLAYGAIN_TRACK_GAIN` tag.
    ///
    /// `reference` is the optional `REPLAYGAIN_REFERENCE_LOUDNESS` tag; a
    /// reference of -23 marks the gain as R128. A `dB` suffix means RG and an
    /// `LU` suffix R128 unless the reference says otherwise. Anything that is
    /// not a number yields the default.
    pub fn from_tag(gain: &str, reference: Option<&str>) -> Self {
        let reference = reference.and_then(|r| {
            r.trim()
                .trim_end_matches(|c: char| "dbDBLUlu".contains(c))
                .trim()
                .parse::<f64>()
                .ok()
                .map(|value| {
                    if -23.1 < value && value < -22.9 {
                        GainKind::R128
                    } else {
                        GainKind::Rg
                    }
                })
        });

        let upper = gain.trim().to_ascii_uppercase();
        let (number, suffix_kind) = if let Some(n) = upper.strip_suffix("DB") {
            (n, GainKind::Rg)
        } else if let Some(n) = upper.strip_suffix("LU") {
            (n, GainKind::R128)
        } else {
            (upper.as_str(), GainKind::Rg)
        };

        let Ok(gain_db) = number.trim().parse::<f64>() else {
            return Self::DEFAULT;
        };
        if !gain_db.is_finite() {
            return Self::DEFAULT;
        }

        Self::new(gain_db, reference.unwrap_or(suffix_kind))
    }

    /// Gain from an Opus `R128_TRACK_GAIN` tag (Q7.8 fixed point)
    pub fn from_r128_q78(tag: &str) -> Option<Self> {
        let raw: f64 = tag.trim().parse().ok()?;
        Some(Self::new(raw / 256.0, GainKind::R128))
    }
}

impl fmt::Display for ReplayGain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.gain_db, self.kind.as_str())
    }
}

impl FromStr for ReplayGain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(value), Some(kind), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("malformed replaygain: {s}"));
        };
        let gain_db: f64 = value
            .parse()
            .map_err(|_| format!("malformed replaygain value: {value}"))?;
        let kind = match kind {
            "DEFAULT" => GainKind::Default,
            "RG" => GainKind::Rg,
            "R128" => GainKind::R128,
            other => return Err(format!("unknown replaygain kind: {other}")),
        };
        Ok(Self { gain_db, kind })
    }
}
