/// Cue sheet parse errors
use thiserror::Error;

/// Result type alias using `CueSheetError`
pub type Result<T> = std::result::Result<T, CueSheetError>;

/// A grammar or validation violation in a cue sheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", line_suffix(.line))]
pub struct CueSheetError {
    /// 1-based line number, `None` for whole-sheet checks
    pub line: Option<usize>,

    /// What went wrong
    pub message: String,
}

impl CueSheetError {
    /// Error attributed to `line`
    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }

    /// Error about the sheet as a whole
    pub fn sheet(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|n| format!(" on line {n}")).unwrap_or_default()
}

impl From<CueSheetError> for twindeck_core::DeckError {
    fn from(err: CueSheetError) -> Self {
        twindeck_core::DeckError::cuesheet(err.to_string())
    }
}

impl From<std::io::Error> for CueSheetError {
    fn from(err: std::io::Error) -> Self {
        CueSheetError::sheet(format!("cannot read cue sheet: {err}"))
    }
}
