//! Cue sheet grammar and validation

use crate::error::{CueSheetError, Result};
use crate::tokenizer::{decode_line, tokenize};
use std::collections::BTreeMap;
use std::path::Path;
use twindeck_core::FRAMES_PER_SECOND;

/// Where an index starts: a file and a frame offset into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPoint {
    /// Filename as written in the sheet
    pub file: String,
    /// Offset in frames
    pub offset: u64,
}

/// Everything the sheet says about one track.
///
/// Track 0 collects values given before the first `TRACK` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSegment {
    /// Index number to start point
    pub indices: BTreeMap<u32, IndexPoint>,
    /// `PERFORMER` values
    pub performer: Vec<String>,
    /// `SONGWRITER` values
    pub songwriter: Vec<String>,
    /// `TITLE` values
    pub title: Vec<String>,
    /// `REM ALBUM` values
    pub album: Vec<String>,
    /// `PREGAP` length in frames
    pub pregap: Option<u64>,
    /// `POSTGAP` length in frames
    pub postgap: Option<u64>,
}

/// Parsed cue sheet: track number to segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueSegments {
    tracks: BTreeMap<u32, TrackSegment>,
}

impl CueSegments {
    /// Segment for track `number` (0 for sheet-global values)
    pub fn track(&self, number: u32) -> Option<&TrackSegment> {
        self.tracks.get(&number)
    }

    /// Sheet-global values
    pub fn global(&self) -> TrackSegment {
        self.tracks.get(&0).cloned().unwrap_or_default()
    }

    /// Numbered tracks in order
    pub fn tracks(&self) -> impl Iterator<Item = (u32, &TrackSegment)> {
        self.tracks
            .iter()
            .filter(|(n, _)| **n > 0)
            .map(|(n, seg)| (*n, seg))
    }

    /// Number of numbered tracks
    pub fn track_count(&self) -> u32 {
        self.tracks.keys().copied().max().unwrap_or(0)
    }
}

/// Parse `mm:ss:ff` into frames; minutes may exceed 99
fn parse_time(text: &str, line: usize) -> Result<u64> {
    let mut fields = text.split(':').map(str::parse::<i64>);
    let (Some(Ok(mm)), Some(Ok(ss)), Some(Ok(ff)), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(CueSheetError::at(line, "time must be in (m*)mm:ss:ff format"));
    };

    if !(0..=74).contains(&ff) || !(0..=59).contains(&ss) || mm < 0 {
        return Err(CueSheetError::at(line, "a time value is out of range"));
    }

    (mm as u64)
        .checked_mul(FRAMES_PER_SECOND * 60)
        .and_then(|frames| frames.checked_add(FRAMES_PER_SECOND * ss as u64 + ff as u64))
        .ok_or_else(|| CueSheetError::at(line, "a time value is out of range"))
}

fn parse_number(text: &str, line: usize) -> Result<u32> {
    text.parse()
        .map_err(|_| CueSheetError::at(line, format!("expected integer value for {text}")))
}

/// Operand count for commands the parser acts on
fn operand_count(command: &str) -> Option<usize> {
    match command {
        "PERFORMER" | "SONGWRITER" | "TITLE" | "PREGAP" | "POSTGAP" => Some(1),
        "FILE" | "TRACK" | "INDEX" => Some(2),
        _ => None,
    }
}

struct Parser {
    segments: BTreeMap<u32, TrackSegment>,
    filename: Option<String>,
    track: u32,
    /// Last index number seen for the current track, -1 right after TRACK
    index: i64,
    prev_frames: u64,
}

impl Parser {
    fn new() -> Self {
        Self {
            segments: BTreeMap::new(),
            filename: None,
            track: 0,
            index: -1,
            prev_frames: 0,
        }
    }

    fn current(&mut self) -> &mut TrackSegment {
        self.segments.entry(self.track).or_default()
    }

    fn command(&mut self, line: usize, command: &str, operands: &[String]) -> Result<()> {
        if command == "REM" {
            return self.rem(line, operands);
        }
        let Some(expected) = operand_count(command) else {
            return Ok(());
        };
        if operands.len() != expected {
            return Err(CueSheetError::at(
                line,
                format!(
                    "wrong number of operands got {} required {expected}",
                    operands.len()
                ),
            ));
        }

        match command {
            "PERFORMER" => self.current().performer.push(operands[0].clone()),
            "SONGWRITER" => self.current().songwriter.push(operands[0].clone()),
            "TITLE" => self.current().title.push(operands[0].clone()),
            "FILE" => self.file(line, &operands[0], &operands[1])?,
            "TRACK" => self.start_track(line, &operands[0], &operands[1])?,
            "PREGAP" => self.pregap(line, &operands[0])?,
            "INDEX" => self.add_index(line, &operands[0], &operands[1])?,
            "POSTGAP" => self.postgap(line, &operands[0])?,
            _ => {}
        }
        Ok(())
    }

    /// Only `REM ALBUM` has a fixed arity; other REM types are logged and
    /// skipped whatever their operand count.
    fn rem(&mut self, line: usize, operands: &[String]) -> Result<()> {
        match operands.first().map(String::as_str) {
            Some("ALBUM") => {
                if operands.len() != 2 {
                    return Err(CueSheetError::at(
                        line,
                        format!(
                            "wrong number of operands got {} required 2",
                            operands.len()
                        ),
                    ));
                }
                tracing::debug!("Cue sheet track album: {}", operands[1]);
                self.current().album.push(operands[1].clone());
            }
            Some(other) => tracing::debug!("Unhandled REM type: {}", other),
            None => {}
        }
        Ok(())
    }

    fn file(&mut self, line: usize, name: &str, kind: &str) -> Result<()> {
        if !matches!(kind, "WAVE" | "MP3" | "AIFF") {
            return Err(CueSheetError::at(line, format!("unsupported file type {kind}")));
        }
        self.filename = Some(name.to_string());
        self.prev_frames = 0;
        Ok(())
    }

    fn start_track(&mut self, line: usize, number: &str, datatype: &str) -> Result<()> {
        if self.filename.is_none() {
            return Err(CueSheetError::at(line, "no filename yet specified"));
        }
        if self.track > 0 && self.index < 1 {
            return Err(CueSheetError::at(
                line,
                format!("track {:02} lacks a 01 index", self.track),
            ));
        }
        if datatype != "AUDIO" {
            return Err(CueSheetError::at(line, "only AUDIO track datatype supported"));
        }

        let number = parse_number(number, line)?;
        self.track += 1;
        self.index = -1;
        if number != self.track {
            return Err(CueSheetError::at(line, "unexpected track number"));
        }
        self.segments.entry(self.track).or_default();
        Ok(())
    }

    fn pregap(&mut self, line: usize, time: &str) -> Result<()> {
        if self.track == 0 || self.index != -1 || self.current().pregap.is_some() {
            return Err(CueSheetError::at(line, "unexpected PREGAP command"));
        }
        let frames = parse_time(time, line)?;
        self.current().pregap = Some(frames);
        Ok(())
    }

    fn add_index(&mut self, line: usize, number: &str, time: &str) -> Result<()> {
        if self.track == 0 {
            return Err(CueSheetError::at(line, "no track yet specified"));
        }
        if self.current().postgap.is_some() {
            return Err(CueSheetError::at(line, "INDEX command following POSTGAP"));
        }

        let number = parse_number(number, line)?;
        let frames = parse_time(time, line)?;

        if self.track == 1 && self.index == -1 && frames != 0 {
            return Err(CueSheetError::at(line, "first index must be zero for a file"));
        }

        if self.index == -1 && number == 1 {
            self.index += 1;
        }
        self.index += 1;
        if i64::from(number) != self.index {
            return Err(CueSheetError::at(line, "unexpected index number"));
        }

        if frames < self.prev_frames {
            return Err(CueSheetError::at(line, "index time before the previous index"));
        }
        if self.prev_frames != 0 && frames == self.prev_frames {
            return Err(CueSheetError::at(line, "index time no different than previously"));
        }

        let file = self.filename.clone().unwrap_or_default();
        self.current()
            .indices
            .insert(number, IndexPoint { file, offset: frames });
        self.prev_frames = frames;
        Ok(())
    }

    fn postgap(&mut self, line: usize, time: &str) -> Result<()> {
        if self.track == 0 || self.index < 1 || self.current().postgap.is_some() {
            return Err(CueSheetError::at(line, "unexpected POSTGAP command"));
        }
        let frames = parse_time(time, line)?;
        self.current().postgap = Some(frames);
        Ok(())
    }

    fn finish(self) -> Result<CueSegments> {
        if self.track == 0 {
            return Err(CueSheetError::sheet("no tracks"));
        }
        if self.index < 1 {
            return Err(CueSheetError::sheet(format!(
                "track {:02} lacks a 01 index",
                self.track
            )));
        }
        Ok(CueSegments {
            tracks: self.segments,
        })
    }
}

/// Parse already-decoded lines
///
/// Unknown commands are ignored. `REM` lines are lenient: only `REM ALBUM`
/// checks its operand count.
pub fn parse_lines<I, S>(lines: I) -> Result<CueSegments>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = Parser::new();
    for (i, line) in lines.into_iter().enumerate() {
        let text = line.as_ref();
        let text = if i == 0 {
            text.trim_start_matches('\u{feff}')
        } else {
            text
        };
        let tokens = tokenize(text);
        let Some((command, operands)) = tokens.split_first() else {
            continue;
        };
        parser.command(i + 1, &command.to_ascii_uppercase(), operands)?;
    }
    parser.finish()
}

/// Parse raw bytes, decoding each line on its own
pub fn parse_bytes(data: &[u8]) -> Result<CueSegments> {
    let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
    let lines: Vec<_> = data
        .split(|&b| b == b'\n')
        .map(|raw| decode_line(raw.strip_suffix(b"\r").unwrap_or(raw)))
        .collect();
    parse_lines(lines)
}

/// Read and parse a cue sheet file
pub fn parse_file(path: &Path) -> Result<CueSegments> {
    let data = std::fs::read(path)?;
    parse_bytes(&data)
}
