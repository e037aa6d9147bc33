//! SubRip parsing and WebVTT rendering

use std::fmt::Write as _;

use crate::types::SubtitleFormat;
use crate::{GatewayError, Result};

/// One timed block of subtitle text. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: u64,
    pub end: u64,
    pub lines: Vec<String>,
}

/// Convert SubRip text to `target`.
///
/// SRT output is the input unchanged. WebVTT output requires the input to
/// parse completely; a single malformed cue fails the whole conversion.
pub fn convert_format(srt: &str, target: SubtitleFormat) -> Result<String> {
    match target {
        SubtitleFormat::Srt => Ok(srt.to_string()),
        SubtitleFormat::WebVtt => parse_srt(srt).map(|cues| render_webvtt(&cues)),
    }
}

/// Parse SubRip cues.
///
/// Accepts CRLF line endings, a leading byte order mark, `.` as the
/// millisecond separator and missing cue numbers.
pub fn parse_srt(text: &str) -> Result<Vec<Cue>> {
    let text = text.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !block.is_empty() {
                cues.push(parse_block(&block, cues.len() + 1)?);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }

    if cues.is_empty() {
        return Err(GatewayError::Conversion("no subtitle cues found".into()));
    }
    Ok(cues)
}

fn parse_block(block: &[&str], number: usize) -> Result<Cue> {
    let mut lines = block.iter().copied();
    let mut timing = lines.next().unwrap_or_default();
    if !timing.contains("-->") && timing.trim().chars().all(|c| c.is_ascii_digit()) {
        timing = lines.next().unwrap_or_default();
    }

    let Some((start, end)) = timing.split_once("-->") else {
        return Err(GatewayError::Conversion(format!(
            "cue {number}: expected a timing line, found '{}'",
            timing.trim()
        )));
    };
    let start = parse_timestamp(start.trim(), number)?;
    // Anything after the end time is SRT positioning; drop it.
    let end = parse_timestamp(end.split_whitespace().next().unwrap_or_default(), number)?;
    if end < start {
        return Err(GatewayError::Conversion(format!("cue {number}: ends before it starts")));
    }

    Ok(Cue {
        start,
        end,
        lines: lines.map(|line| line.trim_end().to_string()).collect(),
    })
}

/// `HH:MM:SS,mmm` (or `.mmm`) to milliseconds.
fn parse_timestamp(raw: &str, number: usize) -> Result<u64> {
    let invalid = || GatewayError::Conversion(format!("cue {number}: invalid timestamp '{raw}'"));

    let (clock, millis) = raw.split_once([',', '.']).ok_or_else(invalid)?;
    let mut parts = clock.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let field = |value: &str, max: Option<u64>| -> Result<u64> {
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: u64 = value.parse().map_err(|_| invalid())?;
        match max {
            Some(max) if n > max => Err(invalid()),
            _ => Ok(n),
        }
    };
    let hours = field(h, None)?;
    let minutes = field(m, Some(59))?;
    let seconds = field(s, Some(59))?;
    if millis.len() > 3 {
        return Err(invalid());
    }
    // "5" after the separator means 500 ms.
    let millis = field(millis, None)? * 10u64.pow(3 - millis.len() as u32);

    hours
        .checked_mul(3_600_000)
        .and_then(|ms| ms.checked_add((minutes * 60 + seconds) * 1000 + millis))
        .ok_or_else(invalid)
}

/// Render cues as a WebVTT document.
pub fn render_webvtt(cues: &[Cue]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for (i, cue) in cues.iter().enumerate() {
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(out, "{} --> {}", vtt_timestamp(cue.start), vtt_timestamp(cue.end));
        for line in &cue.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn vtt_timestamp(ms: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000
    )
}
