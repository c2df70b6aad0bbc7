use log::debug;

use nom::{
    bytes::complete::{is_not, tag, tag_no_case},
    character::complete::{char, multispace1, space0, space1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use serde::Serialize;

use std::cmp::Ordering;

use super::parse_timestamp;

static ARROW: &str = "-->";
static NOTE_TAG: &str = "NOTE";
static VOICE_TAG: &str = "<v";

/// A merged run of captions attributed to one speaker.
///
/// `end >= start`; equality only happens for a degenerate zero-length cue.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug)]
struct Cue {
    start: f64,
    end: f64,
    text: String,
}

fn parse_cue_timing(i: &str) -> IResult<&str, (f64, f64)> {
    let (i, _) = space0(i)?;
    let (i, start) = parse_timestamp(i)?;
    let (i, _) = delimited(space1, tag(ARROW), space1)(i)?;
    let (i, end) = parse_timestamp(i)?;
    Ok((i, (start, end)))
}

fn is_note_line(line: &str) -> bool {
    let result: IResult<&str, (&str, &str)> = pair(tag_no_case(NOTE_TAG), multispace1)(line);
    result.is_ok()
}

// `<v` then whitespace then a non-empty run up to `>`, anchored at the start
// of the cue text. Only the marker is case-insensitive, not the name.
fn parse_voice_tag(i: &str) -> IResult<&str, &str> {
    preceded(
        pair(tag_no_case(VOICE_TAG), multispace1),
        terminated(is_not(">"), char('>')),
    )(i)
}

fn tokenize(text: &str) -> Vec<Cue> {
    let lines: Vec<&str> = text.lines().collect();
    let mut cues = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let (start, end) = match parse_cue_timing(lines[index]) {
            Ok((_, times)) => times,
            Err(_) => {
                index += 1;
                continue;
            }
        };

        let mut payload: Vec<&str> = Vec::new();
        let mut cursor = index + 1;
        while cursor < lines.len() {
            let line = lines[cursor];
            if line.trim().is_empty() || parse_cue_timing(line).is_ok() {
                break;
            }
            if !is_note_line(line) {
                payload.push(line);
            }
            cursor += 1;
        }
        index = cursor;

        if end < start {
            debug!("dropping cue with backwards timing {} --> {}", start, end);
            continue;
        }

        cues.push(Cue {
            start,
            end,
            text: payload.join(" "),
        });
    }

    cues
}

/// Tokenizes a captions document and merges temporally-adjacent cues of the
/// same speaker into continuous segments, sorted by start time.
///
/// Cues without a leading voice tag are discarded. Merging requires the
/// identical speaker string and an exact start-equals-previous-end boundary,
/// with zero tolerance for gaps.
pub fn extract_speaker_segments(text: &str) -> Vec<SpeakerSegment> {
    let mut segments: Vec<SpeakerSegment> = Vec::new();

    for cue in tokenize(text) {
        let speaker = match parse_voice_tag(&cue.text) {
            Ok((_, name)) => name.trim().to_string(),
            Err(_) => {
                debug!("dropping cue without a voice tag: {:?}", cue.text);
                continue;
            }
        };

        match segments.last_mut() {
            Some(last) if last.speaker == speaker && cue.start == last.end => {
                last.end = cue.end;
            }
            _ => segments.push(SpeakerSegment {
                speaker,
                start: cue.start,
                end: cue.end,
            }),
        }
    }

    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));
    segments
}
