use log::debug;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::opt,
    sequence::{pair, preceded, tuple},
    IResult,
};

use serde::Serialize;

static TEMPORAL_TOKEN: &str = "t=";
static SPATIAL_TOKEN: &str = "xywh=";
static UNIT_PIXEL: &str = "pixel:";
static UNIT_PERCENT: &str = "percent:";

/// A `t=start[,end]` locator denoting a sub-interval of a media timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TemporalFragment {
    pub start: f64,
    pub end: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialUnit {
    Pixel,
    Percent,
}

impl Default for SpatialUnit {
    fn default() -> Self {
        SpatialUnit::Pixel
    }
}

/// An `xywh=[unit:]x,y,w,h` locator denoting a rectangular sub-region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpatialFragment {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub unit: SpatialUnit,
}

/// Parsed content of one fragment body. Both parts are optional and
/// independent of each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MediaFragment {
    pub temporal: Option<TemporalFragment>,
    pub spatial: Option<SpatialFragment>,
}

/// Splits a URI at its first `#`, returning the fragment-free source and the
/// fragment body, if any.
pub fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.find('#') {
        Some(idx) => (&uri[..idx], Some(&uri[idx + 1..])),
        None => (uri, None),
    }
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

// A run may be empty: absent sides of the temporal pair are empty runs,
// not zeros.
fn number_run(i: &str) -> IResult<&str, &str> {
    take_while(is_number_char)(i)
}

fn number_run1(i: &str) -> IResult<&str, &str> {
    take_while1(is_number_char)(i)
}

fn temporal_runs(i: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(number_run, opt(preceded(char(','), number_run)))(i)
}

/// Syntactic match only: locates the temporal pattern in `body` and returns
/// the raw `(start, end)` runs without validating them.
///
/// The first `t=` token anywhere in the body wins; a body with no token at
/// all is tried as a bare `start[,end]` form anchored at the beginning, which
/// is how selector values like `10,20` come in.
pub(crate) fn temporal_match(body: &str) -> Option<(&str, Option<&str>)> {
    match body.find(TEMPORAL_TOKEN) {
        Some(idx) => temporal_runs(&body[idx + TEMPORAL_TOKEN.len()..])
            .ok()
            .map(|(_, runs)| runs),
        None => {
            let (_, runs) = temporal_runs(body).ok()?;
            if runs.0.is_empty() && runs.1.map_or(true, str::is_empty) {
                None
            } else {
                Some(runs)
            }
        }
    }
}

/// Parses and validates the temporal part of a fragment body.
///
/// The number-run character class is digits and dots only, so a minus sign is
/// never captured: `t=5,-20` degrades to the open-ended `t=5` instead of
/// failing. A run that is captured but does not parse as a number (`1.2.3`)
/// drops the whole temporal result, as does an end that does not exceed the
/// start.
pub fn parse_temporal(body: &str) -> Option<TemporalFragment> {
    let (start_run, end_run) = temporal_match(body)?;
    let end_run = end_run.filter(|run| !run.is_empty());

    let start = if start_run.is_empty() {
        // `t=,20` form: an empty start with an explicit end means 0
        end_run?;
        0f64
    } else {
        match start_run.parse::<f64>() {
            Ok(start) => start,
            Err(_) => {
                debug!("unusable temporal start {:?} in {:?}", start_run, body);
                return None;
            }
        }
    };

    let end = match end_run {
        Some(run) => match run.parse::<f64>() {
            Ok(end) if end > start => Some(end),
            _ => {
                debug!("unusable temporal end {:?} in {:?}", run, body);
                return None;
            }
        },
        None => None,
    };

    Some(TemporalFragment { start, end })
}

fn spatial_region(i: &str) -> IResult<&str, (Option<&str>, (&str, &str, &str, &str))> {
    pair(
        opt(alt((tag(UNIT_PIXEL), tag(UNIT_PERCENT)))),
        tuple((
            number_run1,
            preceded(char(','), number_run1),
            preceded(char(','), number_run1),
            preceded(char(','), number_run1),
        )),
    )(i)
}

/// Parses and validates the spatial part of a fragment body: the first
/// `xywh=` token anywhere in the body, an optional `pixel:`/`percent:` unit
/// (pixel when absent) and four mandatory comma-separated values.
///
/// Percent regions must fit the normalized canvas; a region that does not is
/// absent, not clamped.
pub fn parse_spatial(body: &str) -> Option<SpatialFragment> {
    let idx = body.find(SPATIAL_TOKEN)?;
    let (_, (unit, runs)) = spatial_region(&body[idx + SPATIAL_TOKEN.len()..]).ok()?;

    let unit = if unit == Some(UNIT_PERCENT) {
        SpatialUnit::Percent
    } else {
        SpatialUnit::Pixel
    };

    let (x, y, width, height) = runs;
    let x = parse_spatial_run(x, body)?;
    let y = parse_spatial_run(y, body)?;
    let width = parse_spatial_run(width, body)?;
    let height = parse_spatial_run(height, body)?;

    // runs are non-negative by construction, so the sum checks also bound
    // each individual value
    if unit == SpatialUnit::Percent && (x + width > 100f64 || y + height > 100f64) {
        debug!("percent region out of bounds in {:?}", body);
        return None;
    }

    Some(SpatialFragment {
        x,
        y,
        width,
        height,
        unit,
    })
}

fn parse_spatial_run(run: &str, body: &str) -> Option<f64> {
    match run.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("unusable spatial value {:?} in {:?}", run, body);
            None
        }
    }
}

/// Parses one bare fragment body (the substring after `#`, or a selector's
/// raw value). The temporal and spatial patterns are searched independently
/// and may appear in either order.
pub fn parse_media_fragment(body: &str) -> MediaFragment {
    MediaFragment {
        temporal: parse_temporal(body),
        spatial: parse_spatial(body),
    }
}

#[test]
fn split_fragment_test() {
    assert_eq!(
        ("http://example.com/canvas", Some("t=10,20")),
        split_fragment("http://example.com/canvas#t=10,20"),
    );
    assert_eq!(("plain", None), split_fragment("plain"));
    assert_eq!(("", Some("t=1")), split_fragment("#t=1"));
    assert_eq!(("a", Some("b#c")), split_fragment("a#b#c"));
}

#[test]
fn parse_temporal_test() {
    assert_eq!(
        Some(TemporalFragment {
            start: 0f64,
            end: Some(30f64),
        }),
        parse_temporal("t=0,30"),
    );
    assert_eq!(
        Some(TemporalFragment {
            start: 3971.24f64,
            end: None,
        }),
        parse_temporal("t=3971.24"),
    );
    // empty start with an explicit end defaults to 0
    assert_eq!(
        Some(TemporalFragment {
            start: 0f64,
            end: Some(20f64),
        }),
        parse_temporal("t=,20"),
    );
    // end must be strictly greater than start
    assert!(parse_temporal("t=20,10").is_none());
    assert!(parse_temporal("t=10,10").is_none());
    // a leading minus is never captured, so the start run is empty and the
    // comma is never reached either: nothing matches
    assert!(parse_temporal("t=-5,20").is_none());
    // same quirk on the end side degrades to the open-ended form
    assert_eq!(
        Some(TemporalFragment {
            start: 5f64,
            end: None,
        }),
        parse_temporal("t=5,-20"),
    );
    // captured but not a number: the whole temporal is dropped
    assert!(parse_temporal("t=1.2.3,20").is_none());
    assert!(parse_temporal("t=5,1.2.3").is_none());
    // both sides empty
    assert!(parse_temporal("t=").is_none());
    assert!(parse_temporal("t=,").is_none());
    assert!(parse_temporal("").is_none());
}

#[test]
fn parse_temporal_search_test() {
    // the pattern is searched anywhere in the body
    assert_eq!(
        Some(TemporalFragment {
            start: 5f64,
            end: Some(9f64),
        }),
        parse_temporal("xywh=10,20,30,40&t=5,9"),
    );
    // the first `t=` occurrence wins, even when it yields nothing
    assert!(parse_temporal("format=json").is_none());
    // a body with no token at all is read as a bare selector value
    assert_eq!(
        Some(TemporalFragment {
            start: 10f64,
            end: Some(20f64),
        }),
        parse_temporal("10,20"),
    );
    assert!(parse_temporal("xywh=10,20,30,40").is_none());
}

#[test]
fn parse_spatial_test() {
    assert_eq!(
        Some(SpatialFragment {
            x: 160f64,
            y: 120f64,
            width: 320f64,
            height: 240f64,
            unit: SpatialUnit::Pixel,
        }),
        parse_spatial("xywh=160,120,320,240"),
    );
    assert_eq!(
        Some(SpatialFragment {
            x: 160f64,
            y: 120f64,
            width: 320f64,
            height: 240f64,
            unit: SpatialUnit::Pixel,
        }),
        parse_spatial("xywh=pixel:160,120,320,240"),
    );
    assert_eq!(
        Some(SpatialFragment {
            x: 10f64,
            y: 20f64,
            width: 30f64,
            height: 40f64,
            unit: SpatialUnit::Percent,
        }),
        parse_spatial("xywh=percent:10,20,30,40"),
    );
    // percent regions must fit the normalized canvas
    assert!(parse_spatial("xywh=percent:80,80,30,30").is_none());
    assert!(parse_spatial("xywh=percent:0,0,100.5,10").is_none());
    // all four values are mandatory
    assert!(parse_spatial("xywh=10,20,30").is_none());
    assert!(parse_spatial("xywh=").is_none());
    assert!(parse_spatial("t=10,20").is_none());
    // captured but not a number
    assert!(parse_spatial("xywh=1.2.3,0,10,10").is_none());
}

#[test]
fn parse_media_fragment_test() {
    let fragment = parse_media_fragment("t=10,20&xywh=0,0,320,240");
    assert_eq!(
        Some(TemporalFragment {
            start: 10f64,
            end: Some(20f64),
        }),
        fragment.temporal,
    );
    assert_eq!(
        Some(SpatialFragment {
            x: 0f64,
            y: 0f64,
            width: 320f64,
            height: 240f64,
            unit: SpatialUnit::Pixel,
        }),
        fragment.spatial,
    );

    // either order
    let swapped = parse_media_fragment("xywh=0,0,320,240&t=10,20");
    assert_eq!(fragment, swapped);

    assert_eq!(MediaFragment::default(), parse_media_fragment("unrelated"));
}
