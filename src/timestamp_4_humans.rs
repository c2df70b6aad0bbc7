use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::map_res,
    IResult,
};

use std::fmt;

fn parse_number(i: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>())(i)
}

fn parse_fraction(i: &str) -> IResult<&str, f64> {
    map_res(digit1, |digits: &str| format!("0.{}", digits).parse::<f64>())(i)
}

/// Parses a `H:MM:SS.mmm` or `MM:SS.mmm` timestamp into seconds.
///
/// Components are read as plain integer runs, so the digit count is free; the
/// fractional part is mandatory.
pub fn parse_timestamp(i: &str) -> IResult<&str, f64> {
    let (i, nb1) = parse_number(i)?;
    let (i, _) = char(':')(i)?;
    let (i, nb2) = parse_number(i)?;
    let (i, separator) = alt((char(':'), char('.')))(i)?;

    if separator == ':' {
        let (i, nb3) = parse_number(i)?;
        let (i, _) = char('.')(i)?;
        let (i, fraction) = parse_fraction(i)?;
        Ok((
            i,
            nb1 as f64 * 3_600f64 + nb2 as f64 * 60f64 + nb3 as f64 + fraction,
        ))
    } else {
        let (i, fraction) = parse_fraction(i)?;
        Ok((i, nb1 as f64 * 60f64 + nb2 as f64 + fraction))
    }
}

#[test]
fn parse_string() {
    let (i, ts) = parse_timestamp("11:42:20.010").unwrap();
    assert!(i.is_empty());
    assert!((ts - 42_140.01f64).abs() < 1e-9);

    let (i, ts) = parse_timestamp("42:20.010").unwrap();
    assert!(i.is_empty());
    assert!((ts - 2_540.01f64).abs() < 1e-9);

    let (i, ts) = parse_timestamp("0:03.5").unwrap();
    assert!(i.is_empty());
    assert!((ts - 3.5f64).abs() < 1e-9);

    // the fractional part is mandatory
    assert!(parse_timestamp("42:20").is_err());
    assert!(parse_timestamp("11:42:20").is_err());
    assert!(parse_timestamp("abc:15.000").is_err());
    assert!(parse_timestamp("42:aa.015").is_err());
}

/// A second count split into display components.
///
/// Renders as `H:MM:SS` from one hour up, `M:SS` below, with a
/// millisecond-precision fractional suffix stripped of trailing zeros and
/// omitted entirely when the fractional part is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timestamp4Humans {
    pub h: u64,
    pub m: u64,
    pub s: u64,
    pub ms: u64,
}

impl Timestamp4Humans {
    pub fn from_secs(secs: f64) -> Self {
        let ms_total = (secs * 1_000f64).round() as u64;
        let s_total = ms_total / 1_000;
        let m_total = s_total / 60;

        Timestamp4Humans {
            h: m_total / 60,
            m: m_total % 60,
            s: s_total % 60,
            ms: ms_total % 1_000,
        }
    }
}

impl fmt::Display for Timestamp4Humans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.h == 0 {
            write!(f, "{}:{:02}", self.m, self.s)?;
        } else {
            write!(f, "{}:{:02}:{:02}", self.h, self.m, self.s)?;
        }

        if self.ms > 0 {
            let ms = format!("{:03}", self.ms);
            write!(f, ".{}", ms.trim_end_matches('0'))?;
        }

        Ok(())
    }
}

#[test]
fn display() {
    assert_eq!("1:06:11.24", Timestamp4Humans::from_secs(3_971.24f64).to_string());
    assert_eq!("12:34.5", Timestamp4Humans::from_secs(754.5f64).to_string());
    assert_eq!("0:59", Timestamp4Humans::from_secs(59f64).to_string());
    assert_eq!("1:00:00", Timestamp4Humans::from_secs(3_600f64).to_string());
    assert_eq!("0:00", Timestamp4Humans::from_secs(0f64).to_string());
    // rounding rolls over into the seconds component
    assert_eq!("1:00", Timestamp4Humans::from_secs(59.9999f64).to_string());
}
