use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};

use crate::error::TypeError;

/// Character separating a primary id from a sidecar suffix. Never part of a
/// primary post id.
pub const SIDECAR_MARK: char = '.';

/// Time prefix carried by files without an explicit `HHMMSSZ-` prefix.
pub const MIDNIGHT: &str = "000000Z";

/// Identifier of a post in a dated directory tree.
///
/// Textual form: `<YYYYMMDD><HHMMSS>Z-<disambiguator>[.<sidecar>]`. The date
/// comes from the `YYYY/MM/DD` day-directory, the time from the optional
/// `HHMMSSZ-` filename prefix (midnight when absent) and the disambiguator is
/// the rest of the filename up to its first `.`.
///
/// Ordering follows the textual form: date, then time, then disambiguator.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostId {
    date: NaiveDate,
    time: NaiveTime,
    disambiguator: String,
    sidecar: Option<String>,
}

impl PostId {
    /// Build a primary id from its parts.
    pub fn new(
        date: NaiveDate,
        time: NaiveTime,
        disambiguator: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let disambiguator = disambiguator.into();
        check_segment(&disambiguator, "disambiguator")?;
        if disambiguator.contains(SIDECAR_MARK) {
            return Err(invalid(&disambiguator, "disambiguator contains '.'"));
        }
        Ok(Self {
            date,
            time: time.with_nanosecond(0).unwrap_or(time),
            disambiguator,
            sidecar: None,
        })
    }

    /// Derive the primary id of a file inside the day-directory for `date`.
    pub fn for_file(date: NaiveDate, file_name: &str) -> Result<Self, TypeError> {
        let stem = FileStem::parse(file_name)
            .ok_or_else(|| invalid(file_name, "not a post file name"))?;
        Self::new(date, stem.time.unwrap_or(NaiveTime::MIN), stem.disambiguator)
    }

    /// The id of a sidecar attached to this post, keyed by the sidecar's
    /// full extension.
    pub fn with_sidecar(&self, extension: impl Into<String>) -> Result<Self, TypeError> {
        let extension = extension.into();
        check_segment(&extension, "sidecar suffix")?;
        Ok(Self {
            sidecar: Some(extension),
            ..self.primary()
        })
    }

    /// This id without any sidecar suffix.
    pub fn primary(&self) -> Self {
        Self {
            sidecar: None,
            ..self.clone()
        }
    }

    pub fn is_sidecar(&self) -> bool {
        self.sidecar.is_some()
    }

    pub fn sidecar(&self) -> Option<&str> {
        self.sidecar.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn disambiguator(&self) -> &str {
        &self.disambiguator
    }

    /// The instant this post was made, in UTC.
    pub fn instant(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }

    /// Filename key shared by every file of this post: `HHMMSSZ-<disambiguator>`.
    pub fn match_key(&self) -> String {
        format!("{}-{}", time_prefix(self.time), self.disambiguator)
    }

    /// Relative path of the day-directory holding this post.
    pub fn day_dir(&self) -> PathBuf {
        day_dir(self.date)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{}",
            self.date.format("%Y%m%d"),
            time_prefix(self.time),
            self.disambiguator
        )?;
        if let Some(sidecar) = &self.sidecar {
            write!(f, "{SIDECAR_MARK}{sidecar}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostId({self})")
    }
}

impl FromStr for PostId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() < 17 {
            return Err(invalid(s, "too short"));
        }
        if !bytes[..14].iter().all(u8::is_ascii_digit) {
            return Err(invalid(s, "date and time must be 14 digits"));
        }
        if bytes[14] != b'Z' || bytes[15] != b'-' {
            return Err(invalid(s, "expected 'Z-' after the time"));
        }

        let date = NaiveDate::from_ymd_opt(
            digits(&s[0..4]) as i32,
            digits(&s[4..6]),
            digits(&s[6..8]),
        )
        .ok_or_else(|| invalid(s, "no such calendar date"))?;
        let time = NaiveTime::from_hms_opt(digits(&s[8..10]), digits(&s[10..12]), digits(&s[12..14]))
            .ok_or_else(|| invalid(s, "no such time of day"))?;

        let rest = &s[16..];
        match rest.split_once(SIDECAR_MARK) {
            Some((name, sidecar)) => Self::new(date, time, name)?.with_sidecar(sidecar),
            None => Self::new(date, time, rest),
        }
    }
}

/// A post filename split into its parts.
///
/// `051121Z-hello.meta.json` has time `05:11:21`, disambiguator `hello` and
/// extension `meta.json`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStem<'a> {
    pub time: Option<NaiveTime>,
    pub disambiguator: &'a str,
    pub extension: Option<&'a str>,
}

impl<'a> FileStem<'a> {
    /// Split a filename. Returns `None` for names that cannot be posts
    /// (hidden files, empty disambiguators).
    pub fn parse(file_name: &'a str) -> Option<Self> {
        if file_name.starts_with('.') {
            return None;
        }
        let (time, rest) = match split_time_prefix(file_name) {
            Some((time, rest)) => (Some(time), rest),
            None => (None, file_name),
        };
        let (disambiguator, extension) = match rest.split_once(SIDECAR_MARK) {
            Some((name, ext)) => (name, (!ext.is_empty()).then_some(ext)),
            None => (rest, None),
        };
        if disambiguator.is_empty() {
            return None;
        }
        Some(Self {
            time,
            disambiguator,
            extension,
        })
    }

    /// Number of `.`-separated extension segments.
    pub fn extension_segments(&self) -> usize {
        self.extension.map_or(0, |ext| ext.split(SIDECAR_MARK).count())
    }
}

/// Relative `YYYY/MM/DD` path of the day-directory for `date`.
pub fn day_dir(date: NaiveDate) -> PathBuf {
    let mut path = PathBuf::from(format!("{:04}", date.year()));
    path.push(format!("{:02}", date.month()));
    path.push(format!("{:02}", date.day()));
    path
}

fn split_time_prefix(name: &str) -> Option<(NaiveTime, &str)> {
    let bytes = name.as_bytes();
    if bytes.len() < 8 || !bytes[..6].iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes[6] != b'Z' || bytes[7] != b'-' {
        return None;
    }
    let time = NaiveTime::from_hms_opt(digits(&name[0..2]), digits(&name[2..4]), digits(&name[4..6]))?;
    Some((time, &name[8..]))
}

fn time_prefix(time: NaiveTime) -> String {
    format!("{:02}{:02}{:02}Z", time.hour(), time.minute(), time.second())
}

// Callers guarantee `s` is all ASCII digits.
fn digits(s: &str) -> u32 {
    s.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

fn check_segment(segment: &str, what: &'static str) -> Result<(), TypeError> {
    if segment.is_empty() {
        return Err(invalid(segment, what));
    }
    if segment.contains(['/', '\\']) || segment.chars().any(char::is_control) {
        return Err(invalid(segment, "contains a path separator or control character"));
    }
    Ok(())
}

fn invalid(id: &str, reason: &'static str) -> TypeError {
    TypeError::InvalidPostId {
        id: id.to_string(),
        reason,
    }
}
