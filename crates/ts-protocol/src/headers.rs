//! Header block encodings for a post's metadata.
//!
//! Every encoding implements [`HeaderWriter`]: headers are accumulated with
//! [`HeaderWriter::set_header`] (keys lower-cased, last write wins) and
//! written out once by [`HeaderWriter::close_headers`], which consumes the
//! writer.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use ts_types::{format_http_date, format_iso, Link};

use crate::error::{ProtocolError, ProtocolResult};
use crate::link_header::serialize_link_header;
use crate::wire::{headers, DEFAULT_CONTENT_TYPE, GEMINI_SUCCESS, PROTOCOL_VERSION};

/// A header value before it is rendered for a particular encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Links(Vec<Link>),
    Time(DateTime<Utc>),
    Json(Value),
}

impl HeaderValue {
    /// Render for a `key: value` header line.
    pub fn to_http(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Links(links) => serialize_link_header(links),
            Self::Time(t) => format_http_date(t),
            Self::Json(v) => v.to_string(),
        }
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Links(links) => serde_json::to_value(links).unwrap_or_default(),
            Self::Time(t) => Value::String(format_iso(t)),
            Self::Json(v) => v.clone(),
        }
    }

    fn is_falsy(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Links(links) => links.is_empty(),
            Self::Time(_) => false,
            Self::Json(v) => match v {
                Value::Null => true,
                Value::Bool(b) => !b,
                Value::Number(n) => n.as_f64() == Some(0.0),
                Value::String(s) => s.is_empty(),
                _ => false,
            },
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Link>> for HeaderValue {
    fn from(links: Vec<Link>) -> Self {
        Self::Links(links)
    }
}

impl From<&[Link]> for HeaderValue {
    fn from(links: &[Link]) -> Self {
        Self::Links(links.to_vec())
    }
}

impl From<DateTime<Utc>> for HeaderValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

impl From<u64> for HeaderValue {
    fn from(n: u64) -> Self {
        Self::Json(Value::from(n))
    }
}

/// Capability shared by every header block encoding.
pub trait HeaderWriter {
    /// Record a header. Later writes to the same key replace earlier ones.
    fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>);

    /// Write the header block and flush the underlying writer.
    fn close_headers(self) -> ProtocolResult<()>;
}

/// `key: value` lines as on the HTTP wire, terminated by a blank line.
///
/// `time-streams-version` and `date` are injected first; setting either
/// explicitly replaces the injected value.
pub struct HttpHeaders<W> {
    out: W,
    headers: Vec<(String, HeaderValue)>,
}

impl<W: Write> HttpHeaders<W> {
    pub fn new(out: W) -> Self {
        Self::with_date(out, Utc::now())
    }

    pub fn with_date(out: W, date: DateTime<Utc>) -> Self {
        let mut writer = Self {
            out,
            headers: Vec::new(),
        };
        writer.set_header(headers::VERSION, PROTOCOL_VERSION);
        writer.set_header(headers::DATE, date);
        writer
    }
}

impl<W: Write> HeaderWriter for HttpHeaders<W> {
    fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    fn close_headers(mut self) -> ProtocolResult<()> {
        for (key, value) in &self.headers {
            write!(self.out, "{key}: {}\r\n", value.to_http())?;
        }
        self.out.write_all(b"\r\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// One flat JSON object per post, followed by a newline. Falsy values are
/// dropped.
pub struct JsonHeaders<W> {
    out: W,
    headers: Map<String, Value>,
}

impl<W: Write> JsonHeaders<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            headers: Map::new(),
        }
    }

    /// The headers accumulated so far.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.headers
    }
}

impl<W: Write> HeaderWriter for JsonHeaders<W> {
    fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        if !value.is_falsy() {
            self.headers.insert(key.to_ascii_lowercase(), value.to_json());
        }
    }

    fn close_headers(mut self) -> ProtocolResult<()> {
        serde_json::to_writer(&mut self.out, &self.headers)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// A single Gemini response line. Only the content type is representable.
pub struct GeminiHeaders<W> {
    out: W,
    content_type: String,
}

impl<W: Write> GeminiHeaders<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl<W: Write> HeaderWriter for GeminiHeaders<W> {
    fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>) {
        if key.eq_ignore_ascii_case(headers::CONTENT_TYPE) {
            if let HeaderValue::Text(content_type) = value.into() {
                self.content_type = content_type;
            }
        }
    }

    fn close_headers(mut self) -> ProtocolResult<()> {
        write!(self.out, "{GEMINI_SUCCESS} {}\r\n", self.content_type)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Header block encodings selectable by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeaderFormat {
    #[default]
    Http,
    Json,
    Gemini,
}

impl HeaderFormat {
    pub fn writer<W: Write>(self, out: W) -> AnyHeaderWriter<W> {
        match self {
            Self::Http => AnyHeaderWriter::Http(HttpHeaders::new(out)),
            Self::Json => AnyHeaderWriter::Json(JsonHeaders::new(out)),
            Self::Gemini => AnyHeaderWriter::Gemini(GeminiHeaders::new(out)),
        }
    }
}

impl FromStr for HeaderFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "json" => Ok(Self::Json),
            "gemini" => Ok(Self::Gemini),
            other => Err(ProtocolError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for HeaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Json => "json",
            Self::Gemini => "gemini",
        })
    }
}

/// The header writer chosen by a [`HeaderFormat`].
pub enum AnyHeaderWriter<W> {
    Http(HttpHeaders<W>),
    Json(JsonHeaders<W>),
    Gemini(GeminiHeaders<W>),
}

impl<W: Write> HeaderWriter for AnyHeaderWriter<W> {
    fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>) {
        match self {
            Self::Http(w) => w.set_header(key, value),
            Self::Json(w) => w.set_header(key, value),
            Self::Gemini(w) => w.set_header(key, value),
        }
    }

    fn close_headers(self) -> ProtocolResult<()> {
        match self {
            Self::Http(w) => w.close_headers(),
            Self::Json(w) => w.close_headers(),
            Self::Gemini(w) => w.close_headers(),
        }
    }
}
