use std::borrow::Cow;
use std::fmt::Write;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use ts_types::Link;

/// Bytes escaped when a post id becomes a link target. Covers the url path
/// delimiters and the `Link` header punctuation; non-ASCII is always escaped.
const TARGET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b',')
    .add(b'/')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a post id for use as a single url path segment.
pub fn encode_target(id: &str) -> String {
    utf8_percent_encode(id, TARGET).to_string()
}

/// Reverse of [`encode_target`]. `None` when the decoded bytes are not UTF-8.
pub fn decode_target(target: &str) -> Option<String> {
    percent_decode_str(target)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

/// Parse a `Link` header value.
///
/// Grammar: `<url>; rel="name"; type="media/type", <url2>; rel="name2"`.
/// Entries are separated by a comma followed by `<`; parameter quotes are
/// optional. Entries without a bracketed url are skipped and unknown
/// parameters are ignored. An absent header is an empty list.
pub fn parse_link_header(header: Option<&str>) -> Vec<Link> {
    let Some(header) = header else {
        return Vec::new();
    };
    split_entries(header)
        .into_iter()
        .filter_map(parse_entry)
        .collect()
}

/// Serialize links into a single `Link` header value.
pub fn serialize_link_header(links: &[Link]) -> String {
    let mut out = String::new();
    for (i, link) in links.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "<{}>", link.url);
        if !link.rel.is_empty() {
            let _ = write!(out, "; rel=\"{}\"", link.rel);
        }
        if let Some(media_type) = &link.media_type {
            let _ = write!(out, "; type=\"{media_type}\"");
        }
    }
    out
}

fn split_entries(header: &str) -> Vec<&str> {
    let bytes = header.as_bytes();
    let mut entries = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b',' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'<' {
                entries.push(&header[start..i]);
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    entries.push(&header[start..]);
    entries
}

fn parse_entry(entry: &str) -> Option<Link> {
    let rest = &entry[entry.find('<')? + 1..];
    let close = rest.find('>')?;
    let mut link = Link::new(String::new(), &rest[..close]);
    for param in rest[close + 1..].split(';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "rel" => link.rel = value,
            "type" => link.media_type = Some(value),
            _ => {}
        }
    }
    Some(link)
}
