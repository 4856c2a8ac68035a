use serde::{Deserialize, Serialize};

/// Well-known link relation names.
pub mod rel {
    pub const SELF: &str = "self";
    pub const PREVIOUS: &str = "previous";
    pub const DESCRIBED_BY: &str = "describedby";
}

/// A typed pointer from one post to another resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target reference: absolute url, absolute path, or a bare post id.
    pub url: String,
    /// Relation name, empty when the header entry carried none.
    #[serde(default)]
    pub rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            rel: rel.into(),
            media_type: None,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// `true` when the target is a bare reference (no scheme, no path).
    pub fn is_bare(&self) -> bool {
        !self.url.contains('/') && !self.url.contains(':')
    }
}

/// First link with the given relation.
pub fn find_rel<'a>(links: &'a [Link], rel: &str) -> Option<&'a Link> {
    links.iter().find(|link| link.rel == rel)
}
