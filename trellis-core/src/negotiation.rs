//! `Accept` header parsing for JSON detection.
//!
//! # Examples
//!
//! ```
//! use trellis_core::negotiation::{Accept, MediaType};
//!
//! let accept = Accept::parse("application/json, text/html;q=0.9, */*;q=0.1");
//! assert!(accept.prefers_json());
//! assert!(accept.accepts(&MediaType::html()));
//!
//! let browser = Accept::parse("text/html,application/xhtml+xml,*/*;q=0.8");
//! assert!(!browser.prefers_json());
//! ```

use std::cmp::Ordering;
use std::fmt;

/// A media range such as `application/json` or `text/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// The type (e.g., "application", "text")
    pub type_: String,
    /// The subtype (e.g., "json", "html")
    pub subtype: String,
}

impl MediaType {
    /// Create a new media type.
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
        }
    }

    /// `application/json`
    pub fn json() -> Self {
        Self::new("application", "json")
    }

    /// `text/html`
    pub fn html() -> Self {
        Self::new("text", "html")
    }

    /// Parse `type/subtype`, ignoring parameters.
    pub fn parse(s: &str) -> Option<Self> {
        let type_subtype = s.split(';').next()?.trim();
        let (type_, subtype) = type_subtype.split_once('/')?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }
        Some(Self::new(type_.to_lowercase(), subtype.to_lowercase()))
    }

    /// Check if this media range covers another (wildcards on either side).
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_matches = self.type_ == "*" || other.type_ == "*" || self.type_ == other.type_;
        let subtype_matches =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        type_matches && subtype_matches
    }

    /// Structured-syntax JSON types such as `application/problem+json`.
    pub fn is_json_like(&self) -> bool {
        self.type_ == "application" && (self.subtype == "json" || self.subtype.ends_with("+json"))
    }

    fn specificity(&self) -> u8 {
        let mut score = 0u8;
        if self.type_ != "*" {
            score += 2;
        }
        if self.subtype != "*" {
            score += 1;
        }
        score
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}

/// A parsed `Accept` header.
#[derive(Debug, Clone, Default)]
pub struct Accept {
    /// Media ranges with their quality values, best first.
    pub media_types: Vec<(MediaType, f32)>,
}

impl Accept {
    /// Parse an `Accept` header value. Unparsable ranges are skipped.
    pub fn parse(header: &str) -> Self {
        let mut media_types: Vec<(MediaType, f32)> = header
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                MediaType::parse(part).map(|mt| (mt, Self::quality_of(part)))
            })
            .collect();

        media_types.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => b.0.specificity().cmp(&a.0.specificity()),
            Some(ord) => ord,
        });

        Self { media_types }
    }

    /// Quality value from the `q` parameter, defaulting to 1.
    fn quality_of(part: &str) -> f32 {
        part.split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .unwrap_or(1.0)
            .clamp(0.0, 1.0)
    }

    /// Quality the client assigns to `media_type`; the most specific
    /// matching range decides. Zero when nothing matches.
    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.media_types
            .iter()
            .filter(|(range, _)| range.matches(media_type))
            .max_by_key(|(range, _)| range.specificity())
            .map(|(_, quality)| *quality)
            .unwrap_or(0.0)
    }

    /// Check if a media type is acceptable.
    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.quality_for(media_type) > 0.0
    }

    /// True when JSON is ranked strictly above HTML, or a `+json` type is
    /// listed explicitly ahead of everything else.
    pub fn prefers_json(&self) -> bool {
        if self
            .media_types
            .first()
            .is_some_and(|(range, q)| *q > 0.0 && range.is_json_like())
        {
            return true;
        }
        self.quality_for(&MediaType::json()) > self.quality_for(&MediaType::html())
    }
}
