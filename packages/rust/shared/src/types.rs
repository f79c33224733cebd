//! Core domain types for the team roster.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// One spreadsheet row after column-name mapping.
///
/// Values are kept as raw strings; interpretation (flags, URLs) happens in the
/// validator. Transient input, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    values: HashMap<String, String>,
}

impl RawRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Raw value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Trimmed value of a field; empty string when absent.
    pub fn get_trimmed(&self, field: &str) -> &str {
        self.get(field).map(str::trim).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// TeamMember
// ---------------------------------------------------------------------------

/// A validated team member, one per accepted spreadsheet row.
///
/// `image_url` is working state for the image resolver and is never part of
/// the published document; `image_name` is attached after resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default = "default_committee")]
    pub committee: String,
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub github: Option<Url>,
    #[serde(default)]
    pub linkedin: Option<Url>,
    #[serde(default)]
    pub website: Option<Url>,
    #[serde(default)]
    pub twitter: Option<Url>,
    #[serde(default)]
    pub bluesky: Option<Url>,
    #[serde(default)]
    pub mastodon: Option<Url>,
    #[serde(skip_serializing, default)]
    pub image_url: Option<Url>,
}

impl TeamMember {
    /// Create a member with only the required field set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: String::new(),
            committee: default_committee(),
            image_name: None,
            github: None,
            linkedin: None,
            website: None,
            twitter: None,
            bluesky: None,
            mastodon: None,
            image_url: None,
        }
    }
}

fn default_committee() -> String {
    "other".into()
}

// ---------------------------------------------------------------------------
// Committee / RosterDocument
// ---------------------------------------------------------------------------

/// A named committee with its members in row order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Committee {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    pub members: Vec<TeamMember>,
}

/// The publishable artifact: everything the site needs to render the team
/// page. Field names and order are the wire contract of the databag file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterDocument {
    pub team_images: String,
    pub default_image: String,
    pub types: Vec<Committee>,
}
