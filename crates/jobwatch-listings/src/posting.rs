//! Posting and identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key recognising the same posting across runs.
///
/// Either the site-assigned id, or a normalized `title | url` pair when the
/// site offers none. Two postings with the same id are the same listing no
/// matter how their other fields drift.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingId(String);

impl PostingId {
    /// Use a site-assigned id verbatim (trimmed).
    pub fn from_site_id(id: &str) -> Self {
        Self(id.trim().to_string())
    }

    /// Derive an id from title and URL: lowercased, whitespace collapsed.
    pub fn derive(title: &str, url: &str) -> Self {
        Self(format!("{} | {}", normalize(title), normalize(url)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lowercase and collapse runs of whitespace to a single space.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One job listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub id: PostingId,
    pub title: String,
    pub url: String,
    pub location: Option<String>,
    pub department: Option<String>,
}

impl Posting {
    /// Build a posting without a site id; the identity is derived from
    /// title and URL.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let title = title.into();
        let url = url.into();
        Self {
            id: PostingId::derive(&title, &url),
            title,
            url,
            location: None,
            department: None,
        }
    }

    pub fn with_id(mut self, id: PostingId) -> Self {
        self.id = id;
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// The persisted form of this posting (everything but the key).
    pub fn record(&self) -> PostingRecord {
        PostingRecord {
            title: self.title.clone(),
            url: self.url.clone(),
            location: self.location.clone(),
            department: self.department.clone(),
        }
    }

    pub fn from_record(id: PostingId, record: PostingRecord) -> Self {
        Self {
            id,
            title: record.title,
            url: record.url,
            location: record.location,
            department: record.department,
        }
    }
}

/// Posting fields as stored in the snapshot file, keyed by [`PostingId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}
