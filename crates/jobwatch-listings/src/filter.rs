//! Role-relevance filter criteria.
//!
//! A posting is kept when ANY keyword is a case-insensitive substring of ANY
//! of the configured fields. With no keywords configured, [`EmptyPolicy`]
//! decides the outcome explicitly.

use serde::{Deserialize, Serialize};

use crate::posting::{Posting, normalize};

/// Posting field a keyword is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Title,
    Department,
}

/// What an empty keyword list means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// No keywords: every posting is relevant.
    #[default]
    KeepAll,
    /// No keywords: nothing is relevant.
    KeepNone,
}

/// A single keyword matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    /// Normalized (lowercased, whitespace-collapsed) keyword.
    needle: String,
    /// The keyword as configured, for reports.
    label: String,
}

impl Matcher {
    pub fn new(keyword: &str) -> Self {
        Self {
            needle: normalize(keyword),
            label: keyword.trim().to_string(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn matches_text(&self, text: &str) -> bool {
        normalize(text).contains(&self.needle)
    }
}

/// Immutable set of keyword matchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    matchers: Vec<Matcher>,
    fields: Vec<MatchField>,
    when_empty: EmptyPolicy,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            matchers: Vec::new(),
            fields: vec![MatchField::Title, MatchField::Department],
            when_empty: EmptyPolicy::default(),
        }
    }
}

impl FilterCriteria {
    /// Build criteria from keywords, matched against title and department.
    ///
    /// Blank keywords are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = keywords
            .into_iter()
            .filter(|k| !k.as_ref().trim().is_empty())
            .map(|k| Matcher::new(k.as_ref()))
            .collect();
        Self {
            matchers,
            ..Self::default()
        }
    }

    /// Restrict matching to the given fields. An empty list keeps the
    /// current fields.
    pub fn with_fields(mut self, fields: Vec<MatchField>) -> Self {
        if !fields.is_empty() {
            self.fields = fields;
        }
        self
    }

    pub fn with_empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.when_empty = policy;
        self
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Whether the posting is relevant.
    pub fn accepts(&self, posting: &Posting) -> bool {
        if self.matchers.is_empty() {
            return self.when_empty == EmptyPolicy::KeepAll;
        }

        self.fields.iter().any(|field| {
            let text = match field {
                MatchField::Title => Some(posting.title.as_str()),
                MatchField::Department => posting.department.as_deref(),
            };
            text.is_some_and(|t| self.matchers.iter().any(|m| m.matches_text(t)))
        })
    }
}
