//! Turn raw careers page content into filtered postings.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::html::{CompiledSelectors, HtmlSelectors};
use crate::{FilterCriteria, ListingsError, Posting, PostingId};

/// Shape of the listing source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingFormat {
    /// Lever postings API (`/v0/postings/<site>?mode=json`).
    Lever,
    /// Greenhouse job board API (`/v1/boards/<board>/jobs`).
    Greenhouse,
    /// Rendered HTML page read with CSS selectors.
    Html(HtmlSelectors),
}

/// A posting record as found in the page, before normalization.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawEntry {
    pub site_id: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
}

enum Parser {
    Lever,
    Greenhouse,
    Html(Box<CompiledSelectors>),
}

/// Extracts postings from raw content and applies [`FilterCriteria`].
pub struct Extractor {
    source: Url,
    parser: Parser,
    criteria: FilterCriteria,
}

impl Extractor {
    /// Create an extractor for the given source page.
    ///
    /// Fails on an unparsable source URL or invalid selectors.
    pub fn new(
        source_url: &str,
        format: ListingFormat,
        criteria: FilterCriteria,
    ) -> Result<Self, ListingsError> {
        let source = Url::parse(source_url).map_err(|e| {
            ListingsError::InvalidConfig(format!("bad source URL `{}`: {}", source_url, e))
        })?;

        let parser = match format {
            ListingFormat::Lever => Parser::Lever,
            ListingFormat::Greenhouse => Parser::Greenhouse,
            ListingFormat::Html(selectors) => {
                Parser::Html(Box::new(CompiledSelectors::compile(&selectors)?))
            }
        };

        Ok(Self {
            source,
            parser,
            criteria,
        })
    }

    pub fn source_url(&self) -> &str {
        self.source.as_str()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Extract relevant postings in page order.
    ///
    /// Zero postings is a valid result. Content that cannot be read as a
    /// listing page at all is a [`ListingsError::Parse`].
    pub fn extract(&self, content: &str) -> Result<Vec<Posting>, ListingsError> {
        if content.trim().is_empty() {
            return Err(ListingsError::Parse("empty response".to_string()));
        }

        let entries = match &self.parser {
            Parser::Lever => lever_entries(content)?,
            Parser::Greenhouse => greenhouse_entries(content)?,
            Parser::Html(selectors) => selectors.entries(content)?,
        };
        let found = entries.len();

        let mut seen = HashSet::new();
        let mut postings = Vec::new();
        for entry in entries {
            let Some(posting) = self.normalize(entry) else {
                continue;
            };

            if !seen.insert(posting.id.clone()) {
                debug!(id = %posting.id, "skipping duplicate posting");
                continue;
            }

            if self.criteria.accepts(&posting) {
                debug!(title = %posting.title, department = ?posting.department, "matched posting");
                postings.push(posting);
            }
        }

        info!(found, kept = postings.len(), "extracted postings");
        Ok(postings)
    }

    fn normalize(&self, entry: RawEntry) -> Option<Posting> {
        let title = collapse(&entry.title);
        if title.is_empty() {
            return None;
        }

        let url = match entry.link.as_deref().map(str::trim) {
            Some(link) if !link.is_empty() => match self.source.join(link) {
                Ok(resolved) => resolved.to_string(),
                Err(e) => {
                    debug!(link, error = %e, "unresolvable posting link, using source URL");
                    self.source.to_string()
                }
            },
            _ => self.source.to_string(),
        };

        let id = match entry.site_id.as_deref().map(str::trim) {
            Some(site_id) if !site_id.is_empty() => PostingId::from_site_id(site_id),
            _ => PostingId::derive(&title, &url),
        };

        Some(Posting {
            id,
            title,
            url,
            location: entry.location.map(|s| collapse(&s)).filter(|s| !s.is_empty()),
            department: entry.department.map(|s| collapse(&s)).filter(|s| !s.is_empty()),
        })
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Deserialize)]
struct LeverPosting {
    id: String,
    text: String,
    #[serde(rename = "hostedUrl", default)]
    hosted_url: Option<String>,
    #[serde(default)]
    categories: LeverCategories,
}

#[derive(Deserialize, Default)]
struct LeverCategories {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

fn lever_entries(content: &str) -> Result<Vec<RawEntry>, ListingsError> {
    let postings: Vec<LeverPosting> = serde_json::from_str(content)
        .map_err(|e| ListingsError::Parse(format!("invalid Lever postings JSON: {}", e)))?;

    Ok(postings
        .into_iter()
        .map(|p| RawEntry {
            site_id: Some(p.id),
            title: p.text,
            link: p.hosted_url,
            department: p.categories.department.or(p.categories.team),
            location: p.categories.location,
        })
        .collect())
}

#[derive(Deserialize)]
struct GreenhouseBoard {
    jobs: Vec<GreenhouseJob>,
}

#[derive(Deserialize)]
struct GreenhouseJob {
    id: u64,
    title: String,
    #[serde(default)]
    absolute_url: Option<String>,
    #[serde(default)]
    location: Option<GreenhouseNamed>,
    #[serde(default)]
    departments: Vec<GreenhouseNamed>,
}

#[derive(Deserialize)]
struct GreenhouseNamed {
    name: String,
}

fn greenhouse_entries(content: &str) -> Result<Vec<RawEntry>, ListingsError> {
    let board: GreenhouseBoard = serde_json::from_str(content)
        .map_err(|e| ListingsError::Parse(format!("invalid Greenhouse board JSON: {}", e)))?;

    Ok(board
        .jobs
        .into_iter()
        .map(|job| RawEntry {
            site_id: Some(job.id.to_string()),
            title: job.title,
            link: job.absolute_url,
            department: job.departments.into_iter().next().map(|d| d.name),
            location: job.location.map(|l| l.name),
        })
        .collect())
}
