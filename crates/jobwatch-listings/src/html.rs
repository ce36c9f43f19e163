//! Selector-driven extraction from rendered careers pages.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::ListingsError;
use crate::extractor::RawEntry;

/// How far up the tree to look for a group heading (department) when the
/// posting row itself does not carry one.
const MAX_ANCESTOR_DEPTH: usize = 10;

/// CSS selectors describing a careers page layout.
///
/// `posting` selects one element per job row. The other selectors are
/// evaluated inside that row; `department` additionally falls back to the
/// nearest enclosing group (accordion sections and the like).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlSelectors {
    /// Element that must exist for the page to count as rendered. A page
    /// without it is unreadable, never an empty listing.
    pub container: String,
    pub posting: String,
    /// Title element inside the row (default: the row's own text).
    #[serde(default)]
    pub title: Option<String>,
    /// Link element inside the row (default: the row itself, its first
    /// anchor, or the anchor enclosing it).
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Attribute on the row holding a site-assigned id.
    #[serde(default)]
    pub id_attribute: Option<String>,
}

/// Selectors parsed once at startup.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSelectors {
    container: Selector,
    container_raw: String,
    posting: Selector,
    title: Option<Selector>,
    link: Option<Selector>,
    department: Option<Selector>,
    location: Option<Selector>,
    anchor: Selector,
    id_attribute: Option<String>,
}

fn compile(selector: &str) -> Result<Selector, ListingsError> {
    Selector::parse(selector)
        .map_err(|e| ListingsError::InvalidConfig(format!("bad selector `{}`: {}", selector, e)))
}

fn compile_opt(selector: &Option<String>) -> Result<Option<Selector>, ListingsError> {
    selector.as_deref().map(compile).transpose()
}

impl CompiledSelectors {
    pub(crate) fn compile(selectors: &HtmlSelectors) -> Result<Self, ListingsError> {
        Ok(Self {
            container: compile(&selectors.container)?,
            container_raw: selectors.container.clone(),
            posting: compile(&selectors.posting)?,
            title: compile_opt(&selectors.title)?,
            link: compile_opt(&selectors.link)?,
            department: compile_opt(&selectors.department)?,
            location: compile_opt(&selectors.location)?,
            anchor: compile("a[href]")?,
            id_attribute: selectors.id_attribute.clone(),
        })
    }

    /// Pull raw entries out of a page.
    pub(crate) fn entries(&self, content: &str) -> Result<Vec<RawEntry>, ListingsError> {
        let document = Html::parse_document(content);

        if document.select(&self.container).next().is_none() {
            return Err(ListingsError::Parse(format!(
                "listing container `{}` not found in page",
                self.container_raw
            )));
        }

        let entries = document
            .select(&self.posting)
            .map(|row| self.entry(row))
            .collect();
        Ok(entries)
    }

    fn entry(&self, row: ElementRef<'_>) -> RawEntry {
        let title = match &self.title {
            Some(sel) => row.select(sel).next().map(text_of).unwrap_or_default(),
            None => text_of(row),
        };

        let link = match &self.link {
            Some(sel) => row
                .select(sel)
                .next()
                .and_then(|el| el.value().attr("href")),
            None => row
                .value()
                .attr("href")
                .or_else(|| {
                    row.select(&self.anchor)
                        .next()
                        .and_then(|el| el.value().attr("href"))
                })
                .or_else(|| enclosing_link(row)),
        }
        .map(str::to_string);

        let site_id = self
            .id_attribute
            .as_deref()
            .and_then(|attr| row.value().attr(attr))
            .map(str::to_string);

        RawEntry {
            site_id,
            title,
            link,
            department: self.department.as_ref().and_then(|sel| nearest(row, sel)),
            location: self
                .location
                .as_ref()
                .and_then(|sel| row.select(sel).next())
                .and_then(|el| non_blank(text_of(el))),
        }
    }
}

/// Text of the first match inside `row`, or inside its closest enclosing
/// group.
fn nearest(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    if let Some(el) = row.select(selector).next() {
        return non_blank(text_of(el));
    }

    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_ANCESTOR_DEPTH)
        .find_map(|ancestor| ancestor.select(selector).next())
        .and_then(|el| non_blank(text_of(el)))
}

/// `href` of the closest enclosing anchor, for rows nested inside a link.
fn enclosing_link(row: ElementRef<'_>) -> Option<&str> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_ANCESTOR_DEPTH)
        .find(|el| el.value().name() == "a")
        .and_then(|el| el.value().attr("href"))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_blank(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ACCORDION_PAGE: &str = r#"
        <html><body>
          <div id="lever-integration-table">
            <section class="dept">
              <div class="header"><span class="name">Data Science &amp; Research</span><span class="count">2</span></div>
              <a class="row" href="/jobs/ds-1" data-id="ds-1">
                <span class="cell title">Senior   Data Scientist</span>
                <span class="cell loc">Boston</span>
              </a>
              <a class="row" href="https://jobs.example.com/ds-2" data-id="ds-2">
                <span class="cell title">Research Scientist</span>
              </a>
            </section>
            <section class="dept">
              <div class="header"><span class="name">Marketing</span></div>
              <a class="row" href="/jobs/mk-1"><span class="cell title">Brand Lead</span></a>
            </section>
          </div>
        </body></html>
    "#;

    fn accordion_selectors() -> HtmlSelectors {
        HtmlSelectors {
            container: "#lever-integration-table".to_string(),
            posting: "a.row".to_string(),
            title: Some(".title".to_string()),
            link: None,
            department: Some(".header .name".to_string()),
            location: Some(".loc".to_string()),
            id_attribute: Some("data-id".to_string()),
        }
    }

    #[test]
    fn test_entries_from_accordion_layout() {
        let compiled = CompiledSelectors::compile(&accordion_selectors()).unwrap();
        let entries = compiled.entries(ACCORDION_PAGE).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Senior Data Scientist");
        assert_eq!(entries[0].link.as_deref(), Some("/jobs/ds-1"));
        assert_eq!(entries[0].site_id.as_deref(), Some("ds-1"));
        assert_eq!(entries[0].department.as_deref(), Some("Data Science & Research"));
        assert_eq!(entries[0].location.as_deref(), Some("Boston"));

        assert_eq!(entries[1].location, None);
        assert_eq!(entries[2].department.as_deref(), Some("Marketing"));
        assert_eq!(entries[2].site_id, None);
    }

    #[test]
    fn test_missing_container_is_parse_failure() {
        let compiled = CompiledSelectors::compile(&accordion_selectors()).unwrap();
        let err = compiled
            .entries("<html><body><p>Loading...</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, ListingsError::Parse(_)));
    }

    #[test]
    fn test_container_without_rows_is_empty() {
        let compiled = CompiledSelectors::compile(&accordion_selectors()).unwrap();
        let entries = compiled
            .entries(r#"<div id="lever-integration-table"></div>"#)
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_row_text_and_first_anchor_by_default() {
        let selectors = HtmlSelectors {
            container: "ul.jobs".to_string(),
            posting: "li.job".to_string(),
            title: None,
            link: None,
            department: None,
            location: None,
            id_attribute: None,
        };
        let compiled = CompiledSelectors::compile(&selectors).unwrap();
        let entries = compiled
            .entries(r#"<ul class="jobs"><li class="job"><a href="/a">Analyst</a></li></ul>"#)
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Analyst");
        assert_eq!(entries[0].link.as_deref(), Some("/a"));
    }

    #[test]
    fn test_link_from_enclosing_anchor() {
        let selectors = HtmlSelectors {
            container: "main".to_string(),
            posting: "span.first".to_string(),
            title: None,
            link: None,
            department: None,
            location: None,
            id_attribute: None,
        };
        let compiled = CompiledSelectors::compile(&selectors).unwrap();
        let entries = compiled
            .entries(
                r#"<main><a href="/jobs/7"><div><span class="first">Coach</span></div></a></main>"#,
            )
            .unwrap();

        assert_eq!(entries[0].title, "Coach");
        assert_eq!(entries[0].link.as_deref(), Some("/jobs/7"));
    }

    #[test]
    fn test_maintenance_page_is_not_an_empty_listing() {
        let selectors = HtmlSelectors {
            container: "ul.jobs".to_string(),
            posting: "li.job".to_string(),
            title: None,
            link: None,
            department: None,
            location: None,
            id_attribute: None,
        };
        let compiled = CompiledSelectors::compile(&selectors).unwrap();
        let err = compiled
            .entries("<html><body>Service temporarily unavailable</body></html>")
            .unwrap_err();
        assert!(matches!(err, ListingsError::Parse(_)));
    }

    #[test]
    fn test_missing_container_in_config_is_rejected() {
        let result: Result<HtmlSelectors, _> = serde_json::from_str(r#"{"posting": "li.job"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_selector_rejected() {
        let mut selectors = accordion_selectors();
        selectors.posting = "a[".to_string();
        let err = CompiledSelectors::compile(&selectors).unwrap_err();
        assert!(matches!(err, ListingsError::InvalidConfig(_)));
    }
}
