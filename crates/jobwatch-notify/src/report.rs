//! Plain-text report rendering.

use chrono::{DateTime, Utc};
use jobwatch_listings::{ListingDiff, Posting};

const RULE_WIDTH: usize = 70;

/// What the report is about, independent of a particular run.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Site label used in the subject and header.
    pub site_name: String,
    /// The careers page; links equal to it are not repeated per posting.
    pub source_url: String,
    /// Monitored keywords, as configured.
    pub keywords: Vec<String>,
    /// List postings that disappeared since the last run.
    pub include_removed: bool,
}

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
    pub has_new: bool,
}

impl Report {
    /// Render the current and new listings of a run.
    pub fn render(diff: &ListingDiff, ctx: &ReportContext, checked_at: DateTime<Utc>) -> Self {
        let has_new = diff.has_new();
        let subject = if has_new {
            format!("{} Careers - NEW Job Listings", ctx.site_name)
        } else {
            format!("{} Careers - Current Job Listings", ctx.site_name)
        };

        let rule = "=".repeat(RULE_WIDTH);
        let monitoring = if ctx.keywords.is_empty() {
            "all postings".to_string()
        } else {
            ctx.keywords.join(", ")
        };

        let mut body = String::new();
        body.push_str(&format!("{}\n", rule));
        body.push_str(&format!("CURRENT JOB LISTINGS - {} Careers\n", ctx.site_name));
        body.push_str(&format!("Monitoring: {}\n", monitoring));
        body.push_str(&format!(
            "Time: {}\n",
            checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        body.push_str(&format!("{}\n\n", rule));

        if has_new {
            body.push_str(&format!("NEW OPENINGS ({}):\n", diff.new.len()));
            for posting in &diff.new {
                body.push_str(&format!("   * {}\n", headline(posting)));
                if let Some(link) = link(posting, ctx) {
                    body.push_str(&format!("     {}\n", link));
                }
            }
        } else {
            body.push_str("No new openings since the last run.\n");
        }
        body.push('\n');

        if ctx.include_removed && !diff.removed.is_empty() {
            body.push_str(&format!("REMOVED / FILLED ({}):\n", diff.removed.len()));
            for posting in &diff.removed {
                body.push_str(&format!("   * {}\n", headline(posting)));
            }
            body.push('\n');
        }

        if diff.current.is_empty() {
            body.push_str(&format!("No job listings found matching: {}\n", monitoring));
            body.push_str(&format!(
                "Visit the careers page directly: {}\n\n",
                ctx.source_url
            ));
        } else {
            let departments = department_counts(&diff.current);
            if !departments.is_empty() {
                body.push_str(&format!(
                    "MONITORED DEPARTMENTS ({} total):\n",
                    departments.len()
                ));
                for (department, count) in &departments {
                    body.push_str(&format!("   {}: {}\n", department, count));
                }
                body.push('\n');
            }

            body.push_str(&format!("OPEN POSITIONS ({} total):\n\n", diff.current.len()));
            for (i, posting) in diff.current.iter().enumerate() {
                body.push_str(&format!("{}. {}", i + 1, headline(posting)));
                if let Some(location) = &posting.location {
                    body.push_str(&format!(" - {}", location));
                }
                body.push('\n');
                if let Some(link) = link(posting, ctx) {
                    body.push_str(&format!("   {}\n", link));
                }
                body.push('\n');
            }
        }

        body.push_str(&rule);
        body.push('\n');

        Self {
            subject,
            body,
            has_new,
        }
    }
}

/// Postings per department, in order of first appearance. Postings without
/// a department are not counted.
fn department_counts(postings: &[Posting]) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for department in postings.iter().filter_map(|p| p.department.as_deref()) {
        match counts.iter_mut().find(|(name, _)| *name == department) {
            Some((_, count)) => *count += 1,
            None => counts.push((department, 1)),
        }
    }
    counts
}

fn headline(posting: &Posting) -> String {
    match &posting.department {
        Some(department) => format!("{} [{}]", posting.title, department),
        None => posting.title.clone(),
    }
}

fn link<'a>(posting: &'a Posting, ctx: &ReportContext) -> Option<&'a str> {
    (posting.url != ctx.source_url).then_some(posting.url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_listings::{PostingId, Snapshot, diff};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "https://careers.example.com/";

    fn ctx(include_removed: bool) -> ReportContext {
        ReportContext {
            site_name: "Acme".to_string(),
            source_url: SOURCE.to_string(),
            keywords: vec!["Data Science".to_string(), "Performance Science".to_string()],
            include_removed,
        }
    }

    fn posting(id: &str, title: &str) -> Posting {
        Posting::new(title, format!("https://jobs.example.com/{}", id))
            .with_id(PostingId::from(id))
            .with_department("Data Science")
    }

    fn checked_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-11-02T15:00:03Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_new_listings_subject_and_sections() {
        let previous =
            Snapshot::from_postings(&[posting("a", "Analyst"), posting("b", "Biostatistician")]);
        let result = diff(
            &previous,
            vec![posting("b", "Biostatistician"), posting("c", "Coach")],
        );
        let report = Report::render(&result, &ctx(false), checked_at());

        assert!(report.has_new);
        assert_eq!(report.subject, "Acme Careers - NEW Job Listings");
        assert!(report.body.contains("Monitoring: Data Science, Performance Science"));
        assert!(report.body.contains("Time: 2024-11-02 15:00:03 UTC"));
        assert!(report.body.contains(
            "NEW OPENINGS (1):\n   * Coach [Data Science]\n     https://jobs.example.com/c\n"
        ));
        assert!(report.body.contains("OPEN POSITIONS (2 total):"));
        assert!(report.body.contains("1. Biostatistician [Data Science]\n"));
        assert!(report.body.contains("2. Coach [Data Science]\n"));
        assert!(!report.body.contains("Analyst"));
    }

    #[test]
    fn test_no_new_listings() {
        let current = vec![posting("a", "Analyst")];
        let previous = Snapshot::from_postings(&current);
        let report = Report::render(&diff(&previous, current), &ctx(false), checked_at());

        assert!(!report.has_new);
        assert_eq!(report.subject, "Acme Careers - Current Job Listings");
        assert!(report.body.contains("No new openings since the last run."));
    }

    #[test]
    fn test_empty_listing_points_to_site() {
        let result = diff(&Snapshot::default(), Vec::new());
        let report = Report::render(&result, &ctx(false), checked_at());
        assert!(
            report
                .body
                .contains("No job listings found matching: Data Science, Performance Science")
        );
        assert!(report.body.contains(&format!("Visit the careers page directly: {}", SOURCE)));
    }

    #[test]
    fn test_removed_section_is_opt_in() {
        let previous = Snapshot::from_postings(&[posting("a", "Analyst")]);
        let result = diff(&previous, Vec::new());

        let silent = Report::render(&result, &ctx(false), checked_at());
        assert!(!silent.body.contains("REMOVED"));

        let verbose = Report::render(&result, &ctx(true), checked_at());
        assert!(verbose.body.contains("REMOVED / FILLED (1):\n   * Analyst [Data Science]\n"));
    }

    #[test]
    fn test_department_counts_follow_listing_order() {
        let current = vec![
            posting("a", "Analyst"),
            Posting::new("Physiologist", "https://jobs.example.com/p")
                .with_department("Performance Science"),
            posting("b", "Biostatistician"),
            Posting::new("Scout", SOURCE),
        ];
        let result = diff(&Snapshot::default(), current);
        let report = Report::render(&result, &ctx(false), checked_at());

        assert!(report.body.contains(
            "MONITORED DEPARTMENTS (2 total):\n   Data Science: 2\n   Performance Science: 1\n\n"
        ));
    }

    #[test]
    fn test_source_url_links_are_omitted() {
        let fallback = Posting::new("Scout", SOURCE).with_location("Boston");
        let result = diff(&Snapshot::default(), vec![fallback]);
        let report = Report::render(&result, &ctx(false), checked_at());

        assert!(report.body.contains("1. Scout - Boston\n\n"));
        assert_eq!(report.body.matches(SOURCE).count(), 0);
    }
}
