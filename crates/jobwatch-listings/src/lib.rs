//! Listing-diff engine for jobwatch.
//!
//! This crate provides:
//! - Extraction of postings from careers pages (Lever, Greenhouse, HTML)
//! - Keyword filter criteria
//! - A pure diff between the last snapshot and the current listings
//! - Atomic snapshot persistence

mod diff;
mod error;
mod extractor;
mod fetch;
mod filter;
mod html;
mod posting;
mod snapshot;

pub use diff::{ListingDiff, diff};
pub use error::ListingsError;
pub use extractor::{Extractor, ListingFormat};
pub use fetch::{DEFAULT_USER_AGENT, Fetcher, HttpFetcher};
pub use filter::{EmptyPolicy, FilterCriteria, MatchField, Matcher};
pub use html::HtmlSelectors;
pub use posting::{Posting, PostingId, PostingRecord, normalize};
pub use snapshot::{Snapshot, SnapshotStore};
