//! Report rendering and delivery for jobwatch.
//!
//! A run's [`ListingDiff`](jobwatch_listings::ListingDiff) is rendered into a
//! plain-text [`Report`] and handed to a [`Notifier`]: the console, email
//! over SMTP, or several at once.

mod error;
mod notifier;
mod report;
mod smtp;

pub use error::NotifyError;
pub use notifier::{ConsoleNotifier, MultiNotifier, Notifier};
pub use report::{Report, ReportContext};
pub use smtp::{MailConfig, SmtpNotifier};
