//! Error types for report delivery.

use thiserror::Error;

/// Errors that can occur while delivering a report.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Sender or receiver is not a valid mailbox.
    #[error("invalid email address `{address}`: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    /// SMTP transport could not be configured.
    #[error("SMTP transport error: {0}")]
    Transport(#[source] lettre::transport::smtp::Error),

    /// The email could not be assembled.
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// Delivery failed.
    #[error("send failure: {0}")]
    Send(#[source] lettre::transport::smtp::Error),

    /// Writing the report to the console failed.
    #[error("console output failed: {0}")]
    Console(#[from] std::io::Error),
}
