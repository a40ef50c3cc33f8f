//! mailcheck - verify email deliverability without sending mail.
//!
//! Given an address, the engine checks that it is syntactically well-formed,
//! that its domain has working MX routing, and that a remote mail exchanger
//! will plausibly accept a message for the specific mailbox - all without
//! ever issuing `DATA`. It also classifies the domain as disposable or
//! free-provider.
//!
//! The core of the crate is the SMTP mailbox probe ([`smtp`]): a state
//! machine that drives an SMTP conversation up to the `RCPT TO` decision
//! point and interprets the server's reply, including provider quirks,
//! multiline greetings, greylisting, quota errors and spam blocks.

#![warn(clippy::all, clippy::pedantic)]

pub mod address;
pub mod batch;
pub mod cache;
pub mod external;
pub mod lists;
pub mod orchestrator;
pub mod port_selector;
pub mod resolver;
pub mod smtp;

pub use address::{Address, FormatError};
pub use batch::{BatchResult, BatchSummary, verify_email_batch};
pub use cache::{Cache, CacheEntry};
pub use lists::{is_disposable_email, is_free_email};
pub use orchestrator::{VerificationError, VerificationResult, VerifyConfig, verify_email};
pub use smtp::probe::MailboxProbeResult;

/// Returns whether `addr` is a syntactically valid email address.
///
/// Equivalent to [`Address::parse`] succeeding.
#[must_use]
pub fn is_valid_email(addr: &str) -> bool {
    address::Address::parse(addr).is_ok()
}

/// Returns whether `domain` has a plausible top-level-domain shape.
///
/// This is a coarse syntactic check, not a public-suffix-list lookup.
#[must_use]
pub fn is_valid_email_domain(domain: &str) -> bool {
    address::is_valid_domain_shape(domain)
}
