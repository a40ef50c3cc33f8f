//! The SMTP mailbox probe: the conversation with a mail exchanger that
//! decides whether a mailbox is likely to accept mail.

pub mod classify;
pub mod probe;
pub mod reply;
pub mod sequence;
pub mod session;
pub mod tls;
