//! Keyword tables and the `RCPT TO` reply classification table.
//!
//! Every pattern here is a fixed literal/substring test, the same style the
//! corpus uses for this kind of provider-quirk detection (quota/disabled/
//! no-such-user string matching) rather than a general regex engine.

use super::reply::SmtpReply;

/// Quota-exceeded wording seen across providers, beyond the bare 452/552
/// codes.
pub const OVER_QUOTA_WORDS: &[&str] = &[
    "over quota",
    "quota exceeded",
    "insufficient",
    "too many messages",
    "mailbox is full",
];

/// Wording that indicates a spam/policy block rather than a genuinely
/// invalid mailbox, matching the `junk|spam|openspf|spoofing|host|rbl.*blocked`
/// pattern.
pub const POLICY_BLOCK_WORDS: &[&str] = &["junk", "spam", "openspf", "spoofing"];

/// Account-disabled wording (distinct from "no such user").
pub const DISABLED_WORDS: &[&str] = &["disabled", "discontinued"];

fn is_policy_blocked(reply: &SmtpReply) -> bool {
    if reply.message_contains_any(POLICY_BLOCK_WORDS) {
        return true;
    }
    let message = reply.message().to_lowercase();
    message.contains("host") || (message.contains("rbl") && message.contains("blocked"))
}

/// The codes that, absent a spam/policy indicator, mean "no such mailbox /
/// disabled".
fn is_definite_rejection_code(code: u16) -> bool {
    matches!(code, 510 | 511 | 513 | 550 | 551 | 553)
}

/// The outcome of classifying a `RCPT TO` reply, before it is folded into a
/// [`super::probe::MailboxProbeResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcptOutcome {
    Deliverable,
    FullInbox,
    Disabled,
    /// 5xx with a spam/policy indicator: not evidence the mailbox is
    /// invalid.
    PolicyBlock,
    /// Any other 4xx: temporary failure / greylisting.
    Greylisted,
    /// Other 5xx, with `VRFY` both requested and advertised: fall back to
    /// asking the server directly.
    FallBackToVrfy,
    /// Other 5xx with no `VRFY` fallback available.
    Ambiguous,
}

/// Classify a `RCPT TO` reply.
#[must_use]
pub fn classify_rcpt(reply: &SmtpReply, vrfy_requested: bool, vrfy_advertised: bool) -> RcptOutcome {
    if matches!(reply.code, 250 | 251) {
        return RcptOutcome::Deliverable;
    }

    if matches!(reply.code, 452 | 552) || reply.message_contains_any(OVER_QUOTA_WORDS) {
        return RcptOutcome::FullInbox;
    }

    if is_definite_rejection_code(reply.code) {
        return if is_policy_blocked(reply) {
            RcptOutcome::PolicyBlock
        } else {
            RcptOutcome::Disabled
        };
    }

    if reply.is_transient_failure() {
        return RcptOutcome::Greylisted;
    }

    if reply.is_permanent_failure() {
        return if vrfy_requested && vrfy_advertised {
            RcptOutcome::FallBackToVrfy
        } else {
            RcptOutcome::Ambiguous
        };
    }

    RcptOutcome::Ambiguous
}

/// The outcome of classifying a `VRFY` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VrfyOutcome {
    Deliverable,
    NotFound,
    Unknown,
}

#[must_use]
pub fn classify_vrfy(reply: &SmtpReply) -> VrfyOutcome {
    match reply.code {
        250 | 252 => VrfyOutcome::Deliverable,
        550 => VrfyOutcome::NotFound,
        _ => VrfyOutcome::Unknown,
    }
}

/// Whether an erroneous non-RCPT reply (`EHLO`/`HELO`/`MAIL FROM`) also
/// carries an account-disabled signal, for completeness with the quota/
/// disabled detection used elsewhere.
#[must_use]
pub fn is_disabled_reply(reply: &SmtpReply) -> bool {
    reply.message_contains_any(DISABLED_WORDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(code: u16, text: &str) -> SmtpReply {
        SmtpReply { code, lines: vec![text.to_string()] }
    }

    #[test]
    fn deliverable_on_250_or_251() {
        assert_eq!(classify_rcpt(&reply(250, "OK"), false, false), RcptOutcome::Deliverable);
        assert_eq!(classify_rcpt(&reply(251, "forwarding"), false, false), RcptOutcome::Deliverable);
    }

    #[test]
    fn over_quota_by_code_or_wording() {
        assert_eq!(classify_rcpt(&reply(452, "mailbox full"), false, false), RcptOutcome::FullInbox);
        assert_eq!(
            classify_rcpt(&reply(550, "5.2.2 over quota"), false, false),
            RcptOutcome::FullInbox
        );
    }

    #[test]
    fn definite_rejection_without_policy_wording_is_disabled() {
        assert_eq!(
            classify_rcpt(&reply(550, "User unknown"), false, false),
            RcptOutcome::Disabled
        );
    }

    #[test]
    fn definite_rejection_with_spam_wording_is_policy_block() {
        assert_eq!(
            classify_rcpt(&reply(550, "JunkMail rejected"), false, false),
            RcptOutcome::PolicyBlock
        );
    }

    #[test]
    fn other_4xx_is_greylisted() {
        assert_eq!(classify_rcpt(&reply(421, "try later"), false, false), RcptOutcome::Greylisted);
    }

    #[test]
    fn other_5xx_falls_back_to_vrfy_when_available() {
        assert_eq!(
            classify_rcpt(&reply(502, "command not implemented"), true, true),
            RcptOutcome::FallBackToVrfy
        );
        assert_eq!(
            classify_rcpt(&reply(502, "command not implemented"), true, false),
            RcptOutcome::Ambiguous
        );
    }

    #[test]
    fn vrfy_classification() {
        assert_eq!(classify_vrfy(&reply(250, "OK")), VrfyOutcome::Deliverable);
        assert_eq!(classify_vrfy(&reply(252, "cannot verify")), VrfyOutcome::Deliverable);
        assert_eq!(classify_vrfy(&reply(550, "no such user")), VrfyOutcome::NotFound);
        assert_eq!(classify_vrfy(&reply(502, "not implemented")), VrfyOutcome::Unknown);
    }
}
