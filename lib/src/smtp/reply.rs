//! Line framing and the multiline SMTP reply.
//!
//! A reply is one or more lines sharing the same three-digit code;
//! continuation lines use `CODE-rest`, the final line uses `CODE SP rest`.

use std::fmt::Display;

/// A fully-assembled SMTP reply: the three-digit code from its final line,
/// plus the text of every line (continuation and final) for capability
/// scanning and keyword classification.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    #[must_use]
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    #[must_use]
    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    #[must_use]
    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// Case-insensitive substring test over every line's text, used for the
    /// quota/policy/spam keyword tables in `classify.rs`.
    #[must_use]
    pub fn message_contains_any(&self, words: &[&str]) -> bool {
        let joined = self.message().to_lowercase();
        words.iter().any(|w| joined.contains(w))
    }

    /// Whether any continuation line advertises `capability` (used when
    /// scanning a multiline `EHLO` response for `STARTTLS`/`VRFY`).
    #[must_use]
    pub fn advertises(&self, capability: &str) -> bool {
        self.lines
            .iter()
            .any(|line| line.trim().eq_ignore_ascii_case(capability))
    }
}

/// A malformed reply line: missing the three-digit code or the
/// space/dash separator at byte offset 3.
#[derive(Debug, Clone)]
pub struct MalformedReply(pub String);

impl Display for MalformedReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed SMTP reply line: {:?}", self.0)
    }
}

impl std::error::Error for MalformedReply {}

pub(super) struct ParsedLine {
    pub code: u16,
    pub is_final: bool,
    pub text: String,
}

/// Parse one CRLF-stripped reply line into its code, finality marker
/// (space vs. dash at offset 3) and text.
pub(super) fn parse_line(line: &str) -> Result<ParsedLine, MalformedReply> {
    if line.len() < 4 {
        return Err(MalformedReply(line.to_string()));
    }
    let bytes = line.as_bytes();
    match bytes[3] {
        b' ' | b'-' => {
            let code = line[0..3]
                .parse::<u16>()
                .map_err(|_| MalformedReply(line.to_string()))?;
            Ok(ParsedLine {
                code,
                is_final: bytes[3] == b' ',
                text: line[4..].to_string(),
            })
        }
        _ => Err(MalformedReply(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_line_reply() {
        let line = parse_line("250 OK").unwrap();
        assert_eq!(line.code, 250);
        assert!(line.is_final);
        assert_eq!(line.text, "OK");
    }

    #[test]
    fn parses_continuation_line() {
        let line = parse_line("250-STARTTLS").unwrap();
        assert_eq!(line.code, 250);
        assert!(!line.is_final);
        assert_eq!(line.text, "STARTTLS");
    }

    #[test]
    fn rejects_short_or_malformed_lines() {
        assert!(parse_line("25").is_err());
        assert!(parse_line("25x OK").is_err());
    }

    #[test]
    fn multiline_greeting_is_not_terminal_until_space() {
        let banner = parse_line("220-hohoho").unwrap();
        assert!(!banner.is_final);
        let terminator = parse_line("220 ready").unwrap();
        assert!(terminator.is_final);
    }

    #[test]
    fn message_contains_any_is_case_insensitive() {
        let reply = SmtpReply {
            code: 452,
            lines: vec!["4.2.2 over QUOTA".to_string()],
        };
        assert!(reply.message_contains_any(&["over quota"]));
    }
}
