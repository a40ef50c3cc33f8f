//! Format validation: RFC-ish syntax and length bounds on an address.

use std::fmt::Display;

/// Why a candidate address failed format validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatError {
    /// Not exactly one `@`, or an empty local/domain part.
    Shape,
    /// Local part exceeds 64 octets.
    LocalTooLong,
    /// Domain part exceeds 253 octets.
    DomainTooLong,
    /// Local part begins/ends with `.`, has `..`, or has `.+`.
    LocalDots,
    /// Domain label is empty, begins/ends with `-`, or has disallowed characters.
    DomainLabel,
    /// Contains whitespace.
    Whitespace,
}

impl Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            FormatError::Shape => "must contain exactly one '@' with non-empty local and domain parts",
            FormatError::LocalTooLong => "local part exceeds 64 octets",
            FormatError::DomainTooLong => "domain part exceeds 253 octets",
            FormatError::LocalDots => "local part has a leading/trailing dot, consecutive dots, or '.+' ",
            FormatError::DomainLabel => "domain has an empty, misplaced-hyphen, or invalid-character label",
            FormatError::Whitespace => "contains whitespace",
        };
        write!(f, "{message}")
    }
}

const MAX_LOCAL_OCTETS: usize = 64;
const MAX_DOMAIN_OCTETS: usize = 253;

/// An address that has passed format validation, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Address {
    /// The original input, lowercased.
    pub raw: String,
    /// The local part (before `@`).
    pub local: String,
    /// The domain part (after `@`), lowercased.
    pub domain: String,
}

impl Address {
    /// Parse and validate `addr` against local-part/domain syntax and length rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule violated.
    pub fn parse(addr: &str) -> Result<Self, FormatError> {
        if addr.chars().any(char::is_whitespace) {
            return Err(FormatError::Whitespace);
        }

        let lowered = addr.to_lowercase();

        let mut parts = lowered.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = match parts.next() {
            Some(d) => d,
            None => return Err(FormatError::Shape),
        };

        if local.is_empty() || domain.is_empty() || local.contains('@') {
            return Err(FormatError::Shape);
        }

        if local.len() > MAX_LOCAL_OCTETS {
            return Err(FormatError::LocalTooLong);
        }
        if domain.len() > MAX_DOMAIN_OCTETS {
            return Err(FormatError::DomainTooLong);
        }

        validate_local(local)?;
        validate_domain(domain)?;

        Ok(Address {
            raw: lowered.clone(),
            local: local.to_string(),
            domain: domain.to_string(),
        })
    }
}

fn validate_local(local: &str) -> Result<(), FormatError> {
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") || local.contains(".+")
    {
        return Err(FormatError::LocalDots);
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), FormatError> {
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(FormatError::DomainLabel);
    }

    for label in domain.split('.') {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return Err(FormatError::DomainLabel);
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(FormatError::DomainLabel);
        }
    }

    Ok(())
}

/// Coarse TLD-shape check used by the orchestrator's domain-validity step.
///
/// This does not consult a public suffix list; it only requires the last
/// label to look like a TLD (at least two ASCII letters).
#[must_use]
pub fn is_valid_domain_shape(domain: &str) -> bool {
    if validate_domain(domain).is_err() {
        return false;
    }
    match domain.rsplit('.').next() {
        Some(tld) => tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}
