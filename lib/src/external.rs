//! External-interface shims: WHOIS, heuristic name detection and
//! fuzzy domain suggestion are out of scope, but the orchestrator must
//! compile and run against *something*, so each collaborator is a trait
//! with one trivial no-op default implementation. Callers who need real
//! behavior supply their own impl.

use std::time::Duration;

/// A parsed (or partially parsed) WHOIS record, as far as the orchestrator
/// cares: registration and age, for `checkDomainAge`/`checkDomainRegistration`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WhoisInfo {
    pub registrar: Option<String>,
    pub registered_at: Option<String>,
    pub age_days: Option<u64>,
}

/// Consulted by the orchestrator when `checkDomainAge` or
/// `checkDomainRegistration` is requested.
#[async_trait::async_trait]
pub trait WhoisClient: Send + Sync {
    async fn lookup(&self, domain: &str, timeout: Duration) -> Option<WhoisInfo>;
}

/// Consulted by the orchestrator when `detectName` is requested, to guess a
/// human name from a local part (e.g. `john.smith` -> `John Smith`).
pub trait NameDetector: Send + Sync {
    fn detect(&self, local_part: &str) -> Option<String>;
}

/// Consulted by the orchestrator when `suggestDomain` is requested, to
/// propose a correction for a likely-mistyped domain (e.g. `gmial.com` ->
/// `gmail.com`).
pub trait DomainSuggester: Send + Sync {
    fn suggest(&self, domain: &str) -> Option<String>;
}

/// Always reports no WHOIS information available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWhoisClient;

#[async_trait::async_trait]
impl WhoisClient for NullWhoisClient {
    async fn lookup(&self, _domain: &str, _timeout: Duration) -> Option<WhoisInfo> {
        None
    }
}

/// Never detects a name.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNameDetector;

impl NameDetector for NoopNameDetector {
    fn detect(&self, _local_part: &str) -> Option<String> {
        None
    }
}

/// Never suggests a correction.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDomainSuggester;

impl DomainSuggester for NoopDomainSuggester {
    fn suggest(&self, _domain: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_whois_client_always_returns_none() {
        assert_eq!(NullWhoisClient.lookup("example.com", Duration::from_secs(1)).await, None);
    }

    #[test]
    fn noop_collaborators_always_return_none() {
        assert_eq!(NoopNameDetector.detect("john.smith"), None);
        assert_eq!(NoopDomainSuggester.suggest("gmial.com"), None);
    }
}
