//! Verification orchestrator: composes format validation, list
//! lookups, MX resolution and the SMTP probe into a single verdict.

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::address::Address;
use crate::cache::Cache;
use crate::external::{DomainSuggester, NameDetector, NoopDomainSuggester, NoopNameDetector, NullWhoisClient, WhoisClient};
use crate::lists;
use crate::resolver;
use crate::smtp::probe::{self, MailboxProbeResult, ProbeConfig};

/// Per-domain port overrides for mail exchangers known to require a
/// specific port regardless of the default trial order.
const PORT_OVERRIDES: &[(&str, u16)] = &[("ovh.net", 465)];

fn port_override_for(domain: &str) -> Option<u16> {
    PORT_OVERRIDES
        .iter()
        .find(|(suffix, _)| domain == *suffix || domain.ends_with(&format!(".{suffix}")))
        .map(|(_, port)| *port)
}

/// The failure taxonomy surfaced in `metadata.error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationError {
    InvalidFormat,
    InvalidDomain,
    NoMx,
    MailboxNotFound,
    SmtpConnectionFailed,
    DisposableEmail,
}

impl Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerificationError::InvalidFormat => "invalid-format",
            VerificationError::InvalidDomain => "invalid-domain",
            VerificationError::NoMx => "no-mx",
            VerificationError::MailboxNotFound => "mailbox-not-found",
            VerificationError::SmtpConnectionFailed => "smtp-connection-failed",
            VerificationError::DisposableEmail => "disposable-email",
        };
        write!(f, "{s}")
    }
}

/// Metadata carried alongside every [`VerificationResult`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct VerificationMetadata {
    pub verification_time: Duration,
    pub cached: bool,
    pub error: Option<VerificationError>,
}

/// The orchestrator's output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VerificationResult {
    pub email: String,
    pub valid_format: bool,
    pub valid_mx: Option<bool>,
    pub valid_smtp: Option<bool>,
    pub is_disposable: bool,
    pub is_free: bool,
    pub detected_name: Option<String>,
    pub domain_suggestion: Option<String>,
    pub domain_age: Option<u64>,
    pub domain_registration: Option<String>,
    pub metadata: VerificationMetadata,
}

impl VerificationResult {
    fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            valid_format: false,
            valid_mx: None,
            valid_smtp: None,
            is_disposable: false,
            is_free: false,
            detected_name: None,
            domain_suggestion: None,
            domain_age: None,
            domain_registration: None,
            metadata: VerificationMetadata { verification_time: Duration::ZERO, cached: false, error: None },
        }
    }
}

/// The closed set of options `verify_email` accepts. Being a concrete
/// struct (not an open map) means unknown options are rejected at the
/// boundary by construction - there is no field to misspell into.
#[derive(Clone)]
pub struct VerifyConfig {
    pub detect_name: bool,
    pub suggest_domain: bool,
    pub check_disposable: bool,
    pub skip_mx_for_disposable: bool,
    pub check_free: bool,
    pub check_domain_age: bool,
    pub check_domain_registration: bool,
    pub verify_mx: bool,
    pub verify_smtp: bool,
    pub probe: ProbeConfig,
    pub cache: Arc<Cache>,
    pub whois: Arc<dyn WhoisClient>,
    pub name_detector: Arc<dyn NameDetector>,
    pub domain_suggester: Arc<dyn DomainSuggester>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            detect_name: false,
            suggest_domain: false,
            check_disposable: true,
            skip_mx_for_disposable: false,
            check_free: true,
            check_domain_age: false,
            check_domain_registration: false,
            verify_mx: true,
            verify_smtp: false,
            probe: ProbeConfig::default(),
            cache: Cache::global(),
            whois: Arc::new(NullWhoisClient),
            name_detector: Arc::new(NoopNameDetector),
            domain_suggester: Arc::new(NoopDomainSuggester),
        }
    }
}

/// Verify a single email address through the full validation and probing sequence.
pub async fn verify_email(email: &str, config: &VerifyConfig) -> VerificationResult {
    let start = Instant::now();
    let mut result = VerificationResult::new(email);

    // 1. Format.
    let address = match Address::parse(email) {
        Ok(a) => a,
        Err(_) => {
            result.metadata.error = Some(VerificationError::InvalidFormat);
            result.metadata.verification_time = start.elapsed();
            return result;
        }
    };
    result.valid_format = true;

    // 2. Name detection.
    if config.detect_name {
        result.detected_name = config.name_detector.detect(&address.local);
    }

    // 3. Domain suggestion.
    if config.suggest_domain {
        result.domain_suggestion = config.domain_suggester.suggest(&address.domain);
    }

    // 4. Domain shape, via the domain-valid cache.
    if !domain_is_valid(&address.domain, &config.cache) {
        result.metadata.error = Some(VerificationError::InvalidDomain);
        result.metadata.verification_time = start.elapsed();
        return result;
    }

    // 5. Disposable.
    let mut skip_mx_and_smtp = false;
    if config.check_disposable {
        result.is_disposable = lists::is_disposable_email(&address.raw, Some(&config.cache));
        if result.is_disposable && config.skip_mx_for_disposable {
            skip_mx_and_smtp = true;
        }
    }

    // 6. Free provider.
    if config.check_free {
        result.is_free = lists::is_free_email(&address.raw, Some(&config.cache));
    }

    // 7. WHOIS, unless skipped by the disposable short-circuit.
    if !skip_mx_and_smtp && (config.check_domain_age || config.check_domain_registration) {
        if let Some(info) = config.whois.lookup(&address.domain, config.probe.timeout).await {
            result.domain_age = info.age_days;
            result.domain_registration = info.registered_at;
        }
    }

    if skip_mx_and_smtp {
        result.metadata.error = Some(VerificationError::DisposableEmail);
        result.metadata.verification_time = start.elapsed();
        return result;
    }

    // 8. MX resolution.
    let mx_hosts = if config.verify_mx || config.verify_smtp {
        match resolver::resolve(&address.domain, &config.cache).await {
            Ok(hosts) => hosts,
            Err(_) => Vec::new(),
        }
    } else {
        Vec::new()
    };

    if config.verify_mx || config.verify_smtp {
        if mx_hosts.is_empty() {
            result.valid_mx = Some(false);
            result.metadata.error = Some(VerificationError::NoMx);
            result.metadata.verification_time = start.elapsed();
            return result;
        }
        result.valid_mx = Some(true);
    }

    // 9. SMTP probe, via the learned-port selector.
    if config.verify_smtp && !mx_hosts.is_empty() {
        let mx_host = &mx_hosts[0];
        let mut probe_config = config.probe.clone();
        if let Some(port) = port_override_for(&address.domain) {
            probe_config.port_trial_order = vec![port];
        }

        let (probe_result, cached) =
            probe::probe_mailbox(mx_host, &address.local, &address.domain, &probe_config, &config.cache).await;
        result.metadata.cached = cached;
        result.valid_smtp = translate_smtp(&probe_result);
        if result.valid_smtp == Some(false) && result.metadata.error.is_none() {
            result.metadata.error = Some(VerificationError::MailboxNotFound);
        } else if !probe_result.can_connect_smtp && result.metadata.error.is_none() {
            result.metadata.error = Some(VerificationError::SmtpConnectionFailed);
        }
    }

    // 10. Metadata.
    result.metadata.verification_time = start.elapsed();
    result
}

fn translate_smtp(probe: &MailboxProbeResult) -> Option<bool> {
    if !probe.can_connect_smtp { None } else { probe.is_deliverable }
}

fn domain_is_valid(domain: &str, cache: &Cache) -> bool {
    use crate::cache::CacheBackend;

    if let Ok(Some(cached)) = cache.domain_valid.get(domain) {
        return cached;
    }
    let valid = crate::address::is_valid_domain_shape(domain);
    let _ = cache.domain_valid.set(domain, valid, None);
    valid
}
