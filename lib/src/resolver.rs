//! MX resolver: prioritized MX lookup with positive and negative
//! caching.

use std::fmt::Display;

use hickory_resolver::Resolver;
use hickory_resolver::proto::rr::rdata::MX;

use crate::cache::{Cache, CacheBackend};

/// A single MX record: an exchange hostname and its DNS priority.
///
/// Ordered ascending by `priority`; ties preserve input order (stable sort).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MxRecord {
    pub exchange: String,
    pub priority: u16,
}

/// DNS resolution failed.
#[derive(Debug, Clone)]
pub struct ResolveError(pub String);

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DNS resolution failed: {}", self.0)
    }
}

impl std::error::Error for ResolveError {}

impl From<hickory_resolver::ResolveError> for ResolveError {
    fn from(err: hickory_resolver::ResolveError) -> Self {
        ResolveError(err.to_string())
    }
}

/// Query DNS directly for `domain`'s MX records, sorted ascending by
/// priority (stable - ties keep DNS answer order). No caching.
///
/// `domain` may be a bare domain or a full `local@domain` address; a
/// leading local part is stripped before the DNS query.
///
/// Only resolvable, fully-qualified, non-root exchanges are kept, per
/// RFC 5321 §2.3.5.
pub async fn resolve_mx_records(domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
    let domain = domain.rsplit_once('@').map_or(domain, |(_, d)| d);

    let resolver = Resolver::builder_tokio()?.build();
    let lookup = resolver.mx_lookup(domain).await?;

    let mut records: Vec<MxRecord> = lookup
        .into_iter()
        .filter(|mx: &MX| mx.exchange().is_fqdn() && !mx.exchange().is_root())
        .map(|mx| MxRecord {
            exchange: mx.exchange().to_string().trim_end_matches('.').to_string(),
            priority: mx.preference(),
        })
        .collect();

    records.sort_by_key(|r| r.priority);

    Ok(records)
}

/// Resolve `domain`'s mail exchangers, consulting and populating `cache`'s
/// `mx` store.
///
/// On a cache miss that fails DNS resolution, an empty list is stored as a
/// negative-cache entry (same TTL as a positive hit) and the original error
/// is returned *for this call only*; subsequent calls observe the cached
/// empty list and return `Ok(vec![])` without re-querying DNS. A domain
/// with no MX records at all (a valid, empty DNS answer) also returns
/// `Ok(vec![])`, indistinguishably from the negative-cache case - both mean
/// "no exchanges known right now".
pub async fn resolve(domain: &str, cache: &Cache) -> Result<Vec<String>, ResolveError> {
    if let Ok(Some(hosts)) = cache.mx.get(domain) {
        tracing::debug!(domain, "mx cache hit");
        return Ok(hosts);
    }

    match resolve_mx_records(domain).await {
        Ok(records) => {
            let hosts: Vec<String> = records.into_iter().map(|r| r.exchange).collect();
            let _ = cache.mx.set(domain, hosts.clone(), None);
            Ok(hosts)
        }
        Err(err) => {
            tracing::warn!(domain, error = %err, "mx lookup failed, negative-caching");
            let _ = cache.mx.set(domain, Vec::new(), None);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sorts_by_priority_stable() {
        let mut records = vec![
            MxRecord { exchange: "c.example.com".into(), priority: 30 },
            MxRecord { exchange: "a.example.com".into(), priority: 10 },
            MxRecord { exchange: "b.example.com".into(), priority: 20 },
        ];
        records.sort_by_key(|r| r.priority);
        let exchanges: Vec<_> = records.iter().map(|r| r.exchange.as_str()).collect();
        assert_eq!(exchanges, ["a.example.com", "b.example.com", "c.example.com"]);
    }

    #[tokio::test]
    async fn negative_cache_serves_empty_after_first_miss() {
        let cache = Cache::new();
        // A domain under a reserved TLD that cannot resolve.
        let domain = "definitely-invalid.invalid";

        let first = resolve(domain, &cache).await;
        assert!(first.is_err());
        assert_eq!(cache.mx.get(domain).unwrap(), Some(Vec::<String>::new()));

        let second = resolve(domain, &cache).await;
        assert_eq!(second.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn positive_hit_is_served_without_requerying() {
        let cache = Cache::new();
        let domain = "example.com";
        cache
            .mx
            .set(domain, vec!["mx1.example.com".to_string()], Some(Duration::from_secs(60)))
            .unwrap();

        let result = resolve(domain, &cache).await.unwrap();
        assert_eq!(result, vec!["mx1.example.com".to_string()]);
    }
}
