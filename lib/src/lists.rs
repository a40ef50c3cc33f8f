//! List lookup: membership tests against disposable / free-provider
//! domain sets, loaded lazily from embedded resources and written through
//! the cache layer.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::cache::{Cache, CacheBackend};

const DISPOSABLE_JSON: &str = include_str!("../resources/disposable_domains.json");
const FREE_JSON: &str = include_str!("../resources/free_providers.json");

fn disposable_set() -> &'static HashSet<String> {
    static SET: OnceLock<HashSet<String>> = OnceLock::new();
    SET.get_or_init(|| load_set(DISPOSABLE_JSON, "disposable"))
}

fn free_set() -> &'static HashSet<String> {
    static SET: OnceLock<HashSet<String>> = OnceLock::new();
    SET.get_or_init(|| load_set(FREE_JSON, "free"))
}

fn load_set(json: &str, name: &str) -> HashSet<String> {
    match serde_json::from_str::<Vec<String>>(json) {
        Ok(domains) => domains.into_iter().map(|d| d.to_lowercase()).collect(),
        Err(err) => {
            tracing::warn!("failed to parse embedded {name} provider list: {err}");
            HashSet::new()
        }
    }
}

/// Extract a domain from either a bare domain or a full `local@domain`
/// address, lowercased.
fn domain_of(email_or_domain: &str) -> String {
    email_or_domain
        .rsplit_once('@')
        .map_or(email_or_domain, |(_, domain)| domain)
        .to_lowercase()
}

/// Returns whether `email_or_domain`'s domain is a known disposable-email
/// provider, using `cache`'s `disposable` store (or the global default
/// cache when none is supplied).
#[must_use]
pub fn is_disposable_email(email_or_domain: &str, cache: Option<&Cache>) -> bool {
    lookup(email_or_domain, cache, disposable_set(), |c| &c.disposable)
}

/// Returns whether `email_or_domain`'s domain is a known free-email
/// provider, using `cache`'s `free` store (or the global default cache
/// when none is supplied).
#[must_use]
pub fn is_free_email(email_or_domain: &str, cache: Option<&Cache>) -> bool {
    lookup(email_or_domain, cache, free_set(), |c| &c.free)
}

fn lookup(
    email_or_domain: &str,
    cache: Option<&Cache>,
    set: &HashSet<String>,
    store: impl Fn(&Cache) -> &crate::cache::CacheStore<bool>,
) -> bool {
    let domain = domain_of(email_or_domain);
    let owned_global;
    let cache = match cache {
        Some(c) => c,
        None => {
            owned_global = Cache::global();
            &owned_global
        }
    };

    if let Ok(Some(hit)) = store(cache).get(&domain) {
        return hit;
    }

    let result = set.contains(&domain);
    let _ = store(cache).set(&domain, result, None);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_disposable_domain() {
        assert!(is_disposable_email("a@mailinator.com", None));
        assert!(!is_disposable_email("a@example.com", None));
    }

    #[test]
    fn detects_free_domain() {
        assert!(is_free_email("a@gmail.com", None));
        assert!(!is_free_email("a@example.com", None));
    }

    #[test]
    fn accepts_bare_domain() {
        assert!(is_disposable_email("mailinator.com", None));
    }

    #[test]
    fn repeat_lookup_is_served_from_cache() {
        let cache = Cache::new();
        assert!(is_free_email("a@yahoo.com", Some(&cache)));
        assert_eq!(cache.free.get("yahoo.com").unwrap(), Some(true));
    }
}
