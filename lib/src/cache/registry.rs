//! The process-wide default cache: one [`CacheStore`](super::CacheStore) per
//! named logical store, plus a lazily-constructed, replaceable singleton.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use crate::external::WhoisInfo;
use crate::smtp::probe::MailboxProbeResult;

use super::{defaults, store::CacheBackend, CacheStore};

/// The typed multi-store cache used across the verification engine.
///
/// Each field is an independent store; a miss or eviction in one never
/// affects another.
pub struct Cache {
    pub mx: CacheStore<Vec<String>>,
    pub disposable: CacheStore<bool>,
    pub free: CacheStore<bool>,
    pub domain_valid: CacheStore<bool>,
    pub smtp: CacheStore<MailboxProbeResult>,
    pub smtp_port: CacheStore<u16>,
    pub domain_suggestion: CacheStore<String>,
    pub whois: CacheStore<WhoisInfo>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Build a fresh cache with the default TTL/capacity table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mx: CacheStore::new(defaults::MX.0, defaults::MX.1),
            disposable: CacheStore::new(defaults::DISPOSABLE.0, defaults::DISPOSABLE.1),
            free: CacheStore::new(defaults::FREE.0, defaults::FREE.1),
            domain_valid: CacheStore::new(defaults::DOMAIN_VALID.0, defaults::DOMAIN_VALID.1),
            smtp: CacheStore::new(defaults::SMTP.0, defaults::SMTP.1),
            smtp_port: CacheStore::new(defaults::SMTP_PORT.0, defaults::SMTP_PORT.1),
            domain_suggestion: CacheStore::new(
                defaults::DOMAIN_SUGGESTION.0,
                defaults::DOMAIN_SUGGESTION.1,
            ),
            whois: CacheStore::new(defaults::WHOIS.0, defaults::WHOIS.1),
        }
    }

    /// Empty every store of this instance.
    pub fn clear(&self) {
        let _ = self.mx.clear();
        let _ = self.disposable.clear();
        let _ = self.free.clear();
        let _ = self.domain_valid.clear();
        let _ = self.smtp.clear();
        let _ = self.smtp_port.clear();
        let _ = self.domain_suggestion.clear();
        let _ = self.whois.clear();
    }

    /// The process-wide default cache, constructed at most once.
    #[must_use]
    pub fn global() -> Arc<Cache> {
        global_slot().load_full()
    }

    /// Replace the process-wide default cache with a fresh, empty instance.
    ///
    /// Existing [`Arc<Cache>`] handles held by in-flight callers keep
    /// working against the old instance; only subsequent [`Cache::global`]
    /// calls observe the replacement.
    pub fn reset_global() {
        global_slot().store(Arc::new(Cache::new()));
    }
}

fn global_slot() -> &'static ArcSwap<Cache> {
    static GLOBAL: OnceLock<ArcSwap<Cache>> = OnceLock::new();
    GLOBAL.get_or_init(|| ArcSwap::from_pointee(Cache::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_is_a_true_singleton() {
        let a = Cache::global();
        let b = Cache::global();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn reset_swaps_the_singleton() {
        let before = Cache::global();
        before.mx.set("example.com", vec!["mx1.example.com".into()], None).unwrap();
        Cache::reset_global();
        let after = Cache::global();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.mx.get("example.com").unwrap(), None);
    }
}
