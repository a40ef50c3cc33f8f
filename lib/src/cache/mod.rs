//! Cache layer: typed, keyed stores with TTL/size bounds and pluggable
//! backends.
//!
//! The engine recognizes eight independent named stores (`mx`, `disposable`,
//! `free`, `domain_valid`, `smtp`, `smtp_port`, `domain_suggestion`,
//! `whois`). Each is an instance of [`CacheStore`], the default in-process
//! backend, built around an LRU map with a TTL attached to every entry.

mod registry;
mod store;

pub use registry::Cache;
pub use store::{CacheBackend, CacheError, CacheStore};

use std::time::{Duration, Instant};

/// A cached value together with its expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    #[must_use]
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Default (ttl, max-entries) per named store.
pub mod defaults {
    use std::time::Duration;

    pub const MX: (Duration, usize) = (Duration::from_secs(60 * 60), 10_000);
    pub const DISPOSABLE: (Duration, usize) = (Duration::from_secs(24 * 60 * 60), 10_000);
    pub const FREE: (Duration, usize) = (Duration::from_secs(24 * 60 * 60), 10_000);
    pub const DOMAIN_VALID: (Duration, usize) = (Duration::from_secs(24 * 60 * 60), 10_000);
    pub const SMTP: (Duration, usize) = (Duration::from_secs(30 * 60), 10_000);
    pub const SMTP_PORT: (Duration, usize) = (Duration::from_secs(24 * 60 * 60), 10_000);
    pub const DOMAIN_SUGGESTION: (Duration, usize) = (Duration::from_secs(24 * 60 * 60), 10_000);
    pub const WHOIS: (Duration, usize) = (Duration::from_secs(60 * 60), 10_000);
}
