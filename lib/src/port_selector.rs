//! Port selector: a thin wrapper over the `smtpPort` cache store that
//! lets the probe short-circuit port trial once a host's working port is
//! known.

use crate::cache::Cache;

/// The port that previously yielded `canConnectSmtp = true` for `mx_host`,
/// if any is still cached.
#[must_use]
pub fn learned_port_for(mx_host: &str, cache: &Cache) -> Option<u16> {
    cache.smtp_port.get(mx_host).ok().flatten()
}

/// Record that `port` worked for `mx_host`, for future probes to reuse.
pub fn remember(mx_host: &str, port: u16, cache: &Cache) {
    let _ = cache.smtp_port.set(mx_host, port, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_and_returns_learned_port() {
        let cache = Cache::new();
        assert_eq!(learned_port_for("mx.example.com", &cache), None);
        remember("mx.example.com", 587, &cache);
        assert_eq!(learned_port_for("mx.example.com", &cache), Some(587));
    }
}
