//! General utilities shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Building
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the receiver base URL (`http://{host}:{port}`).
///
/// Bare IPv6 literals are wrapped in brackets.
#[must_use]
pub fn build_base_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{}]:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_for_ipv4_host() {
        assert_eq!(build_base_url("192.0.2.10", 8080), "http://192.0.2.10:8080");
    }

    #[test]
    fn base_url_for_hostname() {
        assert_eq!(build_base_url("avr.local", 80), "http://avr.local:80");
    }

    #[test]
    fn base_url_brackets_ipv6() {
        assert_eq!(build_base_url("fe80::1", 8080), "http://[fe80::1]:8080");
        assert_eq!(build_base_url("[fe80::1]", 8080), "http://[fe80::1]:8080");
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
