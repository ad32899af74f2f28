//! Client-IP extraction and path matching used to key and scope rate limits.

use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::net::IpAddr;

/// Extracts the real client IP from a request's headers and peer address,
/// honoring `X-Forwarded-For`/`X-Real-IP` only when the immediate peer is a
/// trusted proxy — otherwise a client could spoof its own rate-limit key by
/// setting those headers directly.
pub struct ClientIpExtractor {
    trusted_proxies: Vec<IpNetwork>,
}

impl ClientIpExtractor {
    /// Creates an extractor that trusts only the given CIDR ranges as
    /// forwarding proxies.
    pub fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { trusted_proxies }
    }

    /// Creates an extractor that trusts no proxies: the peer address is
    /// always used verbatim, and forwarding headers are ignored.
    pub fn untrusted() -> Self {
        Self {
            trusted_proxies: Vec::new(),
        }
    }

    /// Builds an extractor from the operator-facing config shape: each
    /// entry is either a CIDR range (`"10.0.0.0/8"`) or a bare IP literal
    /// (`"10.0.0.1"`, treated as a `/32` or `/128` host route). Entries that
    /// parse as neither are skipped with a `tracing::warn!` (under the
    /// `tracing` feature) rather than failing the whole config or being
    /// silently treated as a match.
    pub fn from_config_strings(entries: &[String]) -> Self {
        let mut trusted_proxies = Vec::with_capacity(entries.len());
        for entry in entries {
            match parse_trusted_proxy_entry(entry) {
                Some(network) => trusted_proxies.push(network),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(entry = %entry, "skipping unparseable trusted-proxy entry");
                }
            }
        }
        Self { trusted_proxies }
    }

    fn is_trusted(&self, addr: IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(addr))
    }

    /// Resolves the client IP given the immediate peer address and the
    /// request's header map. `headers` is looked up case-insensitively for
    /// `x-forwarded-for` and `x-real-ip`.
    pub fn extract(&self, peer: IpAddr, headers: &std::collections::HashMap<String, String>) -> IpAddr {
        if !self.is_trusted(peer) {
            return peer;
        }

        if let Some(forwarded) = find_header(headers, "x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                if let Ok(addr) = first.trim().parse::<IpAddr>() {
                    return addr;
                }
            }
        }

        if let Some(real_ip) = find_header(headers, "x-real-ip") {
            if let Ok(addr) = real_ip.trim().parse::<IpAddr>() {
                return addr;
            }
        }

        peer
    }
}

/// Parses a single trusted-proxy config entry: CIDR notation first, falling
/// back to a bare IP literal widened to a host route (`/32` for IPv4,
/// `/128` for IPv6).
fn parse_trusted_proxy_entry(entry: &str) -> Option<IpNetwork> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    if let Ok(network) = entry.parse::<IpNetwork>() {
        return Some(network);
    }
    match entry.parse::<IpAddr>() {
        Ok(addr @ IpAddr::V4(_)) => IpNetwork::new(addr, 32).ok(),
        Ok(addr @ IpAddr::V6(_)) => IpNetwork::new(addr, 128).ok(),
        Err(_) => None,
    }
}

fn find_header<'a>(headers: &'a std::collections::HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Decides whether a request path is subject to rate limiting.
///
/// Exact matches take precedence over prefix matches, so an operator can
/// exempt a specific path (e.g. `/health/ready`) nested under a limited
/// prefix (e.g. `/health`).
pub struct PathMatcher {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl PathMatcher {
    /// Builds a matcher from an exact-match set and a prefix-match set.
    pub fn new(exact: impl IntoIterator<Item = String>, prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            exact: exact.into_iter().collect(),
            prefixes: prefixes.into_iter().collect(),
        }
    }

    /// An empty matcher: every path matches nothing.
    pub fn empty() -> Self {
        Self {
            exact: HashSet::new(),
            prefixes: Vec::new(),
        }
    }

    /// Returns `true` if `path` is covered by this matcher.
    pub fn matches(&self, path: &str) -> bool {
        if self.exact.contains(path) {
            return true;
        }
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}
