//! Client key derivation.

use std::fmt;
use std::net::IpAddr;

/// Key used when the caller's address is unavailable.
///
/// Every such caller shares one budget.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identifier partitioning rate limit state between callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Build a key from the caller's network address.
    pub fn from_addr(addr: Option<IpAddr>) -> Self {
        match addr {
            Some(ip) => Self(normalize_ip(ip).to_string()),
            None => Self::unknown(),
        }
    }

    /// Build a key from a caller-supplied string, falling back to `addr`
    /// and then to [`UNKNOWN_CLIENT`] when it is blank.
    pub fn resolve(raw: &str, addr: Option<IpAddr>) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::from_addr(addr)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The shared fallback key.
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl AsRef<str> for ClientKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// IPv4-mapped IPv6 peers (`::ffff:1.2.3.4`) are keyed as plain IPv4 so a
/// dual-stack listener does not split one client into two budgets.
fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}
