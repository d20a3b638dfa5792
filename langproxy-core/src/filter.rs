/// Host constraint shared by interception rules and the Accept-Language injector.
///
/// A constraint on `example.com` matches `example.com` itself and any
/// subdomain (`www.example.com`, `a.b.example.com`), but never a host that
/// merely ends with the same characters (`evilexample.com`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMatcher {
    domain: String,
}

impl HostMatcher {
    /// Create a new HostMatcher. Case and a trailing dot are normalised away.
    pub fn new(domain: &str) -> Self {
        Self {
            domain: normalize(domain),
        }
    }

    /// Check if a host is the domain or one of its subdomains
    pub fn matches(&self, host: &str) -> bool {
        if self.domain.is_empty() {
            return false;
        }

        let host = normalize(host);
        if host == self.domain {
            return true;
        }

        host.len() > self.domain.len()
            && host.ends_with(&self.domain)
            && host.as_bytes()[host.len() - self.domain.len() - 1] == b'.'
    }
}

/// Strip a port suffix from a `Host` header value.
pub fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        // IPv6 literal: [::1]:8080
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}

fn normalize(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
