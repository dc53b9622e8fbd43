use std::net::IpAddr;

/// Folds IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) into plain IPv4, so that a
/// hop reported over a dual-stack socket still matches IPv4 geofeed entries.
pub trait CanonicalIpAddr {
    fn to_canonical_ip(&self) -> Self;
}

impl CanonicalIpAddr for IpAddr {
    fn to_canonical_ip(&self) -> Self {
        match self {
            IpAddr::V4(v4) => IpAddr::V4(*v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(*v6),
            },
        }
    }
}

/// Parse an address as printed by diagnostic tools: surrounding whitespace, `[v6]`
/// brackets and `%zone` suffixes are tolerated.
pub fn parse_address(s: &str) -> Option<IpAddr> {
    let s = s.trim();
    let s = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(s);
    let s = match s.split_once('%') {
        Some((address, _zone)) => address,
        None => s,
    };
    s.parse::<IpAddr>().ok().map(|ip| ip.to_canonical_ip())
}
