use std::net::{IpAddr, Ipv6Addr};

/// Prefix length IPv6 clients are grouped by (a typical end-site allocation)
pub const IPV6_PREFIX_LEN: u32 = 56;

/// Canonical rate-limit key for a client address
///
/// IPv4-mapped IPv6 addresses collapse to plain IPv4 so a dual-stack
/// listener sees one client, not two. Other IPv6 addresses are masked to
/// their /56 network, since a single subscriber usually controls the whole
/// block.
pub fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => {
                let mask = u128::MAX << (128 - IPV6_PREFIX_LEN);
                let network = Ipv6Addr::from(u128::from(v6) & mask);
                format!("{}/{}", network, IPV6_PREFIX_LEN)
            }
        },
    }
}
