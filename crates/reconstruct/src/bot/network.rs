//! Datacenter IP range matching.
//!
//! Human visitors arrive from residential and mobile ISPs; automated
//! traffic tends to come from cloud and VPS providers. Only IPv4 ranges are
//! listed, so IPv6 addresses never match.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Published ranges of major cloud and VPS providers.
const DATACENTER_CIDRS: &[&str] = &[
    // AWS
    "3.0.0.0/9",
    "18.128.0.0/9",
    "52.0.0.0/10",
    "54.64.0.0/11",
    // Google Cloud
    "34.64.0.0/10",
    "35.184.0.0/13",
    "35.192.0.0/12",
    // Azure
    "20.36.0.0/14",
    "40.64.0.0/10",
    "52.224.0.0/11",
    // DigitalOcean
    "64.225.0.0/16",
    "104.131.0.0/16",
    "138.68.0.0/16",
    "159.203.0.0/16",
    "167.99.0.0/16",
    "206.189.0.0/16",
    // Linode
    "45.33.0.0/17",
    "139.162.0.0/16",
    "172.104.0.0/15",
    // OVH
    "51.68.0.0/16",
    "51.75.0.0/16",
    "137.74.0.0/16",
    "145.239.0.0/16",
    // Hetzner
    "65.108.0.0/15",
    "78.46.0.0/15",
    "88.198.0.0/16",
    "95.216.0.0/15",
    "135.181.0.0/16",
    "168.119.0.0/16",
    // Vultr
    "45.32.0.0/16",
    "45.63.0.0/17",
    "108.61.0.0/16",
];

#[derive(Debug, Clone, Copy)]
struct Cidr {
    network: u32,
    mask: u32,
}

impl Cidr {
    fn parse(s: &str) -> Option<Self> {
        let (addr, len) = s.split_once('/')?;
        let addr: Ipv4Addr = addr.parse().ok()?;
        let len: u32 = len.parse().ok().filter(|l| *l <= 32)?;
        let mask = if len == 0 { 0 } else { u32::MAX << (32 - len) };
        Some(Self {
            network: u32::from(addr) & mask,
            mask,
        })
    }

    fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask == self.network
    }
}

static RANGES: LazyLock<Vec<Cidr>> =
    LazyLock::new(|| DATACENTER_CIDRS.iter().filter_map(|s| Cidr::parse(s)).collect());

/// Whether `ip` falls in a known datacenter range.
pub fn is_datacenter_ip(ip: &str) -> bool {
    match ip.trim().parse::<Ipv4Addr>() {
        Ok(addr) => RANGES.iter().any(|r| r.contains(addr)),
        Err(_) => false,
    }
}
