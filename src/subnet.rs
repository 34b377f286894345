//! IPv4 subnet helpers.
//!
//! Pure functions for address arithmetic, CIDR parsing and host enumeration,
//! plus local interface inspection for picking a default scan subnet.

use crate::error::{SubnetError, SubnetResult};
use ipnetwork::Ipv4Network;
use pnet::datalink;
use std::net::{IpAddr, Ipv4Addr};

/// Largest block `enumerate_hosts` will expand (a /16).
pub const MAX_SCAN_ADDRESSES: u64 = 65536;

/// Subnet used when no usable interface is found.
pub const FALLBACK_SUBNET: &str = "192.168.1.0/24";

/// Interface name fragments that identify virtual, bridge or tunnel links.
const VIRTUAL_INTERFACE_MARKERS: &[&str] = &[
    "docker", "veth", "br-", "virbr", "vmnet", "vbox", "vethernet", "tun", "tap", "utun", "wg",
    "zt", "tailscale", "hyper-v", "virtual",
];

/// Parsed form of a CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrInfo {
    /// Network address (host bits cleared).
    pub network: Ipv4Addr,
    pub prefix_length: u8,
    /// First usable host (network + 1).
    pub first_host: Ipv4Addr,
    /// Last usable host (broadcast - 1).
    pub last_host: Ipv4Addr,
    /// Usable host count, network and broadcast excluded. Zero for /31 and /32.
    pub total_hosts: u64,
}

impl CidrInfo {
    /// Number of addresses in the block, including network and broadcast.
    pub fn block_size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }
}

/// Convert an address to its 32-bit value, most significant octet first.
pub fn ip_to_integer(ip: Ipv4Addr) -> u32 {
    u32::from(ip)
}

/// Convert a 32-bit value back to an address.
pub fn integer_to_ip(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value)
}

/// Check for exactly four dot-separated decimal octets in 0-255.
pub fn is_valid_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

/// Parse a dotted-quad address.
pub fn parse_ipv4(s: &str) -> SubnetResult<Ipv4Addr> {
    s.trim()
        .parse()
        .map_err(|_| SubnetError::InvalidAddress(s.to_string()))
}

/// Parse `a.b.c.d/n` into its network, usable host range and host count.
pub fn parse_cidr(cidr: &str) -> SubnetResult<CidrInfo> {
    let cidr = cidr.trim();
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| SubnetError::InvalidCidr(cidr.to_string()))?;

    let ip: Ipv4Addr = addr
        .parse()
        .map_err(|_| SubnetError::InvalidCidr(cidr.to_string()))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| SubnetError::InvalidPrefix(cidr.to_string()))?;
    let net =
        Ipv4Network::new(ip, prefix).map_err(|_| SubnetError::InvalidPrefix(cidr.to_string()))?;

    let network = ip_to_integer(net.network());
    let broadcast = ip_to_integer(net.broadcast());
    let block = 1u64 << (32 - u32::from(prefix));

    Ok(CidrInfo {
        network: net.network(),
        prefix_length: prefix,
        first_host: integer_to_ip(network.saturating_add(1)),
        last_host: integer_to_ip(broadcast.saturating_sub(1)),
        total_hosts: block.saturating_sub(2),
    })
}

/// List every usable host of a block in ascending order.
///
/// Refuses blocks larger than a /16 so a typo cannot start a scan of
/// millions of addresses.
pub fn enumerate_hosts(cidr: &str) -> SubnetResult<Vec<Ipv4Addr>> {
    let info = parse_cidr(cidr)?;
    if info.block_size() > MAX_SCAN_ADDRESSES {
        return Err(SubnetError::TooLarge {
            cidr: cidr.trim().to_string(),
            addresses: info.block_size(),
            max: MAX_SCAN_ADDRESSES,
        });
    }
    if info.total_hosts == 0 {
        return Ok(Vec::new());
    }

    let first = ip_to_integer(info.first_host);
    let last = ip_to_integer(info.last_host);
    Ok((first..=last).map(integer_to_ip).collect())
}

/// Build CIDR notation from an address and its netmask.
///
/// The prefix is the number of set bits in the mask; the network is the
/// bitwise AND of address and mask.
pub fn calculate_cidr(ip: Ipv4Addr, netmask: Ipv4Addr) -> String {
    let mask = ip_to_integer(netmask);
    let network = integer_to_ip(ip_to_integer(ip) & mask);
    format!("{}/{}", network, mask.count_ones())
}

/// An IPv4 address bound to a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl InterfaceAddress {
    fn is_virtual(&self) -> bool {
        let name = self.name.to_lowercase();
        VIRTUAL_INTERFACE_MARKERS
            .iter()
            .any(|marker| name.contains(marker))
    }

    fn is_home_lan(&self) -> bool {
        let [a, b, _, _] = self.ip.octets();
        a == 192 && b == 168
    }
}

/// Collect the non-loopback IPv4 addresses of all local interfaces.
pub fn local_ipv4_addresses() -> Vec<InterfaceAddress> {
    datalink::interfaces()
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .flat_map(|iface| {
            let name = iface.name.clone();
            iface
                .ips
                .iter()
                .filter_map(|net| match (net.ip(), net.mask()) {
                    (IpAddr::V4(ip), IpAddr::V4(netmask)) if !ip.is_loopback() => {
                        Some(InterfaceAddress {
                            name: name.clone(),
                            ip,
                            netmask,
                        })
                    }
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Choose a scan subnet from a list of interface addresses.
///
/// Physical interfaces in 192.168.0.0/16 win, then any physical interface,
/// then whatever is first, then the hardcoded fallback.
pub fn select_subnet(addresses: &[InterfaceAddress]) -> String {
    let physical: Vec<&InterfaceAddress> = addresses.iter().filter(|a| !a.is_virtual()).collect();

    physical
        .iter()
        .find(|a| a.is_home_lan())
        .or_else(|| physical.first())
        .copied()
        .or_else(|| addresses.first())
        .map(|a| calculate_cidr(a.ip, a.netmask))
        .unwrap_or_else(|| FALLBACK_SUBNET.to_string())
}

/// Pick a subnet to scan from the local interfaces.
pub fn auto_detect_subnet() -> String {
    let addresses = local_ipv4_addresses();
    let subnet = select_subnet(&addresses);
    tracing::debug!(subnet = %subnet, candidates = addresses.len(), "auto-detected subnet");
    subnet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, ip: [u8; 4], mask: [u8; 4]) -> InterfaceAddress {
        InterfaceAddress {
            name: name.to_string(),
            ip: Ipv4Addr::from(ip),
            netmask: Ipv4Addr::from(mask),
        }
    }

    #[test]
    fn test_integer_round_trip() {
        for value in [0u32, 1, 0xC0A8_0101, 0x0A00_0000, u32::MAX] {
            assert_eq!(ip_to_integer(integer_to_ip(value)), value);
        }
        for ip in ["0.0.0.0", "255.255.255.255", "192.168.1.1", "10.20.30.40"] {
            let addr: Ipv4Addr = ip.parse().unwrap();
            assert_eq!(integer_to_ip(ip_to_integer(addr)).to_string(), ip);
        }
        assert_eq!(ip_to_integer(Ipv4Addr::new(192, 168, 1, 1)), 3_232_235_777);
    }

    #[test]
    fn test_is_valid_ipv4() {
        assert!(is_valid_ipv4("192.168.1.1"));
        assert!(is_valid_ipv4("0.0.0.0"));
        assert!(!is_valid_ipv4("256.1.1.1"));
        assert!(!is_valid_ipv4("192.168.1"));
        assert!(!is_valid_ipv4("192.168.1.1.1"));
        assert!(!is_valid_ipv4("a.b.c.d"));
        assert!(!is_valid_ipv4(""));
    }

    #[test]
    fn test_parse_cidr_24() {
        let info = parse_cidr("192.168.1.0/24").unwrap();
        assert_eq!(info.total_hosts, 254);
        assert_eq!(info.first_host, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(info.last_host, Ipv4Addr::new(192, 168, 1, 254));
        assert_eq!(info.prefix_length, 24);
    }

    #[test]
    fn test_parse_cidr_16() {
        let info = parse_cidr("10.0.0.0/16").unwrap();
        assert_eq!(info.total_hosts, 65534);
    }

    #[test]
    fn test_parse_cidr_masks_host_bits() {
        let info = parse_cidr("192.168.1.77/24").unwrap();
        assert_eq!(info.network, Ipv4Addr::new(192, 168, 1, 0));
    }

    #[test]
    fn test_parse_cidr_small_prefixes() {
        assert_eq!(parse_cidr("10.0.0.0/31").unwrap().total_hosts, 0);
        assert_eq!(parse_cidr("10.0.0.1/32").unwrap().total_hosts, 0);
        assert_eq!(parse_cidr("0.0.0.0/0").unwrap().total_hosts, (1u64 << 32) - 2);
    }

    #[test]
    fn test_invalid_cidr_rejected() {
        assert!(matches!(
            parse_cidr("192.168.1.0/33"),
            Err(SubnetError::InvalidPrefix(_))
        ));
        assert!(matches!(
            parse_cidr("192.168.1.0/-1"),
            Err(SubnetError::InvalidPrefix(_))
        ));
        assert!(parse_cidr("192.168.1.0").is_err());
        assert!(parse_cidr("999.168.1.0/24").is_err());
    }

    #[test]
    fn test_enumerate_slash_30() {
        let hosts = enumerate_hosts("192.168.1.0/30").unwrap();
        assert_eq!(
            hosts,
            vec![Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2)]
        );
    }

    #[test]
    fn test_enumerate_size_limit() {
        assert!(matches!(
            enumerate_hosts("10.0.0.0/15"),
            Err(SubnetError::TooLarge { .. })
        ));
        assert_eq!(enumerate_hosts("10.0.0.0/16").unwrap().len(), 65534);
    }

    #[test]
    fn test_enumerate_ascending() {
        let hosts = enumerate_hosts("10.0.0.0/24").unwrap();
        assert!(hosts.windows(2).all(|w| w[0] < w[1]));
        assert!(enumerate_hosts("10.0.0.1/32").unwrap().is_empty());
    }

    #[test]
    fn test_calculate_cidr() {
        assert_eq!(
            calculate_cidr(Ipv4Addr::new(192, 168, 1, 42), Ipv4Addr::new(255, 255, 255, 0)),
            "192.168.1.0/24"
        );
        assert_eq!(
            calculate_cidr(Ipv4Addr::new(10, 1, 2, 3), Ipv4Addr::new(255, 255, 240, 0)),
            "10.1.0.0/20"
        );
    }

    #[test]
    fn test_select_prefers_home_lan() {
        let addrs = vec![
            iface("eth1", [10, 0, 0, 5], [255, 0, 0, 0]),
            iface("docker0", [192, 168, 200, 1], [255, 255, 255, 0]),
            iface("wlan0", [192, 168, 4, 12], [255, 255, 252, 0]),
        ];
        assert_eq!(select_subnet(&addrs), "192.168.4.0/22");
    }

    #[test]
    fn test_select_falls_back() {
        let addrs = vec![iface("eth0", [10, 0, 0, 5], [255, 255, 255, 0])];
        assert_eq!(select_subnet(&addrs), "10.0.0.0/24");

        let only_virtual = vec![iface("tun0", [172, 16, 0, 2], [255, 255, 0, 0])];
        assert_eq!(select_subnet(&only_virtual), "172.16.0.0/16");

        assert_eq!(select_subnet(&[]), FALLBACK_SUBNET);
    }
}
