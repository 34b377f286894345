//! Neighbor table lookup.
//!
//! The OS already knows the MAC of every host it has talked to recently.
//! Reading that table gives the scanner a MAC hint for devices whose reply
//! does not include one. Everything here is best effort: a missing tool or an
//! unreadable file yields an empty map and a warning.

use crate::types::MacAddress;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tokio::process::Command;
use tracing::{debug, warn};

/// IP to MAC mapping from the neighbor table.
pub type NeighborTable = HashMap<Ipv4Addr, MacAddress>;

/// Source of IP to MAC mappings.
#[async_trait]
pub trait NeighborResolver: Send + Sync {
    /// Snapshot the neighbor table. Never fails; returns an empty map instead.
    async fn resolve_neighbor_table(&self) -> NeighborTable;
}

/// Reads the neighbor table of the host OS.
///
/// Linux: `/proc/net/arp`, then `ip neigh show`. Elsewhere: `arp -a`.
#[derive(Debug, Clone, Default)]
pub struct SystemNeighborResolver;

#[async_trait]
impl NeighborResolver for SystemNeighborResolver {
    async fn resolve_neighbor_table(&self) -> NeighborTable {
        #[cfg(target_os = "linux")]
        {
            match tokio::fs::read_to_string("/proc/net/arp").await {
                Ok(content) => {
                    let table = parse_proc_net_arp(&content);
                    debug!(entries = table.len(), "read /proc/net/arp");
                    return table;
                }
                Err(e) => debug!(error = %e, "/proc/net/arp unavailable, trying ip neigh"),
            }
            run_and_parse("ip", &["neigh", "show"]).await
        }
        #[cfg(not(target_os = "linux"))]
        {
            run_and_parse("arp", &["-a"]).await
        }
    }
}

/// A fixed table, for tests and for running with ARP disabled.
#[derive(Debug, Clone, Default)]
pub struct StaticNeighbors(pub NeighborTable);

#[async_trait]
impl NeighborResolver for StaticNeighbors {
    async fn resolve_neighbor_table(&self) -> NeighborTable {
        self.0.clone()
    }
}

async fn run_and_parse(program: &str, args: &[&str]) -> NeighborTable {
    let output = match Command::new(program).args(args).output().await {
        Ok(output) => output,
        Err(e) => {
            warn!(program, error = %e, "neighbor table query failed");
            return NeighborTable::new();
        }
    };

    if !output.status.success() {
        warn!(program, status = %output.status, "neighbor table query returned non-zero status");
        return NeighborTable::new();
    }

    let table = parse_neighbor_output(&String::from_utf8_lossy(&output.stdout));
    debug!(program, entries = table.len(), "parsed neighbor table");
    table
}

/// Parse the Linux `/proc/net/arp` format.
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         a8:bb:50:06:03:3d     *        wlan0
/// ```
///
/// Entries with flags `0x0` are incomplete and skipped.
pub fn parse_proc_net_arp(content: &str) -> NeighborTable {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 || cols[2] == "0x0" {
                return None;
            }
            let ip = cols[0].parse::<Ipv4Addr>().ok()?;
            let mac = usable_mac(cols[3])?;
            Some((ip, mac))
        })
        .collect()
}

/// Parse `ip neigh` or `arp -a` output.
///
/// Both put an IPv4 address (possibly in parentheses) and a MAC somewhere on
/// the line, so each line is scanned for the first token of each kind:
///
/// ```text
/// 192.168.1.20 dev wlan0 lladdr a8:bb:50:06:03:3d REACHABLE
/// ? (192.168.1.20) at a8:bb:50:6:3:3d on en0 ifscope [ethernet]
///   192.168.1.20          a8-bb-50-06-03-3d     dynamic
/// ```
pub fn parse_neighbor_output(output: &str) -> NeighborTable {
    output
        .lines()
        .filter_map(|line| {
            let mut ip = None;
            let mut mac = None;
            for token in line.split_whitespace() {
                let token = token.trim_matches(|c| c == '(' || c == ')');
                if ip.is_none() {
                    if let Ok(addr) = token.parse::<Ipv4Addr>() {
                        ip = Some(addr);
                        continue;
                    }
                }
                if mac.is_none() && token.contains([':', '-']) {
                    mac = usable_mac(token);
                }
            }
            let ip = ip?;
            if ip.is_multicast() || ip.is_broadcast() {
                return None;
            }
            Some((ip, mac?))
        })
        .collect()
}

fn usable_mac(raw: &str) -> Option<MacAddress> {
    let mac: MacAddress = raw.parse().ok()?;
    (!mac.is_zero() && !mac.is_broadcast()).then_some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_net_arp() {
        let content = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         10:20:30:40:50:60     *        wlan0
192.168.1.20     0x1         0x2         A8:BB:50:06:03:3D     *        wlan0
192.168.1.99     0x1         0x0         00:00:00:00:00:00     *        wlan0
";
        let table = parse_proc_net_arp(content);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table[&Ipv4Addr::new(192, 168, 1, 20)].to_string(),
            "a8:bb:50:06:03:3d"
        );
        assert!(!table.contains_key(&Ipv4Addr::new(192, 168, 1, 99)));
    }

    #[test]
    fn test_parse_ip_neigh() {
        let output = "\
192.168.1.20 dev wlan0 lladdr a8:bb:50:06:03:3d REACHABLE
192.168.1.30 dev wlan0 FAILED
fe80::1 dev wlan0 lladdr 10:20:30:40:50:60 router STALE
";
        let table = parse_neighbor_output(output);
        assert_eq!(table.len(), 1);
        assert!(table.contains_key(&Ipv4Addr::new(192, 168, 1, 20)));
    }

    #[test]
    fn test_parse_bsd_arp() {
        let output = "\
? (192.168.1.20) at a8:bb:50:6:3:3d on en0 ifscope [ethernet]
? (192.168.1.255) at ff:ff:ff:ff:ff:ff on en0 ifscope [ethernet]
? (224.0.0.251) at 1:0:5e:0:0:fb on en0 ifscope permanent [ethernet]
";
        let table = parse_neighbor_output(output);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table[&Ipv4Addr::new(192, 168, 1, 20)].to_string(),
            "a8:bb:50:06:03:3d"
        );
    }

    #[test]
    fn test_parse_windows_arp() {
        let output = "\
Interface: 192.168.1.5 --- 0x4
  Internet Address      Physical Address      Type
  192.168.1.20          a8-bb-50-06-03-3d     dynamic
";
        let table = parse_neighbor_output(output);
        assert_eq!(table.len(), 1);
        assert!(table.contains_key(&Ipv4Addr::new(192, 168, 1, 20)));
    }

    #[tokio::test]
    async fn test_static_neighbors() {
        let mut map = NeighborTable::new();
        map.insert(
            Ipv4Addr::new(10, 0, 0, 2),
            "a8:bb:50:00:00:01".parse().unwrap(),
        );
        let resolver = StaticNeighbors(map);
        assert_eq!(resolver.resolve_neighbor_table().await.len(), 1);
    }
}
