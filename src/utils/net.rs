//! Local network interface enumeration.
//!
//! Used to print candidate LAN URLs when the server binds a wildcard
//! address in verbose mode.

use std::net::Ipv4Addr;

/// Collect the IPv4 addresses of all local interfaces.
///
/// Returns an empty list when enumeration fails; callers treat the list
/// as best-effort display data.
pub fn local_ipv4_addrs() -> Vec<Ipv4Addr> {
    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return Vec::new();
    };

    interfaces
        .into_iter()
        .filter_map(|iface| match iface.addr {
            if_addrs::IfAddr::V4(addr) => Some(addr.ip),
            _ => None,
        })
        .collect()
}
