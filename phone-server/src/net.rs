//! Local address discovery for the start report

use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

#[cfg(unix)]
mod unix {
    use super::*;

    /// IPv4 addresses of all interfaces, in the order the OS lists them
    pub fn interface_ipv4_addresses() -> Vec<Ipv4Addr> {
        let mut addresses = Vec::new();
        let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();

        if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
            debug!("getifaddrs failed: {}", std::io::Error::last_os_error());
            return addresses;
        }

        let mut cursor = ifap;
        while !cursor.is_null() {
            let entry = unsafe { &*cursor };
            if !entry.ifa_addr.is_null() {
                let family = unsafe { (*entry.ifa_addr).sa_family };
                if i32::from(family) == libc::AF_INET {
                    let sin = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
                    addresses.push(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
                }
            }
            cursor = entry.ifa_next;
        }

        unsafe { libc::freeifaddrs(ifap) };
        addresses
    }
}

#[cfg(not(unix))]
mod unix {
    use super::*;

    pub fn interface_ipv4_addresses() -> Vec<Ipv4Addr> {
        Vec::new()
    }
}

/// First non-loopback IPv4 interface address, falling back to 127.0.0.1
pub fn local_ipv4_address() -> Ipv4Addr {
    first_non_loopback(unix::interface_ipv4_addresses())
}

/// Address clients should use to reach a server bound to `host`.
///
/// A loopback bind is only reachable on loopback. A wildcard bind or a
/// hostname reports the first interface address; any other IP is its own
/// answer.
pub fn advertised_address(host: &str) -> IpAddr {
    if host.eq_ignore_ascii_case("localhost") {
        return IpAddr::V4(Ipv4Addr::LOCALHOST);
    }
    match host.parse::<IpAddr>() {
        Ok(ip) if !ip.is_unspecified() => ip,
        _ => IpAddr::V4(local_ipv4_address()),
    }
}

fn first_non_loopback(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Ipv4Addr {
    addresses
        .into_iter()
        .find(|addr| !addr.is_loopback())
        .unwrap_or(Ipv4Addr::LOCALHOST)
}
