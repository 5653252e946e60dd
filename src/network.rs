//! CIDR network computation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;

use crate::error::GeoIp2Error;

/// Returns the network containing `ip_address` for the given prefix length,
/// in `address/prefix_len` notation.
///
/// ```
/// assert_eq!(
///     geoip2::network::cidr("192.168.213.111", 31).unwrap(),
///     "192.168.213.110/31"
/// );
/// assert_eq!(
///     geoip2::network::cidr("2001:0db8:85a3:0000:0000:8a2e:0370:7334", 28).unwrap(),
///     "2001:db0::/28"
/// );
/// ```
pub fn cidr(ip_address: &str, prefix_len: u8) -> Result<String, GeoIp2Error> {
    let ip: IpAddr = ip_address
        .parse()
        .map_err(|_| GeoIp2Error::invalid_ip(ip_address))?;
    Ok(network(ip, prefix_len)?.to_string())
}

/// Returns the network containing `ip` for the given prefix length.
///
/// Fails with [`GeoIp2Error::InvalidArgument`] if the prefix length is
/// larger than the address family allows.
pub fn network(ip: IpAddr, prefix_len: u8) -> Result<IpNetwork, GeoIp2Error> {
    let masked = match ip {
        IpAddr::V4(v4) => {
            check_prefix(prefix_len, 32)?;
            IpAddr::V4(Ipv4Addr::from(mask_octets(v4.octets(), prefix_len)))
        }
        IpAddr::V6(v6) => {
            check_prefix(prefix_len, 128)?;
            IpAddr::V6(Ipv6Addr::from(mask_octets(v6.octets(), prefix_len)))
        }
    };
    Ok(IpNetwork::new(masked, prefix_len)?)
}

fn check_prefix(prefix_len: u8, max: u8) -> Result<(), GeoIp2Error> {
    if prefix_len > max {
        return Err(GeoIp2Error::invalid_argument(format!(
            "prefix length {prefix_len} is larger than {max}"
        )));
    }
    Ok(())
}

/// Keeps the first `prefix_len` bits and zeroes the rest.
fn mask_octets<const N: usize>(mut octets: [u8; N], prefix_len: u8) -> [u8; N] {
    let mut remaining = usize::from(prefix_len);
    for octet in octets.iter_mut() {
        if remaining >= 8 {
            remaining -= 8;
            continue;
        }
        *octet = if remaining == 0 {
            0
        } else {
            *octet & (0xFF << (8 - remaining))
        };
        remaining = 0;
    }
    octets
}
