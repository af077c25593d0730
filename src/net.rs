//! Host address arithmetic for testbed layouts.
//!
//! `nth_address` picks the Nth usable host of a CIDR network. For IPv4 the
//! network and broadcast addresses are skipped, except on /31 links where
//! both addresses are hosts and /32 where the only address is returned. For
//! IPv6 only the base (subnet-router anycast) address is skipped.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid network '{0}'")]
    InvalidNetwork(String),

    #[error("Offset must be non-negative")]
    NegativeOffset,

    #[error("Offset out of range for single-address subnet.")]
    SingleAddress,

    #[error("Offset out of range for two-address subnet.")]
    TwoAddress,

    #[error("Offset out of range. Usable range: 0 to {last}")]
    OutOfRange { last: u128 },
}

/// Parse `addr[/prefix]`, ignoring host bits. A bare address is a host route.
pub fn parse_network(network: &str) -> Result<(IpAddr, u8), AddressError> {
    let invalid = || AddressError::InvalidNetwork(network.to_string());
    let (addr, prefix) = match network.trim().split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (network.trim(), None),
    };
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let max = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    let prefix = match prefix {
        Some(prefix) => prefix.parse::<u8>().map_err(|_| invalid())?,
        None => max,
    };
    if prefix > max {
        return Err(invalid());
    }
    let base = match addr {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix))),
    };
    Ok((base, prefix))
}

/// The `offset`-th usable host address of `network`.
pub fn nth_address(network: &str, offset: i64) -> Result<IpAddr, AddressError> {
    let (base, prefix) = parse_network(network)?;
    let offset = u128::try_from(offset).map_err(|_| AddressError::NegativeOffset)?;

    match base {
        IpAddr::V4(v4) => {
            let base = u32::from(v4) as u128;
            let host = match prefix {
                32 if offset == 0 => base,
                32 => return Err(AddressError::SingleAddress),
                31 if offset < 2 => base + offset,
                31 => return Err(AddressError::TwoAddress),
                _ => {
                    let usable = (1u128 << (32 - prefix)) - 2;
                    if offset >= usable {
                        return Err(AddressError::OutOfRange { last: usable - 1 });
                    }
                    base + 1 + offset
                }
            };
            Ok(IpAddr::V4(Ipv4Addr::from(host as u32)))
        }
        IpAddr::V6(v6) => {
            let base = u128::from(v6);
            if prefix == 128 {
                return if offset == 0 {
                    Ok(IpAddr::V6(v6))
                } else {
                    Err(AddressError::SingleAddress)
                };
            }
            let host_bits = 128 - u32::from(prefix);
            let usable = if host_bits == 128 {
                u128::MAX
            } else {
                (1u128 << host_bits) - 1
            };
            if offset >= usable {
                return Err(AddressError::OutOfRange { last: usable - 1 });
            }
            Ok(IpAddr::V6(Ipv6Addr::from(base + 1 + offset)))
        }
    }
}

fn v4_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn v6_mask(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}
