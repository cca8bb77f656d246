use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::error::ConfigError;

/// Prefix lengths RFC 6052 §2.2 defines an embedding for.
pub const VALID_PREFIX_LENS: [u8; 6] = [32, 40, 48, 56, 64, 96];

/// A NAT64 translation prefix: an IPv6 address and one of the six valid
/// prefix lengths. Defines the fixed mapping from an IPv4 address to the
/// synthesized IPv6 address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dns64Prefix {
    addr: [u8; 16],
    len: u8,
}

impl Dns64Prefix {
    pub fn new(addr: Ipv6Addr, len: u8) -> Result<Self, ConfigError> {
        if !VALID_PREFIX_LENS.contains(&len) {
            return Err(ConfigError::InvalidPrefix(format!(
                "Usable prefix length values are 32, 40, 48, 56, 64 and 96, got {}",
                len
            )));
        }
        Ok(Dns64Prefix {
            addr: addr.octets(),
            len,
        })
    }

    pub fn addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.addr)
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    /// Embed an IPv4 address into the prefix per RFC 6052 §2.2: the first
    /// `len / 8` bytes come from the prefix, the four IPv4 bytes go to the
    /// positions the prefix length dictates, byte 8 (the reserved u-octet)
    /// stays zero, and everything else is zero.
    pub fn embed(&self, v4: [u8; 4]) -> [u8; 16] {
        let mut v6 = [0u8; 16];
        let n = (self.len / 8) as usize;
        v6[..n].copy_from_slice(&self.addr[..n]);
        match self.len {
            32 => v6[4..8].copy_from_slice(&v4),
            40 => {
                v6[5..8].copy_from_slice(&v4[..3]);
                v6[9] = v4[3];
            }
            48 => {
                v6[6..8].copy_from_slice(&v4[..2]);
                v6[9..11].copy_from_slice(&v4[2..]);
            }
            56 => {
                v6[7] = v4[0];
                v6[9..12].copy_from_slice(&v4[1..]);
            }
            64 => v6[9..13].copy_from_slice(&v4),
            96 => v6[12..16].copy_from_slice(&v4),
            _ => unreachable!("constructor rejects other lengths"),
        }
        v6[8] = 0;
        v6
    }
}

impl FromStr for Dns64Prefix {
    type Err = ConfigError;

    /// Parse the `V6_ADDR/LEN` form used by the `dns64-prefix` key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidPrefix(format!("Missing prefix length in {:?}", s)))?;
        let addr: Ipv6Addr = addr
            .parse()
            .map_err(|_| ConfigError::InvalidPrefix(format!("Bad IPv6 address in {:?}", s)))?;
        let len: u8 = len
            .parse()
            .map_err(|_| ConfigError::InvalidPrefix(format!("Bad prefix length in {:?}", s)))?;
        Dns64Prefix::new(addr, len)
    }
}

impl std::fmt::Display for Dns64Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr(), self.len)
    }
}
