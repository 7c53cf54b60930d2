//! Core Domain Entities for the Address Manager
//!
//! Network endpoints, timestamps and service bits as they travel through
//! gossip and into the address table.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Prefix of an IPv4 address embedded in IPv6 (`::ffff:0:0/96`).
const IPV4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

/// IP address enum supporting both IPv4 and IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpAddr {
    /// IPv4 address (4 bytes).
    V4([u8; 4]),
    /// IPv6 address (16 bytes).
    V6([u8; 16]),
}

impl IpAddr {
    /// Create an IPv4 address
    pub fn v4(a: u8, b: u8, c: u8, d: u8) -> Self {
        IpAddr::V4([a, b, c, d])
    }

    /// Create an IPv6 address from bytes
    pub fn v6(bytes: [u8; 16]) -> Self {
        IpAddr::V6(bytes)
    }

    /// Decode the 16-byte on-disk form, folding IPv4-mapped addresses back
    /// into `V4`.
    pub fn from_mapped(bytes: [u8; 16]) -> Self {
        if bytes[..12] == IPV4_MAPPED_PREFIX {
            IpAddr::V4([bytes[12], bytes[13], bytes[14], bytes[15]])
        } else {
            IpAddr::V6(bytes)
        }
    }

    /// 16-byte IPv6-mapped form. This is the canonical identity of an IP in
    /// the table and the representation written to disk.
    pub fn to_mapped(&self) -> [u8; 16] {
        match self {
            IpAddr::V4(v4) => {
                let mut out = [0u8; 16];
                out[..12].copy_from_slice(&IPV4_MAPPED_PREFIX);
                out[12..].copy_from_slice(v4);
                out
            }
            IpAddr::V6(v6) => *v6,
        }
    }

    /// Check if this is an IPv4 address (including IPv4-mapped IPv6)
    pub fn is_ipv4(&self) -> bool {
        match self {
            IpAddr::V4(_) => true,
            IpAddr::V6(bytes) => bytes[..12] == IPV4_MAPPED_PREFIX,
        }
    }

    /// Check if this is a native IPv6 address
    pub fn is_ipv6(&self) -> bool {
        !self.is_ipv4()
    }

    /// The IPv4 octets if this is (or maps) an IPv4 address.
    pub fn ipv4_octets(&self) -> Option<[u8; 4]> {
        match self {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(bytes) if bytes[..12] == IPV4_MAPPED_PREFIX => {
                Some([bytes[12], bytes[13], bytes[14], bytes[15]])
            }
            IpAddr::V6(_) => None,
        }
    }
}

impl From<std::net::IpAddr> for IpAddr {
    fn from(ip: std::net::IpAddr) -> Self {
        match ip {
            std::net::IpAddr::V4(v4) => IpAddr::V4(v4.octets()),
            std::net::IpAddr::V6(v6) => IpAddr::V6(v6.octets()),
        }
    }
}

impl From<IpAddr> for std::net::IpAddr {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => std::net::IpAddr::from(v4),
            IpAddr::V6(v6) => std::net::IpAddr::from(v6),
        }
    }
}

impl fmt::Display for IpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::net::IpAddr::from(*self).fmt(f)
    }
}

/// Socket address (IP + Port) - abstraction over std::net::SocketAddr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddr {
    /// IP address (v4 or v6).
    pub ip: IpAddr,
    /// Port number.
    pub port: u16,
}

impl SocketAddr {
    /// Create a new socket address from IP and port.
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Bytes identifying this exact endpoint: mapped IP followed by the
    /// big-endian port.
    pub fn key_bytes(&self) -> [u8; 18] {
        let mut out = [0u8; 18];
        out[..16].copy_from_slice(&self.ip.to_mapped());
        out[16..].copy_from_slice(&self.port.to_be_bytes());
        out
    }

    /// Same endpoint, comparing IPs by their canonical mapped form.
    pub fn same_endpoint(&self, other: &SocketAddr) -> bool {
        self.port == other.port && self.ip.to_mapped() == other.ip.to_mapped()
    }
}

impl From<std::net::SocketAddr> for SocketAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self::new(addr.ip().into(), addr.port())
    }
}

impl fmt::Display for SocketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::net::SocketAddr::new(self.ip.into(), self.port).fmt(f)
    }
}

/// Unix timestamp in seconds
///
/// # Security (Timestamp Bounds)
///
/// Timestamps are clamped to a reasonable maximum to prevent overflow
/// attacks in sorting and comparison operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    ///
    /// Prevents attackers from using u64::MAX to corrupt eviction logic.
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// The "never" timestamp.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// True for the zero ("never") timestamp.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds from timestamp (saturating at 0).
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Signed number of seconds from `earlier` to `self`. Negative when
    /// `earlier` lies in the future.
    pub fn secs_since(&self, earlier: Timestamp) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }
}

/// Service bits advertised by a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ServiceFlags(pub u64);

impl ServiceFlags {
    /// No services.
    pub const NONE: ServiceFlags = ServiceFlags(0);
    /// Full node serving the complete chain.
    pub const NETWORK: ServiceFlags = ServiceFlags(1);

    /// Raw bits.
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub fn contains(&self, other: ServiceFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ServiceFlags {
    type Output = ServiceFlags;

    fn bitor(self, rhs: ServiceFlags) -> ServiceFlags {
        ServiceFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ServiceFlags {
    fn bitor_assign(&mut self, rhs: ServiceFlags) {
        self.0 |= rhs.0;
    }
}

/// A gossiped peer endpoint: where it lives, what it serves, and when it was
/// last heard of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddress {
    /// Network address for P2P communication.
    pub socket_addr: SocketAddr,
    /// Advertised service bits.
    pub services: ServiceFlags,
    /// Last time the network reported this peer alive (0 = unknown).
    pub last_seen: Timestamp,
}

impl PeerAddress {
    /// Create a new peer address
    pub fn new(socket_addr: SocketAddr, services: ServiceFlags, last_seen: Timestamp) -> Self {
        Self {
            socket_addr,
            services,
            last_seen,
        }
    }

    /// Shorthand for the IP.
    pub fn ip(&self) -> IpAddr {
        self.socket_addr.ip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_round_trip_folds_ipv4() {
        let ip = IpAddr::v4(8, 8, 4, 4);
        let mapped = ip.to_mapped();
        assert_eq!(&mapped[..12], &IPV4_MAPPED_PREFIX);
        assert_eq!(IpAddr::from_mapped(mapped), ip);

        let v6 = IpAddr::v6([0x20, 0x01, 0x48, 0x60, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x88, 0x88]);
        assert_eq!(IpAddr::from_mapped(v6.to_mapped()), v6);
    }

    #[test]
    fn test_key_bytes_port_is_big_endian() {
        let addr = SocketAddr::new(IpAddr::v4(1, 2, 3, 4), 0x1234);
        let key = addr.key_bytes();
        assert_eq!(key[16], 0x12);
        assert_eq!(key[17], 0x34);
    }

    #[test]
    fn test_same_endpoint_ignores_representation() {
        let a = SocketAddr::new(IpAddr::v4(1, 2, 3, 4), 8333);
        let b = SocketAddr::new(IpAddr::v6(IpAddr::v4(1, 2, 3, 4).to_mapped()), 8333);
        assert!(a.same_endpoint(&b));
        assert!(!a.same_endpoint(&SocketAddr::new(IpAddr::v4(1, 2, 3, 4), 8334)));
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let ts = Timestamp::new(100);
        assert_eq!(ts.add_secs(50).as_secs(), 150);
        assert_eq!(ts.sub_secs(200).as_secs(), 0); // Saturating
        assert_eq!(ts.secs_since(Timestamp::new(160)), -60);
        assert_eq!(Timestamp::new(u64::MAX).as_secs(), Timestamp::MAX_REASONABLE);
    }

    #[test]
    fn test_service_flags_merge() {
        let mut flags = ServiceFlags::NONE;
        flags |= ServiceFlags::NETWORK;
        flags |= ServiceFlags(1 << 3);
        assert!(flags.contains(ServiceFlags::NETWORK));
        assert_eq!(flags.bits(), 0b1001);
    }
}
