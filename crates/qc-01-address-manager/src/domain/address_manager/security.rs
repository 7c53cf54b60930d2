//! Address manager security primitives.
//!
//! SECURITY-CRITICAL: Contains the keyed hash and the network-group
//! classification behind bucket placement. Isolate for security audits.

use sha2::{Digest, Sha256};

use crate::domain::{IpAddr, SocketAddr};

/// Compute double SHA-256 hash (Bitcoin-style)
#[inline]
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut output = [0u8; 32];
    output.copy_from_slice(&second);
    output
}

/// Incremental double SHA-256 over the concatenation of every written
/// piece, finished into the "cheap" 64-bit hash.
///
/// # Security
/// Every placement hash starts with the table's secret key, so an attacker
/// who does not know the key cannot aim addresses at chosen buckets.
pub struct KeyedHasher {
    inner: Sha256,
}

impl KeyedHasher {
    /// Start a hash seeded with the table key.
    pub fn new(key: &[u8; 32]) -> Self {
        let mut inner = Sha256::new();
        inner.update(key);
        Self { inner }
    }

    /// Feed raw bytes.
    pub fn write(mut self, bytes: &[u8]) -> Self {
        self.inner.update(bytes);
        self
    }

    /// Feed an integer as little-endian u64.
    pub fn write_u64(self, value: u64) -> Self {
        self.write(&value.to_le_bytes())
    }

    /// First 8 bytes of the double hash, little-endian.
    pub fn finish(self) -> u64 {
        let first = self.inner.finalize();
        let second = Sha256::digest(first);
        let mut cheap = [0u8; 8];
        cheap.copy_from_slice(&second[..8]);
        u64::from_le_bytes(cheap)
    }
}

/// Network-group classes.
const GROUP_UNROUTABLE: u8 = 0;
const GROUP_IPV4: u8 = 1;
const GROUP_IPV6: u8 = 2;
const GROUP_LOCAL: u8 = 255;

/// Coarse routing-prefix classification of an IP.
///
/// # Security (Anti-Eclipse)
/// Peers in one group are assumed to be controlled by one operator. IPv4 is
/// grouped by /16, IPv6 by /32 (Hurricane Electric by /36, since it hands out
/// /36 tunnels for free). IPv4 tunnelled inside IPv6 is grouped as IPv4 so
/// wrapping an address does not escape its group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkGroup(Vec<u8>);

impl NetworkGroup {
    /// Classify an IP.
    pub fn from_ip(ip: &IpAddr) -> Self {
        if is_local(ip) {
            return NetworkGroup(vec![GROUP_LOCAL]);
        }
        if !is_routable(ip) {
            return NetworkGroup(vec![GROUP_UNROUTABLE]);
        }
        if let Some([a, b, _, _]) = embedded_ipv4(ip) {
            return NetworkGroup(vec![GROUP_IPV4, a, b]);
        }

        let bytes = ip.to_mapped();
        if bytes[..4] == [0x20, 0x01, 0x04, 0x70] {
            NetworkGroup(vec![
                GROUP_IPV6,
                bytes[0],
                bytes[1],
                bytes[2],
                bytes[3],
                bytes[4] & 0xf0,
            ])
        } else {
            NetworkGroup(vec![GROUP_IPV6, bytes[0], bytes[1], bytes[2], bytes[3]])
        }
    }

    /// Group bytes as fed to the placement hash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// IPv4 carried directly, IPv4-mapped, 6to4 (`2002::/16`) or Teredo
/// (`2001::/32`, obfuscated).
fn embedded_ipv4(ip: &IpAddr) -> Option<[u8; 4]> {
    if let Some(v4) = ip.ipv4_octets() {
        return Some(v4);
    }
    let b = ip.to_mapped();
    if b[0] == 0x20 && b[1] == 0x02 {
        return Some([b[2], b[3], b[4], b[5]]);
    }
    if b[..4] == [0x20, 0x01, 0x00, 0x00] {
        return Some([b[12] ^ 0xff, b[13] ^ 0xff, b[14] ^ 0xff, b[15] ^ 0xff]);
    }
    None
}

/// Loopback or "this host" addresses.
pub fn is_local(ip: &IpAddr) -> bool {
    if let Some([a, ..]) = ip.ipv4_octets() {
        return a == 127 || a == 0;
    }
    let mut loopback = [0u8; 16];
    loopback[15] = 1;
    ip.to_mapped() == loopback
}

fn is_routable_v4([a, b, c, d]: [u8; 4]) -> bool {
    let reserved = a == 0
        || a == 127
        || a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 169 && b == 254)
        || (a == 100 && (64..=127).contains(&b))
        || (a == 198 && (b == 18 || b == 19))
        || (a == 192 && b == 0 && c == 2)
        || (a == 198 && b == 51 && c == 100)
        || (a == 203 && b == 0 && c == 113)
        || a >= 224;
    !reserved && [a, b, c, d] != [255, 255, 255, 255]
}

fn is_routable_v6(b: &[u8; 16]) -> bool {
    let unspecified = b.iter().all(|&x| x == 0);
    let loopback = b[..15].iter().all(|&x| x == 0) && b[15] == 1;
    let unique_local = b[0] & 0xfe == 0xfc;
    let link_local = b[0] == 0xfe && b[1] & 0xc0 == 0x80;
    let documentation = b[..4] == [0x20, 0x01, 0x0d, 0xb8];
    let orchid = b[..3] == [0x20, 0x01, 0x00] && b[3] & 0xf0 == 0x10;
    let multicast = b[0] == 0xff;
    !(unspecified || loopback || unique_local || link_local || documentation || orchid || multicast)
}

/// True if the IP is publicly reachable.
pub fn is_routable(ip: &IpAddr) -> bool {
    match ip.ipv4_octets() {
        Some(v4) => is_routable_v4(v4),
        None => is_routable_v6(&ip.to_mapped()),
    }
}

/// True if the endpoint is publicly reachable and has a real port.
pub fn is_routable_endpoint(addr: &SocketAddr) -> bool {
    addr.port != 0 && is_routable(&addr.ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v6(prefix: &[u8]) -> IpAddr {
        let mut bytes = [0u8; 16];
        bytes[..prefix.len()].copy_from_slice(prefix);
        bytes[15] = 7;
        IpAddr::v6(bytes)
    }

    #[test]
    fn test_sha256d_known_vector() {
        // sha256d("") from Bitcoin test vectors
        assert_eq!(
            hex::encode(sha256d(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_keyed_hasher_depends_on_key() {
        let a = KeyedHasher::new(&[1u8; 32]).write(b"x").finish();
        let b = KeyedHasher::new(&[2u8; 32]).write(b"x").finish();
        assert_ne!(a, b);
        assert_eq!(a, KeyedHasher::new(&[1u8; 32]).write(b"x").finish());
    }

    #[test]
    fn test_ipv4_groups_by_slash16() {
        let a = NetworkGroup::from_ip(&IpAddr::v4(8, 8, 4, 4));
        let b = NetworkGroup::from_ip(&IpAddr::v4(8, 8, 200, 1));
        let c = NetworkGroup::from_ip(&IpAddr::v4(8, 9, 4, 4));
        assert_eq!(a.as_bytes(), &[1, 8, 8]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_tunnelled_ipv4_groups_as_ipv4() {
        let six_to_four = v6(&[0x20, 0x02, 8, 8, 4, 4]);
        assert_eq!(NetworkGroup::from_ip(&six_to_four).as_bytes(), &[1, 8, 8]);

        let mut teredo = [0u8; 16];
        teredo[..4].copy_from_slice(&[0x20, 0x01, 0, 0]);
        teredo[12..].copy_from_slice(&[!8, !8, !4, !4]);
        assert_eq!(NetworkGroup::from_ip(&IpAddr::v6(teredo)).as_bytes(), &[1, 8, 8]);
    }

    #[test]
    fn test_ipv6_groups() {
        let he = v6(&[0x20, 0x01, 0x04, 0x70, 0xab]);
        assert_eq!(NetworkGroup::from_ip(&he).as_bytes(), &[2, 0x20, 0x01, 0x04, 0x70, 0xa0]);

        let other = v6(&[0x2a, 0x01, 0x04, 0xf8, 0xab]);
        assert_eq!(NetworkGroup::from_ip(&other).as_bytes(), &[2, 0x2a, 0x01, 0x04, 0xf8]);
    }

    #[test]
    fn test_local_and_unroutable_groups() {
        assert_eq!(NetworkGroup::from_ip(&IpAddr::v4(127, 0, 0, 1)).as_bytes(), &[255]);
        assert_eq!(NetworkGroup::from_ip(&IpAddr::v4(10, 1, 2, 3)).as_bytes(), &[0]);
        assert_eq!(NetworkGroup::from_ip(&v6(&[0xfc])).as_bytes(), &[0]);
    }

    #[test]
    fn test_routability() {
        assert!(is_routable(&IpAddr::v4(1, 2, 3, 4)));
        for ip in [
            IpAddr::v4(0, 1, 2, 3),
            IpAddr::v4(192, 168, 1, 1),
            IpAddr::v4(172, 20, 0, 1),
            IpAddr::v4(169, 254, 0, 1),
            IpAddr::v4(100, 100, 0, 1),
            IpAddr::v4(198, 19, 0, 1),
            IpAddr::v4(203, 0, 113, 9),
            IpAddr::v4(224, 0, 0, 1),
            IpAddr::v4(255, 255, 255, 255),
        ] {
            assert!(!is_routable(&ip), "{ip} should not be routable");
        }

        assert!(is_routable(&v6(&[0x2a, 0x01])));
        assert!(!is_routable(&v6(&[0xfe, 0x80])));
        assert!(!is_routable(&v6(&[0x20, 0x01, 0x0d, 0xb8])));
        assert!(!is_routable(&v6(&[0x20, 0x01, 0x00, 0x10])));
        assert!(!is_routable(&v6(&[0xff, 0x02])));

        let addr = SocketAddr::new(IpAddr::v4(1, 2, 3, 4), 0);
        assert!(!is_routable_endpoint(&addr));
        assert!(is_routable_endpoint(&SocketAddr::new(addr.ip, 8333)));
    }
}
