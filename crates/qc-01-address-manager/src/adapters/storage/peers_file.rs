//! File-backed `PeersStore`.
//!
//! ```text
//! network magic (4) | payload | sha256d(magic | payload) (32)
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::sha256d;
use crate::error::StoreError;
use crate::ports::PeersStore;

/// Length of the network magic prefix.
const MAGIC_LEN: usize = 4;
/// Length of the trailing checksum.
const CHECKSUM_LEN: usize = 32;

/// Peers file on local disk.
///
/// Writes go to `<path>.tmp`, are synced, then renamed over the old file.
#[derive(Debug, Clone)]
pub struct PeersFile {
    path: PathBuf,
    magic: [u8; 4],
}

impl PeersFile {
    /// Store at `path` for the network identified by `magic`.
    pub fn new<P: AsRef<Path>>(path: P, magic: [u8; 4]) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            magic,
        }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl PeersStore for PeersFile {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("[qc-01] No peers file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < MAGIC_LEN + CHECKSUM_LEN {
            return Err(StoreError::TooShort { len: bytes.len() });
        }
        let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if body[..MAGIC_LEN] != self.magic {
            return Err(StoreError::WrongNetwork {
                found: hex::encode(&body[..MAGIC_LEN]),
                expected: hex::encode(self.magic),
            });
        }
        if sha256d(body) != checksum {
            return Err(StoreError::ChecksumMismatch);
        }

        debug!(
            "[qc-01] Read {} bytes from {}",
            bytes.len(),
            self.path.display()
        );
        Ok(Some(body[MAGIC_LEN..].to_vec()))
    }

    fn write(&self, payload: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut bytes = Vec::with_capacity(MAGIC_LEN + payload.len() + CHECKSUM_LEN);
        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(payload);
        let checksum = sha256d(&bytes);
        bytes.extend_from_slice(&checksum);

        // Write atomically via temp file
        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        debug!(
            "[qc-01] Wrote {} bytes to {}",
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: [u8; 4] = [0xf9, 0xbe, 0xb4, 0xd9];

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PeersFile::new(dir.path().join("peers.dat"), MAGIC);
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = PeersFile::new(dir.path().join("nested/peers.dat"), MAGIC);
        store.write(b"table bytes").unwrap();
        assert_eq!(store.read().unwrap().unwrap(), b"table bytes");
        assert!(!store.temp_path().exists());

        store.write(b"replaced").unwrap();
        assert_eq!(store.read().unwrap().unwrap(), b"replaced");
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peers.dat");
        PeersFile::new(&path, MAGIC).write(b"payload").unwrap();

        let other = PeersFile::new(&path, [0x0b, 0x11, 0x09, 0x07]);
        assert!(matches!(other.read(), Err(StoreError::WrongNetwork { .. })));
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peers.dat");
        let store = PeersFile::new(&path, MAGIC);
        store.write(b"payload").unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[MAGIC_LEN + 2] ^= 0xff;
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(store.read(), Err(StoreError::ChecksumMismatch)));

        fs::write(&path, &bytes[..10]).unwrap();
        assert!(matches!(store.read(), Err(StoreError::TooShort { len: 10 })));
    }
}
