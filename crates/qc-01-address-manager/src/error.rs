//! Error types for the Address Manager subsystem

use std::io;

use thiserror::Error;

/// Errors raised while decoding a persisted address table
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid key size: {0} (expected 32)")]
    InvalidKeySize(u8),

    #[error("Truncated payload: {0}")]
    Truncated(#[from] io::Error),

    #[error("Negative {what} count: {value}")]
    NegativeCount { what: &'static str, value: i32 },

    #[error("{what} count out of range: {value} > {max}")]
    CountOutOfRange {
        what: &'static str,
        value: usize,
        max: usize,
    },

    #[error("Duplicate legacy entry id: {0}")]
    DuplicateLegacyId(i32),

    #[error("Unknown legacy entry id: {0}")]
    UnknownLegacyId(i32),

    #[error("Bucket entry index out of range: {index} (new entries: {count})")]
    EntryIndexOutOfRange { index: i32, count: usize },

    #[error("Tried entry without a recorded success")]
    TriedWithoutSuccess,

    #[error("Placement key is all zero")]
    ZeroKey,

    #[error("{0} unread bytes after the bucket section")]
    TrailingBytes(usize),
}

/// Errors from the durable peers store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Peers file too short: {len} bytes")]
    TooShort { len: usize },

    #[error("Peers file belongs to another network: magic {found}, expected {expected}")]
    WrongNetwork { found: String, expected: String },

    #[error("Peers file checksum mismatch")]
    ChecksumMismatch,
}

/// Top-level error of the Address Manager
#[derive(Debug, Error)]
pub enum AddressManagerError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// An internal invariant of the address table does not hold.
///
/// Never surfaced through the public API: it is logged, and in debug builds
/// it aborts via `debug_assert!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsistencyViolation {
    #[error("entry count does not match ordering array or counters")]
    CountMismatch,

    #[error("ordering array position mismatch")]
    RandomPosMismatch,

    #[error("tried entry without last success")]
    TriedWithoutSuccess,

    #[error("tried entry still referenced by new slots")]
    TriedWithRefs,

    #[error("new entry without references")]
    NewWithoutRefs,

    #[error("new entry above the reference cap")]
    RefsOverCap,

    #[error("endpoint index disagrees with arena")]
    IndexMismatch,

    #[error("tried counter drift")]
    TriedCountDrift,

    #[error("new counter drift")]
    NewCountDrift,

    #[error("slot references a missing entry")]
    DanglingSlot,

    #[error("tried slot holds a non-tried entry")]
    TriedSlotNotTried,

    #[error("new slot holds a tried entry")]
    NewSlotTried,

    #[error("tried entry in the wrong bucket")]
    TriedBucketMismatch,

    #[error("entry in the wrong slot")]
    PositionMismatch,

    #[error("reference count disagrees with slots")]
    RefCountMismatch,

    #[error("all-zero table key")]
    ZeroKey,
}

impl ConsistencyViolation {
    /// Stable negative diagnostic code.
    pub fn code(&self) -> i32 {
        match self {
            Self::CountMismatch => -1,
            Self::RandomPosMismatch => -2,
            Self::TriedWithoutSuccess => -3,
            Self::TriedWithRefs => -4,
            Self::NewWithoutRefs => -5,
            Self::RefsOverCap => -6,
            Self::IndexMismatch => -7,
            Self::TriedCountDrift => -8,
            Self::NewCountDrift => -9,
            Self::DanglingSlot => -10,
            Self::TriedSlotNotTried => -11,
            Self::NewSlotTried => -12,
            Self::TriedBucketMismatch => -13,
            Self::PositionMismatch => -14,
            Self::RefCountMismatch => -15,
            Self::ZeroKey => -16,
        }
    }
}

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Result alias for Address Manager operations
pub type Result<T> = std::result::Result<T, AddressManagerError>;
