//! # Address Manager - New/Tried Bucket System
//!
//! Implements Bitcoin's `addrman` pattern for Eclipse Attack resistance.
//!
//! ## Design (Bitcoin-Inspired)
//!
//! - **New Table**: Addresses heard about but never successfully connected to
//! - **Tried Table**: Addresses we've successfully connected to
//!
//! Both tables are fixed grids of slots holding handles into one entry
//! arena. Placement is a keyed double-SHA256 of network groups, so it can be
//! recomputed at any time and audited by the consistency checker.
//!
//! ## Anti-Eclipse Properties
//!
//! 1. Source-group bucketing caps how far one gossiping network can spread
//! 2. Segregation prevents poisoning Tried with unverified addresses
//! 3. A secret per-node key makes bucket placement unpredictable
//!
//! Reference: Bitcoin Core's `addrman.h`

// Semantic submodules
mod bucket;
mod config;
mod consistency;
mod manager;
mod security;
mod selection;
mod table;
mod types;

// Re-export public API
pub use bucket::{bucket_position, new_bucket, tried_bucket, BucketGrid};
pub use config::{
    AddressManagerConfig, BUCKET_SIZE, MAX_REFS_PER_ADDRESS, NEW_BUCKET_COUNT,
    SOURCE_GROUPS_PER_BUCKET, TRIED_BUCKET_COUNT, TRIED_GROUPS_PER_GROUP,
};
pub use manager::AddressManager;
pub use security::{is_local, is_routable, is_routable_endpoint, sha256d, KeyedHasher, NetworkGroup};
pub use table::AddressTable;
pub use types::{AddressEntry, AddressManagerStats, EntryId};
