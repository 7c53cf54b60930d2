//! # Storage Adapters
//!
//! Durable homes for the serialized address table.

mod peers_file;

pub use peers_file::PeersFile;
