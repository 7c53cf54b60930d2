//! # Address Manager Service
//!
//! High-level service implementing the `AddressManagerApi` port.
//!
//! This service wraps the domain `AddressManager` and provides a
//! thread-safe API for the connection layer, hiding time management and
//! persistence behind it.

// Semantic submodules
mod api;
mod core;

// Re-export public API
pub use core::AddressManagerService;
