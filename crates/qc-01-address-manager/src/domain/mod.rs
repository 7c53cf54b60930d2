//! Domain Layer - Pure business logic with no I/O
//!
//! This module contains the core address-table logic:
//! - Endpoint, timestamp and service-flag types
//! - Keyed bucket placement and network-group classification
//! - New/Tried tables with eviction and promotion
//! - Weighted selection and `getaddr` sampling
//! - The structural invariant checker

pub mod address_manager;
/// Core domain types (entities, values)
pub mod types;

pub use address_manager::*;
pub use types::*;
