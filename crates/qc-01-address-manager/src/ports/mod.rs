//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! This module defines the port interfaces (traits) for the Address Manager.
//!
//! - **Driving Ports (Inbound):** APIs this subsystem exposes to consumers
//! - **Driven Ports (Outbound):** SPIs this subsystem requires from adapters

pub mod inbound;
pub mod outbound;

pub use inbound::AddressManagerApi;
pub use outbound::{ConfigProvider, PeersStore, RandomSource, TimeSource};
