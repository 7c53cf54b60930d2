//! # Integration Flows
//!
//! Exercise the address manager only through its exported API: a simulated
//! node gossips, connects, restarts from disk and serves address requests.

pub mod address_manager_flows;
