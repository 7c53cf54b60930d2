//! # Security Adapters
//!
//! Implementations of the `RandomSource` port.
//!
//! | Adapter | Use |
//! |---------|-----|
//! | `OsRandomSource` | Production (OS entropy) |
//! | `SeededRandomSource` | Reproducible simulations and benchmarks |
//! | `FixedRandomSource` | Deterministic unit tests |

mod random;

pub use random::{FixedRandomSource, OsRandomSource, SeededRandomSource};
