use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::Timestamp;
use crate::ports::TimeSource;

// ============================================================================
// SystemTimeSource - Production Time Source
// ============================================================================

/// Wall clock in whole seconds, optionally shifted by a network offset.
///
/// Address timestamps come from remote peers, so a node whose clock is
/// skewed relative to the network would misjudge which addresses are fresh.
/// The host can feed the median peer offset in through `with_offset`.
///
/// # Example
///
/// ```rust
/// use qc_01_address_manager::adapters::network::SystemTimeSource;
/// use qc_01_address_manager::ports::TimeSource;
///
/// let local = SystemTimeSource::new().now();
/// let adjusted = SystemTimeSource::with_offset(-30).now();
/// assert!(adjusted.as_secs() <= local.as_secs());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource {
    offset_secs: i64,
}

impl SystemTimeSource {
    /// Unadjusted system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// System clock shifted by `offset_secs` (may be negative).
    #[must_use]
    pub fn with_offset(offset_secs: i64) -> Self {
        Self { offset_secs }
    }

    /// Configured offset.
    pub fn offset(&self) -> i64 {
        self.offset_secs
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        // a clock before 1970 reads as 0
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let base = Timestamp::new(secs);
        if self.offset_secs >= 0 {
            base.add_secs(self.offset_secs.unsigned_abs())
        } else {
            base.sub_secs(self.offset_secs.unsigned_abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemTimeSource::new().now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn test_offset_shifts_clock() {
        let ahead = SystemTimeSource::with_offset(3600).now().as_secs();
        let local = SystemTimeSource::new().now().as_secs();
        assert!(ahead >= local + 3599);

        let huge_negative = SystemTimeSource::with_offset(i64::MIN);
        assert_eq!(huge_negative.now(), Timestamp::ZERO);
        assert_eq!(huge_negative.offset(), i64::MIN);
    }
}
