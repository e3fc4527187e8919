//! Shared constants and small helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// State label given to records that have not been through approval.
pub const STATE_DRAFT: &str = "draft";

/// State label set by the approval workflow.
pub const STATE_APPROVED: &str = "approved";

/// Audit action recorded when a record is approved.
pub const ACTION_APPROVED: &str = "APPROVED";

/// Milliseconds since the Unix epoch.
///
/// A clock set before 1970 reads as zero.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
