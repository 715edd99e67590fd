//! Wall-clock time primitive.
//!
//! Millisecond timestamps drive id generation and record ordering. Ids built
//! from them are zero-padded so lexicographic order equals chronological
//! order; no separate index is needed.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallClock(pub u64);

impl WallClock {
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    pub fn as_ms(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_orders_by_value() {
        assert!(WallClock(1) < WallClock(2));
        assert_eq!(WallClock(5).as_ms(), 5);
    }
}
