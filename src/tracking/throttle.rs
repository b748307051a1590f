/// Per-session minimum gap between emitted warnings. A candidate inside the
/// gap is dropped, not deferred.
#[derive(Debug, Clone)]
pub struct WarningThrottler {
    min_interval_ms: u64,
    last_warning_ms: Option<u64>,
}

impl WarningThrottler {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_warning_ms: None,
        }
    }

    /// Whether a warning at `now_ms` may be emitted. Records the emission
    /// when it may.
    pub fn admit(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_warning_ms {
            if now_ms.saturating_sub(last) < self.min_interval_ms {
                return false;
            }
        }
        self.last_warning_ms = Some(now_ms);
        true
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_warning_inside_interval_is_dropped() {
        let mut throttler = WarningThrottler::new(3_000);
        assert!(throttler.admit(1_000));
        assert!(!throttler.admit(3_999));
        // The dropped candidate does not move the window.
        assert!(throttler.admit(4_000));
    }

    #[test]
    fn dropped_candidates_are_not_replayed() {
        let mut throttler = WarningThrottler::new(3_000);
        assert!(throttler.admit(0));
        for t in (100..3_000).step_by(100) {
            assert!(!throttler.admit(t));
        }
        assert!(throttler.admit(3_000));
        assert!(!throttler.admit(3_001));
    }

    #[test]
    fn first_warning_always_passes() {
        let mut throttler = WarningThrottler::new(3_000);
        assert!(throttler.admit(0));
        assert!(WarningThrottler::new(3_000).admit(10));
    }
}
