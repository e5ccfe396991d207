//! Recomputation cadence for one dataset.

/// Cooldown tracker deciding whether a drift computation may run now.
///
/// Timestamps are milliseconds on the caller's clock.
#[derive(Debug, Clone)]
pub struct ScheduleGate {
    period_ms: u64,
    next_eligible_ms: Option<u64>,
}

impl ScheduleGate {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            next_eligible_ms: None,
        }
    }

    /// True if nothing ran yet or the cooldown has elapsed.
    pub fn may_run(&self, now_ms: u64) -> bool {
        match self.next_eligible_ms {
            Some(next) => next <= now_ms,
            None => true,
        }
    }

    /// Record a run at `now_ms`, overwriting any previous deadline.
    pub fn mark_ran(&mut self, now_ms: u64) {
        self.next_eligible_ms = Some(now_ms.saturating_add(self.period_ms));
    }

    pub fn next_eligible_ms(&self) -> Option<u64> {
        self.next_eligible_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_allowed() {
        let gate = ScheduleGate::new(15_000);
        assert!(gate.may_run(0));
        assert!(gate.next_eligible_ms().is_none());
    }

    #[test]
    fn test_cooldown_blocks_until_deadline() {
        let mut gate = ScheduleGate::new(15_000);
        gate.mark_ran(1_000);

        assert!(!gate.may_run(1_000));
        assert!(!gate.may_run(15_999));
        assert!(gate.may_run(16_000));
        assert!(gate.may_run(60_000));
    }

    #[test]
    fn test_mark_ran_overwrites() {
        let mut gate = ScheduleGate::new(10);
        gate.mark_ran(100);
        gate.mark_ran(50);
        assert_eq!(gate.next_eligible_ms(), Some(60));
        assert!(gate.may_run(60));
    }

    #[test]
    fn test_zero_period_never_blocks() {
        let mut gate = ScheduleGate::new(0);
        gate.mark_ran(500);
        assert!(gate.may_run(500));
    }

    #[test]
    fn test_saturating_deadline() {
        let mut gate = ScheduleGate::new(u64::MAX);
        gate.mark_ran(10);
        assert_eq!(gate.next_eligible_ms(), Some(u64::MAX));
    }
}
