// Deadline clock anchored to server-issued timestamps.

use std::time::Duration;

/// A server-anchored origin plus the time allowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    /// Epoch millis issued by the service.
    pub origin_ms: u64,
    pub duration: Duration,
}

impl Deadline {
    pub fn new(origin_ms: u64, duration: Duration) -> Self {
        Self {
            origin_ms,
            duration,
        }
    }

    /// `max(0, duration - (now - origin))`. A `now` before the origin counts
    /// as no time elapsed.
    pub fn remaining_at(&self, now_ms: u64) -> Duration {
        let elapsed = Duration::from_millis(now_ms.saturating_sub(self.origin_ms));
        self.duration.saturating_sub(elapsed)
    }
}

/// One observation of a running clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining: Duration,
    /// True on exactly one tick per anchoring: the first one that sees zero.
    pub expired: bool,
}

/// Turns a [`Deadline`] into a non-increasing countdown with a one-shot expiry.
#[derive(Debug, Clone, Default)]
pub struct DeadlineClock {
    deadline: Option<Deadline>,
    // Lowest remaining value reported since the last anchor.
    floor: Option<Duration>,
    fired: bool,
}

impl DeadlineClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting toward `deadline`. Anchoring to the same deadline again
    /// is a no-op, so a duplicated push cannot re-arm an expiry that already fired.
    /// Returns true when the clock was re-armed.
    pub fn anchor(&mut self, deadline: Deadline) -> bool {
        if self.deadline == Some(deadline) {
            return false;
        }
        self.deadline = Some(deadline);
        self.floor = None;
        self.fired = false;
        true
    }

    /// Stops the clock. Subsequent ticks observe nothing.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.floor = None;
        self.fired = false;
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Remaining time without advancing the clock.
    pub fn remaining(&self, now_ms: u64) -> Option<Duration> {
        let computed = self.deadline?.remaining_at(now_ms);
        Some(match self.floor {
            Some(floor) => computed.min(floor),
            None => computed,
        })
    }

    /// Advances the clock. Returns `None` while cancelled or never anchored.
    pub fn tick(&mut self, now_ms: u64) -> Option<Tick> {
        let remaining = self.remaining(now_ms)?;
        self.floor = Some(remaining);

        let expired = remaining.is_zero() && !self.fired;
        if expired {
            self.fired = true;
        }
        Some(Tick { remaining, expired })
    }
}
