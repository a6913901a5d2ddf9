//! The timed state machine behind one active dig (spec.md §4.5). A session
//! only exists while `Active`; `Pending`/`Terminated` are represented by its
//! absence from or removal out of a `DigRecord` rather than as explicit
//! enum states, since nothing ever observes a session before `start()` or
//! after termination.

#[derive(Debug, Clone, Copy)]
pub struct DigSession {
    /// Wall-clock ms timestamp this run of the timer started at.
    pub started_at_ms: u64,
    /// Progress carried over from a previous cancel (S4); 0 for a fresh dig.
    pub base_accumulated_ms: f64,
    pub full_break_ms: f64,
    pub speed_multiplier: f64,
    /// Last stage emitted, for diff-only packet emission.
    pub last_stage: i8,
}

impl DigSession {
    pub fn new(started_at_ms: u64, base_accumulated_ms: f64, full_break_ms: f64, speed_multiplier: f64) -> Self {
        Self {
            started_at_ms,
            base_accumulated_ms,
            full_break_ms,
            speed_multiplier,
            last_stage: -1,
        }
    }

    /// Total accumulated progress at `now_ms`, including prior pauses.
    pub fn total_ms(&self, now_ms: u64) -> f64 {
        let elapsed = now_ms.saturating_sub(self.started_at_ms) as f64 * self.speed_multiplier;
        self.base_accumulated_ms + elapsed
    }

    pub fn is_complete(&self, now_ms: u64) -> bool {
        self.full_break_ms <= 0.0 || self.total_ms(now_ms) >= self.full_break_ms
    }

    /// `ceil(9 * progress)`, progress clamped to `[0, 1]`. Stage `0` only
    /// comes out at exact zero progress; any progress past that rounds up
    /// to stage `1` immediately. A record with no session at all uses `-1`
    /// as its own "no overlay" sentinel, which is a separate concern from
    /// this function — it is never asked to compute a stage for one.
    pub fn stage_for(total_ms: f64, full_break_ms: f64) -> i8 {
        if full_break_ms <= 0.0 {
            return 9;
        }
        let progress = (total_ms / full_break_ms).clamp(0.0, 1.0);
        (progress * 9.0).ceil() as i8
    }

    pub fn current_stage(&self, now_ms: u64) -> i8 {
        Self::stage_for(self.total_ms(now_ms), self.full_break_ms)
    }
}
