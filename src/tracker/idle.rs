/// Decides when the user counts as away from the machine. Presence is the
/// terminal analog of the page-visibility half of the tracking condition.
pub struct IdleEvaluator {
    threshold_ms: u32,
}

impl IdleEvaluator {
    pub fn from_seconds(threshold_s: u32) -> Self {
        Self {
            threshold_ms: threshold_s.saturating_mul(1000),
        }
    }

    pub fn is_idle(&self, idle_time: u32) -> bool {
        self.threshold_ms < idle_time
    }
}
