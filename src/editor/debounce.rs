/// Trailing-edge debounce driven by explicit millisecond timestamps.
///
/// Each `queue` supersedes the previous deadline; `take_ready` fires once
/// the quiet period has elapsed since the most recent `queue`.
#[derive(Debug, Clone)]
pub struct ChangeDebouncer {
    delay_ms: u64,
    pending_since: Option<u64>,
}

impl ChangeDebouncer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending_since: None,
        }
    }

    pub const fn queue(&mut self, now_ms: u64) {
        self.pending_since = Some(now_ms);
    }

    pub fn take_ready(&mut self, now_ms: u64) -> bool {
        let Some(queued_at) = self.pending_since else {
            return false;
        };
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending_since = None;
            true
        } else {
            false
        }
    }

    pub const fn cancel(&mut self) {
        self.pending_since = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Milliseconds until the pending deadline, if any.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.pending_since
            .map(|queued_at| (queued_at + self.delay_ms).saturating_sub(now_ms))
    }
}
