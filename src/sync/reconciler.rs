/// Clock-drift reconciliation for realtime polling
///
/// Pure with respect to time: callers pass in the wall-clock second, so the
/// logic can be driven by synthetic clocks.
use crate::types::Window;

/// Outcome of reconciling the expected cadence with the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Fetch this window next
    Fetch(Window),
    /// Less than one full second has elapsed; suspend and retry later
    Drift { expected: i64, now: i64 },
}

/// Compute the next fetch window from the last consumed second
pub fn reconcile(expected: i64, now: i64) -> Reconciled {
    // seconds are truncated, so this also catches a sub-second early tick
    if now - 1 < expected {
        Reconciled::Drift { expected, now }
    } else {
        Reconciled::Fetch(Window::new(expected, now))
    }
}

/// Cap a backlog window to the most recent `max_len` seconds
///
/// After a long outage the buffer can only show the last `max_len` seconds
/// anyway, so older seconds are not requested.
pub fn clamp_backlog(window: Window, max_len: u32) -> Window {
    if window.len() > i64::from(max_len) {
        Window::ending_at(window.end, max_len)
    } else {
        window
    }
}

/// Wall-clock second the session has consumed up to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    expected: i64,
}

impl SyncState {
    pub fn new(now: i64) -> Self {
        SyncState { expected: now }
    }

    pub fn expected(&self) -> i64 {
        self.expected
    }

    /// Window for a tick at `now`; does not advance the state
    pub fn next_window(&self, now: i64) -> Reconciled {
        reconcile(self.expected, now)
    }

    /// Mark a window as consumed; never moves backwards
    pub fn commit(&mut self, window: Window) {
        self.expected = self.expected.max(window.end);
    }
}
