//! Per-rule watch state.
//!
//! ```text
//! Idle ──change──► Debouncing ──quiet──► Running ──ok──► Idle
//!   ▲                                       │
//!   └────────reported──── Failed ◄──fatal───┘
//! ```
//!
//! A change while `Running` leaves the state alone: the trigger waits in the
//! worker's single-slot queue.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchState {
    #[default]
    Idle,
    Debouncing,
    Running,
    Failed,
}

impl WatchState {
    /// A change matching the rule was seen.
    pub fn on_change(&mut self) {
        if matches!(self, Self::Idle | Self::Failed) {
            *self = Self::Debouncing;
        }
    }

    /// The worker picked up a trigger.
    pub fn on_start(&mut self) {
        *self = Self::Running;
    }

    /// The task finished.
    pub fn on_finish(&mut self, ok: bool) {
        if *self == Self::Running {
            *self = if ok { Self::Idle } else { Self::Failed };
        }
    }

    /// The failure was shown to the operator.
    pub fn on_reported(&mut self) {
        if *self == Self::Failed {
            *self = Self::Idle;
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Debouncing => "debouncing",
            Self::Running => "running",
            Self::Failed => "failed",
        }
    }
}
