use std::fmt;

/// `Idle → Running → (Completed | Cancelled)`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Finite duration elapsed.
    Completed,
    /// Cancellation observed.
    Cancelled,
}

impl SchedulerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SchedulerState::Completed | SchedulerState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Completed => "completed",
            SchedulerState::Cancelled => "cancelled",
        }
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_become(&self, next: SchedulerState) -> bool {
        use SchedulerState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Completed) | (Running, Cancelled)
        )
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
