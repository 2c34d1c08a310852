use std::fmt;

/// Top-level call lifecycle. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Joining,
    Active,
    Ending,
    Ended,
}

impl CallState {
    pub fn is_active(self) -> bool {
        self == CallState::Active
    }

    pub fn is_finished(self) -> bool {
        matches!(self, CallState::Ending | CallState::Ended)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "idle",
            CallState::Joining => "joining",
            CallState::Active => "active",
            CallState::Ending => "ending",
            CallState::Ended => "ended",
        };
        f.write_str(name)
    }
}
