use std::fmt;

/// Window lifecycle. Ordered; a window only ever moves forward.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WindowState {
    Uninitialized,
    /// Native window and graphics context exist.
    Created,
    /// The context has been made current at least once.
    Running,
    /// A close was requested; the window still exists.
    ClosePending,
    /// Native objects and GPU resources are gone.
    Destroyed,
}

impl WindowState {
    /// The state that immediately follows this one.
    pub fn next(self) -> Option<WindowState> {
        match self {
            WindowState::Uninitialized => Some(WindowState::Created),
            WindowState::Created => Some(WindowState::Running),
            WindowState::Running => Some(WindowState::ClosePending),
            WindowState::ClosePending => Some(WindowState::Destroyed),
            WindowState::Destroyed => None,
        }
    }

    /// Moves to `to` only if it is the immediate successor.
    pub(crate) fn advance(&mut self, to: WindowState) -> bool {
        if self.next() == Some(to) {
            log::debug!("window state {self} -> {to}");
            *self = to;
            true
        } else {
            false
        }
    }

    /// Walks forward one state at a time until `to` is reached. Returns how
    /// many transitions were taken; zero when `to` is not ahead.
    pub(crate) fn step_to(&mut self, to: WindowState) -> usize {
        let mut steps = 0;
        while *self < to {
            let Some(next) = self.next() else { break };
            self.advance(next);
            steps += 1;
        }
        steps
    }

    pub fn is_destroyed(self) -> bool {
        self == WindowState::Destroyed
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowState::Uninitialized => "uninitialized",
            WindowState::Created => "created",
            WindowState::Running => "running",
            WindowState::ClosePending => "close-pending",
            WindowState::Destroyed => "destroyed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_moves_backwards() {
        let mut state = WindowState::Uninitialized;
        assert!(state.advance(WindowState::Created));
        assert!(state.advance(WindowState::Running));
        assert!(!state.advance(WindowState::Created));
        assert!(state.advance(WindowState::ClosePending));
        assert!(!state.advance(WindowState::Running));
        assert_eq!(state, WindowState::ClosePending);
        assert!(state.advance(WindowState::Destroyed));
        assert!(!state.advance(WindowState::Destroyed));
        assert!(state.is_destroyed());
    }

    #[test]
    fn never_skips_a_state() {
        let mut state = WindowState::Created;
        assert!(!state.advance(WindowState::ClosePending));
        assert!(!state.advance(WindowState::Destroyed));
        assert_eq!(state, WindowState::Created);
    }

    #[test]
    fn step_to_visits_every_state_in_between() {
        let mut state = WindowState::Created;
        assert_eq!(state.step_to(WindowState::Destroyed), 3);
        assert!(state.is_destroyed());
        assert_eq!(state.step_to(WindowState::Running), 0);

        let mut state = WindowState::ClosePending;
        assert_eq!(state.step_to(WindowState::Running), 0);
        assert_eq!(state, WindowState::ClosePending);
    }
}
