//! Session lifecycle

use std::fmt;

/// Where a managed query is in its lifecycle.
///
/// Reads move `Unsubmitted -> Incomplete* -> Complete`. Writes move to
/// `Complete` after each submission. `finalize` ends either path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Selection phase; nothing sent to the engine yet
    Unsubmitted,
    /// Last submission left results behind
    Incomplete,
    /// Last submission returned everything that was left
    Complete,
    /// No further submissions allowed
    Finalized,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unsubmitted => "unsubmitted",
            SessionState::Incomplete => "incomplete",
            SessionState::Complete => "complete",
            SessionState::Finalized => "finalized",
        }
    }

    /// True once anything was submitted
    pub fn is_submitted(&self) -> bool {
        !matches!(self, SessionState::Unsubmitted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
