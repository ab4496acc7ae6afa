//! Action phase lifecycle.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The stage of an action's gesture lifecycle.
///
/// `Disabled` and `Waiting` are the only resting phases. `Started`,
/// `Performed`, and `Cancelled` are transient: the state machine settles back
/// to `Waiting` before a dispatch call returns, so mid-gesture state is
/// observable only inside a listener callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Disabled,
    Waiting,
    Started,
    Performed,
    Cancelled,
}

impl Phase {
    /// Legal phase transitions while enabled. Enabling and disabling move
    /// between `Disabled` and `Waiting` outside this table.
    pub fn can_transition_to(self, next: Phase) -> bool {
        match next {
            Phase::Started => self == Phase::Waiting,
            Phase::Performed => self == Phase::Waiting || self == Phase::Started,
            Phase::Cancelled => self == Phase::Started,
            Phase::Waiting | Phase::Disabled => false,
        }
    }
}
