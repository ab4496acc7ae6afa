//! The interaction seam: pluggable gesture recognizers on bindings.
//!
//! Default trigger logic performs an action on any change away from default.
//! An interaction replaces that logic for one binding: on every control
//! change the host hands it an [`InteractionContext`] and the interaction may
//! request exactly one phase transition, which the host validates against the
//! legal-transition table before applying. `Started` and `Cancelled` only
//! ever enter the system through this seam.

use crate::phase::Phase;

/// A gesture recognizer attached to a single resolved binding.
///
/// Implementations keep their own accumulation state (press timestamps, tap
/// counts) and must reset it in [`Interaction::reset`], which the host calls
/// when the owning action disables.
pub trait Interaction: std::fmt::Debug {
    fn process(&mut self, ctx: &mut InteractionContext);

    fn reset(&mut self) {}
}

/// What an interaction sees for one control change, and where it records the
/// transition it wants.
#[derive(Debug)]
pub struct InteractionContext {
    phase: Phase,
    control_is_at_default: bool,
    time: f64,
    requested: Option<Phase>,
}

impl InteractionContext {
    pub(crate) fn new(phase: Phase, control_is_at_default: bool, time: f64) -> Self {
        Self {
            phase,
            control_is_at_default,
            time,
            requested: None,
        }
    }

    /// Current phase of the owning action.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the control that changed now sits at its default value.
    pub fn control_is_at_default(&self) -> bool {
        self.control_is_at_default
    }

    /// Timestamp of the raw state write, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Request `Started`. Later requests in the same call overwrite earlier
    /// ones; at most one transition is applied per control change.
    pub fn started(&mut self) {
        self.requested = Some(Phase::Started);
    }

    /// Request `Performed`.
    pub fn performed(&mut self) {
        self.requested = Some(Phase::Performed);
    }

    /// Request `Cancelled`.
    pub fn cancelled(&mut self) {
        self.requested = Some(Phase::Cancelled);
    }

    pub(crate) fn take_requested(&mut self) -> Option<Phase> {
        self.requested.take()
    }
}

/// An instantiated interaction bound to one resolved binding.
#[derive(Debug)]
pub(crate) struct InteractionState {
    pub(crate) name: String,
    pub(crate) recognizer: Box<dyn Interaction>,
}

/// A deliberate press-and-hold gesture: starts on leaving default, performs
/// only if the control was held for at least `min_duration` seconds before
/// release, cancels on an early release.
///
/// The stock example of the seam; registered under the name `"slowTap"`.
#[derive(Debug, Default)]
pub struct SlowTap {
    pub min_duration: f64,
    press_time: Option<f64>,
}

impl SlowTap {
    pub fn new(min_duration: f64) -> Self {
        Self {
            min_duration,
            press_time: None,
        }
    }
}

impl Interaction for SlowTap {
    fn process(&mut self, ctx: &mut InteractionContext) {
        if !ctx.control_is_at_default() {
            if ctx.phase() == Phase::Waiting {
                self.press_time = Some(ctx.time());
                ctx.started();
            }
            return;
        }
        if let Some(pressed) = self.press_time.take() {
            if ctx.time() - pressed >= self.min_duration {
                ctx.performed();
            } else {
                ctx.cancelled();
            }
        }
    }

    fn reset(&mut self) {
        self.press_time = None;
    }
}
