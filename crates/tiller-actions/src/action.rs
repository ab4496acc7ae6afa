//! Actions and action sets.
//!
//! An action is a named signal that fires on *changes* to the controls its
//! bindings resolve to. Every action is owned by exactly one [`ActionSet`];
//! standalone actions get a private one-action set from the host, so there is
//! never a nullable owner.
//!
//! The set holds the backing storage: one flat binding array, one flat
//! control array, one resolved-binding array. Each action's bindings and
//! controls are contiguous sub-ranges of those arrays; the ranges partition
//! the arrays with no gaps and no overlap across actions (a control can still
//! appear twice in the array when two actions bind it, since the array is
//! append-only per resolution pass).

use std::ops::Range;

use tiller_control::ControlId;

use crate::binding::{Binding, BindingOverride};
use crate::composite::CompositeGroup;
use crate::error::BindingError;
use crate::interaction::InteractionState;
use crate::listener::ListenerSet;
use crate::phase::Phase;

/// Handle to a set owned by a [`TriggerHost`](crate::TriggerHost).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub(crate) usize);

/// Handle to an action within a host-owned set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId {
    pub(crate) set: SetId,
    pub(crate) index: usize,
}

impl ActionId {
    pub fn set(&self) -> SetId {
        self.set
    }
}

/// A phase-transition notification passed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub action: ActionId,
    /// Name of the action, for logging and diagnostics.
    pub name: String,
    pub phase: Phase,
    /// The control whose state change triggered the transition.
    pub control: ControlId,
    /// Timestamp of the raw state write, in seconds.
    pub time: f64,
}

/// One binding after resolution: which controls it matched and which
/// composite group it feeds, if any.
#[derive(Debug, Default)]
pub struct ResolvedBinding {
    /// Index of the source binding in the set's binding array.
    pub binding: usize,
    /// Sub-range of the set's control array.
    pub controls: Range<usize>,
    /// Index into the set's composite array, for part bindings.
    pub composite: Option<usize>,
    pub is_part_of_composite: bool,
    pub(crate) interaction: Option<InteractionState>,
}

/// A named input signal with volatile runtime phase.
#[derive(Debug)]
pub struct Action {
    name: String,
    pub(crate) phase: Phase,
    pub(crate) enabled: bool,
    /// When set, enabling the action runs the default trigger check against
    /// the controls' current state instead of waiting for the next change.
    pub(crate) fire_on_enable: bool,
    pub(crate) bindings: Range<usize>,
    pub(crate) controls: Range<usize>,
    pub(crate) resolved: Range<usize>,
    pub(crate) on_started: ListenerSet<ActionEvent>,
    pub(crate) on_performed: ListenerSet<ActionEvent>,
    pub(crate) on_cancelled: ListenerSet<ActionEvent>,
}

impl Action {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            phase: Phase::Disabled,
            enabled: false,
            fire_on_enable: false,
            bindings: 0..0,
            controls: 0..0,
            resolved: 0..0,
            on_started: ListenerSet::new(),
            on_performed: ListenerSet::new(),
            on_cancelled: ListenerSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// A group of actions enabled and disabled in bulk, plus the backing storage
/// their bindings and controls live in.
#[derive(Debug)]
pub struct ActionSet {
    name: String,
    pub(crate) actions: Vec<Action>,
    pub(crate) bindings: Vec<Binding>,
    // Filled by resolution; cleared and rebuilt wholesale on every pass.
    pub(crate) controls: Vec<ControlId>,
    pub(crate) resolved: Vec<ResolvedBinding>,
    pub(crate) composites: Vec<CompositeGroup>,
    pub(crate) is_resolved: bool,
}

impl ActionSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            actions: Vec::new(),
            bindings: Vec::new(),
            controls: Vec::new(),
            resolved: Vec::new(),
            composites: Vec::new(),
            is_resolved: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an action. Names must be unique within the set.
    pub fn add_action(&mut self, name: &str) -> usize {
        assert!(
            self.action_by_name(name).is_none(),
            "action '{name}' already exists in set '{}'",
            self.name
        );
        let index = self.actions.len();
        let mut action = Action::new(name);
        // New actions start with an empty binding run at the array's end.
        action.bindings = self.bindings.len()..self.bindings.len();
        self.actions.push(action);
        index
    }

    pub fn action(&self, index: usize) -> &Action {
        &self.actions[index]
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn action_by_name(&self, name: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.name == name)
    }

    /// Opt an action into the initial-state check: if a bound control is
    /// already non-default when the action enables, it performs immediately.
    pub fn set_fire_on_enable(&mut self, action: usize, fire: bool) {
        self.actions[action].fire_on_enable = fire;
    }

    /// Append a binding to an action's run.
    ///
    /// The binding lands at the end of the action's contiguous run in the
    /// set-wide binding array; later actions' runs shift up by one.
    pub fn add_binding(&mut self, action: usize, binding: Binding) -> Result<(), BindingError> {
        let target = &self.actions[action];
        if target.enabled {
            return Err(BindingError::ActionEnabled(target.name.clone()));
        }

        let insert_at = if target.bindings.is_empty() {
            // First binding: claim a fresh run at the end of the array.
            self.bindings.len()
        } else {
            target.bindings.end
        };
        self.bindings.insert(insert_at, binding);

        for (i, other) in self.actions.iter_mut().enumerate() {
            if i == action {
                continue;
            }
            if other.bindings.start >= insert_at {
                other.bindings.start += 1;
                other.bindings.end += 1;
            }
        }

        let target = &mut self.actions[action];
        if target.bindings.is_empty() {
            target.bindings = insert_at..insert_at + 1;
        } else {
            target.bindings.end += 1;
        }

        // Any previous resolution no longer covers this binding.
        self.is_resolved = false;
        Ok(())
    }

    pub fn bindings_of(&self, action: usize) -> &[Binding] {
        &self.bindings[self.actions[action].bindings.clone()]
    }

    /// The controls an action's bindings resolved to. Empty until the set has
    /// been resolved.
    pub fn controls_of(&self, action: usize) -> &[ControlId] {
        &self.controls[self.actions[action].controls.clone()]
    }

    pub fn resolved_of(&self, action: usize) -> &[ResolvedBinding] {
        &self.resolved[self.actions[action].resolved.clone()]
    }

    pub fn composites(&self) -> &[CompositeGroup] {
        &self.composites
    }

    pub(crate) fn any_enabled(&self) -> bool {
        self.actions.iter().any(|a| a.enabled)
    }

    /// Locate the binding an override addresses: the action's first binding
    /// carrying the override's group, or its first binding when no group is
    /// given. `None` when nothing matches (the override is silently inert,
    /// matching devices-come-and-go tolerance).
    fn find_binding_for_override(&self, action: usize, group: Option<&str>) -> Option<usize> {
        let run = self.actions[action].bindings.clone();
        match group {
            Some(group) => run.clone().find(|i| self.bindings[*i].in_group(group)),
            None => {
                if run.is_empty() {
                    None
                } else {
                    Some(run.start)
                }
            }
        }
    }

    /// Apply a binding override. The set must be re-resolved afterwards for
    /// the override to take effect.
    pub fn apply_override(&mut self, ov: &BindingOverride) -> Result<(), BindingError> {
        let action = self
            .action_by_name(&ov.action)
            .ok_or_else(|| BindingError::UnknownAction(ov.action.clone()))?;
        if self.actions[action].enabled {
            return Err(BindingError::ActionEnabled(ov.action.clone()));
        }
        let Some(binding) = self.find_binding_for_override(action, ov.group.as_deref()) else {
            tracing::debug!(action = %ov.action, "override matched no binding");
            return Ok(());
        };
        self.bindings[binding].override_path = Some(ov.path.clone());
        self.is_resolved = false;
        Ok(())
    }

    /// Remove the override on the binding the given override addresses.
    pub fn remove_override(&mut self, ov: &BindingOverride) -> Result<(), BindingError> {
        let action = self
            .action_by_name(&ov.action)
            .ok_or_else(|| BindingError::UnknownAction(ov.action.clone()))?;
        if self.actions[action].enabled {
            return Err(BindingError::ActionEnabled(ov.action.clone()));
        }
        if let Some(binding) = self.find_binding_for_override(action, ov.group.as_deref()) {
            self.bindings[binding].override_path = None;
            self.is_resolved = false;
        }
        Ok(())
    }

    /// Restore every binding of an action to its default path.
    pub fn remove_all_overrides(&mut self, action_name: &str) -> Result<(), BindingError> {
        let action = self
            .action_by_name(action_name)
            .ok_or_else(|| BindingError::UnknownAction(action_name.to_string()))?;
        if self.actions[action].enabled {
            return Err(BindingError::ActionEnabled(action_name.to_string()));
        }
        for i in self.actions[action].bindings.clone() {
            self.bindings[i].override_path = None;
        }
        self.is_resolved = false;
        Ok(())
    }
}
