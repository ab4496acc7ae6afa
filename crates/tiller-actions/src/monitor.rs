//! Change-monitor bookkeeping: which actions care about which controls.
//!
//! The registry is the host's fan-out table. Enabling an action registers a
//! monitor for every control its bindings resolved to; disabling removes all
//! of the action's records without touching other actions' interest in the
//! same controls. A reverse index keeps removal proportional to the action's
//! own record count.

use std::collections::HashMap;

use indexmap::IndexMap;

use tiller_control::ControlId;

use crate::action::ActionId;

/// Control → interested actions, in registration order, plus the reverse map.
#[derive(Debug, Default)]
pub struct ChangeMonitorRegistry {
    by_control: IndexMap<ControlId, Vec<ActionId>>,
    by_action: HashMap<ActionId, Vec<ControlId>>,
}

impl ChangeMonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest. Adding the same (control, action) pair twice is a
    /// no-op, so re-enabling an already enabled action cannot double-fire it.
    pub fn add_monitor(&mut self, control: ControlId, action: ActionId) {
        let interested = self.by_control.entry(control).or_default();
        if interested.contains(&action) {
            return;
        }
        interested.push(action);
        self.by_action.entry(action).or_default().push(control);
    }

    /// Drop every monitor the action holds.
    pub fn remove_all_monitors(&mut self, action: ActionId) {
        let Some(controls) = self.by_action.remove(&action) else {
            return;
        };
        for control in controls {
            if let Some(interested) = self.by_control.get_mut(&control) {
                interested.retain(|a| *a != action);
                if interested.is_empty() {
                    self.by_control.swap_remove(&control);
                }
            }
        }
    }

    /// The actions interested in a control, in registration order.
    pub fn interested(&self, control: ControlId) -> &[ActionId] {
        self.by_control
            .get(&control)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drop all records for controls on a removed device. Returns every
    /// action that lost at least one record, so the caller can settle their
    /// runtime state.
    pub fn prune_device(&mut self, device: usize) -> Vec<ActionId> {
        let stale: Vec<ControlId> = self
            .by_control
            .keys()
            .filter(|id| id.device() == device)
            .copied()
            .collect();
        let mut affected = Vec::new();
        for control in stale {
            if let Some(interested) = self.by_control.swap_remove(&control) {
                for action in interested {
                    if let Some(controls) = self.by_action.get_mut(&action) {
                        controls.retain(|c| *c != control);
                    }
                    if !affected.contains(&action) {
                        affected.push(action);
                    }
                }
            }
        }
        affected
    }

    pub fn monitor_count(&self) -> usize {
        self.by_action.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_action.values().all(Vec::is_empty)
    }
}

/// Enabled actions in enable order. Drives bulk disable and host teardown.
#[derive(Debug, Default)]
pub struct EnabledActionRegistry {
    order: Vec<ActionId>,
}

impl EnabledActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, action: ActionId) {
        if !self.order.contains(&action) {
            self.order.push(action);
        }
    }

    pub fn remove(&mut self, action: ActionId) {
        self.order.retain(|a| *a != action);
    }

    pub fn contains(&self, action: ActionId) -> bool {
        self.order.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
