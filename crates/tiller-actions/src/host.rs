//! The trigger host: single owner of every action set and the dispatch loop.
//!
//! Raw state writes go to the control tree first; the caller then reports the
//! changed control to [`TriggerHost::notify`], which fans the change out to
//! every enabled action monitoring that control, runs default trigger logic
//! or the binding's interaction, and dispatches at most one phase transition
//! per action per notification.
//!
//! Listeners never get `&mut` access to the host. An enable or disable
//! decided inside a callback goes through the cloneable [`HostCommands`]
//! queue and is applied after the current notification finishes dispatching.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tiller_control::{ControlId, ControlPath, ControlTree, ControlValue};

use crate::action::{Action, ActionEvent, ActionId, ActionSet, ResolvedBinding, SetId};
use crate::composite::{assemble, AssembledBinding, CompositeGroup};
use crate::error::BindingIssue;
use crate::interaction::{Interaction, InteractionContext, InteractionState};
use crate::listener::ListenerToken;
use crate::monitor::{ChangeMonitorRegistry, EnabledActionRegistry};
use crate::phase::Phase;

type InteractionFactory = Box<dyn Fn() -> Box<dyn Interaction>>;

/// Outcome of one resolution pass over a set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    /// Total controls bound across the set.
    pub controls: usize,
    /// Bindings whose path matched no control in the tree.
    pub unresolved: usize,
    /// Per-binding diagnostics, keyed by set-wide binding index.
    pub issues: Vec<(usize, BindingIssue)>,
}

#[derive(Debug, Clone, Copy)]
enum HostCommand {
    Enable(ActionId),
    Disable(ActionId),
}

/// Handle for queueing enable/disable from inside a listener callback.
///
/// Commands are deferred: they take effect once the notification that is
/// currently dispatching has finished.
#[derive(Debug, Clone)]
pub struct HostCommands {
    queue: Rc<RefCell<Vec<HostCommand>>>,
}

impl HostCommands {
    pub fn enable(&self, action: ActionId) {
        self.queue.borrow_mut().push(HostCommand::Enable(action));
    }

    pub fn disable(&self, action: ActionId) {
        self.queue.borrow_mut().push(HostCommand::Disable(action));
    }
}

/// Owner of all action sets, monitors, and the enabled-action registry.
pub struct TriggerHost {
    sets: Vec<ActionSet>,
    reports: Vec<Option<ResolveReport>>,
    monitors: ChangeMonitorRegistry,
    enabled: EnabledActionRegistry,
    interactions: HashMap<String, InteractionFactory>,
    commands: Rc<RefCell<Vec<HostCommand>>>,
    owner_thread: std::thread::ThreadId,
}

impl Default for TriggerHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerHost {
    pub fn new() -> Self {
        Self {
            sets: Vec::new(),
            reports: Vec::new(),
            monitors: ChangeMonitorRegistry::new(),
            enabled: EnabledActionRegistry::new(),
            interactions: HashMap::new(),
            commands: Rc::new(RefCell::new(Vec::new())),
            owner_thread: std::thread::current().id(),
        }
    }

    /// Take ownership of a set. Handles into the set stay valid for the
    /// host's lifetime.
    pub fn add_set(&mut self, set: ActionSet) -> SetId {
        let id = SetId(self.sets.len());
        self.sets.push(set);
        self.reports.push(None);
        id
    }

    /// Create a standalone action. It gets a private single-action set, so
    /// every action has exactly one owner.
    pub fn add_action(&mut self, name: &str) -> ActionId {
        let mut set = ActionSet::new(name);
        let index = set.add_action(name);
        let set = self.add_set(set);
        ActionId { set, index }
    }

    pub fn set(&self, id: SetId) -> &ActionSet {
        &self.sets[id.0]
    }

    /// Mutable set access for configuration. Per-operation enabled checks
    /// live on [`ActionSet`] itself.
    pub fn set_mut(&mut self, id: SetId) -> &mut ActionSet {
        &mut self.sets[id.0]
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.sets[id.set.0].actions[id.index]
    }

    pub fn action_id(&self, set: SetId, name: &str) -> Option<ActionId> {
        self.sets[set.0]
            .action_by_name(name)
            .map(|index| ActionId { set, index })
    }

    /// Handle for deferred enable/disable from listener callbacks.
    pub fn commands(&self) -> HostCommands {
        HostCommands {
            queue: Rc::clone(&self.commands),
        }
    }

    /// Register an interaction under a case-insensitive name. Bindings refer
    /// to interactions by name; each resolved binding gets a fresh instance
    /// from the factory.
    pub fn register_interaction(
        &mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn Interaction> + 'static,
    ) {
        self.interactions
            .insert(name.to_lowercase(), Box::new(factory));
    }

    pub fn last_report(&self, set: SetId) -> Option<&ResolveReport> {
        self.reports[set.0].as_ref()
    }

    /// Re-resolve every binding of a set against the current tree.
    ///
    /// Destroys and rebuilds the set's control array, resolved bindings, and
    /// composite groups wholesale. Structural problems are collected on the
    /// report; the offending binding is skipped and its siblings still
    /// resolve.
    ///
    /// # Panics
    ///
    /// Panics if any action in the set is enabled. Disable first.
    pub fn resolve(&mut self, set_id: SetId, tree: &ControlTree) -> ResolveReport {
        let set = &mut self.sets[set_id.0];
        assert!(
            !set.any_enabled(),
            "cannot resolve set '{}' while actions are enabled",
            set.name()
        );

        set.controls.clear();
        set.resolved.clear();
        set.composites.clear();
        let mut report = ResolveReport::default();

        for a in 0..set.actions.len() {
            let run = set.actions[a].bindings.clone();
            let controls_start = set.controls.len();
            let resolved_start = set.resolved.len();

            let (items, issues) = assemble(&set.bindings[run.clone()]);
            for (rel, issue) in issues {
                report.issues.push((run.start + rel, issue));
            }

            for item in items {
                match item {
                    AssembledBinding::Single(rel) => {
                        let abs = run.start + rel;
                        let Some(ids) =
                            resolve_one(set.bindings[abs].effective_path(), abs, tree, &mut report)
                        else {
                            continue;
                        };
                        let start = set.controls.len();
                        set.controls.extend(ids);
                        let interaction = instantiate(
                            &self.interactions,
                            set.bindings[abs].interaction.as_deref(),
                        );
                        set.resolved.push(ResolvedBinding {
                            binding: abs,
                            controls: start..set.controls.len(),
                            composite: None,
                            is_part_of_composite: false,
                            interaction,
                        });
                    }
                    AssembledBinding::Composite { binding, kind, parts } => {
                        let open = run.start + binding;
                        let composite = set.composites.len();
                        let mut group = CompositeGroup::new(kind);
                        let interaction = instantiate(
                            &self.interactions,
                            set.bindings[open].interaction.as_deref(),
                        );
                        set.resolved.push(ResolvedBinding {
                            binding: open,
                            controls: set.controls.len()..set.controls.len(),
                            composite: Some(composite),
                            is_part_of_composite: false,
                            interaction,
                        });

                        for (rel, part_name) in parts {
                            let abs = run.start + rel;
                            let Some(ids) =
                                resolve_one(set.bindings[abs].effective_path(), abs, tree, &mut report)
                            else {
                                continue;
                            };
                            if ids.len() > 1 {
                                report
                                    .issues
                                    .push((abs, BindingIssue::MultipleControlsForPart));
                            }
                            let slot = set.controls.len();
                            set.controls.push(ids[0]);
                            // Part slots are relative to the action's run in
                            // the control array.
                            group.bind_part(&part_name, slot - controls_start);
                            let interaction = instantiate(
                                &self.interactions,
                                set.bindings[abs].interaction.as_deref(),
                            );
                            set.resolved.push(ResolvedBinding {
                                binding: abs,
                                controls: slot..slot + 1,
                                composite: Some(composite),
                                is_part_of_composite: true,
                                interaction,
                            });
                        }
                        set.composites.push(group);
                    }
                }
            }

            set.actions[a].controls = controls_start..set.controls.len();
            set.actions[a].resolved = resolved_start..set.resolved.len();
        }

        report.controls = set.controls.len();
        set.is_resolved = true;
        tracing::info!(
            set = %set.name(),
            controls = report.controls,
            unresolved = report.unresolved,
            issues = report.issues.len(),
            "binding resolution complete"
        );
        self.reports[set_id.0] = Some(report.clone());
        report
    }

    /// Enable an action. No-op if already enabled.
    ///
    /// Registers a change monitor for every control the action's bindings
    /// resolved to. With `fire_on_enable` set, controls already off their
    /// default trigger immediately (timestamped zero).
    ///
    /// # Panics
    ///
    /// Panics if the owning set has not been resolved.
    pub fn enable_action(&mut self, id: ActionId, tree: &ControlTree) {
        self.assert_owner_thread();
        let set = &self.sets[id.set.0];
        assert!(
            set.is_resolved,
            "set '{}' must be resolved before enabling actions",
            set.name()
        );
        if set.actions[id.index].enabled {
            return;
        }

        let controls: Vec<ControlId> = set.controls_of(id.index).to_vec();
        let fire = set.actions[id.index].fire_on_enable;
        {
            let action = &mut self.sets[id.set.0].actions[id.index];
            action.enabled = true;
            action.phase = Phase::Waiting;
        }
        for control in &controls {
            self.monitors.add_monitor(*control, id);
        }
        self.enabled.add(id);
        tracing::debug!(
            action = %self.action(id).name(),
            monitors = controls.len(),
            "action enabled"
        );

        if fire {
            if let Some(control) = controls.iter().copied().find(|c| !tree.is_at_default(*c)) {
                self.process_action(id, control, 0.0, tree);
            }
            // The initial-state check dispatches listeners, which may have
            // queued commands; drain them here too, not only from notify.
            self.flush_commands(tree);
        }
    }

    /// Disable an action: tear down its monitors, reset its interactions,
    /// and drop it back to `Disabled`. No-op if not enabled.
    pub fn disable_action(&mut self, id: ActionId) {
        let set = &mut self.sets[id.set.0];
        if !set.actions[id.index].enabled {
            return;
        }
        set.actions[id.index].enabled = false;
        set.actions[id.index].phase = Phase::Disabled;
        for r in set.actions[id.index].resolved.clone() {
            if let Some(state) = set.resolved[r].interaction.as_mut() {
                state.recognizer.reset();
            }
        }
        self.monitors.remove_all_monitors(id);
        self.enabled.remove(id);
        tracing::debug!(action = %self.action(id).name(), "action disabled");
    }

    pub fn enable_set(&mut self, set: SetId, tree: &ControlTree) {
        for index in 0..self.sets[set.0].actions.len() {
            self.enable_action(ActionId { set, index }, tree);
        }
    }

    pub fn disable_set(&mut self, set: SetId) {
        for index in 0..self.sets[set.0].actions.len() {
            self.disable_action(ActionId { set, index });
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled.len()
    }

    /// Fan a control change out to every enabled action monitoring it.
    ///
    /// Call after writing the control's new value into the tree. A control
    /// that no longer exists (device unplugged) prunes the device's monitor
    /// records and drops affected actions back to `Waiting`.
    pub fn notify(&mut self, control: ControlId, time: f64, tree: &ControlTree) {
        self.assert_owner_thread();

        if tree.control(control).is_none() {
            // The whole device is gone; settle every action that held a
            // record on any of its controls, not just the notified one.
            let affected = self.monitors.prune_device(control.device());
            for id in affected {
                let set = &mut self.sets[id.set.0];
                if !set.actions[id.index].enabled {
                    continue;
                }
                set.actions[id.index].phase = Phase::Waiting;
                for r in set.actions[id.index].resolved.clone() {
                    if let Some(state) = set.resolved[r].interaction.as_mut() {
                        state.recognizer.reset();
                    }
                }
            }
            tracing::debug!(?control, "monitored control vanished, records pruned");
            self.flush_commands(tree);
            return;
        }

        // Snapshot so listener-driven changes cannot perturb this fan-out.
        let interested: Vec<ActionId> = self.monitors.interested(control).to_vec();
        for id in interested {
            self.process_action(id, control, time, tree);
        }
        self.flush_commands(tree);
    }

    /// Current value of an action: its first composite's combined value, or
    /// the raw value of its first bound control.
    pub fn action_value(&self, id: ActionId, tree: &ControlTree) -> Option<ControlValue> {
        let set = &self.sets[id.set.0];
        let action = &set.actions[id.index];
        for r in action.resolved.clone() {
            if let Some(composite) = set.resolved[r].composite {
                return Some(set.composites[composite].evaluate(set.controls_of(id.index), tree));
            }
        }
        set.controls[action.controls.clone()]
            .first()
            .and_then(|c| tree.value(*c))
    }

    pub fn on_started(
        &mut self,
        id: ActionId,
        listener: impl FnMut(&ActionEvent) + 'static,
    ) -> ListenerToken {
        self.sets[id.set.0].actions[id.index].on_started.add(listener)
    }

    pub fn on_performed(
        &mut self,
        id: ActionId,
        listener: impl FnMut(&ActionEvent) + 'static,
    ) -> ListenerToken {
        self.sets[id.set.0].actions[id.index].on_performed.add(listener)
    }

    pub fn on_cancelled(
        &mut self,
        id: ActionId,
        listener: impl FnMut(&ActionEvent) + 'static,
    ) -> ListenerToken {
        self.sets[id.set.0].actions[id.index].on_cancelled.add(listener)
    }

    pub fn remove_on_started(&mut self, id: ActionId, token: ListenerToken) -> bool {
        self.sets[id.set.0].actions[id.index].on_started.remove(token)
    }

    pub fn remove_on_performed(&mut self, id: ActionId, token: ListenerToken) -> bool {
        self.sets[id.set.0].actions[id.index].on_performed.remove(token)
    }

    pub fn remove_on_cancelled(&mut self, id: ActionId, token: ListenerToken) -> bool {
        self.sets[id.set.0].actions[id.index].on_cancelled.remove(token)
    }

    /// Run one action's trigger logic for one control change.
    fn process_action(&mut self, id: ActionId, control: ControlId, time: f64, tree: &ControlTree) {
        let set = &mut self.sets[id.set.0];
        if !set.actions[id.index].enabled {
            return;
        }

        // First resolved binding referencing this control; at most one
        // transition dispatches per action per notification.
        let resolved_run = set.actions[id.index].resolved.clone();
        let mut hit = None;
        for r in resolved_run {
            if set.resolved[r]
                .controls
                .clone()
                .any(|slot| set.controls[slot] == control)
            {
                hit = Some(r);
                break;
            }
        }
        let Some(r) = hit else { return };

        // A composite part is "at default" when the whole composite reads as
        // its default value, not when the one key is.
        let at_default = match set.resolved[r].composite {
            Some(composite) => {
                let controls = &set.controls[set.actions[id.index].controls.clone()];
                set.composites[composite].evaluate(controls, tree).is_default()
            }
            None => tree.is_at_default(control),
        };

        let phase = set.actions[id.index].phase;
        let requested = match set.resolved[r].interaction.as_mut() {
            Some(state) => {
                let mut ctx = InteractionContext::new(phase, at_default, time);
                state.recognizer.process(&mut ctx);
                let requested = ctx.take_requested();
                tracing::trace!(interaction = %state.name, ?requested, "interaction processed");
                requested
            }
            // Default trigger logic: any change off default performs.
            None if phase == Phase::Waiting && !at_default => Some(Phase::Performed),
            None => None,
        };

        if let Some(next) = requested {
            self.change_phase(id, next, control, time);
        }
    }

    /// Validate, apply, and dispatch one phase transition. `Performed` and
    /// `Cancelled` are transient and settle back to `Waiting` after their
    /// listeners run.
    fn change_phase(&mut self, id: ActionId, next: Phase, control: ControlId, time: f64) {
        let action = &mut self.sets[id.set.0].actions[id.index];
        let current = action.phase;
        if !current.can_transition_to(next) {
            tracing::warn!(
                action = %action.name(),
                %current,
                %next,
                "ignoring illegal phase transition"
            );
            return;
        }
        action.phase = next;
        let event = ActionEvent {
            action: id,
            name: action.name().to_string(),
            phase: next,
            control,
            time,
        };
        tracing::trace!(action = %event.name, phase = %next, "phase transition");

        // Take the listener list out so callbacks run without borrowing the
        // host; they queue follow-up work through HostCommands.
        let mut listeners = std::mem::take(match next {
            Phase::Started => &mut action.on_started,
            Phase::Performed => &mut action.on_performed,
            Phase::Cancelled => &mut action.on_cancelled,
            Phase::Waiting | Phase::Disabled => {
                unreachable!("resting phases are never dispatched")
            }
        });
        listeners.emit(&event);

        let action = &mut self.sets[id.set.0].actions[id.index];
        match next {
            Phase::Started => action.on_started = listeners,
            Phase::Performed => {
                action.on_performed = listeners;
                action.phase = Phase::Waiting;
            }
            Phase::Cancelled => {
                action.on_cancelled = listeners;
                action.phase = Phase::Waiting;
            }
            Phase::Waiting | Phase::Disabled => {}
        }
    }

    /// Apply deferred enable/disable commands until the queue drains.
    /// Commands queued by fire-on-enable dispatch are picked up too.
    fn flush_commands(&mut self, tree: &ControlTree) {
        loop {
            let drained: Vec<HostCommand> = self.commands.borrow_mut().drain(..).collect();
            if drained.is_empty() {
                break;
            }
            for command in drained {
                match command {
                    HostCommand::Enable(id) => self.enable_action(id, tree),
                    HostCommand::Disable(id) => self.disable_action(id),
                }
            }
        }
    }

    fn assert_owner_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.owner_thread,
            "TriggerHost used off its owning thread"
        );
    }
}

impl std::fmt::Debug for TriggerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerHost")
            .field("sets", &self.sets.len())
            .field("enabled", &self.enabled.len())
            .field("monitors", &self.monitors.monitor_count())
            .field("interactions", &self.interactions.len())
            .finish()
    }
}

fn resolve_one(
    path: &str,
    binding: usize,
    tree: &ControlTree,
    report: &mut ResolveReport,
) -> Option<Vec<ControlId>> {
    let parsed = match ControlPath::parse(path) {
        Ok(parsed) => parsed,
        Err(e) => {
            report.issues.push((binding, BindingIssue::PathSyntax(e)));
            report.unresolved += 1;
            return None;
        }
    };
    let ids = parsed.matches(tree);
    if ids.is_empty() {
        report.unresolved += 1;
        return None;
    }
    Some(ids)
}

fn instantiate(
    factories: &HashMap<String, InteractionFactory>,
    name: Option<&str>,
) -> Option<InteractionState> {
    let name = name?;
    match factories.get(&name.to_lowercase()) {
        Some(factory) => Some(InteractionState {
            name: name.to_string(),
            recognizer: factory(),
        }),
        None => {
            tracing::warn!(interaction = name, "no interaction registered under this name");
            None
        }
    }
}
