//! Action triggering on top of [`tiller_control`] trees.
//!
//! Bindings tie named actions to control paths; resolution walks the tree
//! and freezes the matches into flat arrays; the trigger host fans control
//! changes out to enabled actions and drives their phase machines.
//!
//! Key types:
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Binding`] | A control path plus flags tying it to an action |
//! | [`ActionSet`] | Actions with shared binding/control storage |
//! | [`CompositeGroup`] | Multiple part bindings combined into one value |
//! | [`Phase`] | The gesture lifecycle of an action |
//! | [`TriggerHost`] | Owns the sets, monitors, and dispatch loop |
//! | [`Interaction`] | Pluggable gesture recognizer on a binding |
//!
//! The host is single-threaded by construction; raw input from other threads
//! must be funneled to the owning thread before `notify`.

pub mod action;
pub mod binding;
pub mod composite;
pub mod error;
pub mod host;
pub mod interaction;
pub mod listener;
pub mod monitor;
pub mod phase;

pub use action::{Action, ActionEvent, ActionId, ActionSet, ResolvedBinding, SetId};
pub use binding::{Binding, BindingFlags, BindingOverride};
pub use composite::{assemble, AssembledBinding, CompositeGroup, CompositeKind};
pub use error::{BindingError, BindingIssue};
pub use host::{HostCommands, ResolveReport, TriggerHost};
pub use interaction::{Interaction, InteractionContext, SlowTap};
pub use listener::{ListenerSet, ListenerToken};
pub use monitor::{ChangeMonitorRegistry, EnabledActionRegistry};
pub use phase::Phase;

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tiller_control::{ControlTree, ControlValue, DeviceBuilder, Vec2};

    use super::*;

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tiller_actions=debug,tiller_control=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    fn keyboard_tree() -> ControlTree {
        init_tracing();
        let mut tree = ControlTree::new();
        tree.layouts_mut().register("Keyboard", None);
        tree.add_device(
            DeviceBuilder::new("keyboard", "Keyboard")
                .control("w", ControlValue::Bool(false))
                .control("a", ControlValue::Bool(false))
                .control("s", ControlValue::Bool(false))
                .control("d", ControlValue::Bool(false))
                .control("upArrow", ControlValue::Bool(false)),
        )
        .unwrap();
        tree
    }

    fn wasd_set() -> (ActionSet, usize) {
        let mut set = ActionSet::new("gameplay");
        let movement = set.add_action("move");
        set.add_binding(movement, Binding::composite("2DVector")).unwrap();
        set.add_binding(movement, Binding::part("up", "<Keyboard>/w").with_groups("kbd-up"))
            .unwrap();
        set.add_binding(movement, Binding::part("down", "<Keyboard>/s")).unwrap();
        set.add_binding(movement, Binding::part("left", "<Keyboard>/a")).unwrap();
        set.add_binding(movement, Binding::part("right", "<Keyboard>/d")).unwrap();
        (set, movement)
    }

    fn press(tree: &mut ControlTree, host: &mut TriggerHost, path: &str, down: bool, time: f64) {
        let id = tree.find_by_path(path).unwrap();
        tree.set_value(id, ControlValue::Bool(down)).unwrap();
        host.notify(id, time, tree);
    }

    #[test]
    fn wasd_press_and_release_performs_exactly_once() {
        let mut tree = keyboard_tree();
        let mut host = TriggerHost::new();
        let (set, _) = wasd_set();
        let set = host.add_set(set);
        let movement = host.action_id(set, "move").unwrap();

        let report = host.resolve(set, &tree);
        assert_eq!(report.controls, 4);
        assert_eq!(report.unresolved, 0);
        assert!(report.issues.is_empty());

        let performed = Rc::new(RefCell::new(0));
        let count = Rc::clone(&performed);
        host.on_performed(movement, move |event| {
            assert_eq!(event.name, "move");
            *count.borrow_mut() += 1;
        });

        host.enable_set(set, &tree);
        press(&mut tree, &mut host, "/keyboard/w", true, 1.0);
        assert_eq!(*performed.borrow(), 1);
        assert_eq!(
            host.action_value(movement, &tree),
            Some(ControlValue::Vector2(Vec2::new(0.0, 1.0)))
        );

        // Release returns the composite to default; no second dispatch.
        press(&mut tree, &mut host, "/keyboard/w", false, 1.2);
        assert_eq!(*performed.borrow(), 1);
        assert_eq!(
            host.action_value(movement, &tree),
            Some(ControlValue::Vector2(Vec2::ZERO))
        );
    }

    #[test]
    fn diagonal_input_is_not_normalized() {
        let mut tree = keyboard_tree();
        let mut host = TriggerHost::new();
        let (set, _) = wasd_set();
        let set = host.add_set(set);
        let movement = host.action_id(set, "move").unwrap();
        host.resolve(set, &tree);
        host.enable_set(set, &tree);

        press(&mut tree, &mut host, "/keyboard/w", true, 1.0);
        press(&mut tree, &mut host, "/keyboard/d", true, 1.1);
        assert_eq!(
            host.action_value(movement, &tree),
            Some(ControlValue::Vector2(Vec2::new(1.0, 1.0)))
        );
    }

    #[test]
    fn override_survives_re_resolution() {
        let mut tree = keyboard_tree();
        let mut host = TriggerHost::new();
        let (set, _) = wasd_set();
        let set = host.add_set(set);
        let movement = host.action_id(set, "move").unwrap();
        host.resolve(set, &tree);

        host.set_mut(set)
            .apply_override(&BindingOverride {
                action: "move".to_string(),
                path: "<Keyboard>/upArrow".to_string(),
                group: Some("kbd-up".to_string()),
            })
            .unwrap();

        let report = host.resolve(set, &tree);
        assert_eq!(report.controls, 4);

        let up_arrow = tree.find_by_path("/keyboard/upArrow").unwrap();
        let w = tree.find_by_path("/keyboard/w").unwrap();
        let controls = host.set(set).controls_of(0);
        assert!(controls.contains(&up_arrow));
        assert!(!controls.contains(&w));

        // The rebound key drives the action; the default one no longer does.
        host.enable_set(set, &tree);
        let performed = Rc::new(RefCell::new(0));
        let count = Rc::clone(&performed);
        host.on_performed(movement, move |_| *count.borrow_mut() += 1);

        press(&mut tree, &mut host, "/keyboard/w", true, 1.0);
        assert_eq!(*performed.borrow(), 0);
        press(&mut tree, &mut host, "/keyboard/upArrow", true, 1.1);
        assert_eq!(*performed.borrow(), 1);
        assert_eq!(
            host.action_value(movement, &tree),
            Some(ControlValue::Vector2(Vec2::new(0.0, 1.0)))
        );
    }

    #[test]
    fn sibling_actions_resolve_independently() {
        let mut tree = keyboard_tree();
        let mut host = TriggerHost::new();

        let mut set = ActionSet::new("gameplay");
        let jump = set.add_action("jump");
        let fire = set.add_action("fire");
        set.add_binding(jump, Binding::new("<Keyboard>/w")).unwrap();
        set.add_binding(fire, Binding::new("<Gamepad>/rightTrigger")).unwrap();
        let set = host.add_set(set);

        let report = host.resolve(set, &tree);
        assert_eq!(report.controls, 1);
        assert_eq!(report.unresolved, 1);

        let jump = host.action_id(set, "jump").unwrap();
        host.enable_set(set, &tree);

        let performed = Rc::new(RefCell::new(0));
        let count = Rc::clone(&performed);
        host.on_performed(jump, move |_| *count.borrow_mut() += 1);
        press(&mut tree, &mut host, "/keyboard/w", true, 1.0);
        assert_eq!(*performed.borrow(), 1);
    }
}
