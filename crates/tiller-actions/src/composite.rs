//! Composite assembly — grouping flagged binding runs into gestures.
//!
//! A composite group starts at a `COMPOSITE` binding (whose path names the
//! composite kind) and collects every immediately following
//! `PART_OF_COMPOSITE` binding under that binding's part name. The group
//! closes at the first plain binding or at the end of the list. Groups are
//! built during a resolution pass and frozen afterwards; re-resolution
//! destroys and rebuilds them wholesale.

use indexmap::IndexMap;

use tiller_control::{ControlId, ControlTree, ControlValue, Vec2};

use crate::binding::Binding;
use crate::error::BindingIssue;

/// Kind of a composite, parsed from the opening binding's path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompositeKind {
    /// The built-in `"2DVector"` composite: up/down/left/right parts
    /// combined into a 2D vector.
    Vector2,
    /// A kind this engine has no evaluator for; carried by name.
    Other(String),
}

impl CompositeKind {
    pub fn parse(name: &str) -> CompositeKind {
        if name.eq_ignore_ascii_case("2DVector") {
            CompositeKind::Vector2
        } else {
            CompositeKind::Other(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CompositeKind::Vector2 => "2DVector",
            CompositeKind::Other(name) => name,
        }
    }
}

/// A resolved composite group: kind plus an ordered part-name → control map.
///
/// Part slots index into the owning set's flat control array.
#[derive(Debug, Clone)]
pub struct CompositeGroup {
    kind: CompositeKind,
    // part name (lowercased) -> slot in the set's control array
    parts: IndexMap<String, usize>,
}

impl CompositeGroup {
    pub(crate) fn new(kind: CompositeKind) -> Self {
        Self {
            kind,
            parts: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &CompositeKind {
        &self.kind
    }

    pub fn part(&self, name: &str) -> Option<usize> {
        self.parts.get(&name.to_lowercase()).copied()
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.parts.iter().map(|(name, slot)| (name.as_str(), *slot))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Bind a part. Returns the previously bound slot if the part name was
    /// already taken (last one wins; the caller reports the duplicate).
    pub(crate) fn bind_part(&mut self, name: &str, control_slot: usize) -> Option<usize> {
        self.parts.insert(name.to_lowercase(), control_slot)
    }

    /// Read the composite's current value from the tree.
    ///
    /// `2DVector` combines part magnitudes as `x = right - left`,
    /// `y = up - down`, with no normalization; missing parts read as zero.
    /// Kinds without an evaluator read as their first part's raw value.
    pub fn evaluate(&self, controls: &[ControlId], tree: &ControlTree) -> ControlValue {
        let magnitude = |name: &str| -> f32 {
            self.part(name)
                .and_then(|slot| controls.get(slot))
                .and_then(|id| tree.value(*id))
                .map(|v| v.magnitude())
                .unwrap_or(0.0)
        };

        match &self.kind {
            CompositeKind::Vector2 => ControlValue::Vector2(Vec2::new(
                magnitude("right") - magnitude("left"),
                magnitude("up") - magnitude("down"),
            )),
            CompositeKind::Other(_) => self
                .parts
                .values()
                .next()
                .and_then(|slot| controls.get(*slot))
                .and_then(|id| tree.value(*id))
                .unwrap_or(ControlValue::Axis(0.0)),
        }
    }
}

/// One item of an assembled binding list: a plain binding or a composite run.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembledBinding {
    /// Index of a plain binding in the input list.
    Single(usize),
    /// A composite run: the opening binding, its kind, and the part bindings
    /// in order of appearance.
    Composite {
        binding: usize,
        kind: CompositeKind,
        parts: Vec<(usize, String)>,
    },
}

/// Scan an ordered binding list and group composite runs.
///
/// Structural problems (dangling parts, missing part names, duplicate part
/// names) are reported as issues keyed by binding index; the offending
/// binding is skipped (duplicates keep the last occurrence) and sibling
/// bindings are unaffected.
pub fn assemble(bindings: &[Binding]) -> (Vec<AssembledBinding>, Vec<(usize, BindingIssue)>) {
    let mut items = Vec::new();
    let mut issues = Vec::new();

    for (index, binding) in bindings.iter().enumerate() {
        if binding.is_composite() {
            items.push(AssembledBinding::Composite {
                binding: index,
                kind: CompositeKind::parse(&binding.path),
                parts: Vec::new(),
            });
            continue;
        }

        if binding.is_part_of_composite() {
            let Some(AssembledBinding::Composite { kind, parts, .. }) = items.last_mut() else {
                issues.push((index, BindingIssue::DanglingCompositePart));
                continue;
            };
            let Some(part_name) = binding.part_name.as_deref().filter(|n| !n.is_empty()) else {
                issues.push((index, BindingIssue::MissingPartName));
                continue;
            };
            let part_name = part_name.to_lowercase();
            if let Some(pos) = parts.iter().position(|(_, name)| *name == part_name) {
                let (previous, _) = parts.remove(pos);
                tracing::warn!(
                    composite = kind.name(),
                    part = %part_name,
                    "duplicate composite part name, last one wins"
                );
                issues.push((previous, BindingIssue::DuplicatePartName(part_name.clone())));
            }
            parts.push((index, part_name));
            continue;
        }

        // A plain binding closes any open composite run.
        items.push(AssembledBinding::Single(index));
    }

    (items, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiller_control::DeviceBuilder;

    fn wasd() -> Vec<Binding> {
        vec![
            Binding::composite("2DVector"),
            Binding::part("up", "<Keyboard>/w"),
            Binding::part("down", "<Keyboard>/s"),
            Binding::part("left", "<Keyboard>/a"),
            Binding::part("right", "<Keyboard>/d"),
        ]
    }

    #[test]
    fn groups_one_composite_with_all_parts() {
        let (items, issues) = assemble(&wasd());
        assert!(issues.is_empty());
        assert_eq!(items.len(), 1);
        let AssembledBinding::Composite { binding, kind, parts } = &items[0] else {
            panic!("expected composite");
        };
        assert_eq!(*binding, 0);
        assert_eq!(*kind, CompositeKind::Vector2);
        let names: Vec<&str> = parts.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, ["up", "down", "left", "right"]);
    }

    #[test]
    fn part_order_does_not_matter() {
        let mut bindings = wasd();
        bindings[1..].reverse();
        let (items, issues) = assemble(&bindings);
        assert!(issues.is_empty());
        let AssembledBinding::Composite { parts, .. } = &items[0] else {
            panic!("expected composite");
        };
        assert_eq!(parts.len(), 4);
        for name in ["up", "down", "left", "right"] {
            assert!(parts.iter().any(|(_, n)| n == name), "{name}");
        }
    }

    #[test]
    fn plain_binding_closes_the_group() {
        let mut bindings = wasd();
        bindings.push(Binding::new("<Gamepad>/leftStick"));
        bindings.push(Binding::part("up", "<Keyboard>/upArrow"));

        let (items, issues) = assemble(&bindings);
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], AssembledBinding::Single(5)));
        // The trailing part has no open group any more.
        assert_eq!(issues, vec![(6, BindingIssue::DanglingCompositePart)]);
    }

    #[test]
    fn dangling_part_without_any_composite() {
        let bindings = vec![Binding::part("up", "<Keyboard>/w")];
        let (items, issues) = assemble(&bindings);
        assert!(items.is_empty());
        assert_eq!(issues, vec![(0, BindingIssue::DanglingCompositePart)]);
    }

    #[test]
    fn missing_part_name_is_reported() {
        let bindings = vec![
            Binding::composite("2DVector"),
            Binding {
                part_name: None,
                ..Binding::part("x", "<Keyboard>/w")
            },
        ];
        let (_, issues) = assemble(&bindings);
        assert_eq!(issues, vec![(1, BindingIssue::MissingPartName)]);
    }

    #[test]
    fn duplicate_part_name_last_wins() {
        let bindings = vec![
            Binding::composite("2DVector"),
            Binding::part("up", "<Keyboard>/w"),
            Binding::part("Up", "<Keyboard>/upArrow"),
        ];
        let (items, issues) = assemble(&bindings);
        assert_eq!(
            issues,
            vec![(1, BindingIssue::DuplicatePartName("up".to_string()))]
        );
        let AssembledBinding::Composite { parts, .. } = &items[0] else {
            panic!("expected composite");
        };
        assert_eq!(parts, &[(2, "up".to_string())]);
    }

    #[test]
    fn vector2_evaluation() {
        let mut tree = ControlTree::new();
        tree.add_device(
            DeviceBuilder::new("keyboard", "Keyboard")
                .control("w", ControlValue::Bool(false))
                .control("a", ControlValue::Bool(false))
                .control("s", ControlValue::Bool(false))
                .control("d", ControlValue::Bool(false)),
        )
        .unwrap();

        let controls = ["w", "a", "s", "d"]
            .map(|k| tree.find_by_path(&format!("/keyboard/{k}")).unwrap());

        let mut group = CompositeGroup::new(CompositeKind::Vector2);
        group.bind_part("up", 0);
        group.bind_part("left", 1);
        group.bind_part("down", 2);
        group.bind_part("right", 3);

        assert_eq!(
            group.evaluate(&controls, &tree),
            ControlValue::Vector2(Vec2::ZERO)
        );

        tree.set_value(controls[0], ControlValue::Bool(true)).unwrap();
        tree.set_value(controls[3], ControlValue::Bool(true)).unwrap();
        // No normalization at this layer.
        assert_eq!(
            group.evaluate(&controls, &tree),
            ControlValue::Vector2(Vec2::new(1.0, 1.0))
        );
    }
}
