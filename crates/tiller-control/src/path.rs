//! Binding-path grammar and matching.
//!
//! ```text
//! path      := segment ("/" segment)*
//! segment   := "<" deviceConstraint ">" | usageConstraint | controlName | "*"
//! deviceConstraint := deviceLayoutName (":" usage)?
//! ```
//!
//! The leading segment selects devices; the remaining segments walk child
//! controls by case-insensitive name, with `*` matching any one component.
//! Three leading forms exist:
//!
//! - `<Gamepad>/buttonSouth` restricts to devices whose layout is `Gamepad`
//!   or derives from it (ancestry walk, not type identity).
//! - `Submit` (bare, no `<>`) is a usage lookup across all devices.
//! - `/gamepad/buttonSouth` (rooted) matches the device by name; this is the
//!   form produced by [`Control::path`](crate::tree::Control::path), so a
//!   control's stable path always matches exactly that control.
//!
//! Malformed paths fail at parse time, before any tree walk. An empty match
//! set is not an error: it is the "currently nothing plugged in" result.

use thiserror::Error;

use crate::tree::{ControlId, ControlTree, Device};

/// Syntax errors in a binding path. Raised at parse time only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty binding path")]
    Empty,

    #[error("empty segment at component {0}")]
    EmptySegment(usize),

    #[error("unterminated '<' in segment '{0}'")]
    UnterminatedDeviceConstraint(String),

    #[error("'>' without matching '<' in segment '{0}'")]
    StrayClosingAngle(String),

    #[error("empty device constraint '<>'")]
    EmptyDeviceConstraint,

    #[error("empty usage in device constraint '{0}'")]
    EmptyDeviceUsage(String),

    #[error("device constraint '{0}' is only valid as the first segment")]
    DeviceConstraintNotFirst(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `<Layout>` or `<Layout:Usage>`, first segment only.
    Layout { layout: String, usage: Option<String> },
    /// First segment of a rooted path: match device by name.
    DeviceName(String),
    /// Bare first segment: usage lookup across all devices.
    Usage(String),
    /// Child control by name.
    Name(String),
    /// Any one component.
    Wildcard,
}

/// A parsed binding path, ready to be evaluated against a [`ControlTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPath {
    raw: String,
    segments: Vec<Segment>,
}

impl ControlPath {
    /// Parse a binding-path string. All grammar errors surface here,
    /// synchronously, before any tree walk.
    pub fn parse(path: &str) -> Result<ControlPath, PathError> {
        if path.is_empty() || path == "/" {
            return Err(PathError::Empty);
        }

        let rooted = path.starts_with('/');
        let body = path.strip_prefix('/').unwrap_or(path);

        let mut segments = Vec::new();
        for (i, component) in body.split('/').enumerate() {
            if component.is_empty() {
                return Err(PathError::EmptySegment(i));
            }

            if let Some(inner) = component.strip_prefix('<') {
                if i != 0 {
                    return Err(PathError::DeviceConstraintNotFirst(component.to_string()));
                }
                let Some(inner) = inner.strip_suffix('>') else {
                    return Err(PathError::UnterminatedDeviceConstraint(
                        component.to_string(),
                    ));
                };
                if inner.contains('<') || inner.contains('>') {
                    return Err(PathError::StrayClosingAngle(component.to_string()));
                }
                let (layout, usage) = match inner.split_once(':') {
                    Some((layout, usage)) => (layout, Some(usage)),
                    None => (inner, None),
                };
                if layout.is_empty() {
                    return Err(PathError::EmptyDeviceConstraint);
                }
                if let Some(usage) = usage
                    && usage.is_empty()
                {
                    return Err(PathError::EmptyDeviceUsage(component.to_string()));
                }
                segments.push(Segment::Layout {
                    layout: layout.to_string(),
                    usage: usage.map(str::to_string),
                });
                continue;
            }

            if component.contains('>') || component.contains('<') {
                return Err(PathError::StrayClosingAngle(component.to_string()));
            }

            let segment = if component == "*" {
                Segment::Wildcard
            } else if i == 0 && rooted {
                Segment::DeviceName(component.to_string())
            } else if i == 0 {
                Segment::Usage(component.to_string())
            } else {
                Segment::Name(component.to_string())
            };
            segments.push(segment);
        }

        Ok(ControlPath {
            raw: path.to_string(),
            segments,
        })
    }

    /// The path string as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate the path against the tree, returning every matching control
    /// in device order, then tree order within a device.
    ///
    /// Each call re-walks the tree; nothing is cached across calls. An empty
    /// result means no currently plugged-in device satisfies the path.
    pub fn matches(&self, tree: &ControlTree) -> Vec<ControlId> {
        let mut out = Vec::new();
        let rest = &self.segments[1..];

        for (slot, device) in tree.devices() {
            match &self.segments[0] {
                Segment::Layout { layout, usage } => {
                    if !tree.layouts().derives_from(device.layout(), layout) {
                        continue;
                    }
                    if let Some(usage) = usage
                        && !device.has_usage(usage)
                    {
                        continue;
                    }
                    self.walk(tree, slot, device, 0, rest, &mut out);
                }
                Segment::DeviceName(name) => {
                    if !device.name().eq_ignore_ascii_case(name) {
                        continue;
                    }
                    self.walk(tree, slot, device, 0, rest, &mut out);
                }
                Segment::Wildcard => {
                    self.walk(tree, slot, device, 0, rest, &mut out);
                }
                Segment::Usage(usage) => {
                    let Some(control) = device.usage_control(usage) else {
                        continue;
                    };
                    self.walk(tree, slot, device, control, rest, &mut out);
                }
                // Name only appears past the first segment.
                Segment::Name(_) => unreachable!("name segment in leading position"),
            }
        }

        tracing::trace!(path = %self.raw, matched = out.len(), "path match");
        out
    }

    fn walk(
        &self,
        tree: &ControlTree,
        slot: usize,
        device: &Device,
        control: usize,
        rest: &[Segment],
        out: &mut Vec<ControlId>,
    ) {
        let Some(node) = device.control(control) else {
            return;
        };
        match rest.first() {
            None => out.push(tree.id_of(slot, control)),
            Some(Segment::Name(name)) => {
                if let Some(child) = node.child(name) {
                    self.walk(tree, slot, device, child, &rest[1..], out);
                }
            }
            Some(Segment::Wildcard) => {
                for child in node.children() {
                    self.walk(tree, slot, device, child, &rest[1..], out);
                }
            }
            // Leading-only segment kinds cannot appear mid-path; the parser
            // rejects them.
            Some(_) => unreachable!("device segment past the first position"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DeviceBuilder;
    use crate::value::{ControlValue, Vec2};

    fn tree() -> ControlTree {
        let mut tree = ControlTree::new();
        tree.layouts_mut().register("InputDevice", None);
        tree.layouts_mut().register("Gamepad", Some("InputDevice"));
        tree.layouts_mut().register("DualShockGamepad", Some("Gamepad"));
        tree.layouts_mut().register("Keyboard", Some("InputDevice"));

        tree.add_device(
            DeviceBuilder::new("gamepad", "DualShockGamepad")
                .control("buttonSouth", ControlValue::Bool(false))
                .control("leftStick", ControlValue::Vector2(Vec2::ZERO))
                .control("leftStick/x", ControlValue::Axis(0.0))
                .control("leftStick/y", ControlValue::Axis(0.0))
                .usage("Submit", "buttonSouth"),
        )
        .unwrap();

        tree.add_device(
            DeviceBuilder::new("keyboard", "Keyboard")
                .control("w", ControlValue::Bool(false))
                .control("a", ControlValue::Bool(false))
                .control("s", ControlValue::Bool(false))
                .control("d", ControlValue::Bool(false))
                .control("enter", ControlValue::Bool(false))
                .usage("Submit", "enter"),
        )
        .unwrap();

        tree
    }

    fn parse(path: &str) -> ControlPath {
        ControlPath::parse(path).unwrap()
    }

    #[test]
    fn stable_path_round_trips() {
        let tree = tree();
        for path in ["/gamepad/buttonSouth", "/gamepad/leftStick/x", "/keyboard/w"] {
            let id = tree.find_by_path(path).unwrap();
            assert_eq!(parse(path).matches(&tree), vec![id], "{path}");
        }
    }

    #[test]
    fn layout_constraint_uses_ancestry() {
        let tree = tree();
        let button = tree.find_by_path("/gamepad/buttonSouth").unwrap();
        // Device layout is DualShockGamepad; <Gamepad> matches via the chain.
        assert_eq!(parse("<Gamepad>/buttonSouth").matches(&tree), vec![button]);
        assert_eq!(
            parse("<DualShockGamepad>/buttonSouth").matches(&tree),
            vec![button]
        );
        assert!(parse("<Keyboard>/buttonSouth").matches(&tree).is_empty());
    }

    #[test]
    fn layout_constraint_with_usage() {
        let tree = tree();
        let button = tree.find_by_path("/gamepad/buttonSouth").unwrap();
        assert_eq!(
            parse("<Gamepad:Submit>/buttonSouth").matches(&tree),
            vec![button]
        );
        assert!(parse("<Gamepad:LeftHand>/buttonSouth").matches(&tree).is_empty());
    }

    #[test]
    fn bare_segment_is_usage_lookup() {
        let tree = tree();
        let button = tree.find_by_path("/gamepad/buttonSouth").unwrap();
        let enter = tree.find_by_path("/keyboard/enter").unwrap();
        assert_eq!(parse("Submit").matches(&tree), vec![button, enter]);
    }

    #[test]
    fn wildcard_matches_one_component() {
        let tree = tree();
        let x = tree.find_by_path("/gamepad/leftStick/x").unwrap();
        let y = tree.find_by_path("/gamepad/leftStick/y").unwrap();
        assert_eq!(parse("<Gamepad>/leftStick/*").matches(&tree), vec![x, y]);
    }

    #[test]
    fn wildcard_device_superset() {
        let mut tree = tree();
        let before = parse("*/buttonSouth").matches(&tree);
        assert_eq!(before.len(), 1);

        // Adding a device with the control grows the result.
        tree.add_device(
            DeviceBuilder::new("pad2", "Gamepad")
                .control("buttonSouth", ControlValue::Bool(false)),
        )
        .unwrap();
        let after = parse("*/buttonSouth").matches(&tree);
        assert_eq!(after.len(), 2);
        assert!(before.iter().all(|id| after.contains(id)));

        // Removing one shrinks it back without touching the survivor.
        let pad2 = after.iter().find(|id| !before.contains(id)).unwrap();
        tree.remove_device(pad2.device());
        assert_eq!(parse("*/buttonSouth").matches(&tree), before);
    }

    #[test]
    fn empty_match_is_not_an_error() {
        let tree = ControlTree::new();
        assert!(parse("<Gamepad>/buttonSouth").matches(&tree).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let tree = tree();
        let button = tree.find_by_path("/gamepad/buttonSouth").unwrap();
        assert_eq!(parse("<gamepad>/BUTTONSOUTH").matches(&tree), vec![button]);
    }

    #[test]
    fn syntax_errors_surface_at_parse_time() {
        assert_eq!(ControlPath::parse(""), Err(PathError::Empty));
        assert_eq!(ControlPath::parse("/"), Err(PathError::Empty));
        assert_eq!(
            ControlPath::parse("<Gamepad>//x"),
            Err(PathError::EmptySegment(1))
        );
        assert!(matches!(
            ControlPath::parse("<Gamepad/buttonSouth"),
            Err(PathError::UnterminatedDeviceConstraint(_))
        ));
        assert!(matches!(
            ControlPath::parse("Gamepad>/buttonSouth"),
            Err(PathError::StrayClosingAngle(_))
        ));
        assert_eq!(
            ControlPath::parse("<>/buttonSouth"),
            Err(PathError::EmptyDeviceConstraint)
        );
        assert!(matches!(
            ControlPath::parse("<Gamepad:>/x"),
            Err(PathError::EmptyDeviceUsage(_))
        ));
        assert!(matches!(
            ControlPath::parse("foo/<Gamepad>"),
            Err(PathError::DeviceConstraintNotFirst(_))
        ));
    }

    #[test]
    fn device_root_is_addressable() {
        let tree = tree();
        let root = tree.device_root(0);
        assert_eq!(parse("/gamepad").matches(&tree), vec![root]);
        assert_eq!(parse("<Gamepad>").matches(&tree), vec![root]);
    }
}
