//! Binding data — a declarative pointer from an action to controls.
//!
//! Bindings are plain data, immutable once a resolution pass has consumed
//! them. A run of one `COMPOSITE` binding followed by `PART_OF_COMPOSITE`
//! bindings forms a composite group (see [`crate::composite`]).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Role of a binding within its action's binding list.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BindingFlags: u8 {
        /// Opens a composite group; the binding's path names the composite
        /// kind (e.g. `"2DVector"`) instead of a control.
        const COMPOSITE = 1 << 0;
        /// Belongs to the preceding open composite group, under `part_name`.
        const PART_OF_COMPOSITE = 1 << 1;
        /// Chains with the previous binding (button combos). Carried on the
        /// data model; chains are not assembled into groups.
        const THIS_AND_PREVIOUS_COMBINE = 1 << 2;
    }
}

/// One binding: path, groups, flags, optional part name, optional override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Binding-path string, or the composite kind for `COMPOSITE` bindings.
    pub path: String,
    /// Semicolon-separated group tags, e.g. `"keyboard;gamepad"`. Used to
    /// address a specific binding when applying overrides.
    pub groups: String,
    /// Part name within the owning composite (`PART_OF_COMPOSITE` only).
    pub part_name: Option<String>,
    /// Named interaction driving this binding's phase logic, if any.
    pub interaction: Option<String>,
    pub flags: BindingFlags,
    /// Applied override; [`Binding::effective_path`] prefers this.
    pub override_path: Option<String>,
}

impl Binding {
    /// A plain binding to the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            groups: String::new(),
            part_name: None,
            interaction: None,
            flags: BindingFlags::empty(),
            override_path: None,
        }
    }

    /// A binding that opens a composite group of the given kind.
    pub fn composite(kind: impl Into<String>) -> Self {
        Self {
            flags: BindingFlags::COMPOSITE,
            ..Self::new(kind)
        }
    }

    /// A part binding inside an open composite group.
    pub fn part(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            part_name: Some(name.into()),
            flags: BindingFlags::PART_OF_COMPOSITE,
            ..Self::new(path)
        }
    }

    pub fn with_groups(mut self, groups: impl Into<String>) -> Self {
        self.groups = groups.into();
        self
    }

    pub fn with_interaction(mut self, interaction: impl Into<String>) -> Self {
        self.interaction = Some(interaction.into());
        self
    }

    pub fn combine_with_previous(mut self) -> Self {
        self.flags |= BindingFlags::THIS_AND_PREVIOUS_COMBINE;
        self
    }

    pub fn is_composite(&self) -> bool {
        self.flags.contains(BindingFlags::COMPOSITE)
    }

    pub fn is_part_of_composite(&self) -> bool {
        self.flags.contains(BindingFlags::PART_OF_COMPOSITE)
    }

    /// The path a resolution pass should use: the override if one is
    /// applied, else the default path.
    pub fn effective_path(&self) -> &str {
        self.override_path.as_deref().unwrap_or(&self.path)
    }

    /// True if this binding carries the given group tag (case-insensitive).
    pub fn in_group(&self, group: &str) -> bool {
        self.groups
            .split(';')
            .any(|g| g.trim().eq_ignore_ascii_case(group))
    }
}

/// A binding override: replace one binding's effective path.
///
/// `group` selects among an action's bindings; without it the action's first
/// binding is targeted. Applying an override requires re-resolving the set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BindingOverride {
    /// Name of the action whose binding to override.
    pub action: String,
    /// Replacement path.
    pub path: String,
    /// Group tag selecting the binding, if the action has several.
    pub group: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_path_prefers_override() {
        let mut b = Binding::new("<Keyboard>/w");
        assert_eq!(b.effective_path(), "<Keyboard>/w");
        b.override_path = Some("<Keyboard>/upArrow".to_string());
        assert_eq!(b.effective_path(), "<Keyboard>/upArrow");
        b.override_path = None;
        assert_eq!(b.effective_path(), "<Keyboard>/w");
    }

    #[test]
    fn group_membership() {
        let b = Binding::new("<Gamepad>/buttonSouth").with_groups("gamepad; default");
        assert!(b.in_group("gamepad"));
        assert!(b.in_group("Default"));
        assert!(!b.in_group("keyboard"));
        assert!(!Binding::new("x").in_group("gamepad"));
    }

    #[test]
    fn constructor_flags() {
        assert!(Binding::composite("2DVector").is_composite());
        let part = Binding::part("up", "<Keyboard>/w");
        assert!(part.is_part_of_composite());
        assert_eq!(part.part_name.as_deref(), Some("up"));
        assert!(
            Binding::new("a")
                .combine_with_previous()
                .flags
                .contains(BindingFlags::THIS_AND_PREVIOUS_COMBINE)
        );
    }
}
