//! Device layout registry with single-inheritance ancestry.
//!
//! A layout is a name like `Gamepad` or `DualShockGamepad` plus an optional
//! base layout. Path matching checks "is this device a `<Gamepad>`" by walking
//! the ancestry chain by name, never by any runtime type identity, so the
//! check behaves identically for device kinds unknown at compile time.

use indexmap::IndexMap;

/// Registry of layout names and their base layouts.
///
/// Lookups are case-insensitive; names are stored case-folded.
#[derive(Debug, Default, Clone)]
pub struct LayoutRegistry {
    // layout name (lowercased) -> base layout name (lowercased), if any
    bases: IndexMap<String, Option<String>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layout, optionally deriving from a base layout.
    ///
    /// Re-registering a name replaces its base.
    pub fn register(&mut self, name: &str, base: Option<&str>) {
        self.bases
            .insert(name.to_lowercase(), base.map(str::to_lowercase));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bases.contains_key(&name.to_lowercase())
    }

    /// True if `layout` is `ancestor` or derives from it, walking the
    /// single-inheritance chain. Unregistered layouts only match themselves.
    pub fn derives_from(&self, layout: &str, ancestor: &str) -> bool {
        let ancestor = ancestor.to_lowercase();
        let mut current = layout.to_lowercase();

        // Guard against accidental cycles in the base table.
        let mut steps = 0;
        loop {
            if current == ancestor {
                return true;
            }
            match self.bases.get(&current) {
                Some(Some(base)) => current = base.clone(),
                _ => return false,
            }
            steps += 1;
            if steps > self.bases.len() {
                tracing::warn!(layout, "cycle in layout base table");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LayoutRegistry {
        let mut r = LayoutRegistry::new();
        r.register("InputDevice", None);
        r.register("Gamepad", Some("InputDevice"));
        r.register("DualShockGamepad", Some("Gamepad"));
        r.register("Keyboard", Some("InputDevice"));
        r
    }

    #[test]
    fn ancestry_walk() {
        let r = registry();
        assert!(r.derives_from("DualShockGamepad", "Gamepad"));
        assert!(r.derives_from("DualShockGamepad", "InputDevice"));
        assert!(r.derives_from("Gamepad", "Gamepad"));
        assert!(!r.derives_from("Keyboard", "Gamepad"));
        assert!(!r.derives_from("Gamepad", "DualShockGamepad"));
    }

    #[test]
    fn case_insensitive() {
        let r = registry();
        assert!(r.derives_from("dualshockgamepad", "GAMEPAD"));
    }

    #[test]
    fn cycle_does_not_hang() {
        let mut r = LayoutRegistry::new();
        r.register("A", Some("B"));
        r.register("B", Some("A"));
        assert!(!r.derives_from("A", "C"));
    }
}
