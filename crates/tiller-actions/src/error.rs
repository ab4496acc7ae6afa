//! Error and diagnostic types for binding resolution.
//!
//! Two severities exist. [`BindingError`] is a hard error returned from an
//! operation that could not proceed (unknown action, binding added to an
//! enabled action). [`BindingIssue`] is a per-binding diagnostic collected
//! during a resolution pass: the offending binding is skipped, siblings keep
//! resolving, and the caller reads the issues off the resolve report instead
//! of catching anything.
//!
//! Precondition violations (re-resolving an enabled set, double-owning an
//! action) are programming errors and panic; they are not represented here.

use thiserror::Error;

use tiller_control::PathError;

/// Hard errors from binding and override operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("no action named '{0}' in this set")]
    UnknownAction(String),

    #[error("cannot modify bindings of enabled action '{0}'")]
    ActionEnabled(String),
}

/// Per-binding diagnostics from a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingIssue {
    /// The binding's path failed to parse; the binding resolves to nothing.
    PathSyntax(PathError),

    /// A `PART_OF_COMPOSITE` binding with no preceding open composite group.
    DanglingCompositePart,

    /// A part binding without a part name.
    MissingPartName,

    /// Two parts of the same composite used this name; the last one won.
    DuplicatePartName(String),

    /// A part binding's path matched several controls; only the first is
    /// bound into the composite.
    MultipleControlsForPart,
}

impl std::fmt::Display for BindingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingIssue::PathSyntax(e) => write!(f, "path syntax: {e}"),
            BindingIssue::DanglingCompositePart => {
                write!(f, "part-of-composite binding with no open composite")
            }
            BindingIssue::MissingPartName => write!(f, "composite part binding has no part name"),
            BindingIssue::DuplicatePartName(name) => {
                write!(f, "duplicate composite part name '{name}' (last one wins)")
            }
            BindingIssue::MultipleControlsForPart => {
                write!(f, "composite part matched multiple controls; first bound")
            }
        }
    }
}
