//! Device/control tree and binding-path matching for Tiller.
//!
//! This crate is the leaf of the engine: it knows what devices and controls
//! exist, what their current values are, and how to evaluate a textual
//! binding path against them. It knows nothing about actions, bindings, or
//! phases — that lives in `tiller-actions` on top.
//!
//! # Key Types
//!
//! | Type               | Purpose                                         |
//! |--------------------|-------------------------------------------------|
//! | [`ControlValue`]   | Closed variant over the supported value shapes  |
//! | [`LayoutRegistry`] | Layout names + single-inheritance ancestry      |
//! | [`ControlTree`]    | Plugged-in devices and their control hierarchy  |
//! | [`ControlId`]      | Stable, copyable identity of one control        |
//! | [`ControlPath`]    | Parsed binding path, evaluated against the tree |

mod layout;
mod path;
mod tree;
mod value;

pub use layout::LayoutRegistry;
pub use path::{ControlPath, PathError};
pub use tree::{Control, ControlId, ControlTree, Device, DeviceBuilder, TreeError};
pub use value::{ControlValue, Quat, ValueShape, Vec2, Vec3};
