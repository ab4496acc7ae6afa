//! Control value variants.
//!
//! A control's state is one of a closed set of value shapes. Everything that
//! needs per-shape behavior matches exhaustively on [`ControlValue`]; there is
//! no runtime type inspection anywhere in the engine.

use serde::{Deserialize, Serialize};

/// A 2D vector, e.g. a stick or a synthesized dpad value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// A 3D vector, e.g. an accelerometer reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A rotation, e.g. a device attitude sensor. Default is the identity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

/// The shape of a control's value, without the value itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueShape {
    Bool,
    Axis,
    Vector2,
    Vector3,
    Quaternion,
}

/// The current state of a control.
///
/// `is_default` is the predicate the trigger engine uses to decide whether a
/// raw state write moved a control away from its resting state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ControlValue {
    Bool(bool),
    Axis(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Quaternion(Quat),
}

impl ControlValue {
    /// The resting value for a given shape.
    pub fn default_for(shape: ValueShape) -> ControlValue {
        match shape {
            ValueShape::Bool => ControlValue::Bool(false),
            ValueShape::Axis => ControlValue::Axis(0.0),
            ValueShape::Vector2 => ControlValue::Vector2(Vec2::default()),
            ValueShape::Vector3 => ControlValue::Vector3(Vec3::default()),
            ValueShape::Quaternion => ControlValue::Quaternion(Quat::IDENTITY),
        }
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            ControlValue::Bool(_) => ValueShape::Bool,
            ControlValue::Axis(_) => ValueShape::Axis,
            ControlValue::Vector2(_) => ValueShape::Vector2,
            ControlValue::Vector3(_) => ValueShape::Vector3,
            ControlValue::Quaternion(_) => ValueShape::Quaternion,
        }
    }

    pub fn same_shape(&self, other: &ControlValue) -> bool {
        self.shape() == other.shape()
    }

    /// True iff the value equals its shape's resting state.
    ///
    /// Quaternions rest at the identity, not at all-zeros.
    pub fn is_default(&self) -> bool {
        match self {
            ControlValue::Bool(b) => !b,
            ControlValue::Axis(a) => *a == 0.0,
            ControlValue::Vector2(v) => *v == Vec2::ZERO,
            ControlValue::Vector3(v) => v.x == 0.0 && v.y == 0.0 && v.z == 0.0,
            ControlValue::Quaternion(q) => *q == Quat::IDENTITY,
        }
    }

    /// Scalar magnitude used when a composite part reads a bound control.
    pub fn magnitude(&self) -> f32 {
        match self {
            ControlValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ControlValue::Axis(a) => a.abs(),
            ControlValue::Vector2(v) => v.length(),
            ControlValue::Vector3(v) => v.length(),
            // No meaningful scalar for a rotation; report pressed/not-pressed.
            ControlValue::Quaternion(q) => {
                if *q == Quat::IDENTITY {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }
}
