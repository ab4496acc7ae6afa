//! The live device/control tree.
//!
//! Devices are named collections of controls arranged in a hierarchy; every
//! node is addressable and carries a current [`ControlValue`] plus a stable
//! path string like `/gamepad/buttonSouth`. The trigger engine only ever
//! reads this tree; the single write entry point, [`ControlTree::set_value`],
//! exists for the external event pump (and tests) that deliver raw state.
//!
//! Identity is positional: a [`ControlId`] is a device slot plus a control
//! index within that device. Device slots are stable across removal, so ids
//! of surviving devices never shift when another device is unplugged.

use indexmap::IndexMap;
use thiserror::Error;

use crate::layout::LayoutRegistry;
use crate::value::ControlValue;

/// Errors from tree construction and state writes.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("control '{0}' already exists on device")]
    DuplicateControl(String),

    #[error("parent of control '{0}' has not been declared")]
    MissingParent(String),

    #[error("usage '{usage}' targets unknown control '{target}'")]
    UnknownUsageTarget { usage: String, target: String },

    #[error("no such control")]
    NoSuchControl,

    #[error("value shape mismatch: control is {expected:?}, write was {got:?}")]
    ShapeMismatch {
        expected: crate::value::ValueShape,
        got: crate::value::ValueShape,
    },
}

/// Stable identity of one control in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId {
    pub(crate) device: usize,
    pub(crate) control: usize,
}

impl ControlId {
    pub fn new(device: usize, control: usize) -> Self {
        Self { device, control }
    }

    /// Slot of the owning device.
    pub fn device(&self) -> usize {
        self.device
    }
}

/// One addressable node in a device's control hierarchy.
#[derive(Debug, Clone)]
pub struct Control {
    name: String,
    value: ControlValue,
    path: String,
    // case-folded child name -> control index within the device
    children: IndexMap<String, usize>,
}

impl Control {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> ControlValue {
        self.value
    }

    /// Stable path string, e.g. `/gamepad/leftStick/x`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn child(&self, name: &str) -> Option<usize> {
        self.children.get(&name.to_lowercase()).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = usize> + '_ {
        self.children.values().copied()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A named collection of controls. Index 0 is the device root node.
#[derive(Debug, Clone)]
pub struct Device {
    name: String,
    layout: String,
    controls: Vec<Control>,
    // case-folded usage name -> control index
    usages: IndexMap<String, usize>,
}

impl Device {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn has_usage(&self, usage: &str) -> bool {
        self.usages.contains_key(&usage.to_lowercase())
    }

    pub fn usage_control(&self, usage: &str) -> Option<usize> {
        self.usages.get(&usage.to_lowercase()).copied()
    }

    pub fn control(&self, index: usize) -> Option<&Control> {
        self.controls.get(index)
    }
}

/// Builder for assembling a device before plugging it into the tree.
///
/// Controls are declared by path within the device; parents must be declared
/// before their children.
#[derive(Debug)]
pub struct DeviceBuilder {
    device: Device,
    error: Option<TreeError>,
}

impl DeviceBuilder {
    pub fn new(name: &str, layout: &str) -> Self {
        let root = Control {
            name: name.to_string(),
            value: ControlValue::Bool(false),
            path: format!("/{name}"),
            children: IndexMap::new(),
        };
        Self {
            device: Device {
                name: name.to_string(),
                layout: layout.to_string(),
                controls: vec![root],
                usages: IndexMap::new(),
            },
            error: None,
        }
    }

    /// Declare a control at `path` within the device (e.g. `"leftStick/x"`)
    /// with the given initial value.
    pub fn control(mut self, path: &str, value: ControlValue) -> Self {
        if self.error.is_some() {
            return self;
        }
        let mut parent = 0usize;
        let components: Vec<&str> = path.split('/').collect();
        for (i, component) in components.iter().enumerate() {
            let existing = self.device.controls[parent].child(component);
            let is_last = i == components.len() - 1;
            match existing {
                Some(_) if is_last => {
                    self.error = Some(TreeError::DuplicateControl(path.to_string()));
                    return self;
                }
                Some(index) => parent = index,
                None if is_last => {
                    let index = self.device.controls.len();
                    let parent_path = self.device.controls[parent].path.clone();
                    self.device.controls.push(Control {
                        name: component.to_string(),
                        value,
                        path: format!("{parent_path}/{component}"),
                        children: IndexMap::new(),
                    });
                    self.device.controls[parent]
                        .children
                        .insert(component.to_lowercase(), index);
                }
                None => {
                    self.error = Some(TreeError::MissingParent(path.to_string()));
                    return self;
                }
            }
        }
        self
    }

    /// Declare a usage (e.g. `"Submit"`) routing to a control path within the
    /// device.
    pub fn usage(mut self, usage: &str, target: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let mut index = 0usize;
        for component in target.split('/') {
            match self.device.controls[index].child(component) {
                Some(child) => index = child,
                None => {
                    self.error = Some(TreeError::UnknownUsageTarget {
                        usage: usage.to_string(),
                        target: target.to_string(),
                    });
                    return self;
                }
            }
        }
        self.device.usages.insert(usage.to_lowercase(), index);
        self
    }

    fn build(self) -> Result<Device, TreeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.device),
        }
    }
}

/// The device tree: layout registry plus plugged-in devices.
#[derive(Debug, Default, Clone)]
pub struct ControlTree {
    layouts: LayoutRegistry,
    // Slots stay stable across removal so surviving ControlIds never shift.
    devices: Vec<Option<Device>>,
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    pub fn layouts_mut(&mut self) -> &mut LayoutRegistry {
        &mut self.layouts
    }

    /// Plug a device into the tree, returning its slot.
    pub fn add_device(&mut self, builder: DeviceBuilder) -> Result<usize, TreeError> {
        let device = builder.build()?;
        tracing::debug!(name = device.name(), layout = device.layout(), "device added");
        self.devices.push(Some(device));
        Ok(self.devices.len() - 1)
    }

    /// Unplug a device. Its slot is retired, not reused.
    pub fn remove_device(&mut self, slot: usize) -> bool {
        match self.devices.get_mut(slot) {
            Some(d @ Some(_)) => {
                tracing::debug!(slot, "device removed");
                *d = None;
                true
            }
            _ => false,
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = (usize, &Device)> {
        self.devices
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|d| (i, d)))
    }

    pub fn device(&self, slot: usize) -> Option<&Device> {
        self.devices.get(slot).and_then(Option::as_ref)
    }

    pub fn device_root(&self, slot: usize) -> ControlId {
        ControlId { device: slot, control: 0 }
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.control(id).is_some()
    }

    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.device(id.device).and_then(|d| d.control(id.control))
    }

    pub fn value(&self, id: ControlId) -> Option<ControlValue> {
        self.control(id).map(Control::value)
    }

    pub fn path(&self, id: ControlId) -> Option<&str> {
        self.control(id).map(Control::path)
    }

    pub fn id_of(&self, device_slot: usize, control_index: usize) -> ControlId {
        ControlId {
            device: device_slot,
            control: control_index,
        }
    }

    /// True iff the control and all controls beneath it are at their resting
    /// values. Aggregate nodes (sticks, whole devices) are at default exactly
    /// when every leaf under them is.
    pub fn is_at_default(&self, id: ControlId) -> bool {
        let Some(device) = self.device(id.device) else {
            return true;
        };
        let Some(control) = device.control(id.control) else {
            return true;
        };
        if !control.value.is_default() {
            return false;
        }
        control.children().all(|child| {
            self.is_at_default(ControlId {
                device: id.device,
                control: child,
            })
        })
    }

    /// Write raw state into a control. Shape-checked; the tree never changes
    /// a control's value shape after construction.
    pub fn set_value(&mut self, id: ControlId, value: ControlValue) -> Result<(), TreeError> {
        let device = self
            .devices
            .get_mut(id.device)
            .and_then(Option::as_mut)
            .ok_or(TreeError::NoSuchControl)?;
        let control = device
            .controls
            .get_mut(id.control)
            .ok_or(TreeError::NoSuchControl)?;
        if !control.value.same_shape(&value) {
            return Err(TreeError::ShapeMismatch {
                expected: control.value.shape(),
                got: value.shape(),
            });
        }
        control.value = value;
        Ok(())
    }

    /// Exact lookup of a control by its stable path string.
    pub fn find_by_path(&self, path: &str) -> Option<ControlId> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut components = path.split('/');
        let device_name = components.next()?.to_lowercase();

        let (slot, device) = self
            .devices()
            .find(|(_, d)| d.name().to_lowercase() == device_name)?;

        let mut index = 0usize;
        for component in components {
            index = device.control(index)?.child(component)?;
        }
        Some(ControlId {
            device: slot,
            control: index,
        })
    }
}
