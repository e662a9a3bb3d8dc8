// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use crate::node::NodeId;
use crate::value::{Mat, PinValue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Type tag declared by a pin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Control flow, carries no value
    Flow,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// 4D vector
    Vec4,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Media frame / buffer handle
    Mat,
    /// Wildcard data type
    Any,
    /// Custom type
    Custom(String),
}

impl PinType {
    /// Whether this is the control-flow tag
    pub fn is_flow(&self) -> bool {
        matches!(self, Self::Flow)
    }

    /// Check if an explicit link may join this type to another type
    pub fn can_connect_to(&self, other: &PinType) -> bool {
        // Flow only ever joins flow
        if self.is_flow() || other.is_flow() {
            return self.is_flow() && other.is_flow();
        }

        if self.matches(other) {
            return true;
        }

        // Implicit conversions
        match (self, other) {
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            (Self::Bool, Self::Int | Self::Float) => true,
            (Self::Float, Self::Vec2 | Self::Vec3 | Self::Vec4) => true,
            (Self::Color, Self::Vec4) | (Self::Vec4, Self::Color) => true,
            _ => false,
        }
    }

    /// Strict match used by auto-linking: same data type, or a wildcard side
    pub fn matches(&self, other: &PinType) -> bool {
        if self.is_flow() || other.is_flow() {
            return false;
        }
        matches!(self, Self::Any) || matches!(other, Self::Any) || self == other
    }

    /// Empty value for this type
    pub fn default_value(&self) -> PinValue {
        match self {
            Self::Bool => PinValue::Bool(false),
            Self::Int => PinValue::Int(0),
            Self::Float => PinValue::Float(0.0),
            Self::Vec2 => PinValue::Vec2([0.0; 2]),
            Self::Vec3 => PinValue::Vec3([0.0; 3]),
            Self::Vec4 => PinValue::Vec4([0.0; 4]),
            Self::Color => PinValue::Color([0.0; 4]),
            Self::String => PinValue::String(String::new()),
            Self::Mat => PinValue::Mat(Mat::default()),
            Self::Flow | Self::Any | Self::Custom(_) => PinValue::Empty,
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A typed, named slot on a node.
///
/// Identity, owner, direction and type are fixed at construction. The value
/// lives behind a lock and is always replaced whole, so a reader sees either
/// the previous value or the new one.
pub struct Pin {
    id: PinId,
    name: String,
    owner: NodeId,
    direction: PinDirection,
    pin_type: PinType,
    value: RwLock<PinValue>,
}

impl Pin {
    /// Create a new pin with a fresh ID
    pub fn new(
        owner: NodeId,
        name: impl Into<String>,
        pin_type: PinType,
        direction: PinDirection,
    ) -> Self {
        let value = pin_type.default_value();
        Self {
            id: PinId::new(),
            name: name.into(),
            owner,
            direction,
            pin_type,
            value: RwLock::new(value),
        }
    }

    /// Create an input flow pin
    pub fn flow_input(owner: NodeId, name: impl Into<String>) -> Self {
        Self::new(owner, name, PinType::Flow, PinDirection::Input)
    }

    /// Create an output flow pin
    pub fn flow_output(owner: NodeId, name: impl Into<String>) -> Self {
        Self::new(owner, name, PinType::Flow, PinDirection::Output)
    }

    /// Create an input data pin
    pub fn input(owner: NodeId, name: impl Into<String>, pin_type: PinType) -> Self {
        Self::new(owner, name, pin_type, PinDirection::Input)
    }

    /// Create an output data pin
    pub fn output(owner: NodeId, name: impl Into<String>, pin_type: PinType) -> Self {
        Self::new(owner, name, pin_type, PinDirection::Output)
    }

    /// Set the initial value
    pub fn with_default(self, value: PinValue) -> Self {
        *self.value.write() = value;
        self
    }

    /// Pin ID
    pub fn id(&self) -> PinId {
        self.id
    }

    /// Pin name, unique among the owner's pins of the same direction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning node
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Pin direction
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Declared type
    pub fn pin_type(&self) -> &PinType {
        &self.pin_type
    }

    /// Whether this is a flow pin
    pub fn is_flow(&self) -> bool {
        self.pin_type.is_flow()
    }

    /// Whether this is an input pin
    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    /// Last value stored on this pin
    pub fn value(&self) -> PinValue {
        self.value.read().clone()
    }

    /// Replace the stored value.
    ///
    /// Within a run, prefer [`Context::set_pin_value`](crate::Context::set_pin_value),
    /// which also marks the value fresh for consumers.
    pub fn set_value(&self, value: PinValue) {
        *self.value.write() = value;
    }

    /// Revert to the type's empty value
    pub fn clear_value(&self) {
        self.set_value(self.pin_type.default_value());
    }

    /// Check if a link from this pin to `other` is valid
    pub fn can_link_to(&self, other: &Pin) -> bool {
        self.direction == PinDirection::Output
            && other.direction == PinDirection::Input
            && self.pin_type.can_connect_to(&other.pin_type)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("direction", &self.direction)
            .field("pin_type", &self.pin_type)
            .finish_non_exhaustive()
    }
}
