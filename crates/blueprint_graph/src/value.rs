// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values carried by data pins.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Element type of a [`Mat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatDataType {
    /// Unspecified; consumers keep the input's type
    #[default]
    Undefined,
    /// 8-bit integer samples
    Int8,
    /// 16-bit integer samples
    Int16,
    /// 16-bit float samples
    Float16,
    /// 32-bit float samples
    Float32,
}

impl MatDataType {
    /// Stable numeric code used in persisted documents
    pub fn code(self) -> i64 {
        match self {
            Self::Undefined => -1,
            Self::Int8 => 0,
            Self::Int16 => 1,
            Self::Float16 => 2,
            Self::Float32 => 3,
        }
    }

    /// Inverse of [`MatDataType::code`]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::Undefined),
            0 => Some(Self::Int8),
            1 => Some(Self::Int16),
            2 => Some(Self::Float16),
            3 => Some(Self::Float32),
            _ => None,
        }
    }
}

/// Largest number of samples a single [`Mat`] may hold
pub const MAX_MAT_SAMPLES: usize = 1 << 28;

/// Where a [`Mat`]'s samples live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatDevice {
    /// Host memory
    #[default]
    Cpu,
    /// Accelerator memory on the given device index
    Gpu(u32),
}

/// Opaque media frame handle.
///
/// Samples are shared, so cloning a `Mat` never copies pixel data. Producers
/// build a new `Mat` instead of mutating one that has been published on a pin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mat {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Channels per pixel
    pub channels: usize,
    /// Element type tag
    pub data_type: MatDataType,
    /// Storage location
    pub device: MatDevice,
    /// Presentation time stamp in seconds
    pub time_stamp: f64,
    /// Frame rate as (numerator, denominator)
    pub rate: (i32, i32),
    /// Producer-defined flags
    pub flags: u32,
    data: Arc<[f32]>,
}

impl Mat {
    /// Number of samples in a frame of the given size, or `None` when the
    /// size overflows or exceeds [`MAX_MAT_SAMPLES`]
    pub fn sample_count(width: usize, height: usize, channels: usize) -> Option<usize> {
        width
            .checked_mul(height)?
            .checked_mul(channels)
            .filter(|&count| count <= MAX_MAT_SAMPLES)
    }

    /// Create a frame filled with `value`; an oversized frame comes back empty
    pub fn filled(width: usize, height: usize, channels: usize, value: f32) -> Self {
        match Self::sample_count(width, height, channels) {
            Some(count) => Self::from_samples(width, height, channels, vec![value; count]),
            None => Self::default(),
        }
    }

    /// Create a frame from row-major interleaved samples.
    ///
    /// `samples.len()` must equal `width * height * channels`; a mismatched
    /// buffer produces an empty frame.
    pub fn from_samples(width: usize, height: usize, channels: usize, samples: Vec<f32>) -> Self {
        if Self::sample_count(width, height, channels) != Some(samples.len()) {
            return Self::default();
        }
        Self {
            width,
            height,
            channels,
            data_type: MatDataType::Float32,
            device: MatDevice::Cpu,
            time_stamp: 0.0,
            rate: (0, 1),
            flags: 0,
            data: samples.into(),
        }
    }

    /// Whether the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the size fields still describe the sample buffer
    pub fn is_consistent(&self) -> bool {
        Self::sample_count(self.width, self.height, self.channels) == Some(self.data.len())
    }

    /// All samples, row-major interleaved
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Sample at pixel (`x`, `y`), channel `c`
    pub fn sample(&self, x: usize, y: usize, c: usize) -> Option<f32> {
        if x >= self.width || y >= self.height || c >= self.channels {
            return None;
        }
        let index = y
            .checked_mul(self.width)?
            .checked_add(x)?
            .checked_mul(self.channels)?
            .checked_add(c)?;
        self.data.get(index).copied()
    }

    /// Copy timing metadata from another frame
    pub fn with_timing_of(mut self, other: &Mat) -> Self {
        self.time_stamp = other.time_stamp;
        self.rate = other.rate;
        self.flags = other.flags;
        self
    }
}

/// Value stored on a data pin
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PinValue {
    /// No value
    #[default]
    Empty,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f32),
    /// 2D vector
    Vec2([f32; 2]),
    /// 3D vector
    Vec3([f32; 3]),
    /// 4D vector
    Vec4([f32; 4]),
    /// RGBA color
    Color([f32; 4]),
    /// String
    String(String),
    /// Media frame
    Mat(Mat),
}

impl PinValue {
    /// Whether this is [`PinValue::Empty`] or an empty frame
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Mat(mat) => mat.is_empty(),
            _ => false,
        }
    }

    /// Extract as float, accepting integers and booleans
    pub fn as_float(&self, default: f32) -> f32 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f32,
            Self::Bool(v) => f32::from(u8::from(*v)),
            _ => default,
        }
    }

    /// Extract as integer, truncating floats
    pub fn as_int(&self, default: i64) -> i64 {
        match self {
            Self::Int(v) => *v,
            Self::Float(v) => *v as i64,
            Self::Bool(v) => i64::from(*v),
            _ => default,
        }
    }

    /// Extract as boolean; numbers are true when non-zero
    pub fn as_bool(&self, default: bool) -> bool {
        match self {
            Self::Bool(v) => *v,
            Self::Int(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            _ => default,
        }
    }

    /// Borrow as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as frame
    pub fn as_mat(&self) -> Option<&Mat> {
        match self {
            Self::Mat(mat) => Some(mat),
            _ => None,
        }
    }

    /// Take the frame, or an empty one
    pub fn into_mat(self) -> Mat {
        match self {
            Self::Mat(mat) => mat,
            _ => Mat::default(),
        }
    }
}

impl From<Mat> for PinValue {
    fn from(mat: Mat) -> Self {
        Self::Mat(mat)
    }
}

impl From<f32> for PinValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PinValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
