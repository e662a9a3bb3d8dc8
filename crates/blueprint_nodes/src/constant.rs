// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data-only source nodes.
//!
//! Sources have no flow pins. They run when a consumer pulls their output,
//! at most once per run.

use blueprint_graph::{
    Context, ExecResult, IdRemap, LoadError, LoadStatus, Mat, Node, NodeBase, NodeDocument, NodeId,
    NodeKind, NodeType, NodeTypeInfo, Pin, PinId, PinType, PinValue,
};
use serde::{Deserialize, Serialize};

/// Publishes a fixed number
pub struct FloatNode {
    base: NodeBase,
    out: Pin,
    /// Published value
    pub value: f32,
}

static FLOAT_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Float",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Constant",
};

impl FloatNode {
    /// The value output
    pub fn out_pin(&self) -> &Pin {
        &self.out
    }
}

impl NodeType for FloatNode {
    fn type_info() -> &'static NodeTypeInfo {
        &FLOAT_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Float"),
            out: Pin::output(id, "Out", PinType::Float),
            value: 0.0,
        }
    }
}

impl Node for FloatNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &FLOAT_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        Vec::new()
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        ctx.set_pin_value(&self.out, PinValue::Float(self.value));
        Ok(None)
    }

    fn load(&mut self, doc: &NodeDocument, status: &mut LoadStatus) -> Result<(), LoadError> {
        self.base.load(&FLOAT_INFO, doc, status)?;
        let id = self.id();
        doc.read("value", &mut self.value, id, status);
        Ok(())
    }

    fn save(&self, doc: &mut NodeDocument, remap: &IdRemap) {
        self.base.save(&FLOAT_INFO, doc, remap);
        doc.set("value", f64::from(self.value));
    }

    fn auto_link_output_data_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }
}

/// Test pattern drawn by [`MatSourceNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pattern {
    /// Every sample equals the fill value
    #[default]
    Solid,
    /// Horizontal ramp from zero up to the fill value
    Gradient,
}

/// Generates a test-pattern frame
pub struct MatSourceNode {
    base: NodeBase,
    out: Pin,
    /// Frame width in pixels
    pub width: usize,
    /// Frame height in pixels
    pub height: usize,
    /// Channels per pixel
    pub channels: usize,
    /// Sample value
    pub fill: f32,
    /// Pattern to draw
    pub pattern: Pattern,
}

static MAT_SOURCE_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Mat Source",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Media#Source",
};

impl MatSourceNode {
    /// The frame output
    pub fn out_pin(&self) -> &Pin {
        &self.out
    }

    /// Draw the configured pattern; an unrepresentable size gives an empty frame
    pub fn render(&self) -> Mat {
        let (width, height, channels) = (self.width, self.height, self.channels);
        let Some(count) = Mat::sample_count(width, height, channels) else {
            return Mat::default();
        };
        match self.pattern {
            Pattern::Solid => Mat::filled(width, height, channels, self.fill),
            Pattern::Gradient => {
                let mut samples = Vec::with_capacity(count);
                for _ in 0..height {
                    for x in 0..width {
                        let ramp = if width > 1 {
                            x as f32 / (width - 1) as f32
                        } else {
                            1.0
                        };
                        samples.extend(std::iter::repeat(ramp * self.fill).take(channels));
                    }
                }
                Mat::from_samples(width, height, channels, samples)
            }
        }
    }
}

impl NodeType for MatSourceNode {
    fn type_info() -> &'static NodeTypeInfo {
        &MAT_SOURCE_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Mat Source"),
            out: Pin::output(id, "Out", PinType::Mat),
            width: 64,
            height: 64,
            channels: 4,
            fill: 1.0,
            pattern: Pattern::Solid,
        }
    }
}

impl Node for MatSourceNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &MAT_SOURCE_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        Vec::new()
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        if !matches!(
            Mat::sample_count(self.width, self.height, self.channels),
            Some(count) if count > 0
        ) {
            ctx.report_error(
                self.id(),
                format!(
                    "invalid frame size {}x{}x{}",
                    self.width, self.height, self.channels
                ),
            );
            return Ok(None);
        }
        ctx.set_pin_value(&self.out, PinValue::Mat(self.render()));
        Ok(None)
    }

    fn load(&mut self, doc: &NodeDocument, status: &mut LoadStatus) -> Result<(), LoadError> {
        self.base.load(&MAT_SOURCE_INFO, doc, status)?;
        let id = self.id();
        doc.read("width", &mut self.width, id, status);
        doc.read("height", &mut self.height, id, status);
        doc.read("channels", &mut self.channels, id, status);
        doc.read("fill", &mut self.fill, id, status);
        doc.read("pattern", &mut self.pattern, id, status);
        Ok(())
    }

    fn save(&self, doc: &mut NodeDocument, remap: &IdRemap) {
        self.base.save(&MAT_SOURCE_INFO, doc, remap);
        doc.set("width", self.width);
        doc.set("height", self.height);
        doc.set("channels", self.channels);
        doc.set("fill", f64::from(self.fill));
        doc.set_serialized("pattern", &self.pattern);
    }

    fn auto_link_output_data_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }
}
