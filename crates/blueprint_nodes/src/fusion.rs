// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transition nodes blending two video streams.

use crate::blit::{BlitJob, Layer, MatBlitter};
use blueprint_graph::{
    Compute, ComputeError, Context, ExecResult, IdRemap, LoadError, LoadStatus, Mat, MatDataType,
    MatDevice, Node, NodeBase, NodeDocument, NodeId, NodeKind, NodeType, NodeTypeInfo, Pin, PinId,
    PinType, PinValue, ResourceSlot,
};
use serde_json::Value;

/// Direction the incoming frame moves in from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MoveType {
    /// Second frame enters from the right edge
    #[default]
    Right,
    /// Second frame enters from the left edge
    Left,
    /// Second frame enters from the bottom edge
    Bottom,
    /// Second frame enters from the top edge
    Top,
}

impl MoveType {
    /// Stable numeric code used in persisted documents
    pub fn code(self) -> i64 {
        match self {
            Self::Right => 0,
            Self::Left => 1,
            Self::Bottom => 2,
            Self::Top => 3,
        }
    }

    /// Inverse of [`MoveType::code`]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Right),
            1 => Some(Self::Left),
            2 => Some(Self::Bottom),
            3 => Some(Self::Top),
            _ => None,
        }
    }

    /// Offsets of the first and second frame at progress `pos` on a
    /// `width` x `height` canvas
    pub fn offsets(self, pos: f32, width: usize, height: usize) -> [[i64; 2]; 2] {
        let (w, h) = (width as f32, height as f32);
        let lead = |extent: f32| (pos * extent) as i64;
        let trail = |extent: f32| ((1.0 - pos) * extent) as i64;
        match self {
            Self::Right => [[-lead(w), 0], [trail(w), 0]],
            Self::Left => [[lead(w), 0], [-trail(w), 0]],
            Self::Bottom => [[0, -lead(h)], [0, trail(h)]],
            Self::Top => [[0, lead(h)], [0, -trail(h)]],
        }
    }
}

/// Move transition.
///
/// `Pos` runs from 0 (only `In 1` visible) to 1 (only `In 2` visible); the
/// second frame pushes the first off the canvas in the configured direction.
/// When disabled, `In 1` passes through unchanged.
pub struct MoveFusionNode {
    base: NodeBase,
    enter: Pin,
    first: Pin,
    second: Pin,
    pos: Pin,
    exit: Pin,
    out: Pin,
    /// Direction of the move
    pub move_type: MoveType,
    /// Element type of the output; `Undefined` keeps `In 1`'s type
    pub mat_type: MatDataType,
    blitter: ResourceSlot<MatDevice, MatBlitter>,
}

static MOVE_FUSION_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Move Transform",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Fusion#Video#Move",
};

impl MoveFusionNode {
    /// The input flow pin
    pub fn enter_pin(&self) -> &Pin {
        &self.enter
    }

    /// The outgoing frame
    pub fn first_pin(&self) -> &Pin {
        &self.first
    }

    /// The incoming frame
    pub fn second_pin(&self) -> &Pin {
        &self.second
    }

    /// Transition progress
    pub fn pos_pin(&self) -> &Pin {
        &self.pos
    }

    /// The output flow pin
    pub fn exit_pin(&self) -> &Pin {
        &self.exit
    }

    /// The blended frame
    pub fn out_pin(&self) -> &Pin {
        &self.out
    }

    /// Device the blitter is currently bound to
    pub fn blitter_device(&self) -> Option<MatDevice> {
        self.blitter.lock().key().copied()
    }

    fn job(&self, first: &Mat, second: Mat, pos: f32) -> BlitJob {
        let [first_offset, second_offset] = self.move_type.offsets(pos, first.width, first.height);
        let data_type = match self.mat_type {
            MatDataType::Undefined => first.data_type,
            other => other,
        };
        BlitJob {
            width: first.width,
            height: first.height,
            channels: first.channels,
            data_type,
            layers: vec![
                Layer {
                    mat: first.clone(),
                    offset: first_offset,
                },
                Layer {
                    mat: second,
                    offset: second_offset,
                },
            ],
        }
    }
}

impl NodeType for MoveFusionNode {
    fn type_info() -> &'static NodeTypeInfo {
        &MOVE_FUSION_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Move Transform"),
            enter: Pin::flow_input(id, "Enter"),
            first: Pin::input(id, "In 1", PinType::Mat),
            second: Pin::input(id, "In 2", PinType::Mat),
            pos: Pin::input(id, "Pos", PinType::Float),
            exit: Pin::flow_output(id, "Exit"),
            out: Pin::output(id, "Out", PinType::Mat),
            move_type: MoveType::Right,
            mat_type: MatDataType::Undefined,
            blitter: ResourceSlot::new(),
        }
    }
}

impl Node for MoveFusionNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &MOVE_FUSION_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.enter, &self.first, &self.second, &self.pos]
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.exit, &self.out]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        let first = ctx.get_pin_value(&self.first)?.into_mat();
        let second = ctx.get_pin_value(&self.second)?.into_mat();
        let pos = ctx.get_pin_value(&self.pos)?.as_float(0.0).clamp(0.0, 1.0);
        if first.is_empty() || second.is_empty() {
            return Ok(Some(self.exit.id()));
        }

        let mut slot = self.blitter.lock();
        if !self.is_enabled() {
            ctx.set_pin_value(&self.out, PinValue::Mat(first));
            return Ok(Some(self.exit.id()));
        }

        let job = self.job(&first, second, pos);
        let blitter = match slot.get_or_create(&first.device, |device| {
            Ok::<_, ComputeError>(MatBlitter::new(*device))
        }) {
            Ok(blitter) => blitter,
            Err(e) => {
                ctx.report_error(self.id(), e.to_string());
                return Ok(None);
            }
        };

        match blitter.compute(&job) {
            Ok(computed) => {
                ctx.record_cost(self.id(), computed.cost);
                // A stop that already cleared the output wins
                if !ctx.stop_requested() {
                    let out = computed.output.with_timing_of(&first);
                    ctx.set_pin_value(&self.out, PinValue::Mat(out));
                }
                Ok(Some(self.exit.id()))
            }
            Err(e) => {
                ctx.report_error(self.id(), e.to_string());
                Ok(None)
            }
        }
    }

    fn on_stop(&self) {
        let _slot = self.blitter.lock();
        self.out.set_value(PinValue::Mat(Mat::default()));
    }

    fn load(&mut self, doc: &NodeDocument, status: &mut LoadStatus) -> Result<(), LoadError> {
        self.base.load(&MOVE_FUSION_INFO, doc, status)?;
        let id = self.id();
        doc.read_with("mat_type", &mut self.mat_type, id, status, |v: &Value| {
            v.as_i64().and_then(MatDataType::from_code)
        });
        doc.read_with("move_type", &mut self.move_type, id, status, |v: &Value| {
            v.as_i64().and_then(MoveType::from_code)
        });
        Ok(())
    }

    fn save(&self, doc: &mut NodeDocument, remap: &IdRemap) {
        self.base.save(&MOVE_FUSION_INFO, doc, remap);
        doc.set("mat_type", self.mat_type.code());
        doc.set("move_type", self.move_type.code());
    }

    fn auto_link_input_flow_pin(&self) -> Option<&Pin> {
        Some(&self.enter)
    }

    fn auto_link_output_flow_pin(&self) -> Option<&Pin> {
        Some(&self.exit)
    }

    fn auto_link_input_data_pins(&self) -> Vec<&Pin> {
        vec![&self.first, &self.second]
    }

    fn auto_link_output_data_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }
}
