// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entry and exit nodes.

use blueprint_graph::{
    Context, ExecResult, Node, NodeBase, NodeId, NodeKind, NodeType, NodeTypeInfo, Pin, PinId,
    PinType,
};

/// Where every run begins
pub struct StartNode {
    base: NodeBase,
    start: Pin,
}

static START_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Start",
    version: 1,
    kind: NodeKind::EntryPoint,
    catalog: "System",
};

impl StartNode {
    /// The output flow pin
    pub fn start_pin(&self) -> &Pin {
        &self.start
    }
}

impl NodeType for StartNode {
    fn type_info() -> &'static NodeTypeInfo {
        &START_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Start"),
            start: Pin::flow_output(id, "Start"),
        }
    }
}

impl Node for StartNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &START_INFO
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
        vec![&self.start]
    }

    fn execute(&self, _ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        Ok(Some(self.start.id()))
    }

    fn auto_link_output_flow_pin(&self) -> Option<&Pin> {
        Some(&self.start)
    }
}

/// Filter exit point.
///
/// Pulls the final frame, keeps it on its `In` pin for the host to read and
/// ends the run.
pub struct EndNode {
    base: NodeBase,
    end: Pin,
    input: Pin,
}

static END_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "End",
    version: 1,
    kind: NodeKind::ExitPoint,
    catalog: "System",
};

impl EndNode {
    /// The input flow pin
    pub fn end_pin(&self) -> &Pin {
        &self.end
    }

    /// The frame input
    pub fn input_pin(&self) -> &Pin {
        &self.input
    }

    /// Frame received by the last run
    pub fn frame(&self) -> blueprint_graph::Mat {
        self.input.value().into_mat()
    }
}

impl NodeType for EndNode {
    fn type_info() -> &'static NodeTypeInfo {
        &END_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "End"),
            end: Pin::flow_input(id, "End"),
            input: Pin::input(id, "In", PinType::Mat),
        }
    }
}

impl Node for EndNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &END_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.end, &self.input]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        let frame = ctx.get_pin_value(&self.input)?;
        self.input.set_value(frame);
        ctx.clear_call_stack();
        Ok(None)
    }

    fn auto_link_input_flow_pin(&self) -> Option<&Pin> {
        Some(&self.end)
    }

    fn auto_link_input_data_pins(&self) -> Vec<&Pin> {
        vec![&self.input]
    }
}
