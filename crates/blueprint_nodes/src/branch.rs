// SPDX-License-Identifier: MIT OR Apache-2.0
//! If/else flow control.

use blueprint_graph::{
    Context, ExecResult, Node, NodeBase, NodeId, NodeKind, NodeType, NodeTypeInfo, Pin, PinId,
    PinType, PinValue,
};

/// Continues through `True` or `False` depending on `Condition`.
///
/// A disabled branch always takes `True`.
pub struct BranchNode {
    base: NodeBase,
    enter: Pin,
    condition: Pin,
    on_true: Pin,
    on_false: Pin,
}

static BRANCH_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Branch",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Flow",
};

impl BranchNode {
    /// The input flow pin
    pub fn enter_pin(&self) -> &Pin {
        &self.enter
    }

    /// The condition input
    pub fn condition_pin(&self) -> &Pin {
        &self.condition
    }

    /// Flow taken when the condition holds
    pub fn true_pin(&self) -> &Pin {
        &self.on_true
    }

    /// Flow taken otherwise
    pub fn false_pin(&self) -> &Pin {
        &self.on_false
    }
}

impl NodeType for BranchNode {
    fn type_info() -> &'static NodeTypeInfo {
        &BRANCH_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Branch"),
            enter: Pin::flow_input(id, "Enter"),
            condition: Pin::input(id, "Condition", PinType::Bool)
                .with_default(PinValue::Bool(true)),
            on_true: Pin::flow_output(id, "True"),
            on_false: Pin::flow_output(id, "False"),
        }
    }
}

impl Node for BranchNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &BRANCH_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.enter, &self.condition]
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.on_true, &self.on_false]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        if !self.is_enabled() {
            return Ok(Some(self.on_true.id()));
        }
        let condition = ctx.get_pin_value(&self.condition)?.as_bool(false);
        tracing::debug!("Branch '{}' takes {}", self.name(), condition);
        if condition {
            Ok(Some(self.on_true.id()))
        } else {
            Ok(Some(self.on_false.id()))
        }
    }

    fn auto_link_input_flow_pin(&self) -> Option<&Pin> {
        Some(&self.enter)
    }

    fn auto_link_output_flow_pin(&self) -> Option<&Pin> {
        Some(&self.on_true)
    }

    fn auto_link_input_data_pins(&self) -> Vec<&Pin> {
        vec![&self.condition]
    }
}
