// SPDX-License-Identifier: MIT OR Apache-2.0
//! Small node types used by the unit tests.

use crate::codec::LoadError;
use crate::context::{Context, ExecResult};
use crate::document::{IdRemap, LoadStatus, NodeDocument};
use crate::node::{Node, NodeBase, NodeId, NodeKind, NodeType, NodeTypeInfo};
use crate::pin::{Pin, PinId, PinType};
use crate::value::PinValue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Entry point with a single `Exit` flow pin
pub struct StartNode {
    base: NodeBase,
    pub exit: Pin,
}

static START_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test Start",
    version: 1,
    kind: NodeKind::EntryPoint,
    catalog: "System",
};

impl NodeType for StartNode {
    fn type_info() -> &'static NodeTypeInfo {
        &START_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Start"),
            exit: Pin::flow_output(id, "Exit"),
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
        vec![&self.exit]
    }

    fn execute(&self, _ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        Ok(Some(self.exit.id()))
    }

    fn auto_link_output_flow_pin(&self) -> Option<&Pin> {
        Some(&self.exit)
    }
}

/// Exit point that stores whatever arrives on `In`
pub struct EndNode {
    base: NodeBase,
    pub enter: Pin,
    pub input: Pin,
    /// Clear the call stack when executed
    pub clear_stack: bool,
}

static END_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test End",
    version: 1,
    kind: NodeKind::ExitPoint,
    catalog: "Exit",
};

impl NodeType for EndNode {
    fn type_info() -> &'static NodeTypeInfo {
        &END_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "End"),
            enter: Pin::flow_input(id, "End"),
            input: Pin::input(id, "In", PinType::Any),
            clear_stack: true,
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
        vec![&self.enter, &self.input]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        let value = ctx.get_pin_value(&self.input)?;
        self.input.set_value(value);
        if self.clear_stack {
            ctx.clear_call_stack();
        }
        Ok(None)
    }

    fn auto_link_input_flow_pin(&self) -> Option<&Pin> {
        Some(&self.enter)
    }

    fn auto_link_input_data_pins(&self) -> Vec<&Pin> {
        vec![&self.input]
    }
}

/// Flow node computing `Out = In * Gain`
pub struct PassNode {
    base: NodeBase,
    pub enter: Pin,
    pub input: Pin,
    pub gain: Pin,
    pub exit: Pin,
    pub out: Pin,
    /// Return no exit pin
    pub halt: bool,
    /// Return the entry pin instead of the exit pin
    pub return_entry: bool,
    pub last_entry: Mutex<Option<PinId>>,
    calls: AtomicUsize,
}

static PASS_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test Pass",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Test#Flow",
};

impl NodeType for PassNode {
    fn type_info() -> &'static NodeTypeInfo {
        &PASS_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Pass"),
            enter: Pin::flow_input(id, "Enter"),
            input: Pin::input(id, "In", PinType::Float),
            gain: Pin::input(id, "Gain", PinType::Float).with_default(PinValue::Float(1.0)),
            exit: Pin::flow_output(id, "Exit"),
            out: Pin::output(id, "Out", PinType::Float),
            halt: false,
            return_entry: false,
            last_entry: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }
}

impl PassNode {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Node for PassNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &PASS_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.enter, &self.input, &self.gain]
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.exit, &self.out]
    }

    fn execute(&self, ctx: &mut Context<'_>, entry: Option<PinId>, _threading: bool) -> ExecResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_entry.lock() = entry;
        let input = ctx.get_pin_value(&self.input)?.as_float(0.0);
        let gain = ctx.get_pin_value(&self.gain)?.as_float(1.0);
        ctx.set_pin_value(&self.out, PinValue::Float(input * gain));

        if self.return_entry {
            return Ok(Some(self.enter.id()));
        }
        if self.halt {
            return Ok(None);
        }
        Ok(Some(self.exit.id()))
    }

    fn auto_link_input_flow_pin(&self) -> Option<&Pin> {
        Some(&self.enter)
    }

    fn auto_link_output_flow_pin(&self) -> Option<&Pin> {
        Some(&self.exit)
    }

    fn auto_link_input_data_pins(&self) -> Vec<&Pin> {
        vec![&self.input]
    }

    fn auto_link_output_data_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }
}

/// Data-only source publishing `value` on `Out`; negative values fail
pub struct CounterNode {
    base: NodeBase,
    pub out: Pin,
    pub value: f32,
    calls: AtomicUsize,
}

static COUNTER_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test Counter",
    version: 2,
    kind: NodeKind::Internal,
    catalog: "Test#Data",
};

impl CounterNode {
    /// Number of times `execute` ran
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NodeType for CounterNode {
    fn type_info() -> &'static NodeTypeInfo {
        &COUNTER_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Counter"),
            out: Pin::output(id, "Out", PinType::Float),
            value: 1.0,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Node for CounterNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &COUNTER_INFO
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.value < 0.0 {
            ctx.report_error(self.id(), "negative value");
            return Ok(None);
        }
        ctx.set_pin_value(&self.out, PinValue::Float(self.value));
        Ok(None)
    }

    fn load(&mut self, doc: &NodeDocument, status: &mut LoadStatus) -> Result<(), LoadError> {
        self.base.load(&COUNTER_INFO, doc, status)?;
        let id = self.id();
        doc.read("value", &mut self.value, id, status);
        Ok(())
    }

    fn save(&self, doc: &mut NodeDocument, remap: &IdRemap) {
        self.base.save(&COUNTER_INFO, doc, remap);
        doc.set("value", f64::from(self.value));
    }

    fn auto_link_output_data_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }
}

/// Data-only node computing `Out = A + B`
pub struct SumNode {
    base: NodeBase,
    pub a: Pin,
    pub b: Pin,
    pub out: Pin,
    calls: AtomicUsize,
}

static SUM_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test Sum",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Test#Data",
};

impl SumNode {
    /// Number of times `execute` ran
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NodeType for SumNode {
    fn type_info() -> &'static NodeTypeInfo {
        &SUM_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Sum"),
            a: Pin::input(id, "A", PinType::Float),
            b: Pin::input(id, "B", PinType::Float),
            out: Pin::output(id, "Out", PinType::Float),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Node for SumNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &SUM_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.a, &self.b]
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.out]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let a = ctx.get_pin_value(&self.a)?.as_float(0.0);
        let b = ctx.get_pin_value(&self.b)?.as_float(0.0);
        ctx.set_pin_value(&self.out, PinValue::Float(a + b));
        Ok(None)
    }
}

/// Flow node with two flow inputs, `A` and `B`
pub struct MergeNode {
    base: NodeBase,
    pub a: Pin,
    pub b: Pin,
    pub exit: Pin,
}

static MERGE_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test Merge",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Test#Flow",
};

impl NodeType for MergeNode {
    fn type_info() -> &'static NodeTypeInfo {
        &MERGE_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Merge"),
            a: Pin::flow_input(id, "A"),
            b: Pin::flow_input(id, "B"),
            exit: Pin::flow_output(id, "Exit"),
        }
    }
}

impl Node for MergeNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &MERGE_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.a, &self.b]
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.exit]
    }

    fn execute(&self, _ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        Ok(Some(self.exit.id()))
    }
}

/// Flow node that waits for a stop request, then leaves `Out` untouched
pub struct SpinNode {
    base: NodeBase,
    pub enter: Pin,
    pub exit: Pin,
    pub out: Pin,
    pub started: AtomicBool,
    pub stops: AtomicUsize,
    guard: Mutex<()>,
}

static SPIN_INFO: NodeTypeInfo = NodeTypeInfo {
    name: "Test Spin",
    version: 1,
    kind: NodeKind::Internal,
    catalog: "Test#Flow",
};

impl NodeType for SpinNode {
    fn type_info() -> &'static NodeTypeInfo {
        &SPIN_INFO
    }

    fn create(id: NodeId) -> Self {
        Self {
            base: NodeBase::new(id, "Spin"),
            enter: Pin::flow_input(id, "Enter"),
            exit: Pin::flow_output(id, "Exit"),
            out: Pin::output(id, "Out", PinType::Float),
            started: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
            guard: Mutex::new(()),
        }
    }
}

impl Node for SpinNode {
    fn info(&self) -> &'static NodeTypeInfo {
        &SPIN_INFO
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn input_pins(&self) -> Vec<&Pin> {
        vec![&self.enter]
    }

    fn output_pins(&self) -> Vec<&Pin> {
        vec![&self.exit, &self.out]
    }

    fn execute(&self, ctx: &mut Context<'_>, _entry: Option<PinId>, _threading: bool) -> ExecResult {
        self.started.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !ctx.stop_requested() && Instant::now() < deadline {
            std::thread::yield_now();
        }

        let _guard = self.guard.lock();
        if !ctx.stop_requested() {
            ctx.set_pin_value(&self.out, PinValue::Float(1.0));
        }
        Ok(Some(self.exit.id()))
    }

    fn on_stop(&self) {
        let _guard = self.guard.lock();
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.out.clear_value();
    }
}
