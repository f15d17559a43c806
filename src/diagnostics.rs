//! Interpreter observability hooks (ambient stack, SPEC_FULL.md §2.4).
//!
//! Grounded directly on the grounding codebase's `tracer.rs`: a zero-cost
//! generic-parameter trait with all-default no-op methods, rather than the
//! `log`/`tracing` crates (the grounding codebase has neither as a
//! dependency), so a release build compiled against [`NoopTracer`] optimizes
//! every call site away.

use crate::exception::CodeLoc;
use crate::op::Instr;
use crate::sharp_edge::SharpEdgeEvent;

/// Observes interpreter dispatch events during compilation.
///
/// All methods default to doing nothing; implement only the ones you need,
/// mirroring `VmTracer`'s all-default-methods shape.
pub trait CompileTracer {
    fn on_instruction(&mut self, _loc: CodeLoc, _instr: &Instr) {}
    fn on_call(&mut self, _callee: &str, _depth: u16) {}
    fn on_return(&mut self, _depth: u16) {}
    fn on_sharp_edge(&mut self, _event: &SharpEdgeEvent) {}
    fn on_unpack(&mut self, _proxy_name: &str) {}
}

/// Discards every event. The default tracer; every call site against it
/// should inline to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl CompileTracer for NoopTracer {}

/// Writes each event to stderr, with an optional cap on total lines emitted,
/// grounded on the grounding codebase's `StderrTracer`.
#[derive(Debug)]
pub struct StderrTracer {
    limit: Option<u64>,
    count: u64,
    stopped: bool,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self { limit: None, count: 0, stopped: false }
    }

    #[must_use]
    pub fn with_limit(limit: u64) -> Self {
        Self { limit: Some(limit), count: 0, stopped: false }
    }

    fn tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.count += 1;
        if let Some(limit) = self.limit {
            if self.count > limit {
                self.stopped = true;
                return false;
            }
        }
        true
    }
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileTracer for StderrTracer {
    fn on_instruction(&mut self, loc: CodeLoc, instr: &Instr) {
        if self.tick() {
            eprintln!("[tracekit] {loc}: {:?}", instr.op_name());
        }
    }

    fn on_call(&mut self, callee: &str, depth: u16) {
        if self.tick() {
            eprintln!("[tracekit] call {callee} (depth {depth})");
        }
    }

    fn on_return(&mut self, depth: u16) {
        if self.tick() {
            eprintln!("[tracekit] return (depth {depth})");
        }
    }

    fn on_sharp_edge(&mut self, event: &SharpEdgeEvent) {
        if self.tick() {
            eprintln!("[tracekit] sharp edge: {event}");
        }
    }

    fn on_unpack(&mut self, proxy_name: &str) {
        if self.tick() {
            eprintln!("[tracekit] unpack {proxy_name}");
        }
    }
}

/// Counts how many times each opcode was dispatched, grounded on the
/// grounding codebase's `ProfilingTracer`.
#[derive(Debug, Default)]
pub struct ProfilingTracer {
    counts: ahash::AHashMap<crate::op::OpName, u64>,
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn counts(&self) -> &ahash::AHashMap<crate::op::OpName, u64> {
        &self.counts
    }
}

impl CompileTracer for ProfilingTracer {
    fn on_instruction(&mut self, _loc: CodeLoc, instr: &Instr) {
        *self.counts.entry(instr.op_name()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{CompileTracer, ProfilingTracer, StderrTracer};
    use crate::exception::CodeLoc;
    use crate::op::{Instr, OpName};

    #[test]
    fn stderr_tracer_stops_after_limit() {
        let mut tracer = StderrTracer::with_limit(1);
        let loc = CodeLoc { instr_index: 0, frame_depth: 0 };
        tracer.on_instruction(loc, &Instr::PopTop);
        assert!(!tracer.stopped);
        tracer.on_instruction(loc, &Instr::PopTop);
        assert!(tracer.stopped);
    }

    #[test]
    fn profiling_tracer_counts_by_opcode() {
        let mut tracer = ProfilingTracer::new();
        let loc = CodeLoc { instr_index: 0, frame_depth: 0 };
        tracer.on_instruction(loc, &Instr::PopTop);
        tracer.on_instruction(loc, &Instr::PopTop);
        assert_eq!(tracer.counts().get(&OpName::PopTop), Some(&2));
    }
}
