//! The meta-circular bytecode dispatch loop (C2).
//!
//! Grounded on the grounding codebase's `bytecode/vm/mod.rs` dispatch style:
//! an explicit frame stack walked by a `loop { match instr { ... } }`, with
//! calls pushing a new frame rather than recursing through the host's own
//! call stack (spec.md §4.2 "re-entrant via an explicit frame stack, not via
//! host recursion").

use std::sync::Arc;

use crate::capability::Capability;
use crate::code::Code;
use crate::config::CompileOptions;
use crate::context::CompileContext;
use crate::diagnostics::CompileTracer;
use crate::exception::{CodeLoc, CompileError, InterpSignal, ResourceError};
use crate::frame::{BlockEntry, Frame};
use crate::lookaside::{LookasideAction, resolve_lookaside};
use crate::op::{CompareOp, Instr, UnaryOp};
use crate::primitive::Primitive;
use crate::proxy::{KnownNumber, NumberType, Proxy};
use crate::provenance::{ProvenanceInst, ProvenanceRecord, WrappedValue};
use crate::sharp_edge::WrapDecision;
use crate::trace::{Arg, BoundSymbol, Constraint, TraceCtx};
use crate::value::{OpaqueCallable, Value};

/// Drives symbolic interpretation of one function call, recording bound
/// symbols into `computation` as it goes (spec.md §4.2–§4.5).
pub struct Interpreter<'a, T: CompileTracer> {
    ctx: &'a mut CompileContext,
    computation: &'a mut TraceCtx,
    tracer: &'a mut T,
    frames: Vec<Frame>,
    steps: u64,
}

impl<'a, T: CompileTracer> Interpreter<'a, T> {
    pub fn new(ctx: &'a mut CompileContext, computation: &'a mut TraceCtx, tracer: &'a mut T) -> Self {
        Self { ctx, computation, tracer, frames: Vec::new(), steps: 0 }
    }

    fn options(&self) -> &CompileOptions {
        &self.ctx.options
    }

    /// Runs `code` with `args` to completion, returning its final value.
    pub fn run(&mut self, code: Arc<Code>, args: Vec<WrappedValue>) -> Result<WrappedValue, CompileError> {
        let depth = self.frames.len() as u16;
        if u32::from(depth) >= self.options().limits.max_frame_depth {
            return Err(CompileError::ResourceExhausted(ResourceError::Recursion {
                depth: u32::from(depth),
                limit: self.options().limits.max_frame_depth,
            }));
        }
        self.frames.push(Frame::new(code, args, depth));
        let result = self.dispatch_loop();
        self.frames.pop();
        result
    }

    fn loc(&self) -> CodeLoc {
        let frame = self.frames.last().expect("dispatch loop always has an active frame");
        CodeLoc { instr_index: frame.ip, frame_depth: frame.depth }
    }

    fn dispatch_loop(&mut self) -> Result<WrappedValue, CompileError> {
        loop {
            self.steps += 1;
            if self.steps > self.options().limits.max_steps {
                return Err(CompileError::ResourceExhausted(ResourceError::StepBudget {
                    steps: self.steps,
                    limit: self.options().limits.max_steps,
                }));
            }

            let instr = {
                let frame = self.frames.last().expect("dispatch loop always has an active frame");
                frame.code.instrs.get(frame.ip as usize).cloned().ok_or_else(|| {
                    CompileError::UnsupportedOpcode { name: "<end of code>".to_string(), loc: self.loc() }
                })?
            };
            self.tracer.on_instruction(self.loc(), &instr);

            match self.step(&instr)? {
                InterpSignalOrContinue::Continue => {}
                InterpSignalOrContinue::Signal(InterpSignal::Return(arg)) => return self.arg_to_wrapped(arg),
                InterpSignalOrContinue::Signal(InterpSignal::Raise(err)) => return Err(err),
            }
        }
    }

    fn arg_to_wrapped(&self, arg: Arg) -> Result<WrappedValue, CompileError> {
        Ok(match arg {
            Arg::Proxy(p) => WrappedValue::new(proxy_placeholder_value(&p), p.history().cloned().unwrap_or_else(|| ProvenanceRecord::node(ProvenanceInst::Opaque, vec![]))),
            Arg::Literal(lit) => WrappedValue::new(literal_to_value(&lit), ProvenanceRecord::constant(lit)),
        })
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("dispatch loop always has an active frame")
    }

    /// Executes one instruction, returning `None` if execution should
    /// continue (the common case) or `Some(signal)` if the frame is done.
    fn step(&mut self, instr: &Instr) -> Result<InterpSignalOrContinue, CompileError> {
        match instr {
            Instr::LoadConst(idx) => {
                let literal = self.frame_mut().code.consts[*idx as usize].clone();
                let wrapped = WrappedValue::new(literal_to_value(&literal), ProvenanceRecord::constant(literal));
                self.frame_mut().push(wrapped);
                self.frame_mut().advance();
            }
            Instr::LoadFast(slot) => {
                let value = self.frame_mut().locals[*slot as usize]
                    .clone()
                    .ok_or_else(|| CompileError::GuardViolation { detail: format!("local slot {slot} read before assignment") })?;
                self.frame_mut().push(value);
                self.frame_mut().advance();
            }
            Instr::StoreFast(slot) => {
                let value = self.pop_required()?;
                self.frame_mut().locals[*slot as usize] = Some(value);
                self.frame_mut().advance();
            }
            Instr::LoadGlobal(idx) => {
                let name = self.frame_mut().code.names[*idx as usize].clone();
                let provenance = ProvenanceRecord::constant(crate::value::Literal::Str(name.clone()));
                let wrapped = WrappedValue::new(Value::Opaque(OpaqueCallable(name)), provenance);
                self.frame_mut().push(wrapped);
                self.frame_mut().advance();
            }
            Instr::LoadAttr(idx) => {
                let name = self.frame_mut().code.names[*idx as usize].clone();
                let object = self.pop_required()?;
                let attr = self.load_attr(&object, &name)?;
                self.frame_mut().push(attr);
                self.frame_mut().advance();
            }
            Instr::StoreAttr(_idx) => {
                // Object mutation is outside this crate's value model (spec.md §1
                // out of scope: no in-place host-object mutation tracking).
                let _object = self.pop_required()?;
                let _value = self.pop_required()?;
                self.frame_mut().advance();
            }
            Instr::BinarySubscr => {
                let index = self.pop_required()?;
                let object = self.pop_required()?;
                let item = self.binary_subscr(&object, &index)?;
                self.frame_mut().push(item);
                self.frame_mut().advance();
            }
            Instr::StoreSubscr => {
                let _index = self.pop_required()?;
                let _object = self.pop_required()?;
                let _value = self.pop_required()?;
                self.frame_mut().advance();
            }
            Instr::BinaryOp(op) => {
                let rhs = self.pop_required()?;
                let lhs = self.pop_required()?;
                let result = self.apply_binary(*op, &lhs, &rhs)?;
                self.frame_mut().push(result);
                self.frame_mut().advance();
            }
            Instr::UnaryOp(op) => {
                let operand = self.pop_required()?;
                let result = self.apply_unary(*op, &operand)?;
                self.frame_mut().push(result);
                self.frame_mut().advance();
            }
            Instr::CompareOp(op) => {
                let rhs = self.pop_required()?;
                let lhs = self.pop_required()?;
                let result = self.apply_compare(*op, &lhs, &rhs)?;
                self.frame_mut().push(result);
                self.frame_mut().advance();
            }
            Instr::PopJumpIfFalse(target) | Instr::PopJumpIfTrue(target) => {
                let cond = self.pop_required()?;
                let truthy = cond.value.truthy();
                if let Some(jump) = instr.jump_target(truthy, false) {
                    debug_assert_eq!(jump, *target);
                    self.frame_mut().jump_to(jump);
                } else {
                    self.frame_mut().advance();
                }
            }
            Instr::JumpForward(target) | Instr::JumpBackward(target) => {
                self.frame_mut().jump_to(*target);
            }
            Instr::CallFunction(argc) => {
                let result = self.call_function(*argc, None)?;
                self.frame_mut().push(result);
                self.frame_mut().advance();
            }
            Instr::CallFunctionKw { argc, kwnames } => {
                let names = self.frame_mut().code.kwnames(*kwnames).to_vec();
                let result = self.call_function(*argc, Some(names))?;
                self.frame_mut().push(result);
                self.frame_mut().advance();
            }
            Instr::LoadMethod(idx) => {
                let name = self.frame_mut().code.names[*idx as usize].clone();
                let object = self.pop_required()?;
                let method = self.load_attr(&object, &name)?;
                self.frame_mut().push(object);
                self.frame_mut().push(method);
                self.frame_mut().advance();
            }
            Instr::CallMethod(argc) => {
                // Stack: ..., self, bound_method, arg1..argN (LoadMethod's order).
                let mut pos_args = Vec::with_capacity(*argc as usize + 1);
                for _ in 0..*argc {
                    pos_args.push(self.pop_required()?);
                }
                pos_args.reverse();
                let method = self.pop_required()?;
                let receiver = self.pop_required()?;
                pos_args.insert(0, receiver);
                let result = self.invoke(method, pos_args, Vec::new())?;
                self.frame_mut().push(result);
                self.frame_mut().advance();
            }
            Instr::PopTop => {
                self.pop_required()?;
                self.frame_mut().advance();
            }
            Instr::DupTop => {
                let top = self.frame_mut().peek().cloned().ok_or_else(|| self.empty_stack_err())?;
                self.frame_mut().push(top);
                self.frame_mut().advance();
            }
            Instr::BuildTuple(count) => {
                let mut items = Vec::with_capacity(*count as usize);
                for _ in 0..*count {
                    items.push(self.pop_required()?);
                }
                items.reverse();
                let provenance = ProvenanceRecord::node(ProvenanceInst::Opaque, items.iter().map(|w| w.provenance.clone()).collect());
                let value = Value::Tuple(Arc::new(items.into_iter().map(|w| w.value).collect()));
                self.frame_mut().push(WrappedValue::new(value, provenance));
                self.frame_mut().advance();
            }
            Instr::GetIter => {
                // Iteration is only supported over tuples already built in this
                // trace; `GET_ITER` is a no-op passthrough and `FOR_ITER` below
                // does the indexing.
                self.frame_mut().advance();
            }
            Instr::ForIter(target) => {
                let iterable = self.frame_mut().peek().cloned().ok_or_else(|| self.empty_stack_err())?;
                match &iterable.value {
                    Value::Tuple(items) if !items.is_empty() => {
                        // Pops one item per iteration by rebuilding the remaining tuple;
                        // a minimal model since real iterator protocol state is out of
                        // this crate's value model.
                        let mut rest = (**items).clone();
                        let item = rest.remove(0);
                        self.frame_mut().pop();
                        self.frame_mut().push(WrappedValue::new(Value::Tuple(Arc::new(rest)), iterable.provenance.clone()));
                        self.frame_mut().push(WrappedValue::new(item, iterable.provenance.clone()));
                        self.frame_mut().advance();
                    }
                    _ => {
                        self.frame_mut().pop();
                        let jump = instr.jump_target(false, true).unwrap_or(*target);
                        self.frame_mut().jump_to(jump);
                    }
                }
            }
            Instr::SetupFinally(handler_ip) => {
                let depth = self.frame_mut().stack.len() as u16;
                self.frame_mut().blocks.push(BlockEntry { handler_ip: *handler_ip, stack_depth: depth });
                self.frame_mut().advance();
            }
            Instr::PopBlock => {
                self.frame_mut().blocks.pop();
                self.frame_mut().advance();
            }
            Instr::RaiseVarargs(argc) => {
                let detail = if *argc == 0 {
                    "re-raise of active exception".to_string()
                } else {
                    let value = self.pop_required()?;
                    format!("{}", value.value)
                };
                if let Some(block) = self.frame_mut().blocks.pop() {
                    self.frame_mut().stack.truncate(block.stack_depth as usize);
                    self.frame_mut().jump_to(block.handler_ip);
                } else {
                    return Ok(InterpSignalOrContinue::Signal(InterpSignal::Raise(CompileError::GuardViolation { detail })));
                }
            }
            Instr::ReturnValue => {
                let value = self.pop_required()?;
                let arg = self.to_arg(&value)?;
                return Ok(InterpSignalOrContinue::Signal(InterpSignal::Return(arg)));
            }
        }
        Ok(InterpSignalOrContinue::Continue)
    }

    fn empty_stack_err(&self) -> CompileError {
        CompileError::GuardViolation { detail: "operand stack underflow".to_string() }
    }

    fn pop_required(&mut self) -> Result<WrappedValue, CompileError> {
        self.frame_mut().pop().ok_or_else(|| self.empty_stack_err())
    }

    /// Wraps a computed value's `Arg` form for carrying as a `BoundSymbol`
    /// argument or a frame return value: proxied values keep their proxy
    /// identity, concrete values are inlined as literals where possible,
    /// and anything else (e.g. a tensor never classified by [`Self::wrap_value`])
    /// is proxied on demand.
    fn to_arg(&mut self, wrapped: &WrappedValue) -> Result<Arg, CompileError> {
        if let Some(proxy) = wrapped.proxy() {
            return Ok(Arg::Proxy(proxy));
        }
        if let Some(lit) = value_to_literal(&wrapped.value) {
            return Ok(Arg::Literal(lit));
        }
        let proxy = self.wrap_value(wrapped)?.unwrap_or_else(|| {
            let name = self.ctx.fresh_proxy_name();
            match &wrapped.value {
                Value::Tensor(meta) => Proxy::tensor(name, Some(wrapped.provenance.clone()), (**meta).clone()),
                _ => Proxy::number(name, Some(wrapped.provenance.clone()), NumberType::Int, None),
            }
        });
        wrapped.register_proxy(proxy.clone());
        Ok(Arg::Proxy(proxy))
    }

    /// Wraps a concretely-observed value as a proxy if its provenance is
    /// guardable, applying the sharp-edge policy otherwise (spec.md §4.3,
    /// §4.7), mirroring `_lit_wrap_callback`.
    fn wrap_value(&mut self, wrapped: &WrappedValue) -> Result<Option<Proxy>, CompileError> {
        if let Some(existing) = wrapped.proxy() {
            return Ok(Some(existing));
        }
        let decision = self.options().sharp_edges.classify(&wrapped.value, &wrapped.provenance);
        match decision {
            WrapDecision::Pass => Ok(None),
            WrapDecision::ProxyAndGuard => {
                let name = self.ctx.fresh_proxy_name();
                let proxy = match &wrapped.value {
                    Value::Tensor(meta) => Proxy::tensor(name, Some(wrapped.provenance.clone()), (**meta).clone()),
                    Value::Str(s) => Proxy::string(name, Some(wrapped.provenance.clone()), Some(s.to_string())),
                    Value::Bool(b) => Proxy::number(name, Some(wrapped.provenance.clone()), NumberType::Bool, Some(KnownNumber::Bool(*b))),
                    Value::Int(i) => Proxy::number(name, Some(wrapped.provenance.clone()), NumberType::Int, Some(KnownNumber::Int(*i))),
                    Value::Float(f) => Proxy::number(name, Some(wrapped.provenance.clone()), NumberType::Float, Some(KnownNumber::Float(*f))),
                    _ => Proxy::number(name, Some(wrapped.provenance.clone()), NumberType::Int, None),
                };
                wrapped.register_proxy(proxy.clone());
                self.tracer.on_unpack(&proxy.name().to_string());
                self.record_value_constraint(&proxy);
                Ok(Some(proxy))
            }
            WrapDecision::SharpEdge(event) => {
                self.tracer.on_sharp_edge(&event);
                match self.options().sharp_edges.resolve(event) {
                    crate::sharp_edge::SharpEdgeOutcome::Allowed => Ok(None),
                    crate::sharp_edge::SharpEdgeOutcome::Warned(_) => Ok(None),
                    crate::sharp_edge::SharpEdgeOutcome::Rejected(event) => Err(CompileError::SharpEdge(event)),
                }
            }
        }
    }

    /// Records a `Constraint` for a newly proxied string/number value with a
    /// known concrete value, replayed into the prologue after unpacking
    /// (spec.md §3 Constraint, §4.8). Only meaningful under
    /// `CacheOption::ConstantValues` (`CacheOption::NoCaching` skips guard
    /// emission entirely, §4.9).
    fn record_value_constraint(&mut self, proxy: &Proxy) {
        if matches!(self.ctx.options.cache_option, crate::config::CacheOption::NoCaching) {
            return;
        }
        let constraint = if let Some(s) = proxy.known_string() {
            Constraint::new(Primitive::CheckStringValue, vec![Arg::Proxy(proxy.clone()), Arg::Literal(crate::value::Literal::Str(s.to_string()))])
        } else if let Some(n) = proxy.known_number() {
            let literal = match n {
                KnownNumber::Bool(b) => crate::value::Literal::Bool(b),
                KnownNumber::Int(i) => crate::value::Literal::Int(i),
                KnownNumber::Float(f) => crate::value::Literal::float(f),
            };
            Constraint::new(Primitive::CheckNumberTypeAndValue, vec![Arg::Proxy(proxy.clone()), Arg::Literal(literal)])
        } else {
            return;
        };
        self.ctx.constraints.push(constraint);
    }

    fn load_attr(&mut self, object: &WrappedValue, name: &str) -> Result<WrappedValue, CompileError> {
        let provenance = ProvenanceRecord::load_attr(object.provenance.clone(), name);
        let value = match &object.value {
            Value::Object(obj) => obj.attrs.get(name).cloned().ok_or_else(|| CompileError::GuardViolation {
                detail: format!("no attribute `{name}` on object"),
            })?,
            other => {
                return Err(CompileError::GuardViolation { detail: format!("`{name}` is not an attribute of a {}", other.type_name()) });
            }
        };
        Ok(WrappedValue::new(value, provenance))
    }

    fn binary_subscr(&mut self, object: &WrappedValue, index: &WrappedValue) -> Result<WrappedValue, CompileError> {
        let idx_literal = value_to_literal(&index.value)
            .ok_or_else(|| CompileError::GuardViolation { detail: "subscript index must be an int or str".to_string() })?;
        let provenance = ProvenanceRecord::binary_subscr(object.provenance.clone(), idx_literal.clone());
        let value = match (&object.value, &idx_literal) {
            (Value::Tuple(items), crate::value::Literal::Int(i)) => items
                .get(*i as usize)
                .cloned()
                .ok_or_else(|| CompileError::GuardViolation { detail: format!("tuple index {i} out of range") })?,
            _ => return Err(CompileError::GuardViolation { detail: "unsupported subscript target".to_string() }),
        };
        Ok(WrappedValue::new(value, provenance))
    }

    fn apply_binary(&mut self, op: crate::op::BinOp, lhs: &WrappedValue, rhs: &WrappedValue) -> Result<WrappedValue, CompileError> {
        let lhs_proxy = self.wrap_value(lhs)?;
        let rhs_proxy = self.wrap_value(rhs)?;
        let primitive = Primitive::BinaryArith(op);
        let args = vec![self.to_bind_arg(lhs, lhs_proxy), self.to_bind_arg(rhs, rhs_proxy)];
        self.bind_primitive_result(primitive, args, lhs, rhs, op_result_shape(lhs, rhs))
    }

    fn apply_unary(&mut self, op: UnaryOp, operand: &WrappedValue) -> Result<WrappedValue, CompileError> {
        let proxy = self.wrap_value(operand)?;
        let primitive = Primitive::UnaryArith(op);
        let args = vec![self.to_bind_arg(operand, proxy)];
        self.bind_primitive_result(primitive, args, operand, operand, operand.value.clone())
    }

    fn apply_compare(&mut self, op: CompareOp, lhs: &WrappedValue, rhs: &WrappedValue) -> Result<WrappedValue, CompileError> {
        let lhs_proxy = self.wrap_value(lhs)?;
        let rhs_proxy = self.wrap_value(rhs)?;
        let primitive = Primitive::Compare(op);
        let args = vec![self.to_bind_arg(lhs, lhs_proxy), self.to_bind_arg(rhs, rhs_proxy)];
        self.bind_primitive_result(primitive, args, lhs, rhs, Value::Bool(true))
    }

    fn to_bind_arg(&self, wrapped: &WrappedValue, proxy: Option<Proxy>) -> Arg {
        match proxy {
            Some(p) => Arg::Proxy(p),
            None => value_to_literal(&wrapped.value).map_or_else(
                || Arg::Literal(crate::value::Literal::None),
                Arg::Literal,
            ),
        }
    }

    /// Emits a `BoundSymbol` for a primitive op and returns its wrapped
    /// output (spec.md §4.5: "the interpreter recognizes primitives ...
    /// appends a `BoundSymbol`").
    fn bind_primitive_result(
        &mut self,
        primitive: Primitive,
        args: Vec<Arg>,
        lhs: &WrappedValue,
        rhs: &WrappedValue,
        result_shape_hint: Value,
    ) -> Result<WrappedValue, CompileError> {
        let name = self.ctx.fresh_proxy_name();
        let output_value = result_shape_hint;
        let output_proxy = match &output_value {
            Value::Tensor(meta) => Proxy::tensor(name, None, (**meta).clone()),
            Value::Bool(b) => Proxy::number(name, None, NumberType::Bool, Some(KnownNumber::Bool(*b))),
            Value::Int(i) => Proxy::number(name, None, NumberType::Int, Some(KnownNumber::Int(*i))),
            Value::Float(f) => Proxy::number(name, None, NumberType::Float, Some(KnownNumber::Float(*f))),
            _ => Proxy::number(name, None, NumberType::Int, None),
        };
        let bound = BoundSymbol::new(primitive, args, vec![output_proxy.clone()]);
        self.computation.bind(bound)?;
        let provenance = ProvenanceRecord::node(ProvenanceInst::Opaque, vec![lhs.provenance.clone(), rhs.provenance.clone()]);
        let wrapped = WrappedValue::new(output_value, provenance);
        wrapped.register_proxy(output_proxy);
        Ok(wrapped)
    }

    fn call_function(&mut self, argc: u8, kwnames: Option<Vec<String>>) -> Result<WrappedValue, CompileError> {
        let mut pos_args = Vec::with_capacity(argc as usize);
        for _ in 0..argc {
            pos_args.push(self.pop_required()?);
        }
        pos_args.reverse();
        let callee = self.pop_required()?;

        let kw_count = kwnames.as_ref().map_or(0, Vec::len);
        let split_at = pos_args.len() - kw_count;
        let kwargs_vals = pos_args.split_off(split_at);
        let kwargs: Vec<(String, WrappedValue)> = kwnames.unwrap_or_default().into_iter().zip(kwargs_vals).collect();

        self.invoke(callee, pos_args, kwargs)
    }

    fn invoke(&mut self, callee: WrappedValue, pos_args: Vec<WrappedValue>, kwargs: Vec<(String, WrappedValue)>) -> Result<WrappedValue, CompileError> {
        let callee_key = match &callee.value {
            Value::Opaque(OpaqueCallable(name)) => Some(name.clone()),
            _ => None,
        };

        if let Some(key) = &callee_key {
            if let Some(action) = resolve_lookaside(key, &self.options().translations, &self.options().callbacks) {
                return self.apply_lookaside(action, &pos_args, &kwargs);
            }
        }

        if let Value::Function(code) = &callee.value {
            self.tracer.on_call(&code.name, self.frames.len() as u16);
            let mut args = pos_args;
            args.extend(kwargs.into_iter().map(|(_, v)| v));
            let result = self.run(code.clone(), args)?;
            self.tracer.on_return(self.frames.len() as u16);
            return Ok(result);
        }

        // Opaque call with no lookaside: must be in the safe-call set or it
        // is a sharp edge (spec.md §4.4 step 4, mirrors `lit_lookaside`'s
        // fallthrough to `is_opaque(fn)` check). Under ALLOW/WARN this does
        // not abort interpretation: the call is left uninterpreted and its
        // result wrapped with OPAQUE provenance over the arguments (spec.md
        // §4.4 step 4, §8 scenario 4).
        let name = callee_key.unwrap_or_else(|| "<unknown>".to_string());
        if !self.options().safe_calls.permits(&Capability::CallFunction(name.clone())) {
            let event = crate::sharp_edge::SharpEdgeEvent {
                reason: crate::sharp_edge::SharpEdgeReason::UnsafeOpaqueCall,
                detail: format!("opaque call to `{name}` is outside the safe-call set"),
            };
            self.tracer.on_sharp_edge(&event);
            return match self.options().sharp_edges.resolve(event) {
                crate::sharp_edge::SharpEdgeOutcome::Rejected(event) => Err(CompileError::SharpEdge(event)),
                crate::sharp_edge::SharpEdgeOutcome::Allowed | crate::sharp_edge::SharpEdgeOutcome::Warned(_) => {
                    let provenance = ProvenanceRecord::node(ProvenanceInst::Opaque, pos_args.iter().map(|a| a.provenance.clone()).collect());
                    Ok(WrappedValue::new(Value::Opaque(OpaqueCallable(name)), provenance))
                }
            };
        }

        let mut concrete_args = Vec::with_capacity(pos_args.len());
        for arg in &pos_args {
            concrete_args.push(arg.value.clone());
        }
        let host = self.options().host.clone();
        let result = host.call(&name, &concrete_args).map_err(|detail| CompileError::HostCallFailed { callee: name.clone(), detail })?;
        let provenance = ProvenanceRecord::node(ProvenanceInst::Opaque, pos_args.iter().map(|a| a.provenance.clone()).collect());
        Ok(WrappedValue::new(result, provenance))
    }

    fn apply_lookaside(&mut self, action: LookasideAction, pos_args: &[WrappedValue], kwargs: &[(String, WrappedValue)]) -> Result<WrappedValue, CompileError> {
        match action {
            LookasideAction::Substitute(primitive) => {
                let mut args = Vec::with_capacity(pos_args.len());
                for a in pos_args {
                    let proxy = self.wrap_value(a)?;
                    args.push(self.to_bind_arg(a, proxy));
                }
                let mut kwarg_binds = Vec::with_capacity(kwargs.len());
                for (k, v) in kwargs {
                    let proxy = self.wrap_value(v)?;
                    kwarg_binds.push((k.clone(), self.to_bind_arg(v, proxy)));
                }
                let name = self.ctx.fresh_proxy_name();
                let output_proxy = Proxy::number(name, None, NumberType::Float, None);
                let bound = BoundSymbol::new(primitive, args, vec![output_proxy.clone()]).with_kwargs(kwarg_binds);
                self.computation.bind(bound)?;
                let provenance = ProvenanceRecord::node(ProvenanceInst::Opaque, pos_args.iter().map(|a| a.provenance.clone()).collect());
                let wrapped = WrappedValue::new(proxy_placeholder_value(&output_proxy), provenance);
                wrapped.register_proxy(output_proxy);
                Ok(wrapped)
            }
            LookasideAction::Redirect(value) => {
                let provenance = ProvenanceRecord::node(ProvenanceInst::Opaque, pos_args.iter().map(|a| a.provenance.clone()).collect());
                Ok(WrappedValue::new(value, provenance))
            }
        }
    }
}

enum InterpSignalOrContinue {
    Continue,
    Signal(InterpSignal),
}

fn literal_to_value(literal: &crate::value::Literal) -> Value {
    use crate::value::Literal;
    match literal {
        Literal::None => Value::None,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(bits) => Value::Float(f64::from_bits(*bits)),
        Literal::Str(s) => Value::Str(s.as_str().into()),
        Literal::StrTuple(names) => Value::Tuple(Arc::new(names.iter().map(|n| Value::Str(n.as_str().into())).collect())),
    }
}

fn value_to_literal(value: &Value) -> Option<crate::value::Literal> {
    use crate::value::Literal;
    match value {
        Value::None => Some(Literal::None),
        Value::Bool(b) => Some(Literal::Bool(*b)),
        Value::Int(i) => Some(Literal::Int(*i)),
        Value::Float(f) => Some(Literal::float(*f)),
        Value::Str(s) => Some(Literal::Str(s.to_string())),
        _ => None,
    }
}

fn proxy_placeholder_value(proxy: &Proxy) -> Value {
    match proxy {
        Proxy::Tensor(_) => Value::Tensor(Arc::new(proxy.tensor_meta().cloned().unwrap_or_else(|| crate::tensor::TensorMeta::contiguous(&[], crate::tensor::Device::Cpu, crate::tensor::DType::Float32, false)))),
        Proxy::Number(_) => match proxy.known_number() {
            Some(KnownNumber::Bool(b)) => Value::Bool(b),
            Some(KnownNumber::Int(i)) => Value::Int(i),
            Some(KnownNumber::Float(f)) => Value::Float(f),
            None => Value::Int(0),
        },
        Proxy::String(_) => Value::Str(proxy.known_string().unwrap_or_default().into()),
    }
}

fn op_result_shape(lhs: &WrappedValue, rhs: &WrappedValue) -> Value {
    match (&lhs.value, &rhs.value) {
        (Value::Tensor(meta), _) | (_, Value::Tensor(meta)) => Value::Tensor(meta.clone()),
        (Value::Float(_), _) | (_, Value::Float(_)) => Value::Float(0.0),
        _ => Value::Int(0),
    }
}
