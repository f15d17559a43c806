//! `tracekit`: a tracing bytecode-to-IR compiler.
//!
//! Interprets a host function symbolically, one instruction at a time
//! (spec.md §4.2), tracking how every value it touches was derived
//! (provenance, §4.3) so it can afterward synthesize a **prologue** trace
//! that validates a call's actual arguments against what tracing assumed,
//! and hand back a **computation** trace of the symbolic tensor operations
//! the function performed (§4.9).
//!
//! # Example
//!
//! ```
//! use tracekit::builder::CodeBuilder;
//! use tracekit::config::CompileOptions;
//! use tracekit::op::BinOp;
//! use tracekit::{CallArgs, trace_function};
//!
//! let code = CodeBuilder::new("add_one")
//!     .params(&["x"])
//!     .load_fast("x")
//!     .load_const_int(1)
//!     .binary_op(BinOp::Add)
//!     .return_value()
//!     .build();
//!
//! let result = trace_function(&code, CallArgs::positional(vec![tracekit::value::Value::Int(4)]), CompileOptions::new());
//! assert!(result.is_ok());
//! ```

pub mod builder;
pub mod capability;
pub mod code;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod exception;
pub mod frame;
pub mod host;
pub mod interpreter;
pub mod lookaside;
pub mod op;
pub mod primitive;
pub mod prologue;
pub mod provenance;
pub mod proxy;
pub mod sharp_edge;
pub mod tensor;
pub mod trace;
pub mod value;

use code::Code;
use config::CompileOptions;
use context::{CompileContext, TraceCtxGuard, TraceKind};
use diagnostics::{CompileTracer, NoopTracer};
use exception::CompileError;
use interpreter::Interpreter;
use provenance::{ProvenanceInst, ProvenanceRecord, WrappedValue};
use trace::{Arg, TraceCtx};
use value::Value;

/// The arguments a traced call is invoked with: positional values plus
/// optional keyword values, each paired with its own input provenance root
/// (spec.md §3: `INPUT_ARGS`/`INPUT_KWARGS`).
#[derive(Debug, Default, Clone)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Vec<(String, Value)>,
}

impl CallArgs {
    #[must_use]
    pub fn positional(values: Vec<Value>) -> Self {
        Self { positional: values, keyword: Vec::new() }
    }

    #[must_use]
    pub fn with_keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keyword.push((name.into(), value));
        self
    }
}

/// The two traces produced by one successful compilation (spec.md §4.9):
/// a prologue that validates a call's actual arguments, and a computation
/// trace of the symbolic operations to run once validated.
#[derive(Debug)]
pub struct CompiledTrace {
    pub prologue: TraceCtx,
    pub computation: TraceCtx,
}

/// Interprets `code` against `args` and returns its compiled trace pair
/// (spec.md §4.9 `meso_thunder_interpreter`'s five steps):
///
/// 1. Wrap each argument with `INPUT_ARGS`/`INPUT_KWARGS` provenance.
/// 2. Interpret the function body, recording bound symbols into the
///    computation trace and guard constraints as sharp-edge-safe values are
///    wrapped.
/// 3. Discover the computation trace's used inputs.
/// 4. Synthesize the prologue trace from those inputs.
/// 5. Hoist the computation trace's own trivial input-unpacks to the front.
///
/// # Errors
/// Returns [`CompileError`] if interpretation hits an unsupported opcode, a
/// sharp edge configured to error, a resource limit, or a prologue-synthesis
/// provenance shape with no unpack rule.
pub fn trace_function(code: &Code, args: CallArgs, options: CompileOptions) -> Result<CompiledTrace, CompileError> {
    trace_function_with_tracer(code, args, options, &mut NoopTracer)
}

/// As [`trace_function`], but drives interpreter diagnostics through a
/// caller-supplied [`CompileTracer`] instead of the default no-op.
pub fn trace_function_with_tracer<T: CompileTracer>(
    code: &Code,
    args: CallArgs,
    options: CompileOptions,
    tracer: &mut T,
) -> Result<CompiledTrace, CompileError> {
    let mut ctx = CompileContext::new(options);
    let (mut prologue, mut computation) = context::new_trace_pair();

    let wrapped_args = wrap_call_args(&args);

    {
        let _guard = TraceCtxGuard::enter(&mut ctx, TraceKind::Computation);
        let mut interpreter = Interpreter::new(&mut ctx, &mut computation, tracer);
        let code_arc = std::sync::Arc::new(code.clone());
        let result = interpreter.run(code_arc, wrapped_args)?;
        let final_arg = interpreter_result_to_arg(result);
        computation.outputs = vec![final_arg];
        computation.bind(trace::BoundSymbol::new(primitive::Primitive::Return, computation.outputs.clone(), vec![]))?;
    }

    let inputs = prologue::computation_inputs(&computation);
    {
        let _guard = TraceCtxGuard::enter(&mut ctx, TraceKind::Prologue);
        let constraints = std::mem::take(&mut ctx.constraints);
        prologue::unpack_inputs(&mut ctx, &mut prologue, &inputs, &constraints)?;
    }

    hoist_trivial_unpacks(&mut computation, &inputs);

    Ok(CompiledTrace { prologue, computation })
}

/// Wraps each argument as a child of a single shared `args`/`kwargs` root,
/// selecting its own position or keyword name via `BINARY_SUBSCR` (spec.md
/// §3: "Arguments become `(v, INPUT_ARGS)` ... with child records selecting
/// positional index or keyword name via `BINARY_SUBSCR`"). Mirrors
/// `jit_ext.py`'s per-parameter `args[i]`/`kwargs[k]` provenance, so prologue
/// synthesis unpacks the shared root once (`unpack_trivial(args)`) and then
/// one `unpack_getitem(args, i)` per used parameter (spec.md §8 scenario 1).
fn wrap_call_args(args: &CallArgs) -> Vec<WrappedValue> {
    let mut wrapped = Vec::with_capacity(args.positional.len() + args.keyword.len());
    let args_root = ProvenanceRecord::leaf(ProvenanceInst::InputArgs);
    for (i, value) in args.positional.iter().enumerate() {
        let provenance = ProvenanceRecord::binary_subscr(args_root.clone(), value::Literal::Int(i as i64));
        wrapped.push(WrappedValue::new(value.clone(), provenance));
    }
    let kwargs_root = ProvenanceRecord::leaf(ProvenanceInst::InputKwargs);
    for (name, value) in &args.keyword {
        let provenance = ProvenanceRecord::binary_subscr(kwargs_root.clone(), value::Literal::Str(name.clone()));
        wrapped.push(WrappedValue::new(value.clone(), provenance));
    }
    wrapped
}

fn interpreter_result_to_arg(result: WrappedValue) -> Arg {
    result.proxy().map_or_else(
        || match &result.value {
            Value::Int(i) => Arg::Literal(value::Literal::Int(*i)),
            Value::Float(f) => Arg::Literal(value::Literal::float(*f)),
            Value::Bool(b) => Arg::Literal(value::Literal::Bool(*b)),
            Value::Str(s) => Arg::Literal(value::Literal::Str(s.to_string())),
            Value::None => Arg::Literal(value::Literal::None),
            _ => Arg::Literal(value::Literal::None),
        },
        Arg::Proxy,
    )
}

/// Appends an `unpack_trivial` per prologue output onto the computation
/// trace, then rotates those trailing symbols to the front so the trace
/// reads unpack-then-compute (spec.md §4.8 Computation hoist, mirrors
/// `meso_thunder_interpreter`'s `bsyms[-n:] + bsyms[:-n]` slice rotation).
fn hoist_trivial_unpacks(computation: &mut TraceCtx, prologue_outputs: &[proxy::Proxy]) {
    for output in prologue_outputs {
        computation.add_name(output.name());
        let _ = computation.bind(trace::BoundSymbol::new(primitive::Primitive::UnpackTrivial, vec![], vec![output.clone()]));
    }
    computation.hoist_trailing(prologue_outputs.len());
}
