//! Integration scenarios exercising the public `trace_function` entry point
//! against the bytecode shapes the bundled `CodeBuilder` can construct.

use std::collections::HashMap;
use std::sync::Arc;

use tracekit::builder::CodeBuilder;
use tracekit::capability::{Capability, SafeCallSet};
use tracekit::config::CompileOptions;
use tracekit::exception::CompileError;
use tracekit::op::{BinOp, CompareOp, Instr};
use tracekit::primitive::Primitive;
use tracekit::sharp_edge::SharpEdgeLevel;
use tracekit::tensor::{DType, Device, TensorMeta};
use tracekit::value::{HostObject, Value};
use tracekit::{CallArgs, trace_function};

fn tensor(shape: &[i64]) -> Value {
    Value::Tensor(Arc::new(TensorMeta::contiguous(shape, Device::Cpu, DType::Float32, false)))
}

#[test]
fn scalar_add_proxies_both_tensor_inputs() {
    let code = CodeBuilder::new("add")
        .params(&["x", "y"])
        .load_fast("x")
        .load_fast("y")
        .binary_op(BinOp::Add)
        .return_value()
        .build();

    let traced = trace_function(&code, CallArgs::positional(vec![tensor(&[4, 4]), tensor(&[4, 4])]), CompileOptions::new()).unwrap();

    let add_count = traced.computation.bound_symbols().iter().filter(|s| s.primitive == Primitive::BinaryArith(BinOp::Add)).count();
    assert_eq!(add_count, 1);
    let add_sym = traced.computation.bound_symbols().iter().find(|s| s.primitive == Primitive::BinaryArith(BinOp::Add)).unwrap();
    assert_eq!(add_sym.proxy_args().count(), 2);

    // The shared `args` root is unpacked once via `unpack_trivial`, then each
    // parameter selects its own slot via `unpack_getitem(args, i)` — two
    // `unpack_getitem` pairs from `args`, not a bare `unpack_trivial` each.
    let unpack_count = traced.prologue.bound_symbols().iter().filter(|s| s.primitive == Primitive::UnpackTrivial).count();
    assert_eq!(unpack_count, 1, "the shared args root is unpacked exactly once");
    let getitem_count = traced.prologue.bound_symbols().iter().filter(|s| s.primitive == Primitive::UnpackGetItem).count();
    assert_eq!(getitem_count, 2, "x and y each select their own slot out of args");
    let guard_count = traced.prologue.bound_symbols().iter().filter(|s| s.primitive == Primitive::AssertTensorMetadata).count();
    assert_eq!(guard_count, 2);
    assert_eq!(traced.prologue.bound_symbols().last().unwrap().primitive, Primitive::Return);
}

#[test]
fn attribute_load_unpacks_through_object() {
    let mut attrs = HashMap::new();
    attrs.insert("weight".to_string(), tensor(&[2, 2]));
    let object = Value::Object(Arc::new(HostObject { attrs: attrs.into_iter().collect() }));

    let code = CodeBuilder::new("forward")
        .params(&["m", "x"])
        .load_fast("m")
        .load_attr("weight")
        .load_fast("x")
        .binary_op(BinOp::Add)
        .return_value()
        .build();

    let traced = trace_function(&code, CallArgs::positional(vec![object, tensor(&[2, 2])]), CompileOptions::new()).unwrap();

    let kinds: Vec<_> = traced.prologue.bound_symbols().iter().map(|s| s.primitive).collect();
    assert!(kinds.contains(&Primitive::UnpackAttr));
    // The shared args root is unpacked once; m and x each select their own
    // slot out of it via unpack_getitem, and weight chains one more unpack_attr
    // on top of m's slot.
    assert_eq!(kinds.iter().filter(|k| **k == Primitive::UnpackTrivial).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == Primitive::UnpackGetItem).count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == Primitive::AssertTensorMetadata).count(), 2);
}

#[test]
fn constant_operand_becomes_a_guarded_number_proxy() {
    let code = CodeBuilder::new("add_one")
        .params(&["x"])
        .load_fast("x")
        .load_const_int(1)
        .binary_op(BinOp::Add)
        .return_value()
        .build();

    let traced = trace_function(&code, CallArgs::positional(vec![tensor(&[4, 4])]), CompileOptions::new()).unwrap();

    let add_sym = traced
        .computation
        .bound_symbols()
        .iter()
        .find(|s| s.primitive == Primitive::BinaryArith(BinOp::Add))
        .unwrap();
    assert_eq!(add_sym.proxy_args().count(), 2, "the literal 1 is proxied, not inlined");

    let kinds: Vec<_> = traced.prologue.bound_symbols().iter().map(|s| s.primitive).collect();
    assert!(kinds.contains(&Primitive::CheckNumberTypeAndValue), "a guard is recorded against the value 1");
}

#[test]
fn unsupported_global_errors_under_the_error_policy() {
    let code = CodeBuilder::new("call_global")
        .params(&["x"])
        .load_global("some_global")
        .load_fast("x")
        .call_function(1)
        .return_value()
        .build();

    let options = CompileOptions::new().with_sharp_edges(SharpEdgeLevel::Error);
    let err = trace_function(&code, CallArgs::positional(vec![tensor(&[4, 4])]), options).unwrap_err();
    assert!(matches!(err, CompileError::SharpEdge(_)));
}

#[test]
fn unsupported_global_passes_the_safe_call_check_but_still_needs_a_host_evaluator() {
    let code = CodeBuilder::new("call_global")
        .params(&["x"])
        .load_global("some_global")
        .load_fast("x")
        .call_function(1)
        .return_value()
        .build();

    let mut safe_calls = SafeCallSet::new();
    safe_calls.allow(Capability::CallFunction("some_global".to_string()));
    let mut options = CompileOptions::new();
    options.safe_calls = safe_calls;

    // No host evaluator registered: the call is permitted past the sharp-edge
    // check but still fails, because there is nothing to actually run it.
    let err = trace_function(&code, CallArgs::positional(vec![tensor(&[4, 4])]), options).unwrap_err();
    assert!(matches!(err, CompileError::HostCallFailed { .. }));
}

#[test]
fn unsupported_global_continues_under_the_warn_policy() {
    let code = CodeBuilder::new("call_global")
        .params(&["x"])
        .load_global("some_global")
        .load_fast("x")
        .call_function(1)
        .return_value()
        .build();

    let options = CompileOptions::new().with_sharp_edges(SharpEdgeLevel::Warn);
    let traced = trace_function(&code, CallArgs::positional(vec![tensor(&[4, 4])]), options).unwrap();
    assert_eq!(traced.computation.bound_symbols().last().unwrap().primitive, Primitive::Return);
}

#[test]
fn getitem_access_rewrites_to_unpack_getitem() {
    let code = CodeBuilder::new("first_plus_one")
        .params(&["items"])
        .load_fast("items")
        .load_const_int(0)
        .binary_subscr()
        .load_const_int(1)
        .binary_op(BinOp::Add)
        .return_value()
        .build();

    let items = Value::Tuple(Arc::new(vec![tensor(&[4, 4])]));
    let traced = trace_function(&code, CallArgs::positional(vec![items]), CompileOptions::new()).unwrap();

    let kinds: Vec<_> = traced.prologue.bound_symbols().iter().map(|s| s.primitive).collect();
    assert!(kinds.contains(&Primitive::UnpackGetItem));
}

#[test]
fn branch_trace_contains_only_the_taken_path() {
    let code = CodeBuilder::new("branchy")
        .params(&["x"])
        .load_const_bool(true)
        .emit(Instr::PopJumpIfFalse(6))
        .load_fast("x")
        .load_const_int(1)
        .binary_op(BinOp::Add)
        .return_value()
        .load_fast("x")
        .load_const_int(1)
        .binary_op(BinOp::Sub)
        .return_value()
        .build();

    let traced = trace_function(&code, CallArgs::positional(vec![tensor(&[4, 4])]), CompileOptions::new()).unwrap();

    let kinds: Vec<_> = traced.computation.bound_symbols().iter().map(|s| s.primitive).collect();
    assert!(kinds.contains(&Primitive::BinaryArith(BinOp::Add)));
    assert!(!kinds.contains(&Primitive::BinaryArith(BinOp::Sub)));
}

#[test]
fn function_with_no_tensor_inputs_yields_a_bare_return_trace() {
    let code = CodeBuilder::new("constant_fn").load_const_int(7).return_value().build();

    let traced = trace_function(&code, CallArgs::positional(vec![]), CompileOptions::new()).unwrap();

    assert_eq!(traced.computation.bound_symbols().len(), 1);
    assert_eq!(traced.computation.bound_symbols()[0].primitive, Primitive::Return);
    assert_eq!(traced.prologue.bound_symbols().len(), 1);
    assert_eq!(traced.prologue.bound_symbols()[0].primitive, Primitive::Return);
}

#[test]
fn comparison_result_can_drive_a_later_compare_op() {
    let code = CodeBuilder::new("is_positive")
        .params(&["x", "y"])
        .load_fast("x")
        .load_fast("y")
        .compare_op(CompareOp::Gt)
        .return_value()
        .build();

    let traced = trace_function(&code, CallArgs::positional(vec![Value::Int(3), Value::Int(1)]), CompileOptions::new()).unwrap();
    assert!(traced.computation.bound_symbols().iter().any(|s| s.primitive == Primitive::Compare(CompareOp::Gt)));
}
