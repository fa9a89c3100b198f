// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end operator graphs.
//!
//! These tests build small graphs through the registry and the executor,
//! covering the full lifecycle from declaration through repeated runs, and
//! check that the three crates compose correctly.

use op_runtime::{
    table_for, Executor, HSwishOp, OpError, OpIo, OpKind, OpRegistry, OpSettings, Operator,
    RuntimeConfig, RuntimeError, SettingKey, SettingValue, TensorId,
};
use tensor_arena::ArenaError;
use tensor_core::{AddDivClip, BroadcastStrategy, DType, Shape, Tensor, TensorError};

// ── Helpers ────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("op_runtime=debug,tensor_arena=trace")
        .with_test_writer()
        .try_init();
}

fn cast_to(dtype: DType) -> OpSettings {
    OpSettings::new().with(SettingKey::CAST_DTYPE, SettingValue::DType(dtype))
}

/// Adds the four constant operands of a fused op: addend, divisor, min, max.
fn fused_constants(
    exec: &mut Executor,
    addend: Tensor,
    divisor: Tensor,
    min: f32,
    max: f32,
) -> [TensorId; 4] {
    [
        exec.add_tensor(addend).unwrap(),
        exec.add_tensor(divisor).unwrap(),
        exec.add_tensor(Tensor::scalar(min)).unwrap(),
        exec.add_tensor(Tensor::scalar(max)).unwrap(),
    ]
}

// ── End-to-end Graphs ──────────────────────────────────────────

#[test]
fn test_quantise_pipeline() {
    init_tracing();
    // i64 → f32 → hswish → (x + 0.5) / 0.25 clipped to [0, 255] → u8.
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let x = exec
        .add_tensor(Tensor::from_slice(Shape::nchw(1, 2, 2, 2), &[-4i64, -1, 0, 1, 2, 3, 10, 90]).unwrap())
        .unwrap();
    let xf = exec.declare_tensor(Shape::scalar(), DType::F32);
    let act = exec.declare_tensor(Shape::scalar(), DType::F32);
    let q = exec.declare_tensor(Shape::scalar(), DType::U8);
    let [add, div, lo, hi] = fused_constants(
        &mut exec,
        Tensor::scalar(0.5f32),
        Tensor::scalar(0.25f32),
        0.0,
        255.0,
    );

    exec.add_op("cast", OpIo::new(&[x], &[xf]), &cast_to(DType::F32))
        .unwrap();
    exec.add_op("hswish", OpIo::new(&[xf], &[act]), &OpSettings::new())
        .unwrap();
    exec.add_op(
        "add_div_clip_cast",
        OpIo::new(&[act, add, div, lo, hi], &[q]),
        &cast_to(DType::U8),
    )
    .unwrap();

    let mut exec = exec.prepare().unwrap();
    exec.run().unwrap();

    let out = exec.tensor(q).unwrap();
    assert_eq!(out.shape(), &Shape::nchw(1, 2, 2, 2));
    assert_eq!(out.dtype(), DType::U8);
    // hswish: [-0, -1/3, 0, 2/3, 5/3, 3, 10, 90]
    // (h + 0.5) * 4: [2, 0.67, 2, 4.67, 8.67, 14, 42, 362]
    assert_eq!(
        exec.read::<u8>(q).unwrap(),
        &[2, 0, 2, 4, 8, 14, 42, 255]
    );
}

#[test]
fn test_channel_vector_normalise() {
    init_tracing();
    // Channel-wise scale on an NCHW image: addend and divisor are [1, C, 1, 1].
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let img = exec
        .add_tensor(Tensor::from_slice(Shape::nchw(1, 3, 1, 2), &[10i32, 20, 10, 20, 10, 20]).unwrap())
        .unwrap();
    let add = exec
        .add_tensor(Tensor::from_slice(Shape::nchw(1, 3, 1, 1), &[0i32, 10, -10]).unwrap())
        .unwrap();
    let div = exec
        .add_tensor(Tensor::from_slice(Shape::nchw(1, 3, 1, 1), &[1i32, 2, 5]).unwrap())
        .unwrap();
    let lo = exec.add_tensor(Tensor::scalar(-128i32)).unwrap();
    let hi = exec.add_tensor(Tensor::scalar(12i32)).unwrap();
    let out = exec.declare_tensor(Shape::scalar(), DType::I8);

    exec.add_op(
        "add_div_clip_cast",
        OpIo::new(&[img, add, div, lo, hi], &[out]),
        &cast_to(DType::I8),
    )
    .unwrap();
    let mut exec = exec.prepare().unwrap();
    exec.run().unwrap();

    // c0: [10, 20] → [10, 12]; c1: [10, 15] → [10, 12]; c2: [0, 2].
    assert_eq!(exec.read::<i8>(out).unwrap(), &[10, 12, 10, 12, 0, 2]);
}

#[test]
fn test_per_channel_row_offsets() {
    init_tracing();
    // Addend and divisor of shape [N, 1, 1, W] take the per-channel path.
    let (n, c, h, w) = (2, 2, 1, 3);
    let out_shape = Shape::nchw(n, c, h, w);
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let a = exec
        .add_tensor(Tensor::from_slice(out_shape.clone(), &[100i32; 12]).unwrap())
        .unwrap();
    let add = exec
        .add_tensor(Tensor::from_slice(Shape::nchw(n, 1, 1, w), &[0i32, 1, 2, 10, 20, 30]).unwrap())
        .unwrap();
    let div = exec
        .add_tensor(Tensor::from_slice(Shape::nchw(n, 1, 1, w), &[1i32, 1, 1, 2, 2, 2]).unwrap())
        .unwrap();
    let lo = exec.add_tensor(Tensor::scalar(0i32)).unwrap();
    let hi = exec.add_tensor(Tensor::scalar(255i32)).unwrap();
    let out = exec.declare_tensor(Shape::scalar(), DType::U8);
    exec.add_op(
        "add_div_clip_cast",
        OpIo::new(&[a, add, div, lo, hi], &[out]),
        &cast_to(DType::U8),
    )
    .unwrap();
    let mut exec = exec.prepare().unwrap();

    {
        let operands: Vec<&Tensor> = [a, add, div, lo, hi]
            .iter()
            .map(|&id| exec.tensor(id).unwrap())
            .collect();
        let expr = AddDivClip::<i32>::from_tensors(&operands).unwrap();
        assert_eq!(expr.select_strategy(&out_shape), BroadcastStrategy::PerChannel);
    }

    exec.run().unwrap();
    // Batch 0 rows: 100 + [0, 1, 2]; batch 1 rows: (100 + [10, 20, 30]) / 2.
    assert_eq!(
        exec.read::<u8>(out).unwrap(),
        &[100, 101, 102, 100, 101, 102, 55, 60, 65, 55, 60, 65]
    );
}

#[test]
fn test_runs_are_repeatable() {
    init_tracing();
    let config = RuntimeConfig::from_toml("enable_profiling = true").unwrap();
    let mut exec = Executor::new(config).unwrap();
    let x = exec
        .add_tensor(Tensor::from_slice(Shape::vector(4), &[-3.0f32, -1.5, 0.0, 4.0]).unwrap())
        .unwrap();
    let y = exec.declare_tensor(Shape::scalar(), DType::F32);
    exec.add_op("hswish", OpIo::new(&[x], &[y]), &OpSettings::new())
        .unwrap();
    let mut exec = exec.prepare().unwrap();

    let first = exec.run().unwrap();
    let expected = exec.read::<f32>(y).unwrap().to_vec();
    let second = exec.run().unwrap();

    assert_eq!(exec.read::<f32>(y).unwrap(), &expected[..]);
    assert_eq!(exec.read::<f32>(x).unwrap(), &[-3.0, -1.5, 0.0, 4.0]);
    assert_eq!(first.op_metrics.len(), 1);
    assert_eq!(second.op_metrics[0].op, OpKind::HSwish);
    assert_eq!(first.arena_bytes, second.arena_bytes);
}

// ── Error Paths ────────────────────────────────────────────────

#[test]
fn test_unsupported_pair_rejected_at_prepare() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let x = exec
        .add_tensor(Tensor::from_slice(Shape::vector(2), &[1u8, 2]).unwrap())
        .unwrap();
    let y = exec.declare_tensor(Shape::vector(2), DType::F32);
    exec.add_op("cast", OpIo::new(&[x], &[y]), &cast_to(DType::F32))
        .unwrap();
    let err = exec.prepare().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Operator {
            index: 0,
            op: OpKind::Cast,
            source: OpError::UnsupportedDTypes {
                input: DType::U8,
                output: DType::F32,
                ..
            }
        }
    ));
    assert!(!table_for(OpKind::Cast).supports(DType::U8, DType::F32));
}

#[test]
fn test_incompatible_broadcast_rejected() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let a = exec
        .add_tensor(Tensor::zeros(Shape::new(vec![2, 3]), DType::F32))
        .unwrap();
    let [add, div, lo, hi] = fused_constants(
        &mut exec,
        Tensor::zeros(Shape::new(vec![2]), DType::F32),
        Tensor::scalar(1.0f32),
        0.0,
        1.0,
    );
    let out = exec.declare_tensor(Shape::scalar(), DType::U8);
    exec.add_op(
        "add_div_clip_cast",
        OpIo::new(&[a, add, div, lo, hi], &[out]),
        &cast_to(DType::U8),
    )
    .unwrap();
    let err = exec.prepare().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Operator {
            op: OpKind::AddDivClipCast,
            source: OpError::IncompatibleShapes { .. },
            ..
        }
    ));
}

#[test]
fn test_aliased_output_rejected() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let x = exec.add_tensor(Tensor::scalar(1.0f32)).unwrap();
    exec.add_op("hswish", OpIo::new(&[x], &[x]), &OpSettings::new())
        .unwrap();
    assert!(matches!(
        exec.prepare(),
        Err(RuntimeError::Operator {
            source: OpError::AliasedOutput(_),
            ..
        })
    ));
}

#[test]
fn test_wrong_arity_rejected() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let x = exec.add_tensor(Tensor::scalar(1.0f32)).unwrap();
    let y = exec.declare_tensor(Shape::scalar(), DType::U8);
    exec.add_op("add_div_clip_cast", OpIo::new(&[x, x], &[y]), &cast_to(DType::U8))
        .unwrap();
    assert!(matches!(
        exec.prepare(),
        Err(RuntimeError::Operator {
            source: OpError::Arity {
                expected_inputs: 5,
                inputs: 2,
                ..
            },
            ..
        })
    ));
}

#[test]
fn test_setting_of_wrong_type() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let settings = OpSettings::new().with(SettingKey::CAST_DTYPE, SettingValue::U32(3));
    let err = exec
        .add_op("cast", OpIo::new(&[], &[]), &settings)
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Operator {
            source: OpError::SettingTypeMismatch { .. },
            ..
        }
    ));
}

#[test]
fn test_write_with_wrong_dtype() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let x = exec.add_tensor(Tensor::zeros(Shape::vector(2), DType::F32)).unwrap();
    let err = exec.write(x, &[1i32, 2]).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Arena(ArenaError::Tensor(TensorError::DTypeMismatch { .. }))
    ));
}

// ── Memory Budget ──────────────────────────────────────────────

#[test]
fn test_budget_fits_exactly() {
    // 16 f32 in + 16 u8 out = 64 + 16 bytes.
    let config = RuntimeConfig::from_toml("memory_budget = \"80\"").unwrap();
    let mut exec = Executor::new(config).unwrap();
    let x = exec.declare_tensor(Shape::vector(16), DType::F32);
    let y = exec.declare_tensor(Shape::vector(16), DType::U8);
    exec.add_op("cast", OpIo::new(&[x], &[y]), &cast_to(DType::U8))
        .unwrap();
    let mut exec = exec.prepare().unwrap();
    let metrics = exec.run().unwrap();
    assert_eq!(metrics.arena_bytes, 80);
    assert_eq!(metrics.peak_bytes, 80);
}

#[test]
fn test_budget_exceeded_by_output() {
    let config = RuntimeConfig::from_toml("memory_budget = \"79\"").unwrap();
    let mut exec = Executor::new(config).unwrap();
    let x = exec.declare_tensor(Shape::vector(16), DType::F32);
    let y = exec.declare_tensor(Shape::vector(16), DType::U8);
    exec.add_op("cast", OpIo::new(&[x], &[y]), &cast_to(DType::U8))
        .unwrap();
    match exec.prepare() {
        Err(RuntimeError::Operator {
            source:
                OpError::Arena(ArenaError::OutOfMemory {
                    tensor,
                    requested_bytes,
                    available_bytes,
                    ..
                }),
            ..
        }) => {
            assert_eq!(tensor, y);
            assert_eq!(requested_bytes, 16);
            assert_eq!(available_bytes, 15);
        }
        other => panic!("expected out-of-memory, got {other:?}"),
    }
}

#[test]
fn test_overflowing_shape_is_out_of_memory() {
    let mut exec = Executor::new(RuntimeConfig::default()).unwrap();
    let x = exec.declare_tensor(Shape::new(vec![usize::MAX, 4]), DType::F32);
    let y = exec.declare_tensor(Shape::scalar(), DType::F32);
    exec.add_op("hswish", OpIo::new(&[x], &[y]), &OpSettings::new())
        .unwrap();
    assert!(matches!(
        exec.prepare(),
        Err(RuntimeError::Operator {
            source: OpError::Arena(ArenaError::OutOfMemory { tensor, .. }),
            ..
        }) if tensor == x
    ));
}

// ── Registry ───────────────────────────────────────────────────

#[test]
fn test_restricted_registry() {
    let mut registry = OpRegistry::empty();
    registry.register("hswish", || -> Box<dyn Operator> { Box::new(HSwishOp) });
    let mut exec = Executor::with_registry(RuntimeConfig::default(), registry).unwrap();
    assert!(matches!(
        exec.add_op("cast", OpIo::new(&[], &[]), &cast_to(DType::F32)),
        Err(RuntimeError::UnknownOperator(name)) if name == "cast"
    ));
}

// ── Config ─────────────────────────────────────────────────────

#[test]
fn test_config_toml_roundtrip() {
    let config = RuntimeConfig {
        memory_budget: "16M".into(),
        enable_profiling: true,
    };
    let toml = config.to_toml().unwrap();
    let back = RuntimeConfig::from_toml(&toml).unwrap();
    assert_eq!(back, config);
    assert_eq!(back.parse_budget().unwrap().as_bytes(), 16 * 1024 * 1024);
}

#[test]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("op-runtime-{}.toml", std::process::id()));
    std::fs::write(&path, "memory_budget = \"1K\"\n").unwrap();
    let config = RuntimeConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.parse_budget().unwrap().as_bytes(), 1024);
    assert!(!config.enable_profiling);
}
