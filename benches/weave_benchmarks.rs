//! Weave throughput over classes of growing size.
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use std::hint::black_box;

use classweave::ast::{
    BinaryOp, ClassDecl, Expr, FieldSelector, MemberDecl, MethodSelector, Module, Stmt,
};
use classweave::{ClassNode, Compiler, FieldNode};
use classweave_core::{AccessFlags, TypeRef};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

const TARGET: &str = "bench/Target";

fn target(fields: usize) -> ClassNode {
    (0..fields).fold(ClassNode::new(TARGET).with_default_constructor(), |class, i| {
        let access = if i % 2 == 0 {
            AccessFlags::PUBLIC | AccessFlags::STATIC
        } else {
            AccessFlags::PRIVATE
        };
        class.with_field(FieldNode::new(access, format!("f{i}"), "I"))
    })
}

/// Count the public static ints, then define `initialized` fields with
/// string initializers.
fn module(initialized: usize) -> Module {
    let mut members = vec![
        MemberDecl::select_fields(
            FieldSelector {
                access: Some(AccessFlags::PUBLIC),
                is_static: Some(true),
                field_type: Some(TypeRef::int()),
                name: None,
            },
            Some("fs"),
        ),
        MemberDecl::define_method(
            MethodSelector {
                access: Some(AccessFlags::PUBLIC),
                is_static: Some(false),
                return_type: Some(TypeRef::int()),
                name: Some("count".into()),
                parameters: Some(Vec::new()),
            },
            Stmt::ret(Some(Expr::meta(Expr::call(Expr::lookup("fs"), "size", vec![])))),
        ),
    ];
    for i in 0..initialized {
        members.push(MemberDecl::define_field(
            FieldSelector {
                access: Some(AccessFlags::PRIVATE),
                is_static: Some(false),
                field_type: Some(TypeRef::string()),
                name: Some(format!("label{i}")),
            },
            Some(Expr::binary(BinaryOp::Add, Expr::string("label"), Expr::int(i as i32))),
        ));
    }
    Module::new(vec![ClassDecl::new(TARGET, members)])
}

fn class_size_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let mut group = c.benchmark_group("weave/class_size");
    for fields in [10, 100, 1000] {
        let module = module(8);
        let class = target(fields);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_function(format!("fields_{fields}"), |b| {
            b.iter(|| {
                let mut classes = vec![class.clone()];
                let report = Compiler::new()
                    .compile(black_box(&module), &mut classes)
                    .unwrap();
                end_profiling_frame();
                black_box(report.actions())
            });
        });
    }
    group.finish();
}

fn initializer_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let mut group = c.benchmark_group("weave/initializers");
    let class = target(16);
    for initialized in [1, 16, 128] {
        let module = module(initialized);
        group.throughput(Throughput::Elements(initialized as u64));
        group.bench_function(format!("initializers_{initialized}"), |b| {
            b.iter(|| {
                let mut classes = vec![class.clone()];
                Compiler::new()
                    .compile(black_box(&module), &mut classes)
                    .unwrap();
                end_profiling_frame();
                black_box(classes)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, class_size_benchmarks, initializer_benchmarks);
criterion_main!(benches);
