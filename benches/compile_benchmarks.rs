//! Performance benchmarks for the compile pipeline.
//!
//! - Backend only: parse, check and emit generated modules of growing size
//! - End to end: compile, load and register through an Orchestrator
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use modlink::backend::compiler::{CompileOptions, Compiler, SourceText};
use modlink::backend::core::image;
use modlink::{
    ConstValue, InProcessCatalog, ModuleBuilder, ModuleMetadata, Orchestrator, OrchestratorConfig,
    ReferenceDescriptor, ReferenceSet, SourceUnit,
};
use std::fmt::Write;
use std::hint::black_box;
use std::sync::Arc;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// A module with `count` types in an inheritance chain and `count` constants
/// each depending on the previous one.
fn generated_source(count: usize) -> String {
    let mut source = String::from("type T0 extends Core.Base { id: int; }\nconst C0 = Core.SEED;\n");
    for i in 1..count {
        let _ = writeln!(source, "type T{i} extends T{} {{ f{i}: float; label{i}: string; }}", i - 1);
        let _ = writeln!(source, "const C{i} = (C{} * 3 + {i}) % 1000003;", i - 1);
    }
    source
}

fn core_module() -> ModuleMetadata {
    ModuleBuilder::new("Core")
        .simple_type("Base")
        .constant("SEED", ConstValue::Int(7))
        .build()
}

fn backend_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let refs = ReferenceSet::new([ReferenceDescriptor::from_image(&image::encode(&core_module())).unwrap()]);
    let mut group = c.benchmark_group("compiler/module_sizes");

    for count in [10, 100, 1000] {
        let source = generated_source(count);
        group.throughput(Throughput::Bytes(source.len() as u64));

        for (label, options) in [("release", CompileOptions::release()), ("debug", CompileOptions::debug())] {
            let compiler = Compiler::new(options);
            group.bench_with_input(BenchmarkId::new(label, count), &source, |b, source| {
                b.iter(|| {
                    let emission = compiler.compile("Bench", &[SourceText::new(black_box(source))], &refs);
                    end_profiling_frame();
                    black_box(emission.is_success())
                });
            });
        }
    }

    group.finish();
}

fn end_to_end_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let catalog = Arc::new(InProcessCatalog::new());
    let orchestrator = Orchestrator::new(catalog, OrchestratorConfig::default());
    orchestrator
        .compile("Core", [SourceUnit::new("type Base {} const SEED = 7;")], false)
        .unwrap();

    let source = generated_source(100);
    let mut group = c.benchmark_group("orchestrator");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("compile_and_register_100", |b| {
        b.iter(|| {
            let result = orchestrator
                .compile("Bench", [SourceUnit::new(black_box(source.as_str()))], false)
                .unwrap();
            end_profiling_frame();
            black_box(result.success)
        });
    });
    group.finish();
}

criterion_group!(benches, backend_benchmarks, end_to_end_benchmarks);
criterion_main!(benches);
