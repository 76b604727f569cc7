//! Benchmarks for export trampolines and the binder.
//!
//! Calls go through the JNI shells over the simulated VM, so the numbers
//! measure conversion and release overhead rather than a real JVM.
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- binder
//! ```
//!
//! prints per-scope timings of the binder after the run.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use hostbridge::jni;
use hostbridge::prelude::*;
use hostbridge_backends::sim::{SimRef, SimVm};

#[cfg(feature = "profile-with-puffin")]
use std::collections::HashMap;

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

/// Print the average time of every top-level scope recorded so far.
#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    use puffin::Reader;

    let Some(frame_view) = FRAME_VIEW.get() else {
        return;
    };
    let view = frame_view.lock();
    let scope_collection = view.scope_collection();

    let mut timings: HashMap<String, i64> = HashMap::new();
    let mut frame_count = 0i64;
    for frame in view.recent_frames() {
        frame_count += 1;
        let Ok(unpacked) = frame.unpacked() else {
            continue;
        };
        for (_thread, stream_info) in unpacked.thread_streams.iter() {
            let Ok(scopes) = Reader::from_start(&stream_info.stream).read_top_scopes() else {
                continue;
            };
            for scope in scopes {
                if let Some(details) = scope_collection.fetch_by_id(&scope.id) {
                    *timings.entry(details.name().to_string()).or_insert(0) += scope.record.duration_ns;
                }
            }
        }
    }

    println!("\n=== Profiling Summary ({frame_count} frames) ===");
    let mut entries: Vec<_> = timings.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    for (name, ns) in entries {
        let avg = ns / frame_count.max(1);
        println!("  {:30} {:>10.2?}", name, std::time::Duration::from_nanos(avg as u64));
    }
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

fn answer() -> KInt {
    42
}

fn byte_len(text: KStringPtr) -> KInt {
    text.len() as KInt
}

fn sum(values: KIntArray) -> KInt {
    unsafe { values.as_slice() }.iter().sum()
}

fn add(a: KInt, b: KInt) -> KInt {
    a.wrapping_add(b)
}

hostbridge::jni_exports! {
    env: SimVm,
    module: Bench,
    registrar: register_bench,
    exports: {
        fn Answer() -> KInt = answer;
        fn ByteLen(text: KStringPtr) -> KInt = byte_len;
        fn Sum(values: KIntArray) -> KInt = sum;
        direct fn Add(a: KInt, b: KInt) -> KInt = add;
    }
}

fn bench_vm() -> SimVm {
    let vm = SimVm::new();
    let interop = vm.define_class("org/hostbridge/interop/InteropNativeModule");
    vm.define_static(interop, "callCallbackFromNative", "(I[BI)I", |vm, args| {
        vm.arg_int(&args[2]).unwrap_or(0)
    });
    vm.define_class("bench/Bench");
    vm
}

/// Per-call overhead of each trampoline flavour.
fn trampoline_benchmarks(c: &mut Criterion) {
    let vm = bench_vm();
    let raw = vm.as_raw();
    let mut group = c.benchmark_group("trampolines");

    group.bench_function("direct_add", |b| {
        b.iter(|| black_box(Java_org_Bench_Add(black_box(2), black_box(3))))
    });
    group.bench_function("plain_no_args", |b| {
        b.iter(|| black_box(Java_org_Bench_Answer(raw, SimRef::NULL)))
    });

    let text = vm.new_string("héllo wörld");
    group.bench_function("string_argument", |b| {
        b.iter(|| black_box(Java_org_Bench_ByteLen(raw, SimRef::NULL, black_box(text))))
    });

    for len in [16usize, 1024] {
        let values: Vec<i32> = (0..len as i32).collect();
        let array = vm.new_ints(&values);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("pinned_int_array", len), &array, |b, &array| {
            b.iter(|| black_box(Java_org_Bench_Sum(raw, SimRef::NULL, array)))
        });
    }
    group.finish();
}

/// Binding a table of exports, including dispatcher resolution.
fn binder_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("binder");

    for copies in [1usize, 32] {
        group.throughput(Throughput::Elements((copies * 4) as u64));
        group.bench_with_input(BenchmarkId::new("load", copies), &copies, |b, &copies| {
            b.iter(|| {
                let vm = bench_vm();
                let mut builder = ExportsBuilder::new();
                for _ in 0..copies {
                    builder.register(register_bench);
                }
                builder.set_classpath("Bench", "bench/Bench").ok();
                let loaded = jni::load(&vm, builder.build(), &LoaderConfig::default());
                end_profiling_frame();
                black_box(loaded.map(|loaded| loaded.report.bound_count()))
            });
        });
    }
    group.finish();
    print_profiling_stats();
}

/// Synchronous callbacks into the dispatcher.
fn callback_benchmarks(c: &mut Criterion) {
    let vm = bench_vm();
    let mut builder = ExportsBuilder::new();
    builder.register(register_bench);
    builder.set_classpath("Bench", "bench/Bench").ok();
    let Ok(loaded) = jni::load(&vm, builder.build(), &LoaderConfig::default()) else {
        return;
    };
    let dispatcher = loaded.dispatcher();
    let host = jni::JniHost::new(&vm);
    let args = vec![0u8; 64];

    c.bench_function("callbacks/call_sync_64_bytes", |b| {
        b.iter(|| black_box(dispatcher.call_sync(host, 1, black_box(&args))))
    });
}

criterion_group!(benches, trampoline_benchmarks, binder_benchmarks, callback_benchmarks);
criterion_main!(benches);
