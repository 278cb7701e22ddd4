use bitshuffle_transpose::{KernelId, TransposeEngine};
use core::hint::black_box;
use core::time::Duration;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn generate_input(size: usize, element_size: usize) -> Vec<u8> {
    // Slowly increasing little endian integers, typical of sensor or index data.
    let mut data = vec![0u8; size];
    for (index, element) in data.chunks_exact_mut(element_size).enumerate() {
        let value = (index as u64 / 3).to_le_bytes();
        let len = element.len().min(8);
        element[..len].copy_from_slice(&value[..len]);
    }
    data
}

fn criterion_benchmark(c: &mut Criterion) {
    let size = 8388608; // 8MB
    let element_sizes = [1usize, 2, 4, 8];

    let mut group = c.benchmark_group("Bit Transpose");
    group.throughput(Throughput::Bytes(size as u64));
    group.warm_up_time(Duration::from_secs(5));
    group.measurement_time(Duration::from_secs(15));

    for element_size in element_sizes {
        let input = generate_input(size, element_size);
        let mut output = vec![0u8; size];
        let mut scratch = vec![0u8; size];

        for kernel in KernelId::all_values() {
            let Ok(engine) = TransposeEngine::new(*kernel) else {
                continue;
            };

            group.bench_with_input(
                BenchmarkId::new(format!("transpose_{kernel}"), element_size),
                &input,
                |b, input| {
                    b.iter(|| {
                        engine
                            .transpose_with_scratch(
                                black_box(input),
                                black_box(&mut output),
                                &mut scratch,
                                element_size,
                            )
                            .unwrap()
                    })
                },
            );

            group.bench_with_input(
                BenchmarkId::new(format!("untranspose_{kernel}"), element_size),
                &input,
                |b, input| {
                    b.iter(|| {
                        engine
                            .untranspose_with_scratch(
                                black_box(input),
                                black_box(&mut output),
                                &mut scratch,
                                element_size,
                            )
                            .unwrap()
                    })
                },
            );
        }

        let engine = TransposeEngine::portable();
        group.bench_with_input(
            BenchmarkId::new("shuffle_bytes", element_size),
            &input,
            |b, input| {
                b.iter(|| {
                    engine
                        .shuffle_bytes(black_box(input), black_box(&mut output), element_size)
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = criterion_benchmark
}

criterion_main!(benches);
