//! Benchmark suite for the tensor codec and prompt encoding

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array2, Array3};

use edge_segment::models::codec::resample_bilinear;
use edge_segment::models::{decode_mask, encode_image, encode_prompts};
use edge_segment::{BBox, Point};

fn benchmark_encode_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_image");

    for size in [256u32, 512, 1024].iter() {
        let raster = Array3::<u8>::from_shape_fn((*size as usize, *size as usize, 3), |(y, x, ch)| {
            ((x + y + ch) % 256) as u8
        });

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            size,
            |b, &size| b.iter(|| encode_image(black_box(raster.view()), (size, size))),
        );
    }

    group.finish();
}

fn benchmark_decode_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_mask");
    let low_res = Array2::<f32>::from_shape_fn((256, 256), |(y, x)| (x as f32 - y as f32) / 64.0);

    group.bench_function("256_to_1024", |b| {
        b.iter(|| decode_mask(black_box(low_res.view()), (1024, 1024)))
    });
    group.bench_function("resample_only_256_to_1024", |b| {
        b.iter(|| resample_bilinear(black_box(low_res.view()), (1024, 1024)))
    });

    group.finish();
}

fn benchmark_encode_prompts(c: &mut Criterion) {
    let points: Vec<Point> = (0..16).map(|i| Point::new(i * 64, i * 32)).collect();
    let negatives: Vec<Point> = (0..8).map(|i| Point::new(1000 - i * 10, 5)).collect();
    let bbox = Some(BBox::new(10, 10, 900, 800));

    c.bench_function("encode_prompts_26", |b| {
        b.iter(|| encode_prompts(black_box(&points), black_box(&negatives), bbox))
    });
}

criterion_group!(
    benches,
    benchmark_encode_image,
    benchmark_decode_mask,
    benchmark_encode_prompts
);
criterion_main!(benches);
