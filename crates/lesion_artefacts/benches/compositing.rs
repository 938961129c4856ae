mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use image::{Rgb, RgbImage};
use lesion_artefacts::augment::{resize, rotate};
use lesion_artefacts::prelude::{
    embed, Artefact, ArtefactKind, ArtefactPatch, Position, Raster,
};

const PATCH_SIZES: [usize; 3] = [16, 64, 256];
const KINDS: [ArtefactKind; 5] = ArtefactKind::ALL;

fn patch(size: usize) -> ArtefactPatch {
    let mut delta = Raster::new(size, size, 3);
    for (i, v) in delta.data_mut().iter_mut().enumerate() {
        *v = ((i % 97) as i16) - 48;
    }
    ArtefactPatch::from_delta(delta).expect("three channels")
}

fn embed_benches(c: &mut Criterion) {
    let target: Raster<u8> = Raster::from_rgb(RgbImage::from_pixel(512, 512, Rgb([128, 128, 128])));
    let mut group = c.benchmark_group("compositing/embed");

    for &size in &PATCH_SIZES {
        let p = patch(size);
        group.throughput(common::pixel_throughput(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(embed(&target, p.delta(), Position::new(200, 300))));
        });
    }
    group.finish();
}

fn transform_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositing/transform");

    for &size in &PATCH_SIZES {
        let p = patch(size);
        group.bench_with_input(BenchmarkId::new("resize", size), &size, |b, _| {
            b.iter(|| black_box(resize(&p, 1.3)));
        });
        group.bench_with_input(BenchmarkId::new("rotate", size), &size, |b, _| {
            b.iter(|| black_box(rotate(&p, 37.0)));
        });
    }
    group.finish();
}

fn apply_benches(c: &mut Criterion) {
    let image = RgbImage::from_pixel(512, 512, Rgb([180, 140, 120]));
    let mask = common::centered_lesion(512);
    let mut group = c.benchmark_group("compositing/apply");

    for kind in KINDS {
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter_batched(
                || Artefact::new(kind, vec![patch(32), patch(48)], Some(7)).expect("artefact ok"),
                |mut artefact| black_box(artefact.apply(&image, Some(&mask)).map(|o| o.len())),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = common::image_criterion();
    targets = embed_benches, transform_benches, apply_benches
}
criterion_main!(benches);
