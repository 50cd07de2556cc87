use bytemuck::{Pod, Zeroable};
use cloud_span::{
    containers::{HybridBuffer, MatrixViewParams, PointGrid},
    layout::PointRecord,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{thread_rng, Rng};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct PointXYZI {
    x: f32,
    y: f32,
    z: f32,
    intensity: f32,
}

impl PointRecord for PointXYZI {
    type Scalar = f32;
}

fn gen_random_points(count: usize) -> Vec<PointXYZI> {
    let mut rng = thread_rng();
    (0..count)
        .map(|_| PointXYZI {
            x: rng.gen(),
            y: rng.gen(),
            z: rng.gen(),
            intensity: rng.gen(),
        })
        .collect()
}

fn push_points(points: &[PointXYZI]) {
    let mut buffer = HybridBuffer::new();
    for point in points {
        let _ = buffer.push(*point);
    }
    black_box(buffer);
}

fn resize_grid(width: usize, height: usize) {
    let mut grid = PointGrid::<PointXYZI>::new();
    let _ = grid.resize_2d(width, height);
    black_box(grid);
}

fn sum_coordinates_with_view(grid: &PointGrid<PointXYZI>) {
    if let Ok(view) = grid.matrix_view(MatrixViewParams::new(3, 4, 0)) {
        black_box(view.column_sum());
    }
}

fn sum_coordinates_with_iter(grid: &PointGrid<PointXYZI>) {
    let sum = grid
        .iter()
        .fold([0.0f32; 3], |sum, point| {
            [sum[0] + point.x, sum[1] + point.y, sum[2] + point.z]
        });
    black_box(sum);
}

fn bench(c: &mut Criterion) {
    let random_points = gen_random_points(1 << 16);
    let mut external = random_points.clone();

    c.bench_function("hybrid_buffer_push", |b| {
        b.iter(|| push_points(&random_points));
    });
    c.bench_function("point_grid_resize_2d", |b| {
        b.iter(|| resize_grid(640, 480));
    });

    let Ok(grid) = PointGrid::from_slice(&mut external, 256, 256) else {
        return;
    };
    c.bench_function("matrix_view_sum", |b| {
        b.iter(|| sum_coordinates_with_view(&grid));
    });
    c.bench_function("iterator_sum", |b| {
        b.iter(|| sum_coordinates_with_iter(&grid));
    });
}

criterion_group! {
    name = hybrid_buffer;
    config = Criterion::default().sample_size(40);
    targets = bench
}
criterion_main!(hybrid_buffer);
