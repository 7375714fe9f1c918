//! Benchmarks for quadric decimation at several target ratios

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshtile_core::{Mesh, Point3d};
use meshtile_simplification::{decimate_mesh, decimate_mesh_lossless, DecimatorOptions};

fn generate_grid_mesh(size: usize) -> Mesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f64 / (size - 1) as f64 * std::f64::consts::PI;
            let fy = y as f64 / (size - 1) as f64 * std::f64::consts::PI;
            vertices.push(Point3d::new(x as f64, y as f64, (fx.sin() * fy.sin()) * 2.0));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    Mesh::from_vertices_and_faces(vertices, faces)
}

fn bench_decimation(c: &mut Criterion) {
    let sizes = [20, 40, 80];
    let ratios = [0.3, 0.5, 0.7];
    let options = DecimatorOptions::default();

    let mut group = c.benchmark_group("decimation");

    for &size in &sizes {
        let mesh = generate_grid_mesh(size);
        let face_count = mesh.face_count();

        for &ratio in &ratios {
            let target = (face_count as f64 * ratio) as isize;
            group.bench_with_input(
                BenchmarkId::new("qem", format!("{}f_r{}", face_count, (ratio * 100.0) as u32)),
                &(&mesh, target),
                |b, &(mesh, target)| {
                    b.iter(|| {
                        let result = decimate_mesh(black_box(mesh), target, &options).unwrap();
                        black_box(result);
                    });
                },
            );
        }

        group.bench_with_input(
            BenchmarkId::new("lossless", format!("{}f", face_count)),
            &mesh,
            |b, mesh| {
                b.iter(|| {
                    let result = decimate_mesh_lossless(black_box(mesh), &options).unwrap();
                    black_box(result);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decimation);
criterion_main!(benches);
