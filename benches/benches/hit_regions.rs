// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_dnd::DragDropManager;
use understory_dnd::DropTarget;
use understory_dnd::backend::{HitRegions, HitTest, Region};

struct Cell;

impl DropTarget<u32> for Cell {}

/// `n × n` grid of cells, each nested in one of `n` row regions.
fn grid(n: usize, cell: f64) -> HitRegions {
    let mut dnd: DragDropManager<u32> = DragDropManager::new();
    let mut regions = HitRegions::new();
    for y in 0..n {
        let y0 = y as f64 * cell;
        let row = dnd.register_target("item", Cell);
        regions.insert(
            row,
            Region::target(Rect::new(0.0, y0, n as f64 * cell, y0 + cell)),
        );
        for x in 0..n {
            let x0 = x as f64 * cell;
            let id = dnd.register_target("item", Cell);
            regions.insert(
                id,
                Region::target(Rect::new(x0, y0, x0 + cell, y0 + cell))
                    .with_parent(row)
                    .with_z_index(1),
            );
        }
    }
    regions
}

fn bench_targets_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_regions");
    for &n in &[8_usize, 32] {
        let regions = grid(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("targets_at_grid{n}"), |b| {
            let mut k = 0_usize;
            b.iter(|| {
                k = (k + 7) % (n * n);
                let p = Point::new((k % n) as f64 * 10.0 + 5.0, (k / n) as f64 * 10.0 + 5.0);
                black_box(regions.targets_at(p));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_targets_at);
criterion_main!(benches);
