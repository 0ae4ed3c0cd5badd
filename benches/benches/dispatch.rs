// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_dnd::monitor::{SourceMonitor, TargetMonitor};
use understory_dnd::types::BeginDragOptions;
use understory_dnd::{DragDropManager, DragSource, DropTarget, HandleId};

struct Source;

impl DragSource<u32, u32> for Source {
    fn begin_drag(&self, _m: &SourceMonitor<'_, u32, u32>) -> Option<u32> {
        Some(1)
    }
}

struct Target(u32);

impl DropTarget<u32, u32> for Target {
    fn hover(&self, m: &TargetMonitor<'_, u32, u32>) {
        black_box(m.is_over());
    }

    fn drop(&self, _m: &TargetMonitor<'_, u32, u32>) -> Option<u32> {
        Some(self.0)
    }
}

/// A source plus `depth` nested targets, returned outermost first.
fn nested(depth: u32) -> (DragDropManager<u32, u32>, HandleId, Vec<HandleId>) {
    let mut dnd = DragDropManager::new();
    let source = dnd.register_source("item", Source);
    let targets = (0..depth)
        .map(|i| dnd.register_target("item", Target(i)))
        .collect();
    (dnd, source, targets)
}

fn bench_hover(c: &mut Criterion) {
    let mut group = c.benchmark_group("hover");
    for &depth in &[4_u32, 16, 64] {
        let (mut dnd, source, targets) = nested(depth);
        dnd.begin_drag(&[source], BeginDragOptions::default())
            .unwrap();
        let half = &targets[..targets.len() / 2];
        group.throughput(Throughput::Elements(u64::from(depth)));
        group.bench_function(format!("alternate_depth{depth}"), |b| {
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let stack = if flip { &targets[..] } else { half };
                black_box(dnd.hover(stack, None).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    for &depth in &[4_u32, 16, 64] {
        group.throughput(Throughput::Elements(u64::from(depth)));
        group.bench_function(format!("begin_hover_drop_end_depth{depth}"), |b| {
            b.iter_batched(
                || nested(depth),
                |(mut dnd, source, targets)| {
                    dnd.begin_drag(&[source], BeginDragOptions::default())
                        .unwrap();
                    dnd.hover(&targets, None).unwrap();
                    dnd.drop().unwrap();
                    black_box(dnd.monitor().drop_result().copied());
                    dnd.end_drag().unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_listeners(c: &mut Criterion) {
    let mut group = c.benchmark_group("listeners");
    for &count in &[16_u32, 256] {
        let (mut dnd, source, targets) = nested(count);
        for &t in &targets {
            dnd.listen_target(t, |m| m.is_over(), |v| {
                black_box(*v);
            })
            .unwrap();
        }
        dnd.begin_drag(&[source], BeginDragOptions::default())
            .unwrap();
        let mut i = 0;
        group.bench_function(format!("hover_notify_{count}"), |b| {
            b.iter(|| {
                i = (i + 1) % targets.len();
                black_box(dnd.hover(&targets[i..=i], None).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hover, bench_session, bench_listeners);
criterion_main!(benches);
