// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unregistering during a drag, then cancelling.
//!
//! A hovered target disappears mid-drag (its view was closed). The manager
//! purges it from the hover stack in the same step, a lagging hit test that
//! still reports it is tolerated, and the drag is finally cancelled.
//!
//! Run:
//! - `cargo run -p understory_demos --example dnd_unregister_cancel`

use kurbo::Point;
use understory_dnd::monitor::{DragMonitor, SourceMonitor};
use understory_dnd::types::BeginDragOptions;
use understory_dnd::{DragDropError, DragDropManager, DragSource, DropTarget};

struct File;

impl DragSource<&'static str> for File {
    fn begin_drag(&self, _m: &SourceMonitor<'_, &'static str>) -> Option<&'static str> {
        Some("notes.txt")
    }

    fn end_drag(&self, m: &SourceMonitor<'_, &'static str>) {
        println!("end_drag: did_drop={}", m.did_drop());
    }
}

struct Folder;

impl DropTarget<&'static str> for Folder {}

fn main() -> Result<(), DragDropError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut dnd: DragDropManager<&'static str> = DragDropManager::new();
    let file = dnd.register_source("file", File);
    let desktop = dnd.register_target("file", Folder);
    let window = dnd.register_target("file", Folder);

    dnd.subscribe(|m| {
        println!(
            "  [{}] hovering {:?}",
            m.state().phase(),
            m.target_ids()
        );
    });

    dnd.begin_drag(
        &[file],
        BeginDragOptions {
            client_offset: Some(Point::new(5.0, 5.0)),
            ..BeginDragOptions::default()
        },
    )?;
    dnd.hover(&[desktop, window], Some(Point::new(40.0, 40.0)))?;

    println!("== window closes ==");
    dnd.unregister(window)?;

    println!("== stale hit test ==");
    dnd.hover(&[desktop, window], Some(Point::new(42.0, 41.0)))?;
    assert_eq!(dnd.monitor().target_ids(), &[desktop]);

    println!("== escape ==");
    dnd.cancel()?;
    assert!(!dnd.monitor().is_dragging());
    Ok(())
}
