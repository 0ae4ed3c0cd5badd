// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested drop targets.
//!
//! Three targets nest as board ⊃ column ⊃ slot. Hovering reports shallow and
//! deep `is_over`, the drop runs slot → column → board, and the board
//! overrides the result the slot produced.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p understory_demos --example dnd_nested_targets`

use std::cell::Cell;

use understory_dnd::monitor::{DragMonitor, SourceMonitor, TargetMonitor};
use understory_dnd::types::{BeginDragOptions, IsOverOptions};
use understory_dnd::{DragDropManager, DragDropError, DragSource, DropTarget};

struct Task(&'static str);

impl DragSource<&'static str, String> for Task {
    fn begin_drag(&self, _m: &SourceMonitor<'_, &'static str, String>) -> Option<&'static str> {
        println!("begin_drag: {}", self.0);
        Some(self.0)
    }

    fn end_drag(&self, m: &SourceMonitor<'_, &'static str, String>) {
        println!(
            "end_drag: did_drop={} result={:?}",
            m.did_drop(),
            m.drop_result()
        );
    }
}

struct Zone {
    name: &'static str,
    overrides: bool,
    hovered_deep: Cell<bool>,
}

impl Zone {
    fn new(name: &'static str, overrides: bool) -> Self {
        Self {
            name,
            overrides,
            hovered_deep: Cell::new(false),
        }
    }
}

impl DropTarget<&'static str, String> for Zone {
    fn hover(&self, m: &TargetMonitor<'_, &'static str, String>) {
        self.hovered_deep
            .set(m.is_over_with(IsOverOptions { shallow: false }));
        println!(
            "  hover {:<6} shallow={} deep={}",
            self.name,
            m.is_over(),
            self.hovered_deep.get()
        );
    }

    fn drop(&self, m: &TargetMonitor<'_, &'static str, String>) -> Option<String> {
        println!(
            "  drop  {:<6} result so far: {:?}",
            self.name,
            m.drop_result()
        );
        if self.overrides || m.drop_result().is_none() {
            Some(format!("{} -> {}", m.item()?, self.name))
        } else {
            None
        }
    }
}

fn main() -> Result<(), DragDropError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut dnd: DragDropManager<&'static str, String> = DragDropManager::new();
    let task = dnd.register_source("task", Task("write docs"));
    let board = dnd.register_target("task", Zone::new("board", true));
    let column = dnd.register_target("task", Zone::new("column", false));
    let slot = dnd.register_target("task", Zone::new("slot", false));

    assert!(dnd.begin_drag(&[task], BeginDragOptions::default())?);

    println!("== hover board/column ==");
    let events = dnd.hover(&[board, column], None)?;
    println!("  transitions: {events:?}");

    println!("== hover board/column/slot ==");
    let events = dnd.hover(&[board, column, slot], None)?;
    println!("  transitions: {events:?}");

    println!("== drop ==");
    dnd.drop()?;
    assert_eq!(
        dnd.monitor().drop_result().map(String::as_str),
        Some("write docs -> board")
    );
    dnd.end_drag()?;
    Ok(())
}
