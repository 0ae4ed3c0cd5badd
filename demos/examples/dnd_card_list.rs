// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sortable card list driven by the pointer backend.
//!
//! Each card is both a drag source and a hover-only drop target: it never
//! accepts the drop, it only reports where the dragged card would land
//! (before or after itself, depending on which half the pointer is over).
//! The list behind the cards accepts the drop and returns the placement.
//!
//! Cards hide themselves while dragged by listening to `is_dragging`, and use
//! an empty drag preview so the toolkit draws nothing under the pointer.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example dnd_card_list`

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Point, Rect};
use log::info;
use understory_dnd::backend::{
    DragPreview, HitRegions, PointerBackend, PointerBackendOptions, PointerEvent, Region,
};
use understory_dnd::monitor::{DragMonitor, SourceMonitor, TargetMonitor};
use understory_dnd::{DragDropError, DragDropManager, DragSource, DropTarget, HandleId};

const CARD_HEIGHT: f64 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct DraggedCard {
    id: u32,
    index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Placement {
    id: u32,
    from: usize,
    to: usize,
}

struct CardSource {
    id: u32,
    index: usize,
}

impl DragSource<DraggedCard, Placement> for CardSource {
    fn begin_drag(&self, _m: &SourceMonitor<'_, DraggedCard, Placement>) -> Option<DraggedCard> {
        Some(DraggedCard {
            id: self.id,
            index: self.index,
        })
    }

    // Recognize the dragged card by identity, so a re-registered card still counts.
    fn is_dragging(&self, m: &SourceMonitor<'_, DraggedCard, Placement>) -> bool {
        m.item().is_some_and(|item| item.id == self.id)
    }
}

struct CardSlot {
    index: usize,
    top: f64,
    suggestion: Rc<Cell<Option<usize>>>,
}

impl DropTarget<DraggedCard, Placement> for CardSlot {
    fn can_drop(&self, _m: &TargetMonitor<'_, DraggedCard, Placement>) -> bool {
        false
    }

    fn hover(&self, m: &TargetMonitor<'_, DraggedCard, Placement>) {
        if !m.is_over() {
            return;
        }
        let (Some(item), Some(pointer)) = (m.item(), m.client_offset()) else {
            return;
        };
        if item.index == self.index {
            return;
        }
        let before = pointer.y < self.top + CARD_HEIGHT / 2.0;
        let to = if before { self.index } else { self.index + 1 };
        self.suggestion.set(Some(to));
    }
}

struct List {
    suggestion: Rc<Cell<Option<usize>>>,
}

impl DropTarget<DraggedCard, Placement> for List {
    fn drop(&self, m: &TargetMonitor<'_, DraggedCard, Placement>) -> Option<Placement> {
        let item = m.item()?;
        let to = self.suggestion.take()?;
        Some(Placement {
            id: item.id,
            from: item.index,
            to,
        })
    }
}

fn main() -> Result<(), DragDropError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut dnd: DragDropManager<DraggedCard, Placement> = DragDropManager::new();
    let mut regions = HitRegions::new();
    let suggestion = Rc::new(Cell::new(None));

    let list = dnd.register_target(
        "card",
        List {
            suggestion: suggestion.clone(),
        },
    );
    regions.insert(list, Region::target(Rect::new(0.0, 0.0, 200.0, 400.0)));

    let mut sources: Vec<HandleId> = Vec::new();
    for (index, id) in [10_u32, 20, 30, 40].into_iter().enumerate() {
        let top = index as f64 * CARD_HEIGHT;
        let bounds = Rect::new(0.0, top, 200.0, top + CARD_HEIGHT);
        let slot = dnd.register_target(
            "card",
            CardSlot {
                index,
                top,
                suggestion: suggestion.clone(),
            },
        );
        let source = dnd.register_source("card", CardSource { id, index });
        regions.insert(slot, Region::target(bounds).with_parent(list));
        regions.insert(source, Region::source(bounds).with_parent(slot));
        sources.push(source);

        dnd.listen_source(
            source,
            |m| m.is_dragging(),
            move |hidden| info!("card {id}: hidden={hidden}"),
        )?;
    }

    dnd.subscribe(|m| {
        if let Some(placement) = m.drop_result() {
            info!(
                "card {} moves from index {} to {}",
                placement.id, placement.from, placement.to
            );
        }
    });

    let mut backend: PointerBackend<HitRegions> =
        PointerBackend::new(regions, PointerBackendOptions::default());
    for &source in &sources {
        backend.connect_drag_preview(source, DragPreview::Empty);
    }

    // Drag the first card down past the third one.
    let gesture = [
        PointerEvent::Down(Point::new(50.0, 20.0)),
        PointerEvent::Move(Point::new(52.0, 22.0)),
        PointerEvent::Move(Point::new(50.0, 60.0)),
        PointerEvent::Move(Point::new(50.0, 110.0)),
        PointerEvent::Up(Point::new(50.0, 110.0)),
    ];
    for event in gesture {
        let outcome = backend.handle(&mut dnd, event)?;
        info!("{event:?} -> {outcome:?}");
        if backend.is_dragging() {
            info!(
                "  ghost at {:?}, preview connected: {}",
                dnd.monitor().source_client_offset(),
                backend.active_preview(&dnd).is_some()
            );
        }
    }
    Ok(())
}
