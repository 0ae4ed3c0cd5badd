// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pointer backend.
//!
//! [`PointerBackend`] turns press/move/release input into manager
//! transitions:
//!
//! - `Down` over a draggable source arms a press. Nothing is dragged yet.
//! - `Move` past [`PointerBackendOptions::drag_threshold`] starts the drag
//!   from the innermost source that can drag, then hovers whatever the
//!   [`HitTest`] reports under the pointer. Later moves only hover.
//! - `Up` hovers the release point, drops, and ends the drag. Releasing an
//!   armed press that never crossed the threshold is a plain click.
//! - `Cancel` (escape, focus loss, pointer capture lost) abandons the drag.
//!
//! ## Example
//!
//! ```
//! use kurbo::{Point, Rect};
//! use understory_dnd::backend::{HitRegions, PointerBackend, PointerBackendOptions, PointerEvent, Region};
//! use understory_dnd::manager::DragDropManager;
//! use understory_dnd::monitor::SourceMonitor;
//! use understory_dnd::registry::{DragSource, DropTarget};
//!
//! struct Card;
//! impl DragSource<&'static str> for Card {
//!     fn begin_drag(&self, _m: &SourceMonitor<'_, &'static str>) -> Option<&'static str> {
//!         Some("card-1")
//!     }
//! }
//! struct Column;
//! impl DropTarget<&'static str> for Column {}
//!
//! let mut dnd: DragDropManager<&'static str> = DragDropManager::new();
//! let card = dnd.register_source("card", Card);
//! let column = dnd.register_target("card", Column);
//!
//! let mut regions = HitRegions::new();
//! regions.insert(card, Region::source(Rect::new(0.0, 0.0, 100.0, 40.0)));
//! regions.insert(column, Region::target(Rect::new(200.0, 0.0, 300.0, 400.0)));
//! let mut backend: PointerBackend<_> = PointerBackend::new(regions, PointerBackendOptions::default());
//!
//! backend.handle(&mut dnd, PointerEvent::Down(Point::new(10.0, 10.0))).unwrap();
//! let moved = backend.handle(&mut dnd, PointerEvent::Move(Point::new(250.0, 20.0))).unwrap();
//! assert_eq!(moved.started, Some(card));
//! let released = backend.handle(&mut dnd, PointerEvent::Up(Point::new(250.0, 20.0))).unwrap();
//! assert!(released.dropped && released.ended);
//! ```

use alloc::vec::Vec;

use kurbo::Point;
use log::{debug, warn};

use super::HitTest;
use super::preview::{DragPreview, DragPreviews};
use crate::error::DragDropError;
use crate::hover::HoverEvent;
use crate::manager::DragDropManager;
use crate::state::DragPhase;
use crate::types::{HandleId, HandleKind, HandleStack};

/// Raw pointer input in client coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PointerEvent {
    /// Primary button pressed.
    Down(Point),
    /// Pointer moved.
    Move(Point),
    /// Primary button released.
    Up(Point),
    /// The gesture was aborted.
    Cancel,
}

/// Tuning for [`PointerBackend`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerBackendOptions {
    /// Distance in client units the pointer must travel from the press
    /// before a drag starts. Zero starts on the first move.
    pub drag_threshold: f64,
}

impl Default for PointerBackendOptions {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
        }
    }
}

/// What one [`PointerBackend::handle`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendOutcome {
    /// Source that started a drag during this event.
    pub started: Option<HandleId>,
    /// Hover enter/leave transitions.
    pub transitions: Vec<HoverEvent<HandleId>>,
    /// A target handled the drop.
    pub dropped: bool,
    /// The drag ended (after a drop or a cancel).
    pub ended: bool,
    /// The drag was cancelled.
    pub cancelled: bool,
}

#[derive(Clone, Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Pressed {
        origin: Point,
        candidates: HandleStack,
    },
    Dragging,
}

/// Pointer-driven backend over a [`HitTest`] implementation.
///
/// `P` is the toolkit's preview resource type; see [`DragPreviews`].
#[derive(Debug)]
pub struct PointerBackend<H, P = ()> {
    hit_test: H,
    options: PointerBackendOptions,
    gesture: Gesture,
    previews: DragPreviews<P>,
}

impl<H: HitTest, P: Default> PointerBackend<H, P> {
    /// Create a backend whose empty preview is `P::default()`.
    pub fn new(hit_test: H, options: PointerBackendOptions) -> Self {
        Self::with_empty_preview(hit_test, options, P::default)
    }
}

impl<H: HitTest, P> PointerBackend<H, P> {
    /// Create a backend with a custom empty-preview factory.
    pub fn with_empty_preview(
        hit_test: H,
        options: PointerBackendOptions,
        make_empty: fn() -> P,
    ) -> Self {
        Self {
            hit_test,
            options,
            gesture: Gesture::Idle,
            previews: DragPreviews::new(make_empty),
        }
    }

    /// The hit tester.
    pub fn hit_test(&self) -> &H {
        &self.hit_test
    }

    /// Mutable access to the hit tester, for layout changes.
    pub fn hit_test_mut(&mut self) -> &mut H {
        &mut self.hit_test
    }

    /// Current options.
    pub fn options(&self) -> PointerBackendOptions {
        self.options
    }

    /// Returns true between a press on a source and the start of its drag.
    pub fn is_pressed(&self) -> bool {
        matches!(self.gesture, Gesture::Pressed { .. })
    }

    /// Returns true while this backend drives a drag.
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging)
    }

    /// Connect a drag preview to `source`.
    ///
    /// Previews of sources that have since been unregistered are dropped on
    /// the next press.
    pub fn connect_drag_preview(&mut self, source: HandleId, preview: DragPreview<P>) {
        self.previews.connect(source, preview);
    }

    /// Disconnect the preview of `source`.
    pub fn disconnect_drag_preview(&mut self, source: HandleId) -> Option<DragPreview<P>> {
        self.previews.disconnect(source)
    }

    /// Preview registrations.
    pub fn previews(&self) -> &DragPreviews<P> {
        &self.previews
    }

    /// Preview resource for the active drag's source, if one is connected.
    pub fn active_preview<I: 'static, R: 'static>(
        &self,
        manager: &DragDropManager<I, R>,
    ) -> Option<&P> {
        let source = manager.monitor().source_id()?;
        self.previews.resolve(source)
    }

    /// Feed one pointer event through the backend.
    ///
    /// # Errors
    ///
    /// Propagates [`DragDropError`] from the manager. Handles the hit tester
    /// reports that are no longer registered are skipped rather than reported.
    pub fn handle<I: 'static, R: 'static>(
        &mut self,
        manager: &mut DragDropManager<I, R>,
        event: PointerEvent,
    ) -> Result<BackendOutcome, DragDropError> {
        let mut outcome = BackendOutcome::default();
        match event {
            PointerEvent::Down(point) => self.press(manager, point),
            PointerEvent::Move(point) => match core::mem::take(&mut self.gesture) {
                Gesture::Idle => {}
                Gesture::Pressed { origin, candidates } => {
                    if (point - origin).hypot() < self.options.drag_threshold {
                        self.gesture = Gesture::Pressed { origin, candidates };
                    } else if let Some(source) = self.start(manager, origin, &candidates)? {
                        outcome.started = Some(source);
                        self.gesture = Gesture::Dragging;
                        outcome.transitions = self.hover(manager, point)?;
                    }
                }
                Gesture::Dragging => {
                    if manager.state().phase() == DragPhase::Dragging {
                        self.gesture = Gesture::Dragging;
                        outcome.transitions = self.hover(manager, point)?;
                    }
                }
            },
            PointerEvent::Up(point) => {
                if let Gesture::Dragging = core::mem::take(&mut self.gesture)
                    && manager.state().phase() == DragPhase::Dragging
                    && let Err(err) = self.release(manager, point, &mut outcome)
                {
                    abandon(manager);
                    return Err(err);
                }
            }
            PointerEvent::Cancel => {
                if let Gesture::Dragging = core::mem::take(&mut self.gesture)
                    && manager.state().phase() == DragPhase::Dragging
                {
                    if let Err(err) = manager.cancel() {
                        self.gesture = Gesture::Dragging;
                        return Err(err);
                    }
                    outcome.cancelled = true;
                    outcome.ended = true;
                }
            }
        }
        Ok(outcome)
    }

    fn release<I: 'static, R: 'static>(
        &self,
        manager: &mut DragDropManager<I, R>,
        point: Point,
        outcome: &mut BackendOutcome,
    ) -> Result<(), DragDropError> {
        outcome.transitions = self.hover(manager, point)?;
        manager.drop()?;
        outcome.dropped = manager.monitor().did_drop();
        manager.end_drag()?;
        outcome.ended = true;
        Ok(())
    }

    fn press<I: 'static, R: 'static>(&mut self, manager: &DragDropManager<I, R>, point: Point) {
        if manager.monitor().is_dragging() {
            return;
        }
        self.previews
            .retain(|id| manager.monitor().handle_kind(id) == Some(HandleKind::Source));
        let candidates = live_sources(manager, self.hit_test.sources_at(point));
        self.gesture = if candidates.is_empty() {
            Gesture::Idle
        } else {
            Gesture::Pressed {
                origin: point,
                candidates,
            }
        };
    }

    fn start<I: 'static, R: 'static>(
        &self,
        manager: &mut DragDropManager<I, R>,
        origin: Point,
        candidates: &[HandleId],
    ) -> Result<Option<HandleId>, DragDropError> {
        if manager.monitor().is_dragging() {
            return Ok(None);
        }
        let candidates = live_sources(manager, candidates.iter().copied().collect());
        if candidates.is_empty() {
            return Ok(None);
        }
        let hit_test = &self.hit_test;
        let started =
            manager.begin_drag_with(&candidates, Some(origin), |id| hit_test.source_origin(id))?;
        let source = manager.monitor().source_id().filter(|_| started);
        if let Some(source) = source {
            debug!("pointer travelled past the drag threshold; started from {source}");
        }
        Ok(source)
    }

    fn hover<I: 'static, R: 'static>(
        &self,
        manager: &mut DragDropManager<I, R>,
        point: Point,
    ) -> Result<Vec<HoverEvent<HandleId>>, DragDropError> {
        let targets = self.hit_test.targets_at(point);
        manager.hover(&targets, Some(point))
    }
}

fn live_sources<I, R>(manager: &DragDropManager<I, R>, mut ids: HandleStack) -> HandleStack
where
    I: 'static,
    R: 'static,
{
    ids.retain(|id| manager.monitor().handle_kind(*id) == Some(HandleKind::Source));
    ids
}

/// Drop a session whose release failed part way, so the engine is idle again.
fn abandon<I: 'static, R: 'static>(manager: &mut DragDropManager<I, R>) {
    if manager.state().phase() == DragPhase::Idle {
        return;
    }
    let result = if manager.state().phase() == DragPhase::Dragging {
        manager.cancel()
    } else {
        manager.end_drag()
    };
    match result {
        Ok(()) => debug!("abandoned the drag after a failed release"),
        Err(err) => warn!("could not abandon the drag after a failed release: {err}"),
    }
}
