// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag session state.
//!
//! [`DragState`] is owned by the [`DragDropMonitor`](crate::monitor::DragDropMonitor)
//! and only mutated by the [`DragDropManager`](crate::manager::DragDropManager)
//! transition methods. Everything else sees it through `&` accessors.
//!
//! Phases move `Idle → Dragging → (Dropped | cancelled) → Idle`. Leaving a
//! session always resets every field, so a fresh session never observes data
//! from the previous one.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::error::DragDropError;
use crate::hover::{HoverEvent, HoverStack};
use crate::types::{HandleId, ItemType};

/// Phase of the drag session.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DragPhase {
    /// No drag in progress.
    #[default]
    Idle,
    /// An item is being dragged.
    Dragging,
    /// A drop was dispatched; waiting for the end of the drag.
    Dropped,
}

impl fmt::Display for DragPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Dragging => "dragging",
            Self::Dropped => "dropped",
        })
    }
}

/// A state transition requested from the manager.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Start a drag.
    BeginDrag,
    /// Replace the hover stack.
    Hover,
    /// Dispatch the drop.
    Drop,
    /// Finish the drag.
    EndDrag,
    /// Abandon the drag without a drop.
    Cancel,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeginDrag => "begin a drag",
            Self::Hover => "hover",
            Self::Drop => "drop",
            Self::EndDrag => "end a drag",
            Self::Cancel => "cancel",
        })
    }
}

/// Pointer positions recorded during a drag, in client coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragOffsets {
    /// Pointer position when the drag started.
    pub initial_client: Option<Point>,
    /// Origin of the source's box when the drag started.
    pub initial_source_client: Option<Point>,
    /// Latest pointer position.
    pub client: Option<Point>,
}

impl DragOffsets {
    /// Where the source's box would be if it followed the pointer.
    pub fn source_client(&self) -> Option<Point> {
        let delta = self.difference_from_initial()?;
        Some(self.initial_source_client? + delta)
    }

    /// Pointer travel since the drag started.
    pub fn difference_from_initial(&self) -> Option<Vec2> {
        Some(self.client? - self.initial_client?)
    }
}

/// Current drag session.
#[derive(Debug)]
pub struct DragState<I, R = ()> {
    phase: DragPhase,
    item_type: Option<ItemType>,
    item: Option<I>,
    source_id: Option<HandleId>,
    hover: HoverStack<HandleId>,
    drop_result: Option<R>,
    did_drop: bool,
    offsets: DragOffsets,
}

impl<I, R> Default for DragState<I, R> {
    fn default() -> Self {
        Self {
            phase: DragPhase::Idle,
            item_type: None,
            item: None,
            source_id: None,
            hover: HoverStack::new(),
            drop_result: None,
            did_drop: false,
            offsets: DragOffsets::default(),
        }
    }
}

impl<I, R> DragState<I, R> {
    /// Current phase.
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// True from a successful drag start until the drag ends, including after a drop.
    pub fn is_dragging(&self) -> bool {
        self.phase != DragPhase::Idle
    }

    /// Type of the dragged item.
    pub fn item_type(&self) -> Option<&ItemType> {
        self.item_type.as_ref()
    }

    /// The dragged item.
    pub fn item(&self) -> Option<&I> {
        self.item.as_ref()
    }

    /// Source that produced the item, unless it has been unregistered since.
    pub fn source_id(&self) -> Option<HandleId> {
        self.source_id
    }

    /// Hover stack, outermost first.
    pub fn target_ids(&self) -> &[HandleId] {
        self.hover.as_slice()
    }

    /// Result recorded by the drop, if any target returned one.
    pub fn drop_result(&self) -> Option<&R> {
        self.drop_result.as_ref()
    }

    /// True once a target's drop handler ran in this session.
    pub fn did_drop(&self) -> bool {
        self.did_drop
    }

    /// Recorded pointer positions.
    pub fn offsets(&self) -> &DragOffsets {
        &self.offsets
    }

    pub(crate) fn expect_phase(
        &self,
        op: Transition,
        allowed: &[DragPhase],
    ) -> Result<(), DragDropError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(DragDropError::IllegalTransition {
                op,
                phase: self.phase,
            })
        }
    }

    pub(crate) fn begin(
        &mut self,
        source_id: HandleId,
        item_type: ItemType,
        item: I,
        offsets: DragOffsets,
    ) {
        *self = Self {
            phase: DragPhase::Dragging,
            item_type: Some(item_type),
            item: Some(item),
            source_id: Some(source_id),
            offsets,
            ..Self::default()
        };
    }

    pub(crate) fn move_pointer(&mut self, client_offset: Option<Point>) {
        if let Some(p) = client_offset {
            self.offsets.client = Some(p);
        }
    }

    pub(crate) fn replace_targets(
        &mut self,
        target_ids: &[HandleId],
    ) -> Vec<HoverEvent<HandleId>> {
        self.hover.replace(target_ids)
    }

    pub(crate) fn record_drop(&mut self, result: Option<R>) {
        if let Some(result) = result {
            self.drop_result = Some(result);
        }
        self.did_drop = true;
    }

    pub(crate) fn finish_drop(&mut self) {
        self.phase = DragPhase::Dropped;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Forget `id` as source and as hovered target. Returns true if anything changed.
    pub(crate) fn purge(&mut self, id: HandleId) -> bool {
        let was_source = self.source_id == Some(id);
        if was_source {
            self.source_id = None;
        }
        let was_hovered = self.hover.remove(id);
        was_source || was_hovered
    }

    /// Drop `id` from the hover stack only.
    pub(crate) fn unhover(&mut self, id: HandleId) -> bool {
        self.hover.remove(id)
    }
}
