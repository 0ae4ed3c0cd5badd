// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry of drag sources and drop targets.
//!
//! ## Owner callbacks
//!
//! Owners implement [`DragSource`] or [`DropTarget`] and hand them to the
//! [`DragDropManager`](crate::manager::DragDropManager). Every callback receives a
//! handle-scoped monitor ([`SourceMonitor`] / [`TargetMonitor`]) and a shared
//! reference to the owner. Callbacks therefore cannot start new transitions;
//! owners keep their own mutable state behind `Cell`/`RefCell`.
//!
//! ## Handles
//!
//! Slots are reused with a bumped generation, so a
//! stale [`HandleId`] is rejected instead of reaching a newer registration.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::DragDropError;
use crate::monitor::{DragMonitor, SourceMonitor, TargetMonitor};
use crate::types::{HandleId, HandleKind, ItemType, TargetType};

/// Owner side of a draggable element.
pub trait DragSource<I, R = ()> {
    /// Produce the item for a new drag, or `None` to decline the start.
    fn begin_drag(&self, monitor: &SourceMonitor<'_, I, R>) -> Option<I>;

    /// Whether a drag may start from this source. Defaults to true.
    ///
    /// Calling [`SourceMonitor::can_drag`] from here fails with
    /// [`IllegalReentry`](DragDropError::IllegalReentry).
    fn can_drag(&self, monitor: &SourceMonitor<'_, I, R>) -> bool {
        let _ = monitor;
        true
    }

    /// Whether this source owns the active drag.
    ///
    /// Defaults to "this handle started it". Override when a source can be
    /// recreated mid-drag (for example a list row that is remounted while
    /// reordering) and should recognize the item by identity instead.
    fn is_dragging(&self, monitor: &SourceMonitor<'_, I, R>) -> bool {
        monitor.source_id() == Some(monitor.handle_id())
    }

    /// Called once when the drag ends, dropped or not.
    fn end_drag(&self, monitor: &SourceMonitor<'_, I, R>) {
        let _ = monitor;
    }
}

/// Owner side of an element that accepts drops.
pub trait DropTarget<I, R = ()> {
    /// Whether the current item may be dropped here. Defaults to true.
    ///
    /// Calling [`TargetMonitor::can_drop`] from here fails with
    /// [`IllegalReentry`](DragDropError::IllegalReentry).
    fn can_drop(&self, monitor: &TargetMonitor<'_, I, R>) -> bool {
        let _ = monitor;
        true
    }

    /// Called on every hover update while this target is in the hover stack.
    fn hover(&self, monitor: &TargetMonitor<'_, I, R>) {
        let _ = monitor;
    }

    /// Handle the drop. `Some` replaces the drop result seen by outer targets.
    fn drop(&self, monitor: &TargetMonitor<'_, I, R>) -> Option<R> {
        let _ = monitor;
        None
    }
}

enum Handler<I, R> {
    Source {
        item_type: ItemType,
        source: Box<dyn DragSource<I, R>>,
    },
    Target {
        target_type: TargetType,
        target: Box<dyn DropTarget<I, R>>,
    },
}

impl<I, R> Handler<I, R> {
    fn kind(&self) -> HandleKind {
        match self {
            Self::Source { .. } => HandleKind::Source,
            Self::Target { .. } => HandleKind::Target,
        }
    }
}

struct Slot<I, R> {
    generation: u32,
    handler: Handler<I, R>,
}

/// Live sources and targets keyed by [`HandleId`].
pub(crate) struct Registry<I, R> {
    slots: Vec<Option<Slot<I, R>>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl<I, R> core::fmt::Debug for Registry<I, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sources = self.count(HandleKind::Source);
        let targets = self.count(HandleKind::Target);
        f.debug_struct("Registry")
            .field("sources", &sources)
            .field("targets", &targets)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<I, R> Default for Registry<I, R> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<I, R> Registry<I, R> {
    pub(crate) fn add_source(
        &mut self,
        item_type: ItemType,
        source: Box<dyn DragSource<I, R>>,
    ) -> HandleId {
        self.insert(Handler::Source { item_type, source })
    }

    pub(crate) fn add_target(
        &mut self,
        target_type: TargetType,
        target: Box<dyn DropTarget<I, R>>,
    ) -> HandleId {
        self.insert(Handler::Target {
            target_type,
            target,
        })
    }

    fn insert(&mut self, handler: Handler<I, R>) -> HandleId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Slot {
                generation,
                handler,
            });
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(Slot {
                generation,
                handler,
            }));
            self.generations.push(generation);
            (self.slots.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "HandleId uses 32-bit slot indices."
        )]
        let idx = idx as u32;
        HandleId::new(idx, generation)
    }

    /// Remove a live handle, returning what it was.
    pub(crate) fn remove(&mut self, id: HandleId) -> Result<HandleKind, DragDropError> {
        let kind = self.kind(id).ok_or(DragDropError::InvalidHandle(id))?;
        self.slots[id.idx()] = None;
        self.free_list.push(id.idx());
        Ok(kind)
    }

    fn slot(&self, id: HandleId) -> Option<&Slot<I, R>> {
        self.slots
            .get(id.idx())
            .and_then(|s| s.as_ref())
            .filter(|s| s.generation == id.generation())
    }

    fn slot_mut(&mut self, id: HandleId) -> Option<&mut Slot<I, R>> {
        self.slots
            .get_mut(id.idx())
            .and_then(|s| s.as_mut())
            .filter(|s| s.generation == id.generation())
    }

    pub(crate) fn is_alive(&self, id: HandleId) -> bool {
        self.slot(id).is_some()
    }

    /// True if `id` was issued by this registry but no longer refers to a live handle.
    pub(crate) fn is_stale(&self, id: HandleId) -> bool {
        let issued = self
            .generations
            .get(id.idx())
            .is_some_and(|&g| id.generation() >= 1 && id.generation() <= g);
        issued && !self.is_alive(id)
    }

    pub(crate) fn kind(&self, id: HandleId) -> Option<HandleKind> {
        self.slot(id).map(|s| s.handler.kind())
    }

    fn count(&self, kind: HandleKind) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.handler.kind() == kind)
            .count()
    }

    pub(crate) fn source(
        &self,
        id: HandleId,
    ) -> Result<(&ItemType, &dyn DragSource<I, R>), DragDropError> {
        match self.slot(id).map(|s| &s.handler) {
            Some(Handler::Source { item_type, source }) => Ok((item_type, source.as_ref())),
            _ => Err(DragDropError::InvalidHandle(id)),
        }
    }

    pub(crate) fn target(
        &self,
        id: HandleId,
    ) -> Result<(&TargetType, &dyn DropTarget<I, R>), DragDropError> {
        match self.slot(id).map(|s| &s.handler) {
            Some(Handler::Target {
                target_type,
                target,
            }) => Ok((target_type, target.as_ref())),
            _ => Err(DragDropError::InvalidHandle(id)),
        }
    }

    pub(crate) fn set_source_type(
        &mut self,
        id: HandleId,
        ty: ItemType,
    ) -> Result<(), DragDropError> {
        match self.slot_mut(id).map(|s| &mut s.handler) {
            Some(Handler::Source { item_type, .. }) => {
                *item_type = ty;
                Ok(())
            }
            _ => Err(DragDropError::InvalidHandle(id)),
        }
    }

    pub(crate) fn set_target_type(
        &mut self,
        id: HandleId,
        ty: TargetType,
    ) -> Result<(), DragDropError> {
        match self.slot_mut(id).map(|s| &mut s.handler) {
            Some(Handler::Target { target_type, .. }) => {
                *target_type = ty;
                Ok(())
            }
            _ => Err(DragDropError::InvalidHandle(id)),
        }
    }
}
