// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monitors: read-only views over the drag session.
//!
//! ## Overview
//!
//! [`DragDropMonitor`] is the query engine over the [`DragState`] and the
//! registry. Nothing here mutates the session; transitions go through
//! [`DragDropManager`](crate::manager::DragDropManager).
//!
//! [`SourceMonitor`] and [`TargetMonitor`] are handle-scoped views handed to
//! owner callbacks and selectors. Queries they share live on the
//! [`DragMonitor`] trait.
//!
//! ## Reentrancy
//!
//! `can_drag` / `can_drop` evaluation runs owner code. While a monitor is
//! evaluating one of them, asking the same question again (from inside that
//! owner code) fails with [`DragDropError::IllegalReentry`]. The guard is
//! per monitor instance, so independent managers never see each other's
//! evaluations, and it is released when the outer evaluation returns.

use core::cell::Cell;

use kurbo::{Point, Vec2};

use crate::error::{DragDropError, Query};
use crate::registry::Registry;
use crate::state::{DragOffsets, DragPhase, DragState};
use crate::types::{HandleId, HandleKind, IsOverOptions, ItemType, TargetType};

bitflags::bitflags! {
    /// Owner predicates currently running on a monitor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct Evaluating: u8 {
        const CAN_DRAG = 0b0000_0001;
        const CAN_DROP = 0b0000_0010;
    }
}

impl Evaluating {
    fn of(query: Query) -> Self {
        match query {
            Query::CanDrag => Self::CAN_DRAG,
            Query::CanDrop => Self::CAN_DROP,
        }
    }
}

/// Clears its flag when the evaluation frame ends, including on unwind.
struct EvaluationGuard<'a> {
    evaluating: &'a Cell<Evaluating>,
    flag: Evaluating,
}

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        self.evaluating.set(self.evaluating.get() - self.flag);
    }
}

/// Query engine over the drag session and the registry.
pub struct DragDropMonitor<I, R = ()> {
    pub(crate) registry: Registry<I, R>,
    pub(crate) state: DragState<I, R>,
    evaluating: Cell<Evaluating>,
}

impl<I, R> core::fmt::Debug for DragDropMonitor<I, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragDropMonitor")
            .field("registry", &self.registry)
            .field("phase", &self.state.phase())
            .field("source_id", &self.state.source_id())
            .field("target_ids", &self.state.target_ids())
            .field("did_drop", &self.state.did_drop())
            .finish_non_exhaustive()
    }
}

impl<I, R> DragDropMonitor<I, R> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Registry::default(),
            state: DragState::default(),
            evaluating: Cell::new(Evaluating::empty()),
        }
    }

    fn enter(&self, query: Query) -> Result<EvaluationGuard<'_>, DragDropError> {
        let flag = Evaluating::of(query);
        let current = self.evaluating.get();
        if current.contains(flag) {
            return Err(DragDropError::IllegalReentry(query));
        }
        self.evaluating.set(current | flag);
        Ok(EvaluationGuard {
            evaluating: &self.evaluating,
            flag,
        })
    }

    /// The full session state.
    pub fn state(&self) -> &DragState<I, R> {
        &self.state
    }

    /// Returns true if `id` refers to a live registration.
    pub fn is_registered(&self, id: HandleId) -> bool {
        self.registry.is_alive(id)
    }

    /// What `id` was registered as, if it is live.
    pub fn handle_kind(&self, id: HandleId) -> Option<HandleKind> {
        self.registry.kind(id)
    }

    /// Item type of a live source.
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not a live source.
    pub fn source_type(&self, id: HandleId) -> Result<&ItemType, DragDropError> {
        self.registry.source(id).map(|(ty, _)| ty)
    }

    /// Accepted item types of a live target.
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not a live target.
    pub fn target_type(&self, id: HandleId) -> Result<&TargetType, DragDropError> {
        self.registry.target(id).map(|(ty, _)| ty)
    }

    /// True while a drag is in progress (including after its drop).
    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    /// Type of the dragged item.
    pub fn item_type(&self) -> Option<&ItemType> {
        self.state.item_type()
    }

    /// The dragged item.
    pub fn item(&self) -> Option<&I> {
        self.state.item()
    }

    /// Source of the active drag.
    pub fn source_id(&self) -> Option<HandleId> {
        self.state.source_id()
    }

    /// Hover stack, outermost first.
    pub fn target_ids(&self) -> &[HandleId] {
        self.state.target_ids()
    }

    /// Result of the drop; `None` outside the window between drop and end.
    pub fn drop_result(&self) -> Option<&R> {
        self.state.drop_result()
    }

    /// True once a target handled the drop.
    pub fn did_drop(&self) -> bool {
        self.state.did_drop()
    }

    /// Pointer position when the drag started.
    pub fn initial_client_offset(&self) -> Option<Point> {
        self.state.offsets().initial_client
    }

    /// Origin of the dragged source's box when the drag started.
    pub fn initial_source_client_offset(&self) -> Option<Point> {
        self.state.offsets().initial_source_client
    }

    /// Latest pointer position.
    pub fn client_offset(&self) -> Option<Point> {
        self.state.offsets().client
    }

    /// Projected origin of the source's box under the current pointer.
    pub fn source_client_offset(&self) -> Option<Point> {
        self.state.offsets().source_client()
    }

    /// Pointer travel since the drag started.
    pub fn difference_from_initial_offset(&self) -> Option<Vec2> {
        self.state.offsets().difference_from_initial()
    }

    /// All recorded offsets.
    pub fn offsets(&self) -> &DragOffsets {
        self.state.offsets()
    }

    /// Whether a drag may start from source `id`.
    ///
    /// False while any drag is in progress; otherwise the source's `can_drag`.
    ///
    /// # Errors
    ///
    /// - [`DragDropError::IllegalReentry`] when called from inside a `can_drag`.
    /// - [`DragDropError::InvalidHandle`] if `id` is not a live source.
    pub fn can_drag_source(&self, id: HandleId) -> Result<bool, DragDropError> {
        let _guard = self.enter(Query::CanDrag)?;
        let (_, source) = self.registry.source(id)?;
        if self.is_dragging() {
            return Ok(false);
        }
        Ok(source.can_drag(&SourceMonitor::new(self, id)))
    }

    /// Whether source `id` owns the active drag.
    ///
    /// Requires a drag of the source's own item type; the decision is then the
    /// source's [`is_dragging`](crate::registry::DragSource::is_dragging).
    pub fn is_dragging_source(&self, id: HandleId) -> bool {
        let Ok((source_type, source)) = self.registry.source(id) else {
            return false;
        };
        if self.item_type() != Some(source_type) {
            return false;
        }
        source.is_dragging(&SourceMonitor::new(self, id))
    }

    /// Whether the dragged item may be dropped on target `id`.
    ///
    /// True iff a drag is in progress and not yet dropped, `id` is a live
    /// target, its type accepts the dragged item type, and its `can_drop`
    /// returns true. Unknown or stale ids answer false.
    ///
    /// # Errors
    ///
    /// [`DragDropError::IllegalReentry`] when called from inside a `can_drop`.
    pub fn can_drop_on_target(&self, id: HandleId) -> Result<bool, DragDropError> {
        let _guard = self.enter(Query::CanDrop)?;
        let Ok((target_type, target)) = self.registry.target(id) else {
            return Ok(false);
        };
        if self.state.phase() != DragPhase::Dragging || self.did_drop() {
            return Ok(false);
        }
        let Some(item_type) = self.item_type() else {
            return Ok(false);
        };
        if !target_type.matches(item_type) {
            return Ok(false);
        }
        Ok(target.can_drop(&TargetMonitor::new(self, id)))
    }

    /// Whether target `id` is hovered.
    ///
    /// With `shallow`, only the innermost hovered target answers true.
    pub fn is_over_target(&self, id: HandleId, options: IsOverOptions) -> bool {
        if !self.is_dragging() {
            return false;
        }
        let ids = self.target_ids();
        match ids.iter().position(|&t| t == id) {
            None => false,
            Some(i) => !options.shallow || i + 1 == ids.len(),
        }
    }
}

/// Queries shared by the handle-scoped monitors.
pub trait DragMonitor<I, R> {
    /// The underlying engine monitor.
    fn internal(&self) -> &DragDropMonitor<I, R>;

    /// Handle this view is bound to.
    fn handle_id(&self) -> HandleId;

    /// Type of the dragged item.
    fn item_type<'s>(&'s self) -> Option<&'s ItemType>
    where
        I: 's,
        R: 's,
    {
        self.internal().item_type()
    }

    /// The dragged item.
    fn item<'s>(&'s self) -> Option<&'s I>
    where
        I: 's,
        R: 's,
    {
        self.internal().item()
    }

    /// Result of the drop so far.
    fn drop_result<'s>(&'s self) -> Option<&'s R>
    where
        I: 's,
        R: 's,
    {
        self.internal().drop_result()
    }

    /// True once a target handled the drop.
    fn did_drop(&self) -> bool {
        self.internal().did_drop()
    }

    /// Pointer position when the drag started.
    fn initial_client_offset(&self) -> Option<Point> {
        self.internal().initial_client_offset()
    }

    /// Origin of the dragged source's box when the drag started.
    fn initial_source_client_offset(&self) -> Option<Point> {
        self.internal().initial_source_client_offset()
    }

    /// Latest pointer position.
    fn client_offset(&self) -> Option<Point> {
        self.internal().client_offset()
    }

    /// Projected origin of the source's box under the current pointer.
    fn source_client_offset(&self) -> Option<Point> {
        self.internal().source_client_offset()
    }

    /// Pointer travel since the drag started.
    fn difference_from_initial_offset(&self) -> Option<Vec2> {
        self.internal().difference_from_initial_offset()
    }
}

/// Monitor scoped to one drag source.
pub struct SourceMonitor<'a, I, R = ()> {
    monitor: &'a DragDropMonitor<I, R>,
    handle: HandleId,
}

impl<I, R> Clone for SourceMonitor<'_, I, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, R> Copy for SourceMonitor<'_, I, R> {}

impl<I, R> core::fmt::Debug for SourceMonitor<'_, I, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SourceMonitor")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<'a, I, R> SourceMonitor<'a, I, R> {
    pub(crate) fn new(monitor: &'a DragDropMonitor<I, R>, handle: HandleId) -> Self {
        Self { monitor, handle }
    }

    /// Source of the active drag, which may be another handle.
    pub fn source_id(&self) -> Option<HandleId> {
        self.monitor.source_id()
    }

    /// Whether a drag may start from this source.
    ///
    /// # Errors
    ///
    /// See [`DragDropMonitor::can_drag_source`].
    pub fn can_drag(&self) -> Result<bool, DragDropError> {
        self.monitor.can_drag_source(self.handle)
    }

    /// Whether this source owns the active drag.
    pub fn is_dragging(&self) -> bool {
        self.monitor.is_dragging_source(self.handle)
    }
}

impl<I, R> DragMonitor<I, R> for SourceMonitor<'_, I, R> {
    fn internal(&self) -> &DragDropMonitor<I, R> {
        self.monitor
    }

    fn handle_id(&self) -> HandleId {
        self.handle
    }
}

/// Monitor scoped to one drop target.
pub struct TargetMonitor<'a, I, R = ()> {
    monitor: &'a DragDropMonitor<I, R>,
    handle: HandleId,
}

impl<I, R> Clone for TargetMonitor<'_, I, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, R> Copy for TargetMonitor<'_, I, R> {}

impl<I, R> core::fmt::Debug for TargetMonitor<'_, I, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TargetMonitor")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<'a, I, R> TargetMonitor<'a, I, R> {
    pub(crate) fn new(monitor: &'a DragDropMonitor<I, R>, handle: HandleId) -> Self {
        Self { monitor, handle }
    }

    /// Whether the dragged item may be dropped here.
    ///
    /// # Errors
    ///
    /// See [`DragDropMonitor::can_drop_on_target`].
    pub fn can_drop(&self) -> Result<bool, DragDropError> {
        self.monitor.can_drop_on_target(self.handle)
    }

    /// Whether this target is the innermost hovered target.
    ///
    /// Use [`is_over_with`](Self::is_over_with) to also accept hovering over a
    /// nested target.
    pub fn is_over(&self) -> bool {
        self.is_over_with(IsOverOptions { shallow: true })
    }

    /// Whether this target is hovered, per `options`.
    pub fn is_over_with(&self, options: IsOverOptions) -> bool {
        self.monitor.is_over_target(self.handle, options)
    }
}

impl<I, R> DragMonitor<I, R> for TargetMonitor<'_, I, R> {
    fn internal(&self) -> &DragDropMonitor<I, R> {
        self.monitor
    }

    fn handle_id(&self) -> HandleId {
        self.handle
    }
}
