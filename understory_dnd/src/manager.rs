// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transition engine.
//!
//! ## Overview
//!
//! [`DragDropManager`] owns the registry and the session state (through its
//! [`DragDropMonitor`]) and is the only place either is mutated. Each public
//! method is one synchronous step: validate, mutate, run owner callbacks in
//! their defined order, then notify subscribers once.
//!
//! ## Callback order
//!
//! - `hover`: outer → inner, over the validated hover stack.
//! - `drop`: inner → outer, over the targets that could accept the drop when
//!   it started. A `Some` result replaces the previous one, so the outermost
//!   explicit result wins.
//!
//! ## Example
//!
//! ```
//! use understory_dnd::manager::DragDropManager;
//! use understory_dnd::monitor::{SourceMonitor, TargetMonitor};
//! use understory_dnd::registry::{DragSource, DropTarget};
//! use understory_dnd::types::BeginDragOptions;
//!
//! struct Card(u32);
//! impl DragSource<u32, &'static str> for Card {
//!     fn begin_drag(&self, _m: &SourceMonitor<'_, u32, &'static str>) -> Option<u32> {
//!         Some(self.0)
//!     }
//! }
//!
//! struct Bin;
//! impl DropTarget<u32, &'static str> for Bin {
//!     fn drop(&self, _m: &TargetMonitor<'_, u32, &'static str>) -> Option<&'static str> {
//!         Some("binned")
//!     }
//! }
//!
//! let mut dnd: DragDropManager<u32, &'static str> = DragDropManager::new();
//! let card = dnd.register_source("card", Card(7));
//! let bin = dnd.register_target("card", Bin);
//!
//! assert!(dnd.begin_drag(&[card], BeginDragOptions::default()).unwrap());
//! dnd.hover(&[bin], None).unwrap();
//! dnd.drop().unwrap();
//! assert_eq!(dnd.monitor().drop_result(), Some(&"binned"));
//! dnd.end_drag().unwrap();
//! assert!(!dnd.monitor().is_dragging());
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::Point;
use log::{debug, trace, warn};

use crate::error::DragDropError;
use crate::hover::HoverEvent;
use crate::monitor::{DragDropMonitor, SourceMonitor, TargetMonitor};
use crate::registry::{DragSource, DropTarget};
use crate::state::{DragOffsets, DragPhase, DragState, Transition};
use crate::types::{BeginDragOptions, HandleId, HandleStack, ItemType, TargetType};

/// Identifier of a subscription created by [`DragDropManager::subscribe`] and friends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u64);

type Listener<I, R> = Box<dyn FnMut(&DragDropMonitor<I, R>)>;

struct Subscription<I, R> {
    id: SubscriptionId,
    // Handle whose unregistration drops this subscription.
    owner: Option<HandleId>,
    listener: Listener<I, R>,
}

/// Drag-and-drop coordinator: registration, transitions, and subscriptions.
///
/// Generic over the dragged item `I` and the drop result `R`.
pub struct DragDropManager<I, R = ()> {
    monitor: DragDropMonitor<I, R>,
    subscriptions: Vec<Subscription<I, R>>,
    next_subscription: u64,
}

impl<I, R> core::fmt::Debug for DragDropManager<I, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragDropManager")
            .field("monitor", &self.monitor)
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl<I: 'static, R: 'static> Default for DragDropManager<I, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: 'static, R: 'static> DragDropManager<I, R> {
    /// Create an idle manager with no registrations.
    pub fn new() -> Self {
        Self {
            monitor: DragDropMonitor::new(),
            subscriptions: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Read-only view of the session and the registry.
    pub fn monitor(&self) -> &DragDropMonitor<I, R> {
        &self.monitor
    }

    /// The session state.
    pub fn state(&self) -> &DragState<I, R> {
        self.monitor.state()
    }

    /// Register a drag source producing items of `item_type`.
    pub fn register_source(
        &mut self,
        item_type: impl Into<ItemType>,
        source: impl DragSource<I, R> + 'static,
    ) -> HandleId {
        let item_type = item_type.into();
        let id = self.monitor.registry.add_source(item_type, Box::new(source));
        trace!("registered source {id}");
        id
    }

    /// Register a drop target accepting `target_type`.
    pub fn register_target(
        &mut self,
        target_type: impl Into<TargetType>,
        target: impl DropTarget<I, R> + 'static,
    ) -> HandleId {
        let id = self
            .monitor
            .registry
            .add_target(target_type.into(), Box::new(target));
        trace!("registered target {id}");
        id
    }

    /// Unregister a source or target.
    ///
    /// If the handle is the active source or sits in the hover stack it is
    /// purged in the same step, and subscribers are notified once. Listeners
    /// bound to the handle are dropped.
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not live (for example when
    /// unregistering twice).
    pub fn unregister(&mut self, id: HandleId) -> Result<(), DragDropError> {
        let kind = self.monitor.registry.remove(id)?;
        self.subscriptions.retain(|s| s.owner != Some(id));
        if self.monitor.state.purge(id) {
            debug!("unregistered {kind:?} {id} during a drag; purged from session");
            self.notify();
        }
        Ok(())
    }

    /// Change the item type of a source. The active drag keeps the type it started with.
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not a live source.
    pub fn set_source_type(
        &mut self,
        id: HandleId,
        item_type: impl Into<ItemType>,
    ) -> Result<(), DragDropError> {
        self.monitor.registry.set_source_type(id, item_type.into())
    }

    /// Change the accepted types of a target.
    ///
    /// A hovered target that no longer accepts the dragged item leaves the
    /// hover stack.
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not a live target.
    pub fn set_target_type(
        &mut self,
        id: HandleId,
        target_type: impl Into<TargetType>,
    ) -> Result<(), DragDropError> {
        let target_type = target_type.into();
        let accepts = self
            .monitor
            .item_type()
            .is_none_or(|ty| target_type.matches(ty));
        self.monitor.registry.set_target_type(id, target_type)?;
        if !accepts && self.monitor.state.unhover(id) {
            debug!("retyped target {id} no longer accepts the dragged item");
            self.notify();
        }
        Ok(())
    }

    /// Start a drag from the innermost draggable of `source_ids`.
    ///
    /// `source_ids` are the candidate sources under the pointer, outermost
    /// first. The last one whose `can_drag` holds is asked for an item.
    ///
    /// Returns `Ok(false)` when nothing could drag or the source declined by
    /// returning `None`; the engine then stays idle.
    ///
    /// # Errors
    ///
    /// - [`DragDropError::IllegalTransition`] unless idle.
    /// - [`DragDropError::InvalidHandle`] if any id is not a live source.
    /// - [`DragDropError::IllegalReentry`] propagated from `can_drag` evaluation.
    pub fn begin_drag(
        &mut self,
        source_ids: &[HandleId],
        options: BeginDragOptions,
    ) -> Result<bool, DragDropError> {
        let source_client_offset = options.source_client_offset;
        self.begin_drag_with(source_ids, options.client_offset, |_| {
            source_client_offset
        })
    }

    /// [`begin_drag`](Self::begin_drag), with the source's box origin looked
    /// up once the source is chosen.
    pub(crate) fn begin_drag_with(
        &mut self,
        source_ids: &[HandleId],
        client_offset: Option<Point>,
        source_origin: impl FnOnce(HandleId) -> Option<Point>,
    ) -> Result<bool, DragDropError> {
        self.monitor
            .state
            .expect_phase(Transition::BeginDrag, &[DragPhase::Idle])?;
        for &id in source_ids {
            self.monitor.registry.source(id)?;
        }

        let mut chosen = None;
        for &id in source_ids.iter().rev() {
            if self.monitor.can_drag_source(id)? {
                chosen = Some(id);
                break;
            }
        }
        let Some(source_id) = chosen else {
            debug!(
                "begin_drag: none of {} candidate sources can drag",
                source_ids.len()
            );
            return Ok(false);
        };

        let (item_type, item) = {
            let (item_type, source) = self.monitor.registry.source(source_id)?;
            let item = source.begin_drag(&SourceMonitor::new(&self.monitor, source_id));
            (item_type.clone(), item)
        };
        let Some(item) = item else {
            debug!("begin_drag: source {source_id} declined");
            return Ok(false);
        };

        debug!("begin_drag: {source_id} started a `{item_type}` drag");
        self.monitor.state.begin(
            source_id,
            item_type,
            item,
            DragOffsets {
                initial_client: client_offset,
                initial_source_client: source_origin(source_id),
                client: client_offset,
            },
        );
        self.notify();
        Ok(true)
    }

    /// Replace the hover stack with `target_ids` (outermost first) and run
    /// every hovered target's `hover`, outer to inner.
    ///
    /// The caller's order is trusted. Stale handles (unregistered since the
    /// caller hit-tested) are dropped silently, as are targets that do not
    /// accept the dragged item type. `client_offset`, when given, becomes the
    /// current pointer position before any callback runs.
    ///
    /// Returns the enter/leave transitions relative to the previous stack.
    ///
    /// # Errors
    ///
    /// - [`DragDropError::IllegalTransition`] unless dragging and not yet dropped.
    /// - [`DragDropError::InvalidHandle`] for duplicates, sources, or ids this
    ///   manager never issued.
    pub fn hover(
        &mut self,
        target_ids: &[HandleId],
        client_offset: Option<Point>,
    ) -> Result<Vec<HoverEvent<HandleId>>, DragDropError> {
        self.monitor
            .state
            .expect_phase(Transition::Hover, &[DragPhase::Dragging])?;
        let stack = self.resolve_hover_stack(target_ids)?;

        self.monitor.state.move_pointer(client_offset);
        let transitions = self.monitor.state.replace_targets(&stack);

        for &id in &stack {
            let (_, target) = self.monitor.registry.target(id)?;
            trace!("hover: {id}");
            target.hover(&TargetMonitor::new(&self.monitor, id));
        }

        self.notify();
        Ok(transitions)
    }

    fn resolve_hover_stack(&self, target_ids: &[HandleId]) -> Result<HandleStack, DragDropError> {
        let dragged = self.monitor.item_type();
        let mut stack = HandleStack::new();
        let mut stale = 0_usize;
        for (i, &id) in target_ids.iter().enumerate() {
            if target_ids[..i].contains(&id) {
                return Err(DragDropError::InvalidHandle(id));
            }
            match self.monitor.registry.target(id) {
                Ok((target_type, _)) => {
                    if dragged.is_some_and(|ty| target_type.matches(ty)) {
                        stack.push(id);
                    }
                }
                Err(_) if self.monitor.registry.is_stale(id) => stale += 1,
                Err(err) => return Err(err),
            }
        }
        if stale > 0 {
            warn!("hover: dropped {stale} stale target handles");
        }
        Ok(stack)
    }

    /// Dispatch the drop to the hovered targets, inner to outer.
    ///
    /// Which targets take part is decided before the first callback runs,
    /// from [`DragDropMonitor::can_drop_on_target`]. Each participating
    /// target's `drop` runs once; a `Some` return becomes the drop result
    /// (outer targets override inner ones) and `did_drop` turns true. With
    /// no droppable target under the pointer the session still moves to
    /// [`DragPhase::Dropped`] with `did_drop == false`.
    ///
    /// # Errors
    ///
    /// - [`DragDropError::IllegalTransition`] unless dragging and not yet dropped.
    /// - [`DragDropError::IllegalReentry`] propagated from `can_drop` evaluation.
    pub fn drop(&mut self) -> Result<(), DragDropError> {
        self.monitor
            .state
            .expect_phase(Transition::Drop, &[DragPhase::Dragging])?;

        // Evaluated up front: `can_drop_on_target` answers false once any target has dropped.
        let mut droppable = HandleStack::new();
        for &id in self.monitor.target_ids() {
            if self.monitor.can_drop_on_target(id)? {
                droppable.push(id);
            }
        }

        for &id in droppable.iter().rev() {
            let result = {
                let (_, target) = self.monitor.registry.target(id)?;
                trace!("drop: {id}");
                target.drop(&TargetMonitor::new(&self.monitor, id))
            };
            self.monitor.state.record_drop(result);
        }

        self.monitor.state.finish_drop();
        debug!(
            "drop: {} of {} hovered targets accepted",
            droppable.len(),
            self.monitor.target_ids().len()
        );
        self.notify();
        Ok(())
    }

    /// Finish the drag: run the source's `end_drag`, then reset to idle.
    ///
    /// # Errors
    ///
    /// [`DragDropError::IllegalTransition`] when idle.
    pub fn end_drag(&mut self) -> Result<(), DragDropError> {
        self.monitor.state.expect_phase(
            Transition::EndDrag,
            &[DragPhase::Dragging, DragPhase::Dropped],
        )?;
        self.finish();
        Ok(())
    }

    /// Abandon the drag without dropping (escape key, pointer released
    /// outside every target). `did_drop` stays false for `end_drag`.
    ///
    /// # Errors
    ///
    /// [`DragDropError::IllegalTransition`] unless dragging and not yet dropped.
    pub fn cancel(&mut self) -> Result<(), DragDropError> {
        self.monitor
            .state
            .expect_phase(Transition::Cancel, &[DragPhase::Dragging])?;
        debug!("cancel");
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        if let Some(source_id) = self.monitor.source_id()
            && let Ok((_, source)) = self.monitor.registry.source(source_id)
        {
            source.end_drag(&SourceMonitor::new(&self.monitor, source_id));
        }
        debug!("end_drag: did_drop={}", self.monitor.did_drop());
        self.monitor.state.reset();
        self.notify();
    }

    /// Call `listener` after every change to the session.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&DragDropMonitor<I, R>) + 'static,
    ) -> SubscriptionId {
        self.push_subscription(None, Box::new(listener))
    }

    /// Track a value derived from a source's monitor.
    ///
    /// `on_change` receives the selector's current value immediately, then
    /// again whenever it differs from the last delivered value. The
    /// subscription ends when the source is unregistered.
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not a live source.
    pub fn listen_source<T, S, F>(
        &mut self,
        id: HandleId,
        selector: S,
        mut on_change: F,
    ) -> Result<SubscriptionId, DragDropError>
    where
        T: PartialEq + 'static,
        S: Fn(&SourceMonitor<'_, I, R>) -> T + 'static,
        F: FnMut(&T) + 'static,
    {
        self.monitor.registry.source(id)?;
        let mut last: Option<T> = None;
        let mut listener = move |monitor: &DragDropMonitor<I, R>| {
            let value = selector(&SourceMonitor::new(monitor, id));
            if last.as_ref() != Some(&value) {
                on_change(&value);
                last = Some(value);
            }
        };
        listener(&self.monitor);
        Ok(self.push_subscription(Some(id), Box::new(listener)))
    }

    /// Track a value derived from a target's monitor.
    ///
    /// Same delivery rules as [`listen_source`](Self::listen_source).
    ///
    /// # Errors
    ///
    /// [`DragDropError::InvalidHandle`] if `id` is not a live target.
    pub fn listen_target<T, S, F>(
        &mut self,
        id: HandleId,
        selector: S,
        mut on_change: F,
    ) -> Result<SubscriptionId, DragDropError>
    where
        T: PartialEq + 'static,
        S: Fn(&TargetMonitor<'_, I, R>) -> T + 'static,
        F: FnMut(&T) + 'static,
    {
        self.monitor.registry.target(id)?;
        let mut last: Option<T> = None;
        let mut listener = move |monitor: &DragDropMonitor<I, R>| {
            let value = selector(&TargetMonitor::new(monitor, id));
            if last.as_ref() != Some(&value) {
                on_change(&value);
                last = Some(value);
            }
        };
        listener(&self.monitor);
        Ok(self.push_subscription(Some(id), Box::new(listener)))
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    fn push_subscription(
        &mut self,
        owner: Option<HandleId>,
        listener: Listener<I, R>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription {
            id,
            owner,
            listener,
        });
        id
    }

    fn notify(&mut self) {
        let monitor = &self.monitor;
        for sub in &mut self.subscriptions {
            (sub.listener)(monitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::DragMonitor;
    use crate::types::IsOverOptions;
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    type Log = Rc<RefCell<Vec<String>>>;
    type Dnd = DragDropManager<u32, &'static str>;

    const DEEP: IsOverOptions = IsOverOptions { shallow: false };
    const SHALLOW: IsOverOptions = IsOverOptions { shallow: true };

    struct Source {
        name: &'static str,
        item: Option<u32>,
        can_drag: bool,
        log: Log,
    }

    impl Source {
        fn new(name: &'static str, item: u32, log: &Log) -> Self {
            Self {
                name,
                item: Some(item),
                can_drag: true,
                log: log.clone(),
            }
        }
    }

    impl DragSource<u32, &'static str> for Source {
        fn begin_drag(&self, _m: &SourceMonitor<'_, u32, &'static str>) -> Option<u32> {
            self.log.borrow_mut().push(format!("begin:{}", self.name));
            self.item
        }

        fn can_drag(&self, _m: &SourceMonitor<'_, u32, &'static str>) -> bool {
            self.can_drag
        }

        fn end_drag(&self, m: &SourceMonitor<'_, u32, &'static str>) {
            self.log
                .borrow_mut()
                .push(format!("end:{}:{}", self.name, m.did_drop()));
        }
    }

    struct Target {
        name: &'static str,
        can_drop: bool,
        result: Option<&'static str>,
        log: Log,
    }

    impl Target {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                can_drop: true,
                result: None,
                log: log.clone(),
            }
        }

        fn returning(mut self, result: &'static str) -> Self {
            self.result = Some(result);
            self
        }

        fn refusing(mut self) -> Self {
            self.can_drop = false;
            self
        }
    }

    impl DropTarget<u32, &'static str> for Target {
        fn can_drop(&self, _m: &TargetMonitor<'_, u32, &'static str>) -> bool {
            self.can_drop
        }

        fn hover(&self, _m: &TargetMonitor<'_, u32, &'static str>) {
            self.log.borrow_mut().push(format!("hover:{}", self.name));
        }

        fn drop(&self, _m: &TargetMonitor<'_, u32, &'static str>) -> Option<&'static str> {
            self.log.borrow_mut().push(format!("drop:{}", self.name));
            self.result
        }
    }

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn take(log: &Log) -> Vec<String> {
        core::mem::take(&mut *log.borrow_mut())
    }

    /// Nested targets A ⊃ B ⊃ C plus one source, all of type `card`.
    fn nested(log: &Log) -> (Dnd, HandleId, [HandleId; 3]) {
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, log));
        let a = dnd.register_target("card", Target::new("a", log));
        let b = dnd.register_target("card", Target::new("b", log));
        let c = dnd.register_target("card", Target::new("c", log));
        (dnd, s, [a, b, c])
    }

    #[test]
    fn begin_then_end_without_drop_resets_to_idle() {
        let log = log();
        let (mut dnd, s, _) = nested(&log);
        assert!(dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap());
        assert!(dnd.monitor().is_dragging());
        assert_eq!(dnd.monitor().item(), Some(&1));
        assert_eq!(dnd.monitor().item_type(), Some(&ItemType::new("card")));
        assert_eq!(dnd.monitor().source_id(), Some(s));

        dnd.end_drag().unwrap();
        let state = dnd.state();
        assert_eq!(state.phase(), DragPhase::Idle);
        assert!(!state.did_drop());
        assert!(state.target_ids().is_empty());
        assert!(state.item().is_none());
        assert!(state.source_id().is_none());
        assert_eq!(take(&log), vec!["begin:s", "end:s:false"]);
    }

    #[test]
    fn declined_begin_stays_idle() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source(
            "card",
            Source {
                item: None,
                ..Source::new("s", 0, &log)
            },
        );
        assert_eq!(dnd.begin_drag(&[s], BeginDragOptions::default()), Ok(false));
        assert!(!dnd.monitor().is_dragging());
        assert_eq!(
            dnd.end_drag(),
            Err(DragDropError::IllegalTransition {
                op: Transition::EndDrag,
                phase: DragPhase::Idle,
            })
        );
    }

    #[test]
    fn begin_picks_innermost_draggable_candidate() {
        let log = log();
        let mut dnd = Dnd::new();
        let outer = dnd.register_source("card", Source::new("outer", 1, &log));
        let inner = dnd.register_source(
            "card",
            Source {
                can_drag: false,
                ..Source::new("inner", 2, &log)
            },
        );
        assert!(
            dnd.begin_drag(&[outer, inner], BeginDragOptions::default())
                .unwrap()
        );
        assert_eq!(dnd.monitor().source_id(), Some(outer));
        assert_eq!(dnd.monitor().item(), Some(&1));
        assert!(dnd.monitor().is_dragging_source(outer));
        assert!(!dnd.monitor().is_dragging_source(inner));
    }

    #[test]
    fn begin_rejects_targets_and_double_starts() {
        let log = log();
        let (mut dnd, s, [a, ..]) = nested(&log);
        assert_eq!(
            dnd.begin_drag(&[a], BeginDragOptions::default()),
            Err(DragDropError::InvalidHandle(a))
        );
        assert!(dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap());
        assert_eq!(
            dnd.begin_drag(&[s], BeginDragOptions::default()),
            Err(DragDropError::IllegalTransition {
                op: Transition::BeginDrag,
                phase: DragPhase::Dragging,
            })
        );
    }

    #[test]
    fn nested_hover_reports_shallow_and_deep_over() {
        let log = log();
        let (mut dnd, s, [a, b, c]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        let _ = take(&log);

        dnd.hover(&[a, b, c], None).unwrap();
        let m = dnd.monitor();
        assert!(!m.is_over_target(a, SHALLOW));
        assert!(m.is_over_target(c, SHALLOW));
        assert!(m.is_over_target(a, DEEP));
        assert!(m.is_over_target(b, DEEP));
        assert_eq!(take(&log), vec!["hover:a", "hover:b", "hover:c"]);
    }

    #[test]
    fn hover_returns_enter_and_leave_transitions() {
        let log = log();
        let (mut dnd, s, [a, b, c]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        assert_eq!(
            dnd.hover(&[a, b], None).unwrap(),
            vec![HoverEvent::Enter(a), HoverEvent::Enter(b)]
        );
        assert_eq!(
            dnd.hover(&[a, c], None).unwrap(),
            vec![HoverEvent::Leave(b), HoverEvent::Enter(c)]
        );
        assert!(dnd.hover(&[a, c], None).unwrap().is_empty());
    }

    #[test]
    fn drop_runs_inner_to_outer_and_outer_result_wins() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let a = dnd.register_target("card", Target::new("a", &log).returning("x:1"));
        let b = dnd.register_target("card", Target::new("b", &log));
        let c = dnd.register_target("card", Target::new("c", &log));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a, b, c], None).unwrap();
        let _ = take(&log);

        dnd.drop().unwrap();
        assert_eq!(take(&log), vec!["drop:c", "drop:b", "drop:a"]);
        assert_eq!(dnd.monitor().drop_result(), Some(&"x:1"));
        assert!(dnd.monitor().did_drop());
        assert_eq!(dnd.state().phase(), DragPhase::Dropped);
    }

    #[test]
    fn outer_explicit_result_overrides_inner_result() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let outer = dnd.register_target("card", Target::new("outer", &log).returning("outer"));
        let middle = dnd.register_target("card", Target::new("middle", &log));
        let inner = dnd.register_target("card", Target::new("inner", &log).returning("inner"));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[outer, middle, inner], None).unwrap();
        dnd.drop().unwrap();
        assert_eq!(dnd.monitor().drop_result(), Some(&"outer"));
    }

    #[test]
    fn outer_target_sees_inner_result_during_its_drop() {
        struct Outer(Rc<Cell<Option<(&'static str, bool)>>>);
        impl DropTarget<u32, &'static str> for Outer {
            fn drop(&self, m: &TargetMonitor<'_, u32, &'static str>) -> Option<&'static str> {
                self.0.set(Some((m.drop_result().copied().unwrap_or(""), m.did_drop())));
                None
            }
        }

        let log = log();
        let seen = Rc::new(Cell::new(None));
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let outer = dnd.register_target("card", Outer(seen.clone()));
        let inner = dnd.register_target("card", Target::new("inner", &log).returning("inner"));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[outer, inner], None).unwrap();
        dnd.drop().unwrap();
        assert_eq!(seen.get(), Some(("inner", true)));
        assert_eq!(dnd.monitor().drop_result(), Some(&"inner"));
    }

    #[test]
    fn refusing_target_is_skipped_and_never_droppable() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let a = dnd.register_target("card", Target::new("a", &log));
        let b = dnd.register_target("card", Target::new("b", &log).refusing());
        assert!(!dnd.monitor().can_drop_on_target(b).unwrap());

        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        assert!(!dnd.monitor().can_drop_on_target(b).unwrap());
        dnd.hover(&[a, b], None).unwrap();
        assert!(!dnd.monitor().can_drop_on_target(b).unwrap());
        assert!(dnd.monitor().can_drop_on_target(a).unwrap());
        let _ = take(&log);

        dnd.drop().unwrap();
        assert_eq!(take(&log), vec!["drop:a"]);
        assert!(!dnd.monitor().can_drop_on_target(b).unwrap());
        dnd.end_drag().unwrap();
        assert!(!dnd.monitor().can_drop_on_target(b).unwrap());
    }

    #[test]
    fn drop_with_nothing_droppable_does_not_mark_did_drop() {
        let log = log();
        let (mut dnd, s, _) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.drop().unwrap();
        assert!(!dnd.monitor().did_drop());
        assert_eq!(dnd.monitor().drop_result(), None);
        assert_eq!(
            dnd.drop(),
            Err(DragDropError::IllegalTransition {
                op: Transition::Drop,
                phase: DragPhase::Dropped,
            })
        );
        dnd.end_drag().unwrap();
        assert_eq!(take(&log).last().map(String::as_str), Some("end:s:false"));
    }

    #[test]
    fn illegal_transitions_while_idle() {
        let mut dnd = Dnd::new();
        let idle = |op| DragDropError::IllegalTransition {
            op,
            phase: DragPhase::Idle,
        };
        assert_eq!(dnd.drop(), Err(idle(Transition::Drop)));
        assert_eq!(dnd.hover(&[], None), Err(idle(Transition::Hover)));
        assert_eq!(dnd.cancel(), Err(idle(Transition::Cancel)));
        assert_eq!(dnd.end_drag(), Err(idle(Transition::EndDrag)));
    }

    #[test]
    fn cancel_ends_without_drop() {
        let log = log();
        let (mut dnd, s, [a, ..]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a], None).unwrap();
        dnd.cancel().unwrap();
        assert!(!dnd.monitor().is_dragging());
        assert!(!dnd.monitor().did_drop());
        assert_eq!(take(&log).last().map(String::as_str), Some("end:s:false"));

        // After a drop only `end_drag` may finish the session.
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a], None).unwrap();
        dnd.drop().unwrap();
        assert!(matches!(
            dnd.cancel(),
            Err(DragDropError::IllegalTransition { .. })
        ));
        dnd.end_drag().unwrap();
        assert_eq!(take(&log).last().map(String::as_str), Some("end:s:true"));
    }

    #[test]
    fn drop_result_lives_between_drop_and_end() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let a = dnd.register_target("card", Target::new("a", &log).returning("done"));
        assert_eq!(dnd.monitor().drop_result(), None);

        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a], None).unwrap();
        assert_eq!(dnd.monitor().drop_result(), None);
        dnd.drop().unwrap();
        assert_eq!(dnd.monitor().drop_result(), Some(&"done"));
        dnd.end_drag().unwrap();
        assert_eq!(dnd.monitor().drop_result(), None);
    }

    #[test]
    fn reentrant_can_drop_fails_fast_and_recovers() {
        struct Nosy(Rc<Cell<Option<DragDropError>>>);
        impl DropTarget<u32, &'static str> for Nosy {
            fn can_drop(&self, m: &TargetMonitor<'_, u32, &'static str>) -> bool {
                if let Err(err) = m.can_drop() {
                    self.0.set(Some(err));
                }
                true
            }
        }

        let log = log();
        let seen = Rc::new(Cell::new(None));
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let t = dnd.register_target("card", Nosy(seen.clone()));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[t], None).unwrap();

        assert_eq!(dnd.monitor().can_drop_on_target(t), Ok(true));
        assert_eq!(
            seen.take(),
            Some(DragDropError::IllegalReentry(crate::error::Query::CanDrop))
        );
        // The guard is released: plain queries keep working.
        assert_eq!(dnd.monitor().can_drop_on_target(t), Ok(true));
        assert!(dnd.monitor().is_over_target(t, SHALLOW));
        dnd.drop().unwrap();
        assert!(dnd.monitor().did_drop());
    }

    #[test]
    fn reentrant_can_drag_fails_fast() {
        struct Nosy(Rc<Cell<Option<DragDropError>>>);
        impl DragSource<u32, &'static str> for Nosy {
            fn begin_drag(&self, _m: &SourceMonitor<'_, u32, &'static str>) -> Option<u32> {
                Some(9)
            }
            fn can_drag(&self, m: &SourceMonitor<'_, u32, &'static str>) -> bool {
                if let Err(err) = m.can_drag() {
                    self.0.set(Some(err));
                }
                true
            }
        }

        let seen = Rc::new(Cell::new(None));
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Nosy(seen.clone()));
        assert_eq!(dnd.begin_drag(&[s], BeginDragOptions::default()), Ok(true));
        assert_eq!(
            seen.take(),
            Some(DragDropError::IllegalReentry(crate::error::Query::CanDrag))
        );
    }

    #[test]
    fn hover_filters_mismatched_types_and_stale_handles() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let a = dnd.register_target("card", Target::new("a", &log));
        let column = dnd.register_target("column", Target::new("column", &log));
        let gone = dnd.register_target("card", Target::new("gone", &log));
        dnd.unregister(gone).unwrap();

        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        let _ = take(&log);
        dnd.hover(&[a, column, gone], None).unwrap();
        assert_eq!(dnd.monitor().target_ids(), &[a]);
        assert_eq!(take(&log), vec!["hover:a"]);
    }

    #[test]
    fn hover_rejects_duplicates_sources_and_foreign_ids() {
        let log = log();
        let (mut dnd, s, [a, b, _]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        assert_eq!(
            dnd.hover(&[a, b, a], None),
            Err(DragDropError::InvalidHandle(a))
        );
        assert_eq!(dnd.hover(&[s], None), Err(DragDropError::InvalidHandle(s)));
        let foreign = HandleId::new(99, 1);
        assert_eq!(
            dnd.hover(&[foreign], None),
            Err(DragDropError::InvalidHandle(foreign))
        );
        // Failed hovers leave the stack untouched.
        assert!(dnd.monitor().target_ids().is_empty());
    }

    #[test]
    fn target_sets_accept_any_member_type() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("column", Source::new("s", 1, &log));
        let board = dnd.register_target(TargetType::any_of(["card", "column"]), Target::new("board", &log));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[board], None).unwrap();
        assert!(dnd.monitor().can_drop_on_target(board).unwrap());
        assert!(dnd.monitor().is_over_target(board, SHALLOW));
    }

    #[test]
    fn unregistering_mid_drag_purges_session_references() {
        let log = log();
        let (mut dnd, s, [a, b, c]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a, b, c], None).unwrap();

        dnd.unregister(b).unwrap();
        assert_eq!(dnd.monitor().target_ids(), &[a, c]);
        assert!(!dnd.monitor().is_over_target(b, DEEP));

        dnd.unregister(s).unwrap();
        assert_eq!(dnd.monitor().source_id(), None);
        assert!(dnd.monitor().is_dragging());

        // The source is gone, so nobody is told about the end.
        let _ = take(&log);
        dnd.end_drag().unwrap();
        assert!(take(&log).is_empty());
        assert_eq!(dnd.unregister(b), Err(DragDropError::InvalidHandle(b)));
    }

    #[test]
    fn interleaved_registration_never_leaves_dead_ids_hovered() {
        let log = log();
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let mut live: Vec<HandleId> = (0..4)
            .map(|_| dnd.register_target("card", Target::new("t", &log)))
            .collect();
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();

        let mut dead = Vec::new();
        for round in 0..6 {
            let _ = dnd.hover(&live, None).unwrap();
            let victim = live.remove(round % live.len());
            dnd.unregister(victim).unwrap();
            dead.push(victim);
            live.push(dnd.register_target("card", Target::new("t", &log)));

            // Report the pre-unregistration stack too, as a lagging hit test would.
            let mut lagging = dead.clone();
            lagging.extend(live.iter().copied());
            let _ = dnd.hover(&lagging, None).unwrap();
            for id in dnd.monitor().target_ids() {
                assert!(dnd.monitor().is_registered(*id));
                assert!(!dead.contains(id));
            }
        }
    }

    #[test]
    fn retyped_target_leaves_the_hover_stack() {
        let log = log();
        let (mut dnd, s, [a, b, _]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a, b], None).unwrap();
        dnd.set_target_type(b, "column").unwrap();
        assert_eq!(dnd.monitor().target_ids(), &[a]);
        assert_eq!(
            dnd.set_target_type(s, "column"),
            Err(DragDropError::InvalidHandle(s))
        );
    }

    #[test]
    fn retyped_source_keeps_the_running_drag_type() {
        let log = log();
        let (mut dnd, s, _) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.set_source_type(s, "column").unwrap();
        assert_eq!(dnd.monitor().item_type(), Some(&ItemType::new("card")));
        assert!(!dnd.monitor().is_dragging_source(s));
        dnd.end_drag().unwrap();
        assert_eq!(dnd.monitor().source_type(s).map(ItemType::as_str), Ok("column"));
    }

    #[test]
    fn offsets_are_recorded_at_begin_and_on_hover() {
        let log = log();
        let (mut dnd, s, [a, ..]) = nested(&log);
        assert_eq!(dnd.monitor().client_offset(), None);
        dnd.begin_drag(
            &[s],
            BeginDragOptions {
                client_offset: Some(Point::new(10.0, 10.0)),
                source_client_offset: Some(Point::new(0.0, 5.0)),
            },
        )
        .unwrap();
        dnd.hover(&[a], Some(Point::new(30.0, 15.0))).unwrap();
        let m = dnd.monitor();
        assert_eq!(m.initial_client_offset(), Some(Point::new(10.0, 10.0)));
        assert_eq!(m.client_offset(), Some(Point::new(30.0, 15.0)));
        assert_eq!(m.source_client_offset(), Some(Point::new(20.0, 10.0)));
        assert_eq!(
            m.difference_from_initial_offset(),
            Some(kurbo::Vec2::new(20.0, 5.0))
        );
        dnd.end_drag().unwrap();
        assert_eq!(dnd.monitor().initial_source_client_offset(), None);
        assert_eq!(dnd.monitor().source_client_offset(), None);
    }

    #[test]
    fn hover_callbacks_see_the_new_stack_and_pointer() {
        struct Probe(Rc<RefCell<Vec<(bool, Option<Point>)>>>);
        impl DropTarget<u32, &'static str> for Probe {
            fn hover(&self, m: &TargetMonitor<'_, u32, &'static str>) {
                self.0.borrow_mut().push((m.is_over(), m.client_offset()));
            }
        }

        let log = log();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let outer = dnd.register_target("card", Probe(seen.clone()));
        let inner = dnd.register_target("card", Probe(seen.clone()));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[outer, inner], Some(Point::new(3.0, 4.0))).unwrap();
        let p = Some(Point::new(3.0, 4.0));
        assert_eq!(*seen.borrow(), vec![(false, p), (true, p)]);
    }

    #[test]
    fn subscribers_see_each_transition_once() {
        let log = log();
        let (mut dnd, s, [a, ..]) = nested(&log);
        let phases = Rc::new(RefCell::new(Vec::new()));
        let sink = phases.clone();
        let sub = dnd.subscribe(move |m| sink.borrow_mut().push(m.state().phase()));

        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a], None).unwrap();
        dnd.drop().unwrap();
        dnd.end_drag().unwrap();
        assert_eq!(
            *phases.borrow(),
            vec![
                DragPhase::Dragging,
                DragPhase::Dragging,
                DragPhase::Dropped,
                DragPhase::Idle
            ]
        );

        assert!(dnd.unsubscribe(sub));
        assert!(!dnd.unsubscribe(sub));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        assert_eq!(phases.borrow().len(), 4);
    }

    #[test]
    fn listen_source_emits_distinct_values() {
        let log = log();
        let (mut dnd, s, [a, ..]) = nested(&log);
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        dnd.listen_source(s, |m| m.is_dragging(), move |v| sink.borrow_mut().push(*v))
            .unwrap();

        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a], None).unwrap();
        dnd.drop().unwrap();
        dnd.end_drag().unwrap();
        assert_eq!(*values.borrow(), vec![false, true, false]);
    }

    #[test]
    fn listen_target_ends_with_its_handle() {
        let log = log();
        let (mut dnd, s, [a, b, _]) = nested(&log);
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        dnd.listen_target(b, |m| m.is_over(), move |v| sink.borrow_mut().push(*v))
            .unwrap();

        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a, b], None).unwrap();
        dnd.hover(&[a], None).unwrap();
        assert_eq!(*values.borrow(), vec![false, true, false]);

        dnd.unregister(b).unwrap();
        dnd.hover(&[a], None).unwrap();
        assert_eq!(values.borrow().len(), 3);
        assert_eq!(
            dnd.listen_target(b, |m| m.is_over(), |_| {}),
            Err(DragDropError::InvalidHandle(b))
        );
    }

    #[test]
    fn listeners_observe_purges_without_intermediate_states() {
        let log = log();
        let (mut dnd, s, [a, b, _]) = nested(&log);
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        dnd.hover(&[a, b], None).unwrap();

        let stacks = Rc::new(RefCell::new(Vec::new()));
        let sink = stacks.clone();
        dnd.subscribe(move |m| sink.borrow_mut().push(m.target_ids().to_vec()));
        dnd.unregister(b).unwrap();
        dnd.unregister(s).unwrap();
        assert_eq!(*stacks.borrow(), vec![vec![a], vec![a]]);
    }

    #[test]
    fn independent_managers_do_not_share_guards() {
        struct Peek(Rc<Dnd>, HandleId, Rc<Cell<Option<Result<bool, DragDropError>>>>);
        impl DropTarget<u32, &'static str> for Peek {
            fn can_drop(&self, _m: &TargetMonitor<'_, u32, &'static str>) -> bool {
                self.2.set(Some(self.0.monitor().can_drop_on_target(self.1)));
                true
            }
        }

        let log = log();
        let mut other = Dnd::new();
        let other_source = other.register_source("card", Source::new("o", 5, &log));
        let other_target = other.register_target("card", Target::new("ot", &log));
        other
            .begin_drag(&[other_source], BeginDragOptions::default())
            .unwrap();
        let other = Rc::new(other);

        let seen = Rc::new(Cell::new(None));
        let mut dnd = Dnd::new();
        let s = dnd.register_source("card", Source::new("s", 1, &log));
        let t = dnd.register_target("card", Peek(other, other_target, seen.clone()));
        dnd.begin_drag(&[s], BeginDragOptions::default()).unwrap();
        assert_eq!(dnd.monitor().can_drop_on_target(t), Ok(true));
        assert_eq!(seen.get(), Some(Ok(true)));
    }
}
