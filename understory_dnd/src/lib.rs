// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_dnd --heading-base-level=0

//! Understory DnD: framework-agnostic, `no_std` drag-and-drop coordination.
//!
//! ## Overview
//!
//! This crate tracks one drag session at a time: which source started it,
//! what item is being dragged, which drop targets are hovered, and what the
//! drop produced. It does not draw anything and does not read input devices.
//! Owners register [`DragSource`](crate::registry::DragSource) and
//! [`DropTarget`](crate::registry::DropTarget) implementations, and a backend
//! (your toolkit, or the bundled [`PointerBackend`](crate::backend::PointerBackend))
//! reports pointer activity to the [`DragDropManager`](crate::manager::DragDropManager).
//!
//! ## Lifecycle
//!
//! A session moves through [`DragPhase`](crate::state::DragPhase)s:
//!
//! 1) `begin_drag`: the innermost candidate source that can drag produces the item.
//!    A source may decline by returning `None`; the manager then stays idle.
//! 2) `hover`: replaces the hover stack (outermost first). Stale handles and
//!    targets of other item types are dropped. Each hovered target's `hover`
//!    runs outer→inner.
//! 3) `drop`: targets that can accept the item run their `drop` inner→outer.
//!    A `Some` result replaces the previous one, so an outer target can
//!    override what an inner one decided.
//! 4) `end_drag` or `cancel`: the source's `end_drag` runs and the session resets.
//!
//! Calling a transition in the wrong phase fails with
//! [`DragDropError::IllegalTransition`](crate::error::DragDropError::IllegalTransition).
//!
//! ## Monitors
//!
//! Owner callbacks receive a handle-scoped monitor
//! ([`SourceMonitor`](crate::monitor::SourceMonitor) /
//! [`TargetMonitor`](crate::monitor::TargetMonitor)) and never a mutable
//! manager, so they cannot start transitions of their own. Asking
//! `can_drop` from inside a `can_drop` implementation (or `can_drag` from
//! inside `can_drag`) fails fast with
//! [`DragDropError::IllegalReentry`](crate::error::DragDropError::IllegalReentry).
//!
//! ## Subscriptions
//!
//! [`subscribe`](crate::manager::DragDropManager::subscribe) runs a listener
//! after every transition. [`listen_target`](crate::manager::DragDropManager::listen_target)
//! and [`listen_source`](crate::manager::DragDropManager::listen_source) track a
//! derived value per handle and report it only when it changes.
//!
//! ## Example
//!
//! ```
//! use core::cell::Cell;
//! use understory_dnd::manager::DragDropManager;
//! use understory_dnd::monitor::{DragMonitor, SourceMonitor, TargetMonitor};
//! use understory_dnd::registry::{DragSource, DropTarget};
//! use understory_dnd::types::BeginDragOptions;
//!
//! struct Card { id: u32 }
//! impl DragSource<u32, String> for Card {
//!     fn begin_drag(&self, _m: &SourceMonitor<'_, u32, String>) -> Option<u32> {
//!         Some(self.id)
//!     }
//! }
//!
//! struct List { name: &'static str, hovered: Cell<bool> }
//! impl DropTarget<u32, String> for List {
//!     fn hover(&self, m: &TargetMonitor<'_, u32, String>) {
//!         self.hovered.set(m.is_over());
//!     }
//!     fn drop(&self, m: &TargetMonitor<'_, u32, String>) -> Option<String> {
//!         let card = m.item()?;
//!         Some(format!("card {card} moved to {}", self.name))
//!     }
//! }
//!
//! let mut dnd: DragDropManager<u32, String> = DragDropManager::new();
//! let card = dnd.register_source("card", Card { id: 3 });
//! let done = dnd.register_target("card", List { name: "done", hovered: Cell::new(false) });
//!
//! assert!(dnd.begin_drag(&[card], BeginDragOptions::default())?);
//! dnd.hover(&[done], None)?;
//! dnd.drop()?;
//! assert_eq!(dnd.monitor().drop_result().map(String::as_str), Some("card 3 moved to done"));
//! dnd.end_drag()?;
//! # Ok::<(), understory_dnd::error::DragDropError>(())
//! ```
//!
//! ## Features
//!
//! - `std` (default): forwards to `kurbo/std`.
//! - `libm`: forwards to `kurbo/libm`, for `no_std` targets.
//!
//! This crate is `no_std` and uses `alloc`. Diagnostics go through the `log` facade.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod error;
pub mod hover;
pub mod manager;
pub mod monitor;
pub mod registry;
pub mod state;
pub mod types;

pub use error::DragDropError;
pub use manager::{DragDropManager, SubscriptionId};
pub use monitor::{DragDropMonitor, DragMonitor, SourceMonitor, TargetMonitor};
pub use registry::{DragSource, DropTarget};
pub use types::{HandleId, ItemType, TargetType};
