// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend: turns raw pointer input into manager transitions.
//!
//! ## Layering
//!
//! The [`manager`](crate::manager) never hit-tests. A backend asks a
//! [`HitTest`] implementation which sources and targets sit under the
//! pointer, then drives [`DragDropManager`](crate::manager::DragDropManager)
//! with the results:
//!
//! - [`HitRegions`]: a small containment tree of rectangles, enough for
//!   tests, demos and simple toolkits.
//! - [`PointerBackend`]: a single-pointer press/move/release state machine
//!   with a drag threshold.
//! - [`DragPreviews`]: per-source preview registrations, including the
//!   lazily created empty preview.
//!
//! Toolkits with their own scene graph implement [`HitTest`] directly.

use kurbo::Point;

use crate::types::{HandleId, HandleStack};

pub mod pointer;
pub mod preview;
pub mod regions;

pub use pointer::{BackendOutcome, PointerBackend, PointerBackendOptions, PointerEvent};
pub use preview::{DragPreview, DragPreviews};
pub use regions::{HitRegions, Region};

/// Spatial lookup from a client-space point to registered handles.
pub trait HitTest {
    /// Drop targets under `point`, outermost first.
    fn targets_at(&self, point: Point) -> HandleStack;

    /// Drag sources under `point`, outermost first.
    fn sources_at(&self, point: Point) -> HandleStack;

    /// Client-space origin of a source's box, used for
    /// [`initial_source_client_offset`](crate::monitor::DragDropMonitor::initial_source_client_offset).
    fn source_origin(&self, id: HandleId) -> Option<Point> {
        let _ = id;
        None
    }
}
