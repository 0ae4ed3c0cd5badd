// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle hit testing over a containment tree.
//!
//! Each [`Region`] is an axis-aligned client-space rectangle keyed by the
//! [`HandleId`] it stands for. Parent links describe nesting; a point query
//! picks the topmost region of the requested kind (higher `z_index`, then the
//! newer handle) and reports it with its same-kind ancestors, outermost first.
//!
//! ```
//! use kurbo::{Point, Rect};
//! use understory_dnd::backend::{HitRegions, HitTest, Region};
//! use understory_dnd::manager::DragDropManager;
//! use understory_dnd::registry::DropTarget;
//!
//! struct Zone;
//! impl DropTarget<u32> for Zone {}
//!
//! let mut dnd: DragDropManager<u32> = DragDropManager::new();
//! let board = dnd.register_target("card", Zone);
//! let column = dnd.register_target("card", Zone);
//!
//! let mut regions = HitRegions::new();
//! regions.insert(board, Region::target(Rect::new(0.0, 0.0, 400.0, 300.0)));
//! regions.insert(column, Region::target(Rect::new(10.0, 10.0, 110.0, 290.0)).with_parent(board));
//!
//! assert_eq!(regions.targets_at(Point::new(50.0, 50.0)).as_slice(), &[board, column]);
//! assert_eq!(regions.targets_at(Point::new(200.0, 50.0)).as_slice(), &[board]);
//! ```

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Rect};

use super::HitTest;
use crate::types::{HandleId, HandleKind, HandleStack};

/// One hit-testable rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    /// Whether the handle is a source or a target.
    pub kind: HandleKind,
    /// Enclosing region, if any.
    pub parent: Option<HandleId>,
    /// Client-space bounds. Containment is half-open, as in [`Rect::contains`].
    pub bounds: Rect,
    /// Stacking order among overlapping regions; higher is on top.
    pub z_index: i32,
}

impl Region {
    /// A root source region.
    pub fn source(bounds: Rect) -> Self {
        Self {
            kind: HandleKind::Source,
            parent: None,
            bounds,
            z_index: 0,
        }
    }

    /// A root target region.
    pub fn target(bounds: Rect) -> Self {
        Self {
            kind: HandleKind::Target,
            parent: None,
            bounds,
            z_index: 0,
        }
    }

    /// Nest this region under `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: HandleId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the stacking order.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }
}

/// Containment tree of [`Region`]s implementing [`HitTest`].
#[derive(Clone, Debug, Default)]
pub struct HitRegions {
    regions: BTreeMap<HandleId, Region>,
}

impl HitRegions {
    /// Create an empty set of regions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if there are no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Insert or replace the region for `id`.
    pub fn insert(&mut self, id: HandleId, region: Region) {
        self.regions.insert(id, region);
    }

    /// The region for `id`.
    pub fn get(&self, id: HandleId) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Remove `id` and every region nested under it.
    ///
    /// Returns the removed handles, `id` first. Unregister them from the
    /// manager as well; stale handles left in either place are tolerated.
    pub fn remove(&mut self, id: HandleId) -> Vec<HandleId> {
        let mut removed = Vec::new();
        if self.regions.remove(&id).is_none() {
            return removed;
        }
        removed.push(id);
        let mut i = 0;
        while i < removed.len() {
            let parent = removed[i];
            let children: Vec<HandleId> = self
                .regions
                .iter()
                .filter(|(_, r)| r.parent == Some(parent))
                .map(|(&child, _)| child)
                .collect();
            for child in children {
                self.regions.remove(&child);
                removed.push(child);
            }
            i += 1;
        }
        removed
    }

    /// Move or resize a region. Returns false if `id` has no region.
    pub fn set_bounds(&mut self, id: HandleId, bounds: Rect) -> bool {
        match self.regions.get_mut(&id) {
            Some(region) => {
                region.bounds = bounds;
                true
            }
            None => false,
        }
    }

    /// Change a region's stacking order. Returns false if `id` has no region.
    pub fn set_z_index(&mut self, id: HandleId, z_index: i32) -> bool {
        match self.regions.get_mut(&id) {
            Some(region) => {
                region.z_index = z_index;
                true
            }
            None => false,
        }
    }

    /// Topmost region of `kind` containing `point`.
    ///
    /// If several overlap with the same `z_index`, the one with the higher
    /// generation wins, then the higher slot (see [`HandleId::is_newer_than`]).
    /// Callers that need insertion order should assign `z_index` explicitly.
    pub fn topmost(&self, point: Point, kind: HandleKind) -> Option<HandleId> {
        let mut best: Option<(HandleId, i32)> = None;
        for (&id, region) in &self.regions {
            if region.kind != kind || !region.bounds.contains(point) {
                continue;
            }
            match best {
                None => best = Some((id, region.z_index)),
                Some((best_id, z_best)) => {
                    let z = region.z_index;
                    if z > z_best || (z == z_best && id.is_newer_than(best_id)) {
                        best = Some((id, z));
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// `id` and its ancestors of the same kind, outermost first.
    pub fn path(&self, id: HandleId) -> HandleStack {
        let mut path = HandleStack::new();
        let Some(kind) = self.regions.get(&id).map(|r| r.kind) else {
            return path;
        };
        let mut cursor = Some(id);
        // A tree visits each region at most once; more steps means a parent cycle.
        let mut budget = self.regions.len();
        while let Some(current) = cursor {
            let Some(region) = self.regions.get(&current) else {
                break;
            };
            if budget == 0 {
                break;
            }
            budget -= 1;
            if region.kind == kind {
                path.push(current);
            }
            cursor = region.parent;
        }
        path.reverse();
        path
    }

    fn stack_at(&self, point: Point, kind: HandleKind) -> HandleStack {
        self.topmost(point, kind)
            .map(|id| self.path(id))
            .unwrap_or_default()
    }
}

impl HitTest for HitRegions {
    fn targets_at(&self, point: Point) -> HandleStack {
        self.stack_at(point, HandleKind::Target)
    }

    fn sources_at(&self, point: Point) -> HandleStack {
        self.stack_at(point, HandleKind::Source)
    }

    fn source_origin(&self, id: HandleId) -> Option<Point> {
        self.regions
            .get(&id)
            .filter(|r| r.kind == HandleKind::Source)
            .map(|r| r.bounds.origin())
    }
}
