// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for the drag-and-drop engine: handles, item types, and options.
//!
//! ## Overview
//!
//! These types describe what the [`manager`](crate::manager) registers and
//! what owners pass in when reporting pointer activity. They carry no
//! behavior beyond type matching.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Point;
use smallvec::SmallVec;

/// Identifier for a registered drag source or drop target.
///
/// A small, copyable handle made of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On registration, a fresh slot is allocated with generation `1`.
/// - On unregistration, the slot is freed; any `HandleId` pointing at it is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `HandleId`.
///
/// Stale handles never alias a newer registration because the generation must match.
/// Use [`DragDropMonitor::is_registered`](crate::monitor::DragDropMonitor::is_registered)
/// to check liveness.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u32, pub(crate) u32);

impl HandleId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }

    /// Deterministic tie-break order: higher generation first, then higher slot.
    ///
    /// This follows issue order only within a slot. A reused low slot
    /// outranks a fresh higher slot of an older generation.
    pub fn is_newer_than(self, other: Self) -> bool {
        (self.1 > other.1) || (self.1 == other.1 && self.0 > other.0)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

/// What a handle was registered as.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HandleKind {
    /// A drag source: produces the item when a drag starts.
    Source,
    /// A drop target: receives hover and drop callbacks.
    Target,
}

/// Ordered run of handles, outermost first.
///
/// Used for hover stacks and for candidate source lists reported by a backend.
pub type HandleStack = SmallVec<[HandleId; 8]>;

/// Tag naming the kind of item being dragged.
///
/// Sources register exactly one item type; targets accept one or more via
/// [`TargetType`]. Matching is by string equality.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ItemType(Cow<'static, str>);

impl ItemType {
    /// Item type backed by a static name, usable in constants.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The type's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ItemType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ItemType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item types a drop target accepts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TargetType {
    /// Accept exactly this type.
    One(ItemType),
    /// Accept any type in the set.
    AnyOf(Vec<ItemType>),
}

impl TargetType {
    /// Build a target type accepting any of `types`.
    pub fn any_of<T: Into<ItemType>>(types: impl IntoIterator<Item = T>) -> Self {
        Self::AnyOf(types.into_iter().map(Into::into).collect())
    }

    /// Returns true if a dragged item of `item_type` may interact with this target.
    pub fn matches(&self, item_type: &ItemType) -> bool {
        match self {
            Self::One(ty) => ty == item_type,
            Self::AnyOf(types) => types.contains(item_type),
        }
    }
}

impl From<ItemType> for TargetType {
    fn from(ty: ItemType) -> Self {
        Self::One(ty)
    }
}

impl From<&'static str> for TargetType {
    fn from(name: &'static str) -> Self {
        Self::One(ItemType::new(name))
    }
}

/// Pointer data recorded when a drag starts.
///
/// Passed to [`DragDropManager::begin_drag`](crate::manager::DragDropManager::begin_drag).
/// Both offsets are in the same client coordinate space as later
/// [`hover`](crate::manager::DragDropManager::hover) offsets.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeginDragOptions {
    /// Pointer position when the gesture started.
    pub client_offset: Option<Point>,
    /// Origin of the dragged source's box at the same moment.
    pub source_client_offset: Option<Point>,
}

/// Options for [`is_over_target`](crate::monitor::DragDropMonitor::is_over_target).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IsOverOptions {
    /// Only report the innermost hovered target, not its ancestors.
    pub shallow: bool,
}
