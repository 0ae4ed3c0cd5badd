// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover stack: the ordered set of hovered targets and its enter/leave transitions.
//!
//! ## Usage
//!
//! The manager keeps one [`HoverStack`] per drag session. Every
//! [`hover`](crate::manager::DragDropManager::hover) call replaces the stack
//! and reports the minimal `Enter(..)` / `Leave(..)` transitions between the
//! old and new stacks, so owners can drive highlight state without diffing
//! themselves.
//!
//! ## Minimal example
//!
//! ```
//! use understory_dnd::hover::{HoverStack, HoverEvent};
//! let mut h: HoverStack<u32> = HoverStack::new();
//! assert_eq!(h.replace(&[1, 2]), vec![HoverEvent::Enter(1), HoverEvent::Enter(2)]);
//! assert_eq!(h.replace(&[1, 3]), vec![HoverEvent::Leave(2), HoverEvent::Enter(3)]);
//! ```

use alloc::vec::Vec;

/// Ordered hovered path, outermost target first.
///
/// Ordering semantics of the transitions returned by [`HoverStack::replace`]:
/// - Leave events are emitted from inner-most to outer-most.
/// - Enter events are emitted from outer-most to inner-most.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoverStack<K: Copy + Eq> {
    current: Vec<K>,
}

/// A hover transition event.
///
/// Returned by [`HoverStack::replace`] and by
/// [`DragDropManager::hover`](crate::manager::DragDropManager::hover).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoverEvent<K> {
    /// The pointer entered the given target (in order from outer→inner).
    Enter(K),
    /// The pointer left the given target (in order from inner→outer).
    Leave(K),
}

impl<K: Copy + Eq> HoverStack<K> {
    /// Create an empty hover stack.
    pub fn new() -> Self {
        Self {
            current: Vec::new(),
        }
    }

    /// The hovered path, outermost first.
    pub fn as_slice(&self) -> &[K] {
        &self.current
    }

    /// The innermost hovered entry, if any.
    pub fn innermost(&self) -> Option<K> {
        self.current.last().copied()
    }

    /// Returns true if nothing is hovered.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Clear the stack, returning leave events from inner-most to outer-most.
    pub fn clear(&mut self) -> Vec<HoverEvent<K>> {
        let out = self
            .current
            .iter()
            .rev()
            .map(|&k| HoverEvent::Leave(k))
            .collect();
        self.current.clear();
        out
    }

    /// Remove one entry wherever it sits, keeping the order of the rest.
    ///
    /// Returns true if the entry was present.
    pub fn remove(&mut self, key: K) -> bool {
        let before = self.current.len();
        self.current.retain(|&k| k != key);
        self.current.len() != before
    }

    /// Replace the stack with `new_path` and return the transitions from the
    /// previous stack.
    ///
    /// Leaves are emitted from inner-most to outer-most, then enters from
    /// outer-most to inner-most.
    pub fn replace(&mut self, new_path: &[K]) -> Vec<HoverEvent<K>> {
        // Length of the shared outer prefix.
        let mut common = 0;
        while common < self.current.len()
            && common < new_path.len()
            && self.current[common] == new_path[common]
        {
            common += 1;
        }

        let mut out = Vec::new();
        for &k in self.current[common..].iter().rev() {
            out.push(HoverEvent::Leave(k));
        }
        for &k in &new_path[common..] {
            out.push(HoverEvent::Enter(k));
        }

        self.current.clear();
        self.current.extend_from_slice(new_path);
        out
    }
}
