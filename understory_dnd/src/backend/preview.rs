// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag previews.
//!
//! A source may connect a preview: something the toolkit draws under the
//! pointer while the source's item is dragged. [`DragPreview::Empty`] asks
//! for no visible preview, which is how an owner renders its own ghost from
//! [`source_client_offset`](crate::monitor::DragDropMonitor::source_client_offset)
//! instead. Toolkits usually still need a concrete resource for "nothing"
//! (a transparent image); [`DragPreviews`] builds it once, on first use, and
//! keeps it for its own lifetime.

use alloc::collections::BTreeMap;
use core::cell::OnceCell;

use crate::types::HandleId;

/// Preview connected to a drag source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragPreview<P> {
    /// Draw nothing; the owner renders the dragged item itself.
    Empty,
    /// A toolkit-specific preview resource.
    Custom(P),
}

/// Per-source preview connections plus the lazily created empty preview.
pub struct DragPreviews<P> {
    connected: BTreeMap<HandleId, DragPreview<P>>,
    empty: OnceCell<P>,
    make_empty: fn() -> P,
}

impl<P: core::fmt::Debug> core::fmt::Debug for DragPreviews<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragPreviews")
            .field("connected", &self.connected)
            .field("empty", &self.empty)
            .finish_non_exhaustive()
    }
}

impl<P: Default> Default for DragPreviews<P> {
    fn default() -> Self {
        Self::new(P::default)
    }
}

impl<P> DragPreviews<P> {
    /// Create an empty set; `make_empty` builds the empty preview resource on first use.
    pub fn new(make_empty: fn() -> P) -> Self {
        Self {
            connected: BTreeMap::new(),
            empty: OnceCell::new(),
            make_empty,
        }
    }

    /// Connect `preview` to `source`, replacing any previous one.
    ///
    /// Connections outlive their source's registration. Disconnect on
    /// teardown, or let [`retain`](Self::retain) sweep unregistered sources.
    pub fn connect(&mut self, source: HandleId, preview: DragPreview<P>) {
        self.connected.insert(source, preview);
    }

    /// Disconnect the preview of `source`, returning it.
    pub fn disconnect(&mut self, source: HandleId) -> Option<DragPreview<P>> {
        self.connected.remove(&source)
    }

    /// Keep only the connections whose source satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(HandleId) -> bool) {
        self.connected.retain(|&id, _| keep(id));
    }

    /// Number of connected sources.
    pub fn len(&self) -> usize {
        self.connected.len()
    }

    /// Returns true if no source has a preview connected.
    pub fn is_empty(&self) -> bool {
        self.connected.is_empty()
    }

    /// The preview connected to `source`.
    pub fn get(&self, source: HandleId) -> Option<&DragPreview<P>> {
        self.connected.get(&source)
    }

    /// The resource to draw for `source`.
    ///
    /// `None` when nothing is connected, in which case the toolkit falls back
    /// to its default preview.
    pub fn resolve(&self, source: HandleId) -> Option<&P> {
        match self.connected.get(&source)? {
            DragPreview::Custom(preview) => Some(preview),
            DragPreview::Empty => Some(self.empty()),
        }
    }

    /// The shared empty preview resource, created on first call.
    pub fn empty(&self) -> &P {
        self.empty.get_or_init(self.make_empty)
    }
}
