// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised by the drag-and-drop engine.
//!
//! Every variant is an integration bug in the owning component layer. Nothing
//! is retried internally. A declined drag start is not an error: see
//! [`DragDropManager::begin_drag`](crate::manager::DragDropManager::begin_drag).

use core::fmt;

use thiserror::Error;

use crate::state::{DragPhase, Transition};
use crate::types::HandleId;

/// Owner-supplied predicate currently being evaluated by a monitor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Query {
    /// A source's `can_drag`.
    CanDrag,
    /// A target's `can_drop`.
    CanDrop,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CanDrag => "can_drag",
            Self::CanDrop => "can_drop",
        })
    }
}

/// Error returned by fallible manager and monitor operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum DragDropError {
    /// The handle is unknown, already unregistered, of the wrong kind, or listed twice.
    #[error("invalid handle {0}")]
    InvalidHandle(HandleId),
    /// The transition is not legal in the current drag phase.
    #[error("cannot {op} while {phase}")]
    IllegalTransition {
        /// Transition that was requested.
        op: Transition,
        /// Phase the engine was in.
        phase: DragPhase,
    },
    /// A monitor query was issued from inside the same query's owner callback.
    #[error("{0} may not be queried from inside a {0} implementation")]
    IllegalReentry(Query),
}
