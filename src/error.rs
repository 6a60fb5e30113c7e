//! Recoverable, caller-facing errors.
//!
//! Contract violations that a valid caller can never trigger from world data
//! (an uninitialized `Context`, a `trim_*` call while `Executing`) panic at the
//! call site instead of returning a `Result`, the same way `ai_core::Blackboard`
//! panics on a key/type mismatch rather than threading an error type through
//! every read. Only the one genuinely recoverable, caller-triggerable failure
//! mode — binding a slot twice — gets a `thiserror` enum, matching how
//! `logos-goap` reserves `thiserror` for its public fallible API surface.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotBindError {
    #[error("slot {0} is unknown to this domain")]
    UnknownSlot(u32),

    #[error("slot {0} already has a subtask bound; clear it before rebinding")]
    AlreadyBound(u32),

    #[error("binding slot {0} would create a self-referential cycle")]
    SelfCycle(u32),
}
