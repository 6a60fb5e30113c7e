//! Decomposition/MTR observability.
//!
//! The spec treats formatted logging and file/wire I/O as out of scope, but
//! still names two always-present knobs (`DebugMTR`, `LogDecomposition`) that
//! an embedding host needs to observe planning. This mirrors `ai_tools::trace`:
//! a dependency-free event/sink pair with a zero-cost `NullTraceSink` default.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub tag: Cow<'static, str>,
    pub a: i64,
    pub b: i64,
}

impl TraceEvent {
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self { tag: tag.into(), a: 0, b: 0 }
    }

    pub fn with_a(mut self, a: i64) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: i64) -> Self {
        self.b = b;
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

/// Collects events in-memory; useful in tests and for embedding hosts that
/// want to render a decomposition trace after the fact.
#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}
