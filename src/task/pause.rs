/// A marker leaf that may only appear as a `Sequence` child: it never
/// executes and is always valid. Encountering one during decomposition stops
/// the enclosing Sequence and records a resume point (see
/// `decompose::sequence`).
#[derive(Debug, Default)]
pub struct PausePlanTask;
