use super::Task;
use crate::error::SlotBindError;

/// A late-bound extension point: holds at most one bound subtask (expected to
/// be a `Task::Compound` root of a sub-domain). `is_valid` is true iff bound;
/// binding is atomic and a double-bind is rejected rather than silently
/// overwritten.
pub struct SlotTask {
    pub id: u32,
    pub(crate) subtask: Option<Task>,
}

impl SlotTask {
    pub fn new(id: u32) -> Self {
        Self { id, subtask: None }
    }

    pub fn is_valid(&self) -> bool {
        self.subtask.is_some()
    }

    pub fn subtask(&self) -> Option<&Task> {
        self.subtask.as_ref()
    }

    pub fn set_subtask(&mut self, task: Task) -> Result<(), SlotBindError> {
        if self.subtask.is_some() {
            return Err(SlotBindError::AlreadyBound(self.id));
        }
        self.subtask = Some(task);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.subtask = None;
    }
}
