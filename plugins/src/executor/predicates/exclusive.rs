use std::collections::HashSet;

use taskweave_core::error::ExecutorError;
use taskweave_core::executor::traits::{ConflictPredicate, PairVerdict};
use taskweave_core::executor::types::Task;

/// Capabilities with unbounded side effects (shell, code execution, ...)
/// that must never overlap with any other task.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveCapabilityPredicate {
    exclusive: HashSet<String>,
}

impl ExclusiveCapabilityPredicate {
    pub fn new(exclusive: impl IntoIterator<Item = String>) -> Self {
        Self {
            exclusive: exclusive.into_iter().collect(),
        }
    }
}

impl ConflictPredicate for ExclusiveCapabilityPredicate {
    fn name(&self) -> &str {
        "exclusive"
    }

    fn check(&self, earlier: &Task, later: &Task) -> Result<PairVerdict, ExecutorError> {
        if self.exclusive.contains(&earlier.capability) || self.exclusive.contains(&later.capability) {
            Ok(PairVerdict::Conflict)
        } else {
            Ok(PairVerdict::Unknown)
        }
    }
}
