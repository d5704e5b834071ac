use crate::error::ExecutorError;
use crate::executor::types::Task;

/// Outcome of comparing an earlier task with a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerdict {
    /// The later task must wait for the earlier one.
    Conflict,
    /// Positively established: the two may run concurrently.
    Independent,
    /// This predicate cannot tell.
    Unknown,
}

/// Pluggable conflict check used by the dependency inferencer.
pub trait ConflictPredicate: Send + Sync {
    fn name(&self) -> &str;

    /// Compare `earlier` (submitted first) with `later`.
    fn check(&self, earlier: &Task, later: &Task) -> Result<PairVerdict, ExecutorError>;

    /// Narrow boolean form: does `later` conflict with `earlier`?
    fn conflicts_with(&self, earlier: &Task, later: &Task) -> bool {
        !matches!(self.check(earlier, later), Ok(PairVerdict::Independent))
    }
}
