use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use taskweave_core::error::ExecutorError;
use taskweave_core::executor::traits::{ConflictPredicate, PairVerdict};
use taskweave_core::executor::types::Task;

/// Filesystem-aware overlap check.
///
/// Paths are compared component-wise after lexical normalization, so
/// `./out/a.txt` and `out/a.txt` are the same resource and `out` contains
/// `out/a.txt`, while `out2` and `out` do not overlap. Only pairs involving
/// a writer are judged. Disjoint paths prove independence only when both
/// capabilities are known readers or writers; an unclassified capability may
/// touch files its path argument does not name.
#[derive(Debug, Clone)]
pub struct PathPrefixPredicate {
    read_only: HashSet<String>,
    writers: HashSet<String>,
    path_keys: Vec<String>,
}

impl PathPrefixPredicate {
    pub fn new(
        read_only: impl IntoIterator<Item = String>,
        writers: impl IntoIterator<Item = String>,
        path_keys: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            read_only: read_only.into_iter().collect(),
            writers: writers.into_iter().collect(),
            path_keys: path_keys.into_iter().collect(),
        }
    }

    fn classified(&self, task: &Task) -> bool {
        self.writers.contains(&task.capability) || self.read_only.contains(&task.capability)
    }

    fn paths(&self, task: &Task) -> Vec<PathBuf> {
        self.path_keys
            .iter()
            .filter_map(|key| task.args.get(key)?.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize(Path::new(s)))
            .collect()
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

impl ConflictPredicate for PathPrefixPredicate {
    fn name(&self) -> &str {
        "path-prefix"
    }

    fn check(&self, earlier: &Task, later: &Task) -> Result<PairVerdict, ExecutorError> {
        let writes = self.writers.contains(&earlier.capability)
            || self.writers.contains(&later.capability);
        if !writes {
            return Ok(PairVerdict::Unknown);
        }

        let a = self.paths(earlier);
        let b = self.paths(later);
        if a.is_empty() || b.is_empty() {
            return Ok(PairVerdict::Unknown);
        }

        if a.iter().any(|pa| b.iter().any(|pb| overlaps(pa, pb))) {
            return Ok(PairVerdict::Conflict);
        }
        Ok(if self.classified(earlier) && self.classified(later) {
            PairVerdict::Independent
        } else {
            PairVerdict::Unknown
        })
    }
}
