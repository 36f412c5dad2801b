//! Set of paths that are queued or being processed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared in-flight set.
///
/// Cloning is cheap and every clone observes the same set. A path is added
/// before it is enqueued and removed only after its job has finished.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` if it is absent. Returns false, without mutating, if
    /// it is already present.
    pub fn try_add(&self, path: impl Into<PathBuf>) -> bool {
        self.lock().insert(path.into())
    }

    /// Drop membership of `path`. Removing an absent path is a no-op.
    pub fn remove(&self, path: &Path) {
        self.lock().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the current members, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.lock().iter().cloned().collect();
        paths.sort();
        paths
    }

    // A panic while holding the lock cannot leave the set half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_add_until_removed() {
        let set = InFlightSet::new();
        let path = Path::new("/library/shows/ep1.mkv");

        assert!(set.try_add(path));
        assert!(!set.try_add(path));
        assert!(set.contains(path));

        set.remove(path);
        assert!(!set.contains(path));
        assert!(set.try_add(path));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let set = InFlightSet::new();
        set.remove(Path::new("/library/missing.ts"));
        set.remove(Path::new("/library/missing.ts"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let set = InFlightSet::new();
        let other = set.clone();
        assert!(set.try_add("/library/a.ts"));
        assert!(!other.try_add("/library/a.ts"));
        assert_eq!(other.len(), 1);
        assert_eq!(other.paths(), vec![PathBuf::from("/library/a.ts")]);
    }

    #[test]
    fn test_concurrent_try_add_single_winner() {
        let set = InFlightSet::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let set = set.clone();
                std::thread::spawn(move || set.try_add("/library/shared.ts"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(set.len(), 1);
    }
}
