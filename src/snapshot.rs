// 16.0: shared read-mostly state. one writer replaces the whole value, readers
// grab an Arc to the current version and never see a half-updated table.

use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub struct Snapshot<T> {
    inner: Arc<RwLock<Arc<T>>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(value))),
        }
    }

    /// Current version.
    pub fn load(&self) -> Arc<T> {
        let guard = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new version. Readers holding the old Arc keep it.
    pub fn store(&self, value: T) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn readers_keep_their_version() {
        let snap = Snapshot::new(vec![1, 2, 3]);
        let before = snap.load();
        snap.store(vec![4]);
        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*snap.load(), vec![4]);
    }

    #[test]
    fn clones_share_state() {
        let writer = Snapshot::new(0u32);
        let reader = writer.clone();
        writer.store(7);
        assert_eq!(*reader.load(), 7);
    }

    #[test]
    fn concurrent_readers_see_whole_values() {
        let snap = Snapshot::new(vec![0u32; 16]);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader = snap.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let current = reader.load();
                        let first = current[0];
                        assert!(current.iter().all(|&v| v == first));
                    }
                })
            })
            .collect();

        for round in 1..=100u32 {
            snap.store(vec![round; 16]);
        }
        for handle in readers {
            handle.join().unwrap();
        }
    }
}
