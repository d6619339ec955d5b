//! Generic registry used for outputs and plugins

use mg_core::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::entries::{Entries, Keyed};
use crate::in_flight::{InFlight, Reservation};

/// Mutex-guarded, insertion-ordered collection keyed by `unique`.
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct Registry<T> {
    name: &'static str,
    entries: Arc<Mutex<Entries<T>>>,
    in_flight: InFlight,
}

impl<T: Keyed> Registry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arc::new(Mutex::new(Entries::new())),
            in_flight: InFlight::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append; fails with `DuplicateKey` if `unique` is taken
    pub fn add(&self, item: T) -> Result<()> {
        let unique = item.unique().to_string();
        self.lock().add(item)?;
        debug!(registry = self.name, unique = %unique, "Added");
        Ok(())
    }

    /// Remove; fails with `NotFound` if absent
    pub fn remove_by_unique(&self, unique: &str) -> Result<T> {
        let item = self.lock().remove(unique)?;
        debug!(registry = self.name, unique = %unique, "Removed");
        Ok(item)
    }

    pub fn get_by_unique(&self, unique: &str) -> Option<T> {
        self.lock().get(unique).cloned()
    }

    pub fn contains(&self, unique: &str) -> bool {
        self.lock().contains(unique)
    }

    /// Apply `f` to the stored item and return the updated copy
    pub fn update<F>(&self, unique: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut T),
    {
        let mut entries = self.lock();
        let item = entries
            .get_mut(unique)
            .ok_or_else(|| Error::not_found(unique))?;
        f(item);
        Ok(item.clone())
    }

    /// Snapshot in insertion order
    pub fn list(&self) -> Vec<T> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn reserve(&self, unique: &str) -> Result<Reservation> {
        self.in_flight.reserve(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_core::{Output, Plugin};

    #[test]
    fn test_add_preserves_order_and_rejects_duplicates() {
        let registry = Registry::new("output");
        registry.add(Output::new("rtmp://a/live", "o1")).unwrap();
        registry.add(Output::new("rtmp://b/live", "o2")).unwrap();

        let err = registry.add(Output::new("rtmp://c/live", "o1")).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(ref u) if u == "o1"));

        let uniques: Vec<_> = registry.list().into_iter().map(|o| o.unique).collect();
        assert_eq!(uniques, vec!["o1", "o2"]);
        assert_eq!(registry.get_by_unique("o1").unwrap().path, "rtmp://a/live");
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let registry: Registry<Output> = Registry::new("output");
        assert!(matches!(
            registry.remove_by_unique("nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let registry = Registry::new("plugin");
        registry
            .add(Plugin::new("show-time", "p1", Default::default()))
            .unwrap();
        let snapshot = registry.list();
        registry.remove_by_unique("p1").unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let registry = Registry::new("plugin");
        registry
            .add(Plugin::new("show-time", "p1", Default::default()))
            .unwrap();
        let updated = registry
            .update("p1", |p| {
                p.params.insert("x".into(), "10".into());
            })
            .unwrap();
        assert_eq!(updated.params["x"], "10");
        assert_eq!(registry.get_by_unique("p1").unwrap(), updated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_lose_nothing() {
        let registry = Registry::new("output");
        let mut handles = Vec::new();
        for i in 0..200 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.add(Output::new(format!("rtmp://h/{}", i), format!("o{}", i)))
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut uniques: Vec<_> = registry.list().into_iter().map(|o| o.unique).collect();
        assert_eq!(uniques.len(), 200);
        uniques.sort();
        uniques.dedup();
        assert_eq!(uniques.len(), 200);
    }
}
