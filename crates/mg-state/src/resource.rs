//! Playback queue mirror
//!
//! The live queue holds resources the engine has accepted and not finished.
//! Its head is the current resource. Finished resources move to a bounded
//! history so `all_list` can report what has already played.

use chrono::{DateTime, Utc};
use mg_core::{Error, Resource, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::entries::Entries;
use crate::in_flight::{InFlight, Reservation};

pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

struct Queue {
    live: Entries<Resource>,
    history: Vec<Resource>,
    history_limit: usize,
}

impl Queue {
    fn retire(&mut self, resource: Resource) {
        self.history.push(resource);
        if self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(0..excess);
        }
    }
}

#[derive(Clone)]
pub struct ResourceRegistry {
    queue: Arc<Mutex<Queue>>,
    in_flight: InFlight,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Queue {
                live: Entries::new(),
                history: Vec::new(),
                history_limit,
            })),
            in_flight: InFlight::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the live queue. A `unique` still queued is rejected with
    /// `DuplicateKey`; played ones only live on in history and may be queued
    /// again.
    pub fn add(&self, resource: Resource) -> Result<()> {
        let mut queue = self.lock();
        if queue.live.contains(&resource.unique) {
            return Err(Error::duplicate_key(&resource.unique));
        }
        debug!(unique = %resource.unique, path = %resource.path, "Resource queued");
        queue.live.add(resource)
    }

    /// Fails with `NotFound` for unknown resources and
    /// `CannotRemoveCurrent` for the head of the queue
    pub fn check_removable(&self, unique: &str) -> Result<()> {
        let queue = self.lock();
        match queue.live.position(unique) {
            None => Err(Error::not_found(unique)),
            Some(0) => Err(Error::cannot_remove_current(unique)),
            Some(_) => Ok(()),
        }
    }

    pub fn remove_by_unique(&self, unique: &str) -> Result<Resource> {
        let resource = self.lock().live.remove(unique)?;
        debug!(unique = %unique, "Resource dequeued");
        Ok(resource)
    }

    pub fn current(&self) -> Option<Resource> {
        self.lock().live.first().cloned()
    }

    pub fn get_by_unique(&self, unique: &str) -> Option<Resource> {
        let queue = self.lock();
        queue
            .live
            .get(unique)
            .or_else(|| queue.history.iter().find(|r| r.unique == unique))
            .cloned()
    }

    pub fn contains(&self, unique: &str) -> bool {
        self.lock().live.contains(unique)
    }

    /// Record that the engine began playing `unique`
    pub fn mark_started(&self, unique: &str, at: DateTime<Utc>) -> Result<Resource> {
        let mut queue = self.lock();
        let resource = queue
            .live
            .get_mut(unique)
            .ok_or_else(|| Error::not_found(unique))?;
        resource.start_time = Some(at);
        Ok(resource.clone())
    }

    /// Record that the engine finished `unique` and retire it to history
    pub fn mark_ended(&self, unique: &str, at: DateTime<Utc>) -> Result<Resource> {
        let mut queue = self.lock();
        let mut resource = queue.live.remove(unique)?;
        resource.end_time = Some(at);
        queue.retire(resource.clone());
        Ok(resource)
    }

    /// Empty the live queue after playback stopped. The head is stamped as
    /// ended if it had started; everything is retired to history.
    pub fn stop_all(&self, at: DateTime<Utc>) -> Vec<Resource> {
        let mut queue = self.lock();
        let mut drained = queue.live.drain();
        if let Some(head) = drained.first_mut() {
            if head.start_time.is_some() && head.end_time.is_none() {
                head.end_time = Some(at);
            }
        }
        for resource in &drained {
            queue.retire(resource.clone());
        }
        if !drained.is_empty() {
            warn!(count = drained.len(), "Playback stopped; queue cleared");
        }
        drained
    }

    /// Resources not yet finished, head first
    pub fn list(&self) -> Vec<Resource> {
        self.lock().live.snapshot()
    }

    /// Played resources followed by the live queue
    pub fn all_list(&self) -> Vec<Resource> {
        let queue = self.lock();
        let mut all = queue.history.clone();
        all.extend(queue.live.snapshot());
        all
    }

    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().live.is_empty()
    }

    pub fn reserve(&self, unique: &str) -> Result<Reservation> {
        self.in_flight.reserve(unique)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
