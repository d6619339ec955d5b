//! Reservations preventing two concurrent operations on one `unique`

use mg_core::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `unique` until the returned reservation is dropped
    pub fn reserve(&self, unique: &str) -> Result<Reservation> {
        if !self.lock().insert(unique.to_string()) {
            debug!(unique = %unique, "Rejecting operation: unique already in flight");
            return Err(Error::in_flight(unique));
        }
        Ok(Reservation {
            keys: Arc::clone(&self.keys),
            unique: unique.to_string(),
        })
    }

    pub fn is_reserved(&self, unique: &str) -> bool {
        self.lock().contains(unique)
    }
}

/// Releases its key on drop
pub struct Reservation {
    keys: Arc<Mutex<HashSet<String>>>,
    unique: String,
}

impl Reservation {
    pub fn unique(&self) -> &str {
        &self.unique
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.unique);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_reservation_is_rejected_until_release() {
        let in_flight = InFlight::new();
        let first = in_flight.reserve("r1").unwrap();
        assert!(matches!(in_flight.reserve("r1"), Err(Error::InFlight(_))));
        assert!(in_flight.reserve("r2").is_ok());

        drop(first);
        assert!(!in_flight.is_reserved("r1"));
        assert!(in_flight.reserve("r1").is_ok());
    }
}
