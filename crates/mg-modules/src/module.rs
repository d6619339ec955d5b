//! Module contract

use mg_core::{Error, Event, Result};

/// A domain module receiving every engine event for local bookkeeping.
///
/// Handlers run on the event pump, one event at a time and in engine order.
/// They must not block; an `Err` is logged by the dispatcher and does not
/// stop delivery to other modules.
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle_event(&self, event: &Event) -> Result<()>;
}

/// Reject empty identifying fields before any round trip
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{} must not be empty", field)));
    }
    Ok(())
}
