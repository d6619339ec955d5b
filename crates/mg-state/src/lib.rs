//! mg-state: local mirrors of engine-side collections
//!
//! Every registry serializes access internally; callers never hold a lock
//! across an engine round trip.

pub mod entries;
pub mod in_flight;
pub mod registry;
pub mod resource;

pub use entries::{Entries, Keyed};
pub use in_flight::{InFlight, Reservation};
pub use registry::Registry;
pub use resource::{ResourceRegistry, DEFAULT_HISTORY_LIMIT};

use mg_core::{Output, Plugin};

pub type OutputRegistry = Registry<Output>;
pub type PluginRegistry = Registry<Plugin>;
