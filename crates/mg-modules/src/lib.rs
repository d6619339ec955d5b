//! mg-modules: domain modules and the event dispatcher
//!
//! # Modules
//!
//! - `play`: stop playback, relay engine logs
//! - `output`: push targets
//! - `resource`: playback queue and history
//! - `plugin`: engine plugins and their parameters
//! - `manager`: [`ModuleManager`], the single event sink
//! - `roundtrip`: send a command, wait for its event

pub mod manager;
pub mod module;
pub mod output;
pub mod play;
pub mod plugin;
pub mod resource;
pub mod roundtrip;

pub use manager::ModuleManager;
pub use module::Module;
pub use output::OutputModule;
pub use play::PlayModule;
pub use plugin::PluginModule;
pub use resource::ResourceModule;
pub use roundtrip::RoundTrip;
