//! mg-bridge: the boundary between mediagate and the media engine
//!
//! This crate provides:
//! - `CommandBridge` / `EventSink`: the send and receive contracts
//! - `codec`: bincode bodies keyed by action kind
//! - `EventPump`: the single, ordered event delivery loop
//! - `ChannelBridge`: an in-process bridge over tokio channels
//! - `LoopbackEngine`: an acknowledging stand-in for the native engine

pub mod bridge;
pub mod channel;
pub mod codec;
pub mod loopback;

pub use bridge::{CommandBridge, EventPump, EventSink, RawCommand, RawEvent};
pub use channel::{ChannelBridge, EngineEndpoint, EventEmitter};
pub use loopback::LoopbackEngine;
