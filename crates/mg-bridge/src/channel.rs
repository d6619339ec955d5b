//! In-process bridge built on tokio channels
//!
//! [`ChannelBridge::new`] returns the process-side bridge, the engine-side
//! endpoint and the event pump. Whatever drives [`EngineEndpoint`] plays the
//! engine: the loopback engine in development, a scripted driver in tests.

use mg_core::{ActionKind, Error, EventBody, Result};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::{CommandBridge, EventPump, RawCommand, RawEvent};
use crate::codec;

/// Process side: implements [`CommandBridge`]
#[derive(Clone)]
pub struct ChannelBridge {
    commands: mpsc::UnboundedSender<RawCommand>,
}

impl ChannelBridge {
    pub fn new() -> (ChannelBridge, EngineEndpoint, EventPump) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();

        let bridge = ChannelBridge { commands: cmd_tx };
        let endpoint = EngineEndpoint {
            commands: cmd_rx,
            emitter: EventEmitter { events: evt_tx },
        };
        (bridge, endpoint, EventPump::new(evt_rx))
    }
}

impl CommandBridge for ChannelBridge {
    fn send(&self, kind: ActionKind, body: Vec<u8>) -> Result<()> {
        debug!(kind = %kind, bytes = body.len(), "Sending command");
        self.commands
            .send(RawCommand { kind, body })
            .map_err(|_| Error::send(format!("engine is not accepting commands ({})", kind)))
    }
}

/// Engine side: receives commands, emits events
pub struct EngineEndpoint {
    commands: mpsc::UnboundedReceiver<RawCommand>,
    emitter: EventEmitter,
}

impl EngineEndpoint {
    /// Next command, or `None` once every bridge handle is gone
    pub async fn recv(&mut self) -> Option<RawCommand> {
        self.commands.recv().await
    }

    /// Next command without waiting
    pub fn try_recv(&mut self) -> Option<RawCommand> {
        self.commands.try_recv().ok()
    }

    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    pub fn emit(&self, kind: ActionKind, body: &EventBody) -> Result<()> {
        self.emitter.emit(kind, body)
    }

    /// Stop accepting commands; later sends fail with a send error
    pub fn close_commands(&mut self) {
        self.commands.close();
    }
}

/// Clonable handle that pushes events into the pump
#[derive(Clone)]
pub struct EventEmitter {
    events: mpsc::UnboundedSender<RawEvent>,
}

impl EventEmitter {
    pub fn emit(&self, kind: ActionKind, body: &EventBody) -> Result<()> {
        let body = codec::encode_event(body)?;
        self.emit_raw(RawEvent {
            code: kind.code(),
            body,
        })
    }

    pub fn emit_raw(&self, raw: RawEvent) -> Result<()> {
        self.events
            .send(raw)
            .map_err(|_| Error::internal("event pump has stopped"))
    }
}

impl RawCommand {
    /// Decode the command body into its schema
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode(&self.body)
    }
}
