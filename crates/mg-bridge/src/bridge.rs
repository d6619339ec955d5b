//! Bridge contract with the engine
//!
//! Commands go out through [`CommandBridge::send`]. Events come back as
//! [`RawEvent`]s on a single queue which the [`EventPump`] drains in order,
//! decoding each one before handing it to the process-wide [`EventSink`].

use mg_core::{ActionKind, Event, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::codec;

/// Outbound half of the engine boundary
pub trait CommandBridge: Send + Sync {
    /// Fire a command. Returns as soon as the engine accepted it; the
    /// answer, if any, arrives later as an event.
    fn send(&self, kind: ActionKind, body: Vec<u8>) -> Result<()>;
}

/// Receiver of every decoded engine event
pub trait EventSink: Send + Sync {
    /// Called once per event, in emission order. Must finish its fan-out
    /// before returning.
    fn deliver(&self, event: Event);
}

/// Command as it crosses the bridge
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    pub kind: ActionKind,
    pub body: Vec<u8>,
}

/// Event as emitted by the engine, before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub code: u32,
    pub body: Vec<u8>,
}

/// Single ordered delivery point for engine events
pub struct EventPump {
    rx: mpsc::UnboundedReceiver<RawEvent>,
}

impl EventPump {
    pub fn new(rx: mpsc::UnboundedReceiver<RawEvent>) -> Self {
        Self { rx }
    }

    /// Drain events until the engine side hangs up.
    ///
    /// Undecodable events are logged and skipped; they never stall the
    /// events behind them.
    pub async fn run(mut self, sink: Arc<dyn EventSink>) {
        info!("Event pump started");
        let mut delivered: u64 = 0;

        while let Some(raw) = self.rx.recv().await {
            let kind = match codec::kind_from_code(raw.code) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(code = raw.code, error = %e, "Dropping event with unknown kind");
                    continue;
                }
            };

            match codec::decode_event(kind, &raw.body) {
                Ok(body) => {
                    debug!(kind = %kind, unique = ?body.unique(), "Delivering event");
                    sink.deliver(Event::new(kind, body));
                    delivered += 1;
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Dropping undecodable event");
                }
            }
        }

        info!(delivered, "Event pump stopped: engine closed its event stream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_core::{EventBody, LogEvent, ResourceEvent};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Event>>);

    impl EventSink for Collect {
        fn deliver(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn raw(kind: ActionKind, body: &EventBody) -> RawEvent {
        RawEvent {
            code: kind.code(),
            body: codec::encode_event(body).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_pump_preserves_order_and_skips_garbage() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Collect::default());

        for unique in ["a", "b"] {
            let body = EventBody::Resource(ResourceEvent {
                path: format!("/media/{}.mp4", unique),
                unique: unique.into(),
                error: String::new(),
            });
            tx.send(raw(ActionKind::ResourceAdd, &body)).unwrap();
        }
        tx.send(RawEvent { code: 4242, body: vec![] }).unwrap();
        tx.send(RawEvent {
            code: ActionKind::OutputAdd.code(),
            body: vec![1],
        })
        .unwrap();
        tx.send(raw(
            ActionKind::EngineLog,
            &EventBody::Log(LogEvent {
                level: "info".into(),
                message: "ready".into(),
            }),
        ))
        .unwrap();
        drop(tx);

        EventPump::new(rx).run(sink.clone()).await;

        let events = sink.0.lock().unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::ResourceAdd, ActionKind::ResourceAdd, ActionKind::EngineLog]
        );
        assert_eq!(events[0].unique(), Some("a"));
        assert_eq!(events[1].unique(), Some("b"));
    }
}
