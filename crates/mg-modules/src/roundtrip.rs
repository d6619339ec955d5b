//! Command / event round trip
//!
//! Every module operation that needs the engine goes through
//! [`RoundTrip::call`]: the waiter is registered first, the command is fired,
//! and the caller blocks until the matching event or the timeout. The waiter
//! guard removes the waiter on every exit path.

use mg_bridge::{codec, CommandBridge};
use mg_core::{ActionKind, Error, EventBody, Result};
use mg_keeper::{Keeper, Pending, Waiter};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct RoundTrip {
    bridge: Arc<dyn CommandBridge>,
    keeper: Arc<Keeper>,
    timeout: Duration,
}

impl RoundTrip {
    pub fn new(bridge: Arc<dyn CommandBridge>, keeper: Arc<Keeper>, timeout: Duration) -> Self {
        Self {
            bridge,
            keeper,
            timeout,
        }
    }

    pub fn keeper(&self) -> &Arc<Keeper> {
        &self.keeper
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `command` as `kind` and wait for the event `waiter` accepts.
    ///
    /// A non-empty error in the matched body becomes [`Error::Engine`].
    pub async fn call<C: Serialize>(
        &self,
        kind: ActionKind,
        command: &C,
        waiter: (Waiter, Pending),
    ) -> Result<EventBody> {
        let (waiter, pending) = waiter;
        // Registered before the send so a fast reply cannot slip past.
        let guard = self.keeper.register_guarded(waiter);
        debug!(kind = %kind, waiter_id = %guard.id(), "Round trip started");

        let body = codec::encode(command)?;
        if let Err(e) = self.bridge.send(kind, body) {
            warn!(kind = %kind, error = %e, "Command was not accepted by the engine");
            return Err(e);
        }

        let body = self.keeper.wait(pending, self.timeout).await?;
        drop(guard);

        match body.error() {
            Some(message) => {
                debug!(kind = %kind, error = %message, "Engine reported failure");
                Err(Error::engine(message))
            }
            None => Ok(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_bridge::{ChannelBridge, EventSink};
    use mg_core::{AddCommand, Event, OutputEvent};

    struct KeeperSink(Arc<Keeper>);

    impl EventSink for KeeperSink {
        fn deliver(&self, event: Event) {
            self.0.dispatch(&event);
        }
    }

    fn output_add(unique: &str) -> AddCommand {
        AddCommand {
            path: "rtmp://h/live".into(),
            unique: unique.into(),
        }
    }

    #[tokio::test]
    async fn test_send_failure_closes_waiter() {
        let (bridge, mut engine, _pump) = ChannelBridge::new();
        engine.close_commands();
        let keeper = Arc::new(Keeper::new());
        let rt = RoundTrip::new(Arc::new(bridge), keeper.clone(), Duration::from_millis(50));

        let err = rt
            .call(
                ActionKind::OutputAdd,
                &output_add("o1"),
                Waiter::for_unique(ActionKind::OutputAdd, "o1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Send(_)));
        assert!(keeper.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_closes_waiter() {
        let (bridge, _engine, _pump) = ChannelBridge::new();
        let keeper = Arc::new(Keeper::new());
        let rt = RoundTrip::new(Arc::new(bridge), keeper.clone(), Duration::from_millis(30));

        let err = rt
            .call(
                ActionKind::OutputAdd,
                &output_add("o1"),
                Waiter::for_unique(ActionKind::OutputAdd, "o1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(keeper.len(), 0);
        assert_eq!(keeper.metrics().timed_out(), 1);
    }

    #[tokio::test]
    async fn test_error_body_becomes_engine_failure() {
        let (bridge, mut engine, pump) = ChannelBridge::new();
        let keeper = Arc::new(Keeper::new());
        tokio::spawn(pump.run(Arc::new(KeeperSink(keeper.clone()))));
        tokio::spawn(async move {
            while let Some(cmd) = engine.recv().await {
                let cmd: AddCommand = cmd.decode().unwrap();
                engine
                    .emit(
                        ActionKind::OutputAdd,
                        &EventBody::Output(OutputEvent {
                            path: cmd.path,
                            unique: cmd.unique,
                            error: "connection refused".into(),
                        }),
                    )
                    .unwrap();
            }
        });

        let rt = RoundTrip::new(Arc::new(bridge), keeper.clone(), Duration::from_secs(2));
        let err = rt
            .call(
                ActionKind::OutputAdd,
                &output_add("o1"),
                Waiter::for_unique(ActionKind::OutputAdd, "o1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Engine(ref m) if m == "connection refused"));
        assert!(keeper.is_empty());
    }
}
