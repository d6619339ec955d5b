//! Module manager and event dispatcher
//!
//! Built once at startup and shared behind an `Arc`. It is the single sink the
//! event pump delivers to: each event goes to every module in a fixed order,
//! then to the keeper, then to push subscribers.

use mg_bridge::{CommandBridge, EventSink};
use mg_core::{Event, RuntimeConfig};
use mg_keeper::Keeper;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};

use crate::module::Module;
use crate::output::OutputModule;
use crate::play::PlayModule;
use crate::plugin::PluginModule;
use crate::resource::ResourceModule;
use crate::roundtrip::RoundTrip;

pub struct ModuleManager {
    play: Arc<PlayModule>,
    output: Arc<OutputModule>,
    resource: Arc<ResourceModule>,
    plugin: Arc<PluginModule>,
    /// Dispatch order
    modules: Vec<Arc<dyn Module>>,
    keeper: Arc<Keeper>,
    events: broadcast::Sender<Event>,
    timeout: Duration,
}

impl ModuleManager {
    pub fn new(bridge: Arc<dyn CommandBridge>, config: &RuntimeConfig) -> Self {
        Self::with_keeper(bridge, Arc::new(Keeper::new()), config)
    }

    pub fn with_keeper(
        bridge: Arc<dyn CommandBridge>,
        keeper: Arc<Keeper>,
        config: &RuntimeConfig,
    ) -> Self {
        let rt = RoundTrip::new(bridge, keeper.clone(), config.wait_timeout);

        let play = Arc::new(PlayModule::new(rt.clone()));
        let output = Arc::new(OutputModule::new(rt.clone()));
        let resource = Arc::new(ResourceModule::new(rt.clone()));
        let plugin = Arc::new(PluginModule::new(rt));

        let modules: Vec<Arc<dyn Module>> = vec![
            play.clone(),
            output.clone(),
            resource.clone(),
            plugin.clone(),
        ];
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        info!(
            modules = ?modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            timeout_ms = config.wait_timeout.as_millis() as u64,
            "Module manager initialized"
        );

        Self {
            play,
            output,
            resource,
            plugin,
            modules,
            keeper,
            events,
            timeout: config.wait_timeout,
        }
    }

    pub fn play(&self) -> &PlayModule {
        &self.play
    }

    pub fn output(&self) -> &OutputModule {
        &self.output
    }

    pub fn resource(&self) -> &ResourceModule {
        &self.resource
    }

    pub fn plugin(&self) -> &PluginModule {
        &self.plugin
    }

    /// Look a module up by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.iter().find(|m| m.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn keeper(&self) -> &Arc<Keeper> {
        &self.keeper
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Receive every dispatched event. Slow receivers lag, they never block dispatch.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Live push subscribers
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Fan one event out. Returns the id of the waiter that claimed it.
    pub fn dispatch(&self, event: Event) -> Option<String> {
        trace!(kind = %event.kind, unique = ?event.unique(), "Dispatching event");

        for module in &self.modules {
            let copy = event.clone();
            match panic::catch_unwind(AssertUnwindSafe(|| module.handle_event(&copy))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(module = module.name(), kind = %event.kind, error = %e, "Module failed to handle event");
                }
                Err(_) => {
                    error!(module = module.name(), kind = %event.kind, "Module panicked while handling event");
                }
            }
        }

        let offer = AssertUnwindSafe(|| self.keeper.dispatch(&event));
        let claimed = match panic::catch_unwind(offer) {
            Ok(claimed) => claimed,
            Err(_) => {
                error!(kind = %event.kind, "Keeper panicked while dispatching event");
                None
            }
        };
        // No subscribers is not an error.
        let _ = self.events.send(event);
        claimed
    }
}

impl EventSink for ModuleManager {
    fn deliver(&self, event: Event) {
        self.dispatch(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_bridge::ChannelBridge;
    use mg_core::{ActionKind, EventBody, LogEvent, OutputEvent};
    use mg_keeper::Waiter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Exploding;

    impl Module for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn handle_event(&self, _event: &Event) -> mg_core::Result<()> {
            panic!("handler bug");
        }
    }

    struct Counting(AtomicUsize);

    impl Module for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn handle_event(&self, _event: &Event) -> mg_core::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn output_add(unique: &str) -> Event {
        Event::new(
            ActionKind::OutputAdd,
            EventBody::Output(OutputEvent {
                path: "rtmp://h/live".into(),
                unique: unique.into(),
                error: String::new(),
            }),
        )
    }

    fn manager() -> ModuleManager {
        let (bridge, _engine, _pump) = ChannelBridge::new();
        ModuleManager::new(Arc::new(bridge), &RuntimeConfig::default())
    }

    #[test]
    fn test_modules_are_registered_in_order() {
        let manager = manager();
        assert_eq!(manager.names(), vec!["play", "output", "resource", "plugin"]);
        assert!(manager.get("output").is_some());
        assert!(manager.get("missing").is_none());
    }

    #[test]
    fn test_panicking_module_does_not_stop_delivery() {
        let mut manager = manager();
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        manager.modules.insert(0, Arc::new(Exploding));
        manager.modules.push(counting.clone());

        manager.dispatch(Event::new(
            ActionKind::EngineLog,
            EventBody::Log(LogEvent {
                level: "info".into(),
                message: "hello".into(),
            }),
        ));
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_predicate_does_not_stop_delivery() {
        let manager = manager();
        let mut rx = manager.subscribe();
        let (bad, _bad_pending) = Waiter::new(ActionKind::OutputAdd, |_| panic!("predicate bug"));
        manager.keeper().register(bad);

        let event = output_add("o1");
        assert_eq!(manager.dispatch(event.clone()), None);
        assert_eq!(rx.recv().await.unwrap(), event);

        let (good, _good_pending) = Waiter::for_unique(ActionKind::OutputAdd, "o1");
        let good_id = good.id().to_string();
        manager.keeper().register(good);
        assert_eq!(manager.dispatch(output_add("o1")), Some(good_id));
        assert!(manager.keeper().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_republished() {
        let manager = manager();
        let mut rx = manager.subscribe();
        let event = Event::new(
            ActionKind::OutputError,
            EventBody::Output(OutputEvent {
                path: "rtmp://h/live".into(),
                unique: "o1".into(),
                error: "broken pipe".into(),
            }),
        );
        manager.dispatch(event.clone());
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
