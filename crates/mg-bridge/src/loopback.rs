//! Loopback engine
//!
//! Stands in for the native media engine during development: it acknowledges
//! every command with the event the real engine would emit, keeps just enough
//! state to reject removals of unknown items, and starts the first queued
//! resource. No media is decoded or streamed.

use mg_core::{
    ActionKind, AddCommand, EngineConfig, EventBody, LogEvent, OutputEvent, PlayEvent,
    PluginCommand, PluginEvent, RemoveCommand, ResourceEvent, Result,
};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bridge::RawCommand;
use crate::channel::{EngineEndpoint, EventEmitter};

#[derive(Default)]
struct LoopbackState {
    /// (unique, path) in play order
    queue: Vec<(String, String)>,
    outputs: HashMap<String, String>,
    plugins: HashMap<String, String>,
}

pub struct LoopbackEngine {
    endpoint: EngineEndpoint,
    config: EngineConfig,
    state: LoopbackState,
}

impl LoopbackEngine {
    pub fn new(endpoint: EngineEndpoint, config: EngineConfig) -> Self {
        Self {
            endpoint,
            config,
            state: LoopbackState::default(),
        }
    }

    /// Run the engine loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let emitter = self.endpoint.emitter();
        let banner = format!(
            "loopback engine ready: {}x{}@{} {}",
            self.config.width, self.config.height, self.config.frame_rate, self.config.protocol
        );
        info!("{}", banner);
        let _ = emitter.emit(
            ActionKind::EngineLog,
            &EventBody::Log(LogEvent {
                level: "info".to_string(),
                message: banner,
            }),
        );

        while let Some(command) = self.endpoint.recv().await {
            if let Err(e) = self.handle(&emitter, &command) {
                warn!(kind = %command.kind, error = %e, "Loopback engine could not handle command");
                let _ = emitter.emit(
                    ActionKind::EngineLog,
                    &EventBody::Log(LogEvent {
                        level: "error".to_string(),
                        message: format!("{}: {}", command.kind, e),
                    }),
                );
            }
        }

        info!("Loopback engine stopped");
    }

    fn handle(&mut self, emitter: &EventEmitter, command: &RawCommand) -> Result<()> {
        let state = &mut self.state;
        match command.kind {
            ActionKind::ResourceAdd => {
                let cmd: AddCommand = command.decode()?;
                let error = empty_path_error(&cmd.path);
                let starts = error.is_empty() && state.queue.is_empty();
                if error.is_empty() {
                    state.queue.push((cmd.unique.clone(), cmd.path.clone()));
                }
                let body = ResourceEvent {
                    path: cmd.path,
                    unique: cmd.unique,
                    error,
                };
                emitter.emit(ActionKind::ResourceAdd, &EventBody::Resource(body.clone()))?;
                if starts {
                    emitter.emit(ActionKind::ResourceStart, &EventBody::Resource(body))?;
                }
            }
            ActionKind::ResourceRemove => {
                let cmd: RemoveCommand = command.decode()?;
                let position = state.queue.iter().position(|(u, _)| *u == cmd.unique);
                let (path, error) = match position {
                    Some(0) => (state.queue[0].1.clone(), "resource is playing".to_string()),
                    Some(i) => (state.queue.remove(i).1, String::new()),
                    None => (String::new(), "resource not found".to_string()),
                };
                emitter.emit(
                    ActionKind::ResourceRemove,
                    &EventBody::Resource(ResourceEvent {
                        path,
                        unique: cmd.unique,
                        error,
                    }),
                )?;
            }
            ActionKind::OutputAdd | ActionKind::OutputRemove => {
                let (path, unique, error) = if command.kind == ActionKind::OutputAdd {
                    let cmd: AddCommand = command.decode()?;
                    let error = empty_path_error(&cmd.path);
                    if error.is_empty() {
                        state.outputs.insert(cmd.unique.clone(), cmd.path.clone());
                    }
                    (cmd.path, cmd.unique, error)
                } else {
                    let cmd: RemoveCommand = command.decode()?;
                    match state.outputs.remove(&cmd.unique) {
                        Some(path) => (path, cmd.unique, String::new()),
                        None => (String::new(), cmd.unique, "output not found".to_string()),
                    }
                };
                emitter.emit(
                    command.kind,
                    &EventBody::Output(OutputEvent {
                        path,
                        unique,
                        error,
                    }),
                )?;
            }
            ActionKind::PluginAdd | ActionKind::PluginUpdate => {
                let cmd: PluginCommand = command.decode()?;
                let error = if command.kind == ActionKind::PluginUpdate
                    && !state.plugins.contains_key(&cmd.unique)
                {
                    "plugin not found".to_string()
                } else {
                    empty_path_error(&cmd.path)
                };
                if error.is_empty() {
                    state.plugins.insert(cmd.unique.clone(), cmd.path.clone());
                }
                emitter.emit(
                    command.kind,
                    &EventBody::Plugin(PluginEvent {
                        path: cmd.path,
                        unique: cmd.unique,
                        params: cmd.params,
                        error,
                    }),
                )?;
            }
            ActionKind::PluginRemove => {
                let cmd: RemoveCommand = command.decode()?;
                let (path, error) = match state.plugins.remove(&cmd.unique) {
                    Some(path) => (path, String::new()),
                    None => (String::new(), "plugin not found".to_string()),
                };
                emitter.emit(
                    ActionKind::PluginRemove,
                    &EventBody::Plugin(PluginEvent {
                        path,
                        unique: cmd.unique,
                        params: HashMap::new(),
                        error,
                    }),
                )?;
            }
            ActionKind::PlayStop => {
                let error = if state.queue.is_empty() {
                    "nothing is playing".to_string()
                } else {
                    String::new()
                };
                let drained = std::mem::take(&mut state.queue);
                emitter.emit(ActionKind::PlayStop, &EventBody::Play(PlayEvent { error }))?;
                if !drained.is_empty() {
                    emitter.emit(ActionKind::PlayEnd, &EventBody::Play(PlayEvent::default()))?;
                }
            }
            other => {
                warn!(kind = %other, "Loopback engine ignores event-only kind sent as a command");
            }
        }
        Ok(())
    }
}

fn empty_path_error(path: &str) -> String {
    if path.trim().is_empty() {
        "empty path".to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{CommandBridge, EventSink};
    use crate::channel::ChannelBridge;
    use crate::codec;
    use mg_core::{Event, StopCommand};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Event>>);

    impl EventSink for Collect {
        fn deliver(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    async fn settle(sink: &Collect, count: usize) -> Vec<Event> {
        for _ in 0..100 {
            if sink.0.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sink.0.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_first_resource_starts_and_stop_drains() {
        let (bridge, endpoint, pump) = ChannelBridge::new();
        let sink = Arc::new(Collect::default());
        LoopbackEngine::new(endpoint, EngineConfig::default()).spawn();
        tokio::spawn(pump.run(sink.clone()));

        for unique in ["r1", "r2"] {
            let cmd = AddCommand {
                path: format!("/media/{}.mp4", unique),
                unique: unique.to_string(),
            };
            bridge
                .send(ActionKind::ResourceAdd, codec::encode(&cmd).unwrap())
                .unwrap();
        }
        bridge
            .send(ActionKind::PlayStop, codec::encode(&StopCommand {}).unwrap())
            .unwrap();

        let events = settle(&sink, 6).await;
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::EngineLog,
                ActionKind::ResourceAdd,
                ActionKind::ResourceStart,
                ActionKind::ResourceAdd,
                ActionKind::PlayStop,
                ActionKind::PlayEnd,
            ]
        );
        assert_eq!(events[2].unique(), Some("r1"));
    }

    #[tokio::test]
    async fn test_errors_are_reported_in_the_body() {
        let (bridge, endpoint, pump) = ChannelBridge::new();
        let sink = Arc::new(Collect::default());
        LoopbackEngine::new(endpoint, EngineConfig::default()).spawn();
        tokio::spawn(pump.run(sink.clone()));

        let remove = RemoveCommand {
            unique: "missing".into(),
        };
        bridge
            .send(ActionKind::OutputRemove, codec::encode(&remove).unwrap())
            .unwrap();

        let events = settle(&sink, 2).await;
        assert_eq!(events[1].kind, ActionKind::OutputRemove);
        assert_eq!(events[1].error(), Some("output not found"));
    }
}
