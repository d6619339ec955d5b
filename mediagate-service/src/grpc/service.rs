//! MediaGate gRPC service: module operations and event streaming

use std::sync::Arc;

use mg_core::Error;
use mg_modules::ModuleManager;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use super::proto::{
    self, media_gate_server::MediaGate, AddRequest, EventMessage, ListRequest, OutputList,
    PluginList, PluginRequest, ResourceList, StopRequest, StopResponse, UniqueRequest,
    WatchRequest,
};

pub struct MediaGateService {
    manager: Arc<ModuleManager>,
}

impl MediaGateService {
    pub fn new(manager: Arc<ModuleManager>) -> Self {
        Self { manager }
    }
}

fn status(err: Error) -> Status {
    let message = err.to_string();
    match err {
        Error::InvalidArgument(_) => Status::invalid_argument(message),
        Error::NotFound(_) => Status::not_found(message),
        Error::DuplicateKey(_) => Status::already_exists(message),
        Error::CannotRemoveCurrent(_) => Status::failed_precondition(message),
        Error::InFlight(_) => Status::aborted(message),
        Error::Timeout(_) => Status::deadline_exceeded(message),
        Error::Send(_) => Status::unavailable(message),
        Error::Engine(_) => Status::unknown(message),
        _ => Status::internal(message),
    }
}

impl From<mg_core::Resource> for proto::Resource {
    fn from(r: mg_core::Resource) -> Self {
        Self {
            unique: r.unique,
            path: r.path,
            create_time: r.create_time.timestamp_millis(),
            start_time: r.start_time.map(|t| t.timestamp_millis()),
            end_time: r.end_time.map(|t| t.timestamp_millis()),
        }
    }
}

impl From<mg_core::Output> for proto::Output {
    fn from(o: mg_core::Output) -> Self {
        Self {
            unique: o.unique,
            path: o.path,
            create_time: o.create_time.timestamp_millis(),
            error: o.error,
        }
    }
}

impl From<mg_core::Plugin> for proto::Plugin {
    fn from(p: mg_core::Plugin) -> Self {
        Self {
            unique: p.unique,
            path: p.path,
            params: p.params,
            create_time: p.create_time.timestamp_millis(),
        }
    }
}

#[tonic::async_trait]
impl MediaGate for MediaGateService {
    async fn add_resource(
        &self,
        request: Request<AddRequest>,
    ) -> Result<Response<proto::Resource>, Status> {
        let req = request.into_inner();
        let resource = self
            .manager
            .resource()
            .add(&req.path, &req.unique)
            .await
            .map_err(status)?;
        Ok(Response::new(resource.into()))
    }

    async fn remove_resource(
        &self,
        request: Request<UniqueRequest>,
    ) -> Result<Response<proto::Resource>, Status> {
        let req = request.into_inner();
        let resource = self
            .manager
            .resource()
            .remove(&req.unique)
            .await
            .map_err(status)?;
        Ok(Response::new(resource.into()))
    }

    async fn list_resources(
        &self,
        _request: Request<ListRequest>,
    ) -> Result<Response<ResourceList>, Status> {
        let resources = self.manager.resource().list();
        Ok(Response::new(ResourceList {
            resources: resources.into_iter().map(Into::into).collect(),
        }))
    }

    async fn list_all_resources(
        &self,
        _request: Request<ListRequest>,
    ) -> Result<Response<ResourceList>, Status> {
        let resources = self.manager.resource().all_list();
        Ok(Response::new(ResourceList {
            resources: resources.into_iter().map(Into::into).collect(),
        }))
    }

    async fn add_output(
        &self,
        request: Request<AddRequest>,
    ) -> Result<Response<proto::Output>, Status> {
        let req = request.into_inner();
        let output = self
            .manager
            .output()
            .add(&req.path, &req.unique)
            .await
            .map_err(status)?;
        Ok(Response::new(output.into()))
    }

    async fn remove_output(
        &self,
        request: Request<UniqueRequest>,
    ) -> Result<Response<proto::Output>, Status> {
        let req = request.into_inner();
        let output = self
            .manager
            .output()
            .remove(&req.unique)
            .await
            .map_err(status)?;
        Ok(Response::new(output.into()))
    }

    async fn list_outputs(
        &self,
        _request: Request<ListRequest>,
    ) -> Result<Response<OutputList>, Status> {
        let outputs = self.manager.output().list();
        Ok(Response::new(OutputList {
            outputs: outputs.into_iter().map(Into::into).collect(),
        }))
    }

    async fn add_plugin(
        &self,
        request: Request<PluginRequest>,
    ) -> Result<Response<proto::Plugin>, Status> {
        let req = request.into_inner();
        let plugin = self
            .manager
            .plugin()
            .add(&req.path, &req.unique, req.params)
            .await
            .map_err(status)?;
        Ok(Response::new(plugin.into()))
    }

    async fn remove_plugin(
        &self,
        request: Request<UniqueRequest>,
    ) -> Result<Response<proto::Plugin>, Status> {
        let req = request.into_inner();
        let plugin = self
            .manager
            .plugin()
            .remove(&req.unique)
            .await
            .map_err(status)?;
        Ok(Response::new(plugin.into()))
    }

    async fn list_plugins(
        &self,
        _request: Request<ListRequest>,
    ) -> Result<Response<PluginList>, Status> {
        let plugins = self.manager.plugin().list();
        Ok(Response::new(PluginList {
            plugins: plugins.into_iter().map(Into::into).collect(),
        }))
    }

    async fn update_plugin(
        &self,
        request: Request<PluginRequest>,
    ) -> Result<Response<proto::Plugin>, Status> {
        let req = request.into_inner();
        let plugin = self
            .manager
            .plugin()
            .update(&req.unique, req.params)
            .await
            .map_err(status)?;
        Ok(Response::new(plugin.into()))
    }

    async fn stop_play(
        &self,
        _request: Request<StopRequest>,
    ) -> Result<Response<StopResponse>, Status> {
        self.manager.play().stop().await.map_err(status)?;
        Ok(Response::new(StopResponse { stopped: true }))
    }

    type WatchEventsStream = ReceiverStream<Result<EventMessage, Status>>;

    async fn watch_events(
        &self,
        request: Request<WatchRequest>,
    ) -> Result<Response<Self::WatchEventsStream>, Status> {
        let kinds = request.into_inner().kinds;
        let mut events = self.manager.subscribe();
        let (tx, rx) = mpsc::channel(64);
        debug!(?kinds, "gRPC event watch started");

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = tx.closed() => break,
                    received = events.recv() => received,
                };
                let event = match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "gRPC watcher lagging; events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !kinds.is_empty() && !kinds.iter().any(|k| k == event.kind.as_str()) {
                    continue;
                }

                let message = EventMessage {
                    kind: event.kind.to_string(),
                    unique: event.unique().unwrap_or_default().to_string(),
                    error: event.error().unwrap_or_default().to_string(),
                    body_json: serde_json::to_string(&event.body).unwrap_or_default(),
                };
                if tx.send(Ok(message)).await.is_err() {
                    break;
                }
            }
            debug!("gRPC event watch ended");
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_bridge::ChannelBridge;
    use mg_core::{ActionKind, Event, EventBody, OutputEvent, PlayEvent, RuntimeConfig};
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use tonic::Code;

    fn service() -> (MediaGateService, Arc<ModuleManager>) {
        let (bridge, _engine, _pump) = ChannelBridge::new();
        let manager = Arc::new(ModuleManager::new(
            Arc::new(bridge),
            &RuntimeConfig::default(),
        ));
        (MediaGateService::new(manager.clone()), manager)
    }

    fn output_event(kind: ActionKind, unique: &str) -> Event {
        Event::new(
            kind,
            EventBody::Output(OutputEvent {
                path: "rtmp://h/live".into(),
                unique: unique.into(),
                error: String::new(),
            }),
        )
    }

    #[test]
    fn test_errors_map_to_status_codes() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cases = vec![
            (Error::invalid_argument("path"), Code::InvalidArgument),
            (Error::not_found("o1"), Code::NotFound),
            (Error::duplicate_key("o1"), Code::AlreadyExists),
            (Error::cannot_remove_current("r1"), Code::FailedPrecondition),
            (Error::in_flight("o1"), Code::Aborted),
            (Error::timeout("OUTPUT_ADD"), Code::DeadlineExceeded),
            (Error::send("engine gone"), Code::Unavailable),
            (Error::engine("bad url"), Code::Unknown),
            (Error::config("wait_timeout"), Code::Internal),
            (Error::internal("bug"), Code::Internal),
            (Error::from(io), Code::Internal),
            (Error::from(json), Code::Internal),
        ];
        for (err, code) in cases {
            let message = err.to_string();
            let status = status(err);
            assert_eq!(status.code(), code, "{}", message);
            assert_eq!(status.message(), message);
        }
    }

    #[tokio::test]
    async fn test_watch_streams_only_requested_kinds() {
        let (svc, manager) = service();
        let mut stream = svc
            .watch_events(Request::new(WatchRequest {
                kinds: vec!["OUTPUT_ADD".into()],
            }))
            .await
            .unwrap()
            .into_inner();

        manager.dispatch(output_event(ActionKind::OutputRemove, "o0"));
        manager.dispatch(Event::new(
            ActionKind::PlayStop,
            EventBody::Play(PlayEvent::default()),
        ));
        manager.dispatch(output_event(ActionKind::OutputAdd, "o1"));
        manager.dispatch(output_event(ActionKind::OutputError, "o1"));
        manager.dispatch(output_event(ActionKind::OutputAdd, "o2"));

        for expected in ["o1", "o2"] {
            let message = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(message.kind, "OUTPUT_ADD");
            assert_eq!(message.unique, expected);
            assert!(message.error.is_empty());
            let body: serde_json::Value = serde_json::from_str(&message.body_json).unwrap();
            assert_eq!(body["type"], "output");
        }

        let quiet = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn test_watch_ends_when_client_goes_away() {
        let (svc, manager) = service();
        let stream = svc
            .watch_events(Request::new(WatchRequest { kinds: Vec::new() }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(manager.subscriber_count(), 1);

        drop(stream);
        tokio::time::timeout(Duration::from_secs(1), async {
            while manager.subscriber_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
