//! gRPC server setup for mediagate-service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use mg_modules::ModuleManager;
use tonic::transport::Server;
use tracing::info;

use super::proto::media_gate_server::MediaGateServer;
use super::service::MediaGateService;

pub async fn start_grpc_server(addr: SocketAddr, manager: Arc<ModuleManager>) -> Result<()> {
    info!("Starting gRPC server on {}", addr);

    Server::builder()
        .add_service(MediaGateServer::new(MediaGateService::new(manager)))
        .serve(addr)
        .await?;

    Ok(())
}
