//! gRPC surface (feature `grpc`)

pub mod proto {
    tonic::include_proto!("mediagate");
}

mod server;
mod service;

pub use server::start_grpc_server;
pub use service::MediaGateService;
