//! mediagate daemon
//!
//! Wires the engine bridge to the module dispatcher and exposes the module
//! operations over:
//! - HTTP REST + websocket event push
//! - JSON-RPC (TCP and/or Unix socket)
//! - gRPC (feature `grpc`)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use mg_bridge::{ChannelBridge, LoopbackEngine};
use mg_core::RuntimeConfig;
use mg_http::{create_app, HttpServer, MiddlewareConfig};
use mg_jsonrpc::{JsonRpcServer, JsonRpcServerConfig};
use mg_modules::ModuleManager;

#[cfg(feature = "grpc")]
mod grpc;

#[derive(Parser, Debug)]
#[command(name = "mediagate")]
#[command(about = "Synchronous client APIs in front of an asynchronous media engine")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// HTTP bind address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Disable the HTTP surface
    #[arg(long)]
    no_http: bool,

    /// JSON-RPC TCP address
    #[arg(long)]
    jsonrpc_tcp: Option<String>,

    /// JSON-RPC Unix socket path
    #[arg(long)]
    jsonrpc_socket: Option<String>,

    /// gRPC bind address
    #[cfg(feature = "grpc")]
    #[arg(long)]
    grpc: Option<std::net::SocketAddr>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,

    /// Disable compression
    #[arg(long)]
    no_compression: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration and exit
    Config,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("mediagate=info".parse()?)
        .add_directive("mg_modules=info".parse()?)
        .add_directive("mg_http=info".parse()?)
        .add_directive("mg_jsonrpc=info".parse()?)
        .add_directive("engine=info".parse()?)
        .add_directive("tower_http=debug".parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = mg_core::config::load_environment();
    let args = Args::parse();
    init_tracing(args.log_json)?;

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path);
    }

    let config = RuntimeConfig::from_env().context("Invalid configuration")?;

    if let Some(Commands::Config) = args.command {
        let summary = serde_json::json!({
            "wait_timeout_ms": config.wait_timeout.as_millis() as u64,
            "event_buffer": config.event_buffer,
            "engine": config.engine,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    info!("Starting mediagate...");

    // --- 1. Engine bridge and dispatcher ---

    let (bridge, endpoint, pump) = ChannelBridge::new();
    let manager = Arc::new(ModuleManager::new(Arc::new(bridge), &config));
    let engine_handle = LoopbackEngine::new(endpoint, config.engine.clone()).spawn();
    let pump_handle = tokio::spawn(pump.run(manager.clone()));
    info!(
        width = config.engine.width,
        height = config.engine.height,
        protocol = %config.engine.protocol,
        "Engine bridge initialized"
    );

    // --- 2. JSON-RPC ---

    let jsonrpc_future = {
        let manager = manager.clone();
        let jsonrpc_config = JsonRpcServerConfig {
            unix_socket: args.jsonrpc_socket.clone(),
            tcp_addr: args.jsonrpc_tcp.clone(),
        };
        async move {
            if jsonrpc_config.unix_socket.is_none() && jsonrpc_config.tcp_addr.is_none() {
                std::future::pending::<()>().await;
            }
            Arc::new(JsonRpcServer::new(jsonrpc_config, manager))
                .run()
                .await
        }
    };

    // --- 3. HTTP ---

    let http_future = {
        let manager = manager.clone();
        let middleware = MiddlewareConfig::for_wait_timeout(config.wait_timeout)
            .cors(!args.no_cors)
            .compression(!args.no_compression);
        let bind = args.bind.clone();
        let enabled = !args.no_http;
        async move {
            if !enabled {
                std::future::pending::<()>().await;
            }
            let server = HttpServer::builder()
                .bind(bind)
                .router(create_app(manager))
                .middleware(middleware)
                .build()?;
            server.serve().await?;
            Ok::<(), anyhow::Error>(())
        }
    };

    // --- 4. gRPC ---

    #[cfg(feature = "grpc")]
    let grpc_future = {
        let manager = manager.clone();
        let addr = args.grpc;
        async move {
            match addr {
                Some(addr) => grpc::start_grpc_server(addr, manager).await,
                None => std::future::pending().await,
            }
        }
    };
    #[cfg(not(feature = "grpc"))]
    let grpc_future = std::future::pending::<Result<()>>();

    // --- 5. Run All ---

    tokio::select! {
        res = http_future => {
            error!("HTTP server exited: {:?}", res);
        }
        res = jsonrpc_future => {
            error!("JSON-RPC server exited: {:?}", res);
        }
        res = grpc_future => {
            error!("gRPC server exited: {:?}", res);
        }
        res = engine_handle => {
            error!("Engine exited: {:?}", res);
        }
        res = pump_handle => {
            error!("Event pump exited: {:?}", res);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
