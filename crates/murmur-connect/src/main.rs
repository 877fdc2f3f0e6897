use std::sync::Arc;

use clap::Parser;
use tracing::info;

use murmur_core::config::MurmurConfig;
use murmur_registry::{Registry, ServiceEntry, SERVICE_CONNECT};

mod bucket;
mod channel;
mod logic_client;
mod room;
mod rpc;
mod server;
mod websocket;

use logic_client::LogicClient;
use server::{Server, ServerOptions};

#[derive(Parser)]
#[command(name = "murmur-connect", about = "Stateful edge owning live client sessions")]
struct Args {
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_connect=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = MurmurConfig::load(args.config.as_deref())?;
    let server_id = config.connect.server_id.clone();

    let registry = Registry::connect(
        &config.registry.host,
        &config.registry.base_path,
        &config.registry.username,
        &config.registry.password,
        config.registry.connection_timeout,
    )
    .await?;

    let operator = Arc::new(LogicClient::new(registry.clone())?);
    let options = ServerOptions::from_config(&config.connect.timeouts, &config.connect.bucket);
    let server = Server::new(&config.connect.bucket, options, operator, server_id.clone());

    // Push RPC surface for the Task tier - one listener per configured bind.
    let mut first_bind = None;
    for bind in config.connect.rpc_bind.split(',').map(str::trim) {
        if bind.is_empty() {
            continue;
        }
        first_bind.get_or_insert_with(|| bind.to_string());
        let listener = tokio::net::TcpListener::bind(bind).await?;
        info!(%bind, "connect rpc listening");
        let router = rpc::router(server.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "rpc server exited");
            }
        });
    }
    let rpc_addr = first_bind
        .ok_or_else(|| anyhow::anyhow!("connect.rpc_bind has no usable address"))?;

    let entry = ServiceEntry::new(&server_id, &format!("http://{}", rpc_addr), "ws");
    let lease = registry
        .register_with_keepalive(SERVICE_CONNECT, entry)
        .await?;

    let listener = tokio::net::TcpListener::bind(&config.connect.ws_bind).await?;
    info!(bind = %config.connect.ws_bind, server_id = %server_id, "websocket edge listening");
    let ws_router = websocket::router(server);

    tokio::select! {
        res = axum::serve(listener, ws_router) => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            lease.abort();
            let _ = registry.deregister(SERVICE_CONNECT, &server_id).await;
        }
    }
    Ok(())
}
