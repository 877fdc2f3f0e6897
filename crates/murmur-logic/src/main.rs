use std::sync::Arc;

use clap::Parser;
use tracing::info;

use murmur_broker::RedisBroker;
use murmur_core::config::MurmurConfig;
use murmur_core::ids::{worker_id_from_server_id, Snowflake};
use murmur_history::ChatStore;
use murmur_registry::{Registry, ServiceEntry, SERVICE_LOGIC};
use murmur_sessions::RedisSessions;
use murmur_users::UserStore;

mod commands;
mod logic;
mod producer;
mod rpc;

use logic::Logic;
use producer::Producer;

#[derive(Parser)]
#[command(name = "murmur-logic", about = "Stateless authority for sessions and publication")]
struct Args {
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_logic=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = MurmurConfig::load(args.config.as_deref())?;
    let server_id = config.logic.server_id.clone();

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let users_conn = rusqlite::Connection::open(&config.database.path)?;
    murmur_users::db::init_db(&users_conn)?;
    let users = Arc::new(UserStore::new(users_conn));

    let history_conn = rusqlite::Connection::open(&config.database.path)?;
    murmur_history::db::init_db(&history_conn)?;
    let history = Arc::new(ChatStore::new(history_conn));

    let sessions = Arc::new(
        RedisSessions::connect(
            &config.session_store.address,
            &config.session_store.password,
            config.session_store.db,
        )
        .await?,
    );
    let broker = Arc::new(RedisBroker::connect(&config.broker.brokers).await?);
    let producer = Producer::new(
        broker,
        &config.broker.queue_prefix,
        &config.broker.ai_jobs_topic,
    );

    let ids = Snowflake::new(worker_id_from_server_id(&server_id));
    let logic = Arc::new(Logic::new(
        sessions,
        users,
        history,
        producer,
        ids,
        server_id.clone(),
    ));

    let registry = Registry::connect(
        &config.registry.host,
        &config.registry.base_path,
        &config.registry.username,
        &config.registry.password,
        config.registry.connection_timeout,
    )
    .await?;

    let mut first_bind = None;
    let mut servers = Vec::new();
    for bind in config.logic.rpc_bind.split(',').map(str::trim) {
        if bind.is_empty() {
            continue;
        }
        first_bind.get_or_insert_with(|| bind.to_string());
        let listener = tokio::net::TcpListener::bind(bind).await?;
        info!(%bind, server_id = %server_id, "logic rpc listening");
        let router = rpc::router(logic.clone());
        servers.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "rpc server exited");
            }
        }));
    }
    let rpc_addr =
        first_bind.ok_or_else(|| anyhow::anyhow!("logic.rpc_bind has no usable address"))?;

    let entry = ServiceEntry::new(&server_id, &format!("http://{}", rpc_addr), "ws");
    let lease = registry
        .register_with_keepalive(SERVICE_LOGIC, entry)
        .await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    lease.abort();
    let _ = registry.deregister(SERVICE_LOGIC, &server_id).await;
    for s in servers {
        s.abort();
    }
    Ok(())
}
