use std::sync::Arc;

use clap::Parser;
use tracing::info;

use murmur_broker::RedisBroker;
use murmur_core::config::MurmurConfig;
use murmur_core::ids::{worker_id_from_server_id, Snowflake};
use murmur_history::ChatStore;
use murmur_registry::Registry;

mod consumer;
mod dispatch;
mod edge_client;

use dispatch::Dispatcher;
use edge_client::HttpEdgeClient;

#[derive(Parser)]
#[command(name = "murmur-task", about = "Broker consumer driving edge pushes and history")]
struct Args {
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_task=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = MurmurConfig::load(args.config.as_deref())?;

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(&config.database.path)?;
    murmur_history::db::init_db(&conn)?;
    let history = Arc::new(ChatStore::new(conn));

    let registry = Registry::connect(
        &config.registry.host,
        &config.registry.base_path,
        &config.registry.username,
        &config.registry.password,
        config.registry.connection_timeout,
    )
    .await?;
    let edges = Arc::new(HttpEdgeClient::new(registry)?);

    let broker: Arc<dyn murmur_broker::Broker> =
        Arc::new(RedisBroker::connect(&config.broker.brokers).await?);

    let ids = Snowflake::new(worker_id_from_server_id("task"));
    let dispatcher = Arc::new(Dispatcher::new(edges, history, ids));

    for server_id in config.task.server_ids.split(',').map(str::trim) {
        if server_id.is_empty() {
            continue;
        }
        let topic = config.topic_for_server(server_id);
        let group = format!("murmur-task-{}", server_id);
        info!(topic, group, "starting delivery consumer");
        tokio::spawn(consumer::run_delivery_consumer(
            broker.clone(),
            topic,
            group,
            dispatcher.clone(),
        ));
    }

    tokio::spawn(consumer::run_ai_results_consumer(
        broker.clone(),
        config.broker.ai_results_topic.clone(),
        dispatcher,
    ));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
