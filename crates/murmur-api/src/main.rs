use std::sync::Arc;

use axum::{routing::post, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use murmur_broker::RedisBroker;
use murmur_core::config::MurmurConfig;
use murmur_registry::Registry;

mod handlers;
mod logic_client;
mod response;

use handlers::AppState;
use logic_client::LogicClient;

#[derive(Parser)]
#[command(name = "murmur-api", about = "HTTP front-end for the chat fabric")]
struct Args {
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_api=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = MurmurConfig::load(args.config.as_deref())?;

    let registry = Registry::connect(
        &config.registry.host,
        &config.registry.base_path,
        &config.registry.username,
        &config.registry.password,
        config.registry.connection_timeout,
    )
    .await?;
    let logic = LogicClient::new(registry)?;
    let broker = Arc::new(RedisBroker::connect(&config.broker.brokers).await?);

    let state = Arc::new(AppState {
        logic,
        broker,
        ai_jobs_topic: config.broker.ai_jobs_topic.clone(),
    });

    let router = Router::new()
        .route("/user/login", post(handlers::user::login))
        .route("/user/register", post(handlers::user::register))
        .route("/user/checkAuth", post(handlers::user::check_auth))
        .route("/user/logout", post(handlers::user::logout))
        .route("/push/push", post(handlers::push::push))
        .route("/push/pushRoom", post(handlers::push::push_room))
        .route("/push/count", post(handlers::push::count))
        .route("/push/getRoomInfo", post(handlers::push::get_room_info))
        .route("/history/list", post(handlers::history::list))
        .route("/ai/summarize", post(handlers::ai::summarize))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.api.bind).await?;
    info!(bind = %config.api.bind, "api listening");
    axum::serve(listener, router).await?;
    Ok(())
}
