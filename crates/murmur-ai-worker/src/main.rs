use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use murmur_broker::{Broker, RedisBroker};
use murmur_core::config::{AiProvider, MurmurConfig};
use murmur_protocol::{AiJob, AiResult};

mod kimi;
mod ollama;
mod prompt;
mod provider;

use kimi::KimiProvider;
use ollama::OllamaProvider;
use provider::{ChatRequest, LlmProvider};

const CONSUMER_GROUP: &str = "ai-worker";

#[derive(Parser)]
#[command(name = "murmur-ai-worker", about = "LLM enrichment lane for the chat fabric")]
struct Args {
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_ai_worker=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = MurmurConfig::load(args.config.as_deref())?;

    let provider: Arc<dyn LlmProvider> = match config.ai.provider {
        AiProvider::Ollama => Arc::new(OllamaProvider::new(&config.ai.base_url)),
        AiProvider::Kimi => Arc::new(KimiProvider::new(&config.ai.base_url, &config.ai.api_key)),
    };

    let broker = Arc::new(RedisBroker::connect(&config.broker.brokers).await?);
    info!(
        provider = provider.name(),
        model = %config.ai.model,
        jobs = %config.broker.ai_jobs_topic,
        results = %config.broker.ai_results_topic,
        "worker started"
    );

    loop {
        let mut rx = match broker
            .subscribe(&config.broker.ai_jobs_topic, CONSUMER_GROUP)
            .await
        {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "subscribe failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        while let Some(delivery) = rx.recv().await {
            let job: AiJob = match serde_json::from_slice(&delivery.payload) {
                Ok(job) => job,
                Err(e) => {
                    warn!(error = %e, "bad job json, skipped");
                    continue;
                }
            };

            let req = ChatRequest {
                model: config.ai.model.clone(),
                prompt: prompt::build_prompt(&job),
            };
            let result = match provider.send(&req).await {
                Ok(resp) => AiResult {
                    room_id: job.room_id,
                    text: resp.content,
                    op: job.op,
                    model: resp.model,
                    err: String::new(),
                    client_msg_id: 0,
                },
                Err(e) => {
                    warn!(room_id = job.room_id, op = ?job.op, error = %e, "llm call failed");
                    AiResult {
                        room_id: job.room_id,
                        text: String::new(),
                        op: job.op,
                        model: config.ai.model.clone(),
                        err: e.to_string(),
                        client_msg_id: 0,
                    }
                }
            };

            let payload = match serde_json::to_vec(&result) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "unserializable result");
                    continue;
                }
            };
            if let Err(e) = broker
                .publish(
                    &config.broker.ai_results_topic,
                    &format!("room:{}", job.room_id),
                    payload,
                )
                .await
            {
                warn!(room_id = job.room_id, error = %e, "result publish failed");
            }
        }
        warn!("job stream ended, resubscribing");
    }
}
