use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use neuron_client::NeuronClient;
use seoforge_common::{Clock, Config, SystemClock};
use seoforge_pipeline::{LlmGenerator, Pipeline, PipelineConfig, PromptSet};
use seoforge_queue::{LeaseManager, PgQueueStore};
use seoforge_worker::{LogPublisher, Worker, WorkerDeps};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("seoforge=info".parse()?))
        .init();

    info!("SEO Forge worker starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    // Term engine
    let neuron = NeuronClient::new(config.neuron_api_key.clone())
        .with_base_url(config.neuron_api_endpoint.as_str())
        .with_http_client(http.clone());
    match neuron.list_projects().await {
        Ok(projects) => info!(projects = projects.len(), "Neuron API reachable"),
        Err(e) => warn!(error = %e, "Neuron project listing failed, continuing"),
    }

    // Language model
    let mut openai = OpenAi::new(config.openai_api_key.clone(), config.openai_model.clone())
        .with_http_client(http);
    if let Some(max_tokens) = config.openai_max_tokens {
        openai = openai.with_max_tokens(max_tokens);
    }
    let prompts = PromptSet::load(config.prompts_file_path.as_deref())?;
    let generator = LlmGenerator::new(Arc::new(openai), prompts);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pipeline = Pipeline::new(
        Arc::new(neuron),
        Arc::new(generator),
        clock.clone(),
        PipelineConfig::from_config(&config),
    );

    // Queue
    let store = PgQueueStore::connect(&config.database_url).await?;
    store.ensure_schema().await?;
    let leases = LeaseManager::new(Arc::new(store), clock);

    let worker = Worker::new(
        WorkerDeps::builder()
            .pipeline(Arc::new(pipeline))
            .leases(leases)
            .publisher(Arc::new(LogPublisher))
            .anchors_config_path(config.anchors_config_path.as_ref().map(PathBuf::from))
            .worker_id(config.worker_id.clone())
            .lease(config.lease_duration()?)
            .batch_size(config.claim_batch_size)
            .build(),
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.scheduler_interval_secs));
    info!(
        interval_secs = config.scheduler_interval_secs,
        "Scheduler running, Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = worker.run_cycle().await {
                    error!(error = %e, "Cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}
