mod config;
mod runner;

use common::nats::NatsClient;
use common::telemetry::{init_telemetry, TelemetryConfig};
use config::ServiceConfig;
use ga_worker::ga_worker::{GaWorker, GaWorkerConfig};
use ga_worker::http::{AuthorizationServiceClient, GoogleAnalyticsHttpClient};
use runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_telemetry(&TelemetryConfig {
        service_name: config.service_name.clone(),
        log_level: config.log_level.clone(),
    });

    info!(
        nats_url = %config.nats_url,
        analytics_endpoint = %config.google_analytics_base_url,
        "Starting ga-bridge service"
    );
    debug!("Configuration: {:?}", config);

    let nats_client = match initialize_nats(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize NATS: {}", e);
            std::process::exit(1);
        }
    };

    let (user_lookup, hit_sender) = match build_http_clients(&config) {
        Ok(clients) => clients,
        Err(e) => {
            error!("Failed to build HTTP clients: {}", e);
            std::process::exit(1);
        }
    };

    let worker = match GaWorker::new(
        nats_client.jetstream(),
        user_lookup,
        hit_sender,
        GaWorkerConfig {
            device_reports_stream: config.device_reports_stream.clone(),
            device_reports_subject: config.device_reports_subject.clone(),
            device_events_stream: config.device_events_stream.clone(),
            device_events_subject: config.device_events_subject.clone(),
            device_changes_stream: config.device_changes_stream.clone(),
            device_changes_subject: config.device_changes_subject.clone(),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to initialize analytics dispatch module: {}", e);
            std::process::exit(1);
        }
    };

    let mut runner = Runner::new();

    for (i, process) in worker.into_runner_processes().into_iter().enumerate() {
        runner = runner.with_named_process(format!("ga_worker_{}", i), process);
    }

    runner = runner
        .with_closer({
            let nats_for_close = Arc::clone(&nats_client);
            move || {
                Box::pin(async move {
                    info!("Running cleanup tasks...");
                    if let Ok(client) = Arc::try_unwrap(nats_for_close) {
                        client.close().await;
                    }
                    info!("Cleanup complete");
                    Ok(())
                })
            }
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

async fn initialize_nats(config: &ServiceConfig) -> anyhow::Result<Arc<NatsClient>> {
    info!("Initializing NATS...");
    let nats_client = Arc::new(
        NatsClient::connect(
            &config.nats_url,
            Duration::from_secs(config.startup_timeout_secs),
        )
        .await?,
    );

    nats_client
        .ensure_stream(&config.device_reports_stream)
        .await?;
    nats_client
        .ensure_stream(&config.device_events_stream)
        .await?;
    nats_client
        .ensure_stream(&config.device_changes_stream)
        .await?;

    Ok(nats_client)
}

fn build_http_clients(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<AuthorizationServiceClient>, Arc<GoogleAnalyticsHttpClient>)> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let user_lookup = Arc::new(AuthorizationServiceClient::new(
        &config.authorization_service_base_url,
        timeout,
    )?);
    let hit_sender = Arc::new(GoogleAnalyticsHttpClient::new(
        &config.google_analytics_base_url,
        timeout,
    )?);
    Ok((user_lookup, hit_sender))
}
