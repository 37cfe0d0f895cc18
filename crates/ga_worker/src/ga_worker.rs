use crate::domain::{DispatchService, HitSender, UserLookup};
use crate::nats::{
    create_device_change_handler, create_device_event_handler, create_device_report_handler,
};
use async_nats::jetstream;
use common::nats::NatsConsumer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct GaWorkerConfig {
    pub device_reports_stream: String,
    pub device_reports_subject: String,
    pub device_events_stream: String,
    pub device_events_subject: String,
    pub device_changes_stream: String,
    pub device_changes_subject: String,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
}

/// Wires the dispatch service to one consumer per inbound event family.
pub struct GaWorker {
    report_consumer: NatsConsumer,
    event_consumer: NatsConsumer,
    change_consumer: NatsConsumer,
}

impl GaWorker {
    pub async fn new(
        jetstream: &jetstream::Context,
        user_lookup: Arc<dyn UserLookup>,
        hit_sender: Arc<dyn HitSender>,
        config: GaWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing analytics dispatch module");

        let service = Arc::new(DispatchService::new(user_lookup, hit_sender));

        let report_consumer = NatsConsumer::new(
            jetstream,
            &config.device_reports_stream,
            "ga-bridge-reports",
            &config.device_reports_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            create_device_report_handler(service.clone()),
        )
        .await?;

        let event_consumer = NatsConsumer::new(
            jetstream,
            &config.device_events_stream,
            "ga-bridge-events",
            &config.device_events_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            create_device_event_handler(service.clone()),
        )
        .await?;

        let change_consumer = NatsConsumer::new(
            jetstream,
            &config.device_changes_stream,
            "ga-bridge-changes",
            &config.device_changes_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            create_device_change_handler(service),
        )
        .await?;

        info!("Analytics dispatch module initialized");

        Ok(Self {
            report_consumer,
            event_consumer,
            change_consumer,
        })
    }

    pub fn into_runner_processes(
        self,
    ) -> Vec<
        Box<
            dyn FnOnce(
                    CancellationToken,
                ) -> std::pin::Pin<
                    Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
                > + Send,
        >,
    > {
        vec![
            Box::new({
                let consumer = self.report_consumer;
                move |ctx| Box::pin(async move { consumer.run(ctx).await })
            }),
            Box::new({
                let consumer = self.event_consumer;
                move |ctx| Box::pin(async move { consumer.run(ctx).await })
            }),
            Box::new({
                let consumer = self.change_consumer;
                move |ctx| Box::pin(async move { consumer.run(ctx).await })
            }),
        ]
    }
}
