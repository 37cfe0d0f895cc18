use anyhow::{Context, Result};
use async_nats::jetstream::{self, consumer::PullConsumer, AckKind};
use futures::{future::BoxFuture, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handler invoked once per inbound message with the raw payload and the
/// subject it arrived on. Returning `Err` naks the message for redelivery.
pub type MessageHandler =
    Box<dyn Fn(bytes::Bytes, String) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Durable JetStream pull consumer that hands messages to a handler one at a
/// time. A message is fully processed (and acked or naked) before the next
/// one starts, so handlers never see overlapping events from the same queue.
pub struct NatsConsumer {
    consumer: PullConsumer,
    batch_size: usize,
    max_wait: Duration,
    handler: MessageHandler,
}

impl NatsConsumer {
    pub async fn new(
        jetstream: &jetstream::Context,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        handler: MessageHandler,
    ) -> Result<Self> {
        debug!(
            stream = stream_name,
            consumer = consumer_name,
            subject = subject_filter,
            "Creating JetStream consumer"
        );

        let consumer = jetstream
            .create_consumer_on_stream(
                jetstream::consumer::pull::Config {
                    name: Some(consumer_name.to_string()),
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: subject_filter.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
                stream_name,
            )
            .await
            .context("Failed to create consumer")?;

        info!(
            stream = stream_name,
            consumer = consumer_name,
            "Consumer created successfully"
        );

        Ok(Self {
            consumer,
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            handler,
        })
    }

    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        info!("Starting consumer loop");

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Received shutdown signal, stopping consumer");
                    break;
                }
                result = self.fetch_and_process() => {
                    if let Err(e) = result {
                        error!(error = %e, "Error processing fetched messages");
                        // Keep consuming despite errors.
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("Consumer stopped gracefully");
        Ok(())
    }

    async fn fetch_and_process(&self) -> Result<()> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(self.batch_size)
            .expires(self.max_wait)
            .messages()
            .await
            .context("Failed to fetch messages")?;

        while let Some(result) = messages.next().await {
            let msg = match result {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "Error receiving message from fetch");
                    continue;
                }
            };

            let subject = msg.subject.to_string();
            match (self.handler)(msg.payload.clone(), subject.clone()).await {
                Ok(()) => {
                    if let Err(e) = msg.ack().await {
                        error!(error = %e, subject = %subject, "Failed to acknowledge message");
                    }
                }
                Err(e) => {
                    error!(
                        error = %e,
                        subject = %subject,
                        "Rejecting message due to processing error"
                    );
                    if let Err(e) = msg.ack_with(AckKind::Nak(None)).await {
                        error!(error = %e, subject = %subject, "Failed to reject message");
                    }
                }
            }
        }

        Ok(())
    }
}
