use crate::domain::{DeviceEventHook, DispatchService, DomainError};
use common::nats::MessageHandler;
use std::sync::Arc;
use tracing::{debug, error};

/// Create a MessageHandler for hook-triggered device events.
pub fn create_device_event_handler(service: Arc<DispatchService>) -> MessageHandler {
    Box::new(move |payload: bytes::Bytes, subject: String| {
        let service = Arc::clone(&service);

        Box::pin(async move {
            let event: DeviceEventHook = serde_json::from_slice(&payload).map_err(|e| {
                error!(
                    error = %e,
                    subject = %subject,
                    "failed to decode device event message"
                );
                DomainError::InvalidMessage(e.to_string())
            })?;

            service.dispatch_device_event(event).await?;

            debug!(subject = %subject, status = "success", "processed device event");
            Ok(())
        })
    })
}
