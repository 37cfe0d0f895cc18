use crate::domain::{DeviceChangeEventHook, DispatchService, DomainError};
use common::nats::MessageHandler;
use std::sync::Arc;
use tracing::{debug, error};

/// Create a MessageHandler for device-change events.
pub fn create_device_change_handler(service: Arc<DispatchService>) -> MessageHandler {
    Box::new(move |payload: bytes::Bytes, subject: String| {
        let service = Arc::clone(&service);

        Box::pin(async move {
            let event: DeviceChangeEventHook = serde_json::from_slice(&payload).map_err(|e| {
                error!(
                    error = %e,
                    subject = %subject,
                    "failed to decode device change event message"
                );
                DomainError::InvalidMessage(e.to_string())
            })?;

            service.dispatch_device_change_event(event).await?;

            debug!(subject = %subject, status = "success", "processed device change event");
            Ok(())
        })
    })
}
