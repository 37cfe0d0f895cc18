use crate::domain::{DeviceInfo, DispatchService, DomainError};
use common::nats::MessageHandler;
use std::sync::Arc;
use tracing::{debug, error};

/// Create a MessageHandler for simple device reports: decode the JSON
/// payload and dispatch through the domain service. A decode or lookup
/// failure naks the message; redelivery policy belongs to the transport.
pub fn create_device_report_handler(service: Arc<DispatchService>) -> MessageHandler {
    Box::new(move |payload: bytes::Bytes, subject: String| {
        let service = Arc::clone(&service);

        Box::pin(async move {
            let info: DeviceInfo = serde_json::from_slice(&payload).map_err(|e| {
                error!(
                    error = %e,
                    subject = %subject,
                    "failed to decode device report message"
                );
                DomainError::InvalidMessage(e.to_string())
            })?;

            service.dispatch_device_info(info).await?;

            debug!(subject = %subject, status = "success", "processed device report");
            Ok(())
        })
    })
}

// Note: unit tests for the handlers would need real NATS messages; the
// decode-and-dispatch path is covered by the dispatch integration test.
