use crate::domain::custom_data::flatten;
use crate::domain::error::DomainResult;
use crate::domain::events::{DeviceChangeEventHook, DeviceEventHook, DeviceInfo, DeviceRequest, Hook};
use crate::domain::hit::{AnalyticsHit, HitSender, UserLookup};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Domain service that turns one inbound device event into a sequence of
/// independent analytics hits.
///
/// Flow per event:
/// 1. Determine the tracking id (user lookup for the simple shape, embedded
///    hook otherwise)
/// 2. Flatten the event's custom-data tree(s) into dot-qualified pairs
/// 3. Send one hit per pair and one hit per package reference/version
///
/// Every per-hit failure is logged and swallowed; only the tracking-id
/// lookup may abort a dispatch.
pub struct DispatchService {
    user_lookup: Arc<dyn UserLookup>,
    hit_sender: Arc<dyn HitSender>,
}

impl DispatchService {
    pub fn new(user_lookup: Arc<dyn UserLookup>, hit_sender: Arc<dyn HitSender>) -> Self {
        Self {
            user_lookup,
            hit_sender,
        }
    }

    /// Dispatch a simple device event. The tracking id is resolved through
    /// the user-lookup collaborator; a user without one drops the event
    /// silently, a lookup failure aborts the dispatch.
    #[instrument(skip(self, info), fields(unit_id = %info.unit_id, user_id = %info.user_id))]
    pub async fn dispatch_device_info(&self, info: DeviceInfo) -> DomainResult<()> {
        let user = self.user_lookup.get_user_by_id(&info.user_id).await?;

        let tracking_id = match user.ga_tracking_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                debug!(user_id = %info.user_id, "user has no tracking id, dropping event");
                return Ok(());
            }
        };

        let pairs = flatten(&info.additional_properties, &[]);
        debug!(hit_count = pairs.len(), "flattened custom client data");

        for pair in pairs {
            self.try_send(AnalyticsHit {
                tracking_id: tracking_id.clone(),
                user_agent: info.user_agent.clone(),
                unit_id: info.unit_id.clone(),
                version_id: Some(info.version_id.clone()),
                key: pair.key,
                value: pair.value,
                ip_address: info.device_ip.clone(),
            })
            .await;
        }

        Ok(())
    }

    /// Dispatch a hook-triggered device event: the tracking id comes from
    /// the embedded hook, so no lookup occurs.
    #[instrument(skip(self, event), fields(unit_id = %event.device_event.request.unit_id, hook = %event.hook.name))]
    pub async fn dispatch_device_event(&self, event: DeviceEventHook) -> DomainResult<()> {
        let request = &event.device_event.request;
        self.send_custom_data_hits(&event.hook, request).await;
        self.send_package_hits(&event.hook, request).await;
        Ok(())
    }

    /// Dispatch a device-change event: both the pre-change and post-change
    /// requests are flattened independently with an empty prefix, then both
    /// package lists are sent.
    #[instrument(skip(self, event), fields(unit_id = %event.device_change_event.old_request.unit_id, hook = %event.hook.name))]
    pub async fn dispatch_device_change_event(
        &self,
        event: DeviceChangeEventHook,
    ) -> DomainResult<()> {
        let change = &event.device_change_event;
        self.send_custom_data_hits(&event.hook, &change.old_request).await;
        self.send_custom_data_hits(&event.hook, &change.new_request).await;
        self.send_package_hits(&event.hook, &change.old_request).await;
        self.send_package_hits(&event.hook, &change.new_request).await;
        Ok(())
    }

    async fn send_custom_data_hits(&self, hook: &Hook, request: &DeviceRequest) {
        // An empty tree on the hook shapes carries no facts; packages are
        // the only hits such an event produces.
        if request.custom_client_data.is_empty() {
            debug!("no custom client data on request");
            return;
        }

        for pair in flatten(&request.custom_client_data, &[]) {
            self.try_send(AnalyticsHit {
                tracking_id: hook.ga_tracking_id.clone(),
                user_agent: request.user_agent.clone(),
                unit_id: request.unit_id.clone(),
                version_id: None,
                key: pair.key,
                value: pair.value,
                ip_address: request.ip_address.clone(),
            })
            .await;
        }
    }

    async fn send_package_hits(&self, hook: &Hook, request: &DeviceRequest) {
        for package in &request.packages {
            let Some(version) = &package.version else {
                warn!(
                    reference = %package.reference,
                    "package has no resolved version, skipping hit"
                );
                continue;
            };

            self.try_send(AnalyticsHit {
                tracking_id: hook.ga_tracking_id.clone(),
                user_agent: request.user_agent.clone(),
                unit_id: request.unit_id.clone(),
                version_id: None,
                key: package.reference.clone(),
                value: version.clone(),
                ip_address: request.ip_address.clone(),
            })
            .await;
        }
    }

    async fn try_send(&self, hit: AnalyticsHit) {
        if let Err(e) = self.hit_sender.send_hit(&hit).await {
            error!(
                error = %e,
                key = %hit.key,
                value = %hit.value,
                "failed to send analytics hit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{LookupError, SendError};
    use crate::domain::events::{DeviceChangeEvent, DeviceEvent, PackageRef};
    use crate::domain::hit::{MockHitSender, MockUserLookup, User};
    use serde_json::json;
    use std::sync::Mutex;

    fn custom_data(value: serde_json::Value) -> crate::domain::CustomData {
        value.as_object().expect("test tree must be an object").clone()
    }

    fn device_info(tree: serde_json::Value) -> DeviceInfo {
        DeviceInfo {
            unit_id: "unit-123".to_string(),
            user_id: "user-456".to_string(),
            segment_id: None,
            version_id: "v42".to_string(),
            reception_date: None,
            device_ip: "192.0.2.7".to_string(),
            user_agent: "sdk/1.2".to_string(),
            additional_properties: custom_data(tree),
        }
    }

    fn device_request(tree: serde_json::Value, packages: Vec<PackageRef>) -> DeviceRequest {
        DeviceRequest {
            user_id: None,
            unit_id: "unit-123".to_string(),
            ip_address: "192.0.2.7".to_string(),
            user_agent: "sdk/1.2".to_string(),
            custom_client_data: custom_data(tree),
            packages,
        }
    }

    fn hook() -> Hook {
        Hook {
            ga_tracking_id: "UA-12345678-12".to_string(),
            name: "test hook".to_string(),
        }
    }

    fn package(reference: &str, version: Option<&str>) -> PackageRef {
        PackageRef {
            reference: reference.to_string(),
            version: version.map(str::to_string),
        }
    }

    /// Sender mock that records every hit it sees and fails the ones whose
    /// key is listed in `fail_keys`.
    fn recording_sender(
        fail_keys: &[&str],
    ) -> (MockHitSender, std::sync::Arc<Mutex<Vec<AnalyticsHit>>>) {
        let sent = std::sync::Arc::new(Mutex::new(Vec::new()));
        let fail_keys: Vec<String> = fail_keys.iter().map(|k| k.to_string()).collect();

        let mut mock_sender = MockHitSender::new();
        let sent_clone = sent.clone();
        mock_sender.expect_send_hit().returning(move |hit| {
            sent_clone.lock().unwrap().push(hit.clone());
            if fail_keys.contains(&hit.key) {
                Err(SendError(anyhow::anyhow!("collection endpoint returned 500")))
            } else {
                Ok(())
            }
        });

        (mock_sender, sent)
    }

    #[tokio::test]
    async fn test_dispatch_device_info_sends_one_hit_per_leaf() {
        // Arrange
        let mut mock_lookup = MockUserLookup::new();
        mock_lookup
            .expect_get_user_by_id()
            .withf(|id| id == "user-456")
            .times(1)
            .return_once(|_| {
                Ok(User {
                    ga_tracking_id: Some("UA-12345678-12".to_string()),
                })
            });

        let (mock_sender, sent) = recording_sender(&[]);

        let service = DispatchService::new(Arc::new(mock_lookup), Arc::new(mock_sender));
        let info = device_info(json!({
            "battery": { "level": "50", "damaged": "false" },
            "what": "this"
        }));

        // Act
        let result = service.dispatch_device_info(info).await;

        // Assert
        assert!(result.is_ok());
        let sent = sent.lock().unwrap();
        let keys: Vec<(&str, &str)> = sent
            .iter()
            .map(|h| (h.key.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("battery.level", "50"),
                ("battery.damaged", "false"),
                ("what", "this"),
            ]
        );
        for hit in sent.iter() {
            assert_eq!(hit.tracking_id, "UA-12345678-12");
            assert_eq!(hit.unit_id, "unit-123");
            assert_eq!(hit.version_id.as_deref(), Some("v42"));
            assert_eq!(hit.ip_address, "192.0.2.7");
            assert_eq!(hit.user_agent, "sdk/1.2");
        }
    }

    #[tokio::test]
    async fn test_dispatch_device_info_empty_tree_sends_single_empty_hit() {
        // Arrange
        let mut mock_lookup = MockUserLookup::new();
        mock_lookup
            .expect_get_user_by_id()
            .times(1)
            .return_once(|_| {
                Ok(User {
                    ga_tracking_id: Some("UA-12345678-12".to_string()),
                })
            });

        let (mock_sender, sent) = recording_sender(&[]);

        let service = DispatchService::new(Arc::new(mock_lookup), Arc::new(mock_sender));

        // Act
        let result = service.dispatch_device_info(device_info(json!({}))).await;

        // Assert
        assert!(result.is_ok());
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, "");
        assert_eq!(sent[0].value, "");
        assert_eq!(sent[0].version_id.as_deref(), Some("v42"));
    }

    #[tokio::test]
    async fn test_dispatch_device_info_without_tracking_id_sends_nothing() {
        // Arrange
        let mut mock_lookup = MockUserLookup::new();
        mock_lookup
            .expect_get_user_by_id()
            .times(1)
            .return_once(|_| Ok(User { ga_tracking_id: None }));

        // No expectations: any send would panic the mock
        let mock_sender = MockHitSender::new();

        let service = DispatchService::new(Arc::new(mock_lookup), Arc::new(mock_sender));

        // Act
        let result = service
            .dispatch_device_info(device_info(json!({ "what": "this" })))
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_device_info_blank_tracking_id_sends_nothing() {
        // Arrange
        let mut mock_lookup = MockUserLookup::new();
        mock_lookup
            .expect_get_user_by_id()
            .times(1)
            .return_once(|_| {
                Ok(User {
                    ga_tracking_id: Some("   ".to_string()),
                })
            });

        let mock_sender = MockHitSender::new();

        let service = DispatchService::new(Arc::new(mock_lookup), Arc::new(mock_sender));

        // Act
        let result = service
            .dispatch_device_info(device_info(json!({ "what": "this" })))
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_device_info_lookup_failure_propagates() {
        // Arrange
        let mut mock_lookup = MockUserLookup::new();
        mock_lookup
            .expect_get_user_by_id()
            .times(1)
            .return_once(|_| Err(LookupError(anyhow::anyhow!("authorization service returned 503"))));

        let mock_sender = MockHitSender::new();

        let service = DispatchService::new(Arc::new(mock_lookup), Arc::new(mock_sender));

        // Act
        let result = service
            .dispatch_device_info(device_info(json!({ "what": "this" })))
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(crate::domain::DomainError::UserLookup(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_device_info_send_failure_does_not_stop_remaining() {
        // Arrange
        let mut mock_lookup = MockUserLookup::new();
        mock_lookup
            .expect_get_user_by_id()
            .times(1)
            .return_once(|_| {
                Ok(User {
                    ga_tracking_id: Some("UA-12345678-12".to_string()),
                })
            });

        let (mock_sender, sent) = recording_sender(&["battery.damaged"]);

        let service = DispatchService::new(Arc::new(mock_lookup), Arc::new(mock_sender));
        let info = device_info(json!({
            "battery": { "level": "50", "damaged": "false" },
            "what": "this"
        }));

        // Act
        let result = service.dispatch_device_info(info).await;

        // Assert - the failing hit is swallowed and the rest are attempted
        assert!(result.is_ok());
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_device_event_sends_custom_data_and_packages() {
        // Arrange
        let (mock_sender, sent) = recording_sender(&[]);
        let service = DispatchService::new(Arc::new(MockUserLookup::new()), Arc::new(mock_sender));

        let event = DeviceEventHook {
            hook: hook(),
            device_event: DeviceEvent {
                request: device_request(
                    json!({ "battery": { "level": "50" } }),
                    vec![
                        package("io.example.app", Some("1.0.0")),
                        package("io.example.firmware", Some("0.0.2")),
                    ],
                ),
            },
        };

        // Act
        let result = service.dispatch_device_event(event).await;

        // Assert
        assert!(result.is_ok());
        let sent = sent.lock().unwrap();
        let keys: Vec<(&str, &str)> = sent
            .iter()
            .map(|h| (h.key.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("battery.level", "50"),
                ("io.example.app", "1.0.0"),
                ("io.example.firmware", "0.0.2"),
            ]
        );
        // The hook hit shape has no version slot
        assert!(sent.iter().all(|h| h.version_id.is_none()));
        assert!(sent.iter().all(|h| h.tracking_id == "UA-12345678-12"));
    }

    #[tokio::test]
    async fn test_dispatch_device_event_empty_custom_data_sends_packages_only() {
        // Arrange
        let (mock_sender, sent) = recording_sender(&[]);
        let service = DispatchService::new(Arc::new(MockUserLookup::new()), Arc::new(mock_sender));

        let event = DeviceEventHook {
            hook: hook(),
            device_event: DeviceEvent {
                request: device_request(
                    json!({}),
                    vec![package("A", Some("1.0")), package("B", Some("2.0"))],
                ),
            },
        };

        // Act
        let result = service.dispatch_device_event(event).await;

        // Assert
        assert!(result.is_ok());
        let sent = sent.lock().unwrap();
        let keys: Vec<(&str, &str)> = sent
            .iter()
            .map(|h| (h.key.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(keys, vec![("A", "1.0"), ("B", "2.0")]);
    }

    #[tokio::test]
    async fn test_dispatch_device_event_skips_package_without_version() {
        // Arrange
        let (mock_sender, sent) = recording_sender(&[]);
        let service = DispatchService::new(Arc::new(MockUserLookup::new()), Arc::new(mock_sender));

        let event = DeviceEventHook {
            hook: hook(),
            device_event: DeviceEvent {
                request: device_request(
                    json!({}),
                    vec![package("unresolved", None), package("resolved", Some("2.0"))],
                ),
            },
        };

        // Act
        let result = service.dispatch_device_event(event).await;

        // Assert
        assert!(result.is_ok());
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, "resolved");
    }

    #[tokio::test]
    async fn test_dispatch_device_change_event_covers_both_requests_in_order() {
        // Arrange
        let (mock_sender, sent) = recording_sender(&[]);
        let service = DispatchService::new(Arc::new(MockUserLookup::new()), Arc::new(mock_sender));

        let event = DeviceChangeEventHook {
            hook: hook(),
            device_change_event: DeviceChangeEvent {
                old_request: device_request(
                    json!({ "previous": { "state": "idle" } }),
                    vec![package("pkg", Some("1.0"))],
                ),
                new_request: device_request(
                    json!({ "current": { "state": "active" } }),
                    vec![package("pkg", Some("2.0"))],
                ),
            },
        };

        // Act
        let result = service.dispatch_device_change_event(event).await;

        // Assert - old tree, new tree, old packages, new packages
        assert!(result.is_ok());
        let sent = sent.lock().unwrap();
        let keys: Vec<(&str, &str)> = sent
            .iter()
            .map(|h| (h.key.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("previous.state", "idle"),
                ("current.state", "active"),
                ("pkg", "1.0"),
                ("pkg", "2.0"),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_device_change_event_send_failure_isolated() {
        // Arrange - the first hit of four fails
        let (mock_sender, sent) = recording_sender(&["previous.state"]);
        let service = DispatchService::new(Arc::new(MockUserLookup::new()), Arc::new(mock_sender));

        let event = DeviceChangeEventHook {
            hook: hook(),
            device_change_event: DeviceChangeEvent {
                old_request: device_request(
                    json!({ "previous": { "state": "idle" } }),
                    vec![package("pkg", Some("1.0"))],
                ),
                new_request: device_request(
                    json!({ "current": { "state": "active" } }),
                    vec![package("pkg", Some("2.0"))],
                ),
            },
        };

        // Act
        let result = service.dispatch_device_change_event(event).await;

        // Assert - all four hits attempted, event completes without error
        assert!(result.is_ok());
        assert_eq!(sent.lock().unwrap().len(), 4);
    }
}
