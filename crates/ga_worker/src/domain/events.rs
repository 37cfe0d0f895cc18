use crate::domain::custom_data::CustomData;
use serde::Deserialize;

/// Simple device event, keyed by user id. The tracking id for this shape is
/// resolved through the user-lookup collaborator.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub unit_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub segment_id: Option<String>,
    pub version_id: String,
    #[serde(default)]
    pub reception_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "deviceIP", default)]
    pub device_ip: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub additional_properties: CustomData,
}

/// Event-embedded record carrying the analytics tracking id, used when the
/// id need not be looked up externally.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub ga_tracking_id: String,
    #[serde(default)]
    pub name: String,
}

/// A software package reference/version pair resolved for a device.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    pub reference: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub unit_id: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub custom_client_data: CustomData,
    #[serde(default)]
    pub packages: Vec<PackageRef>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    pub request: DeviceRequest,
}

/// Hook-triggered device event: one custom-data tree and one package list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEventHook {
    pub hook: Hook,
    pub device_event: DeviceEvent,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceChangeEvent {
    pub old_request: DeviceRequest,
    pub new_request: DeviceRequest,
}

/// Device-change event: pre-change and post-change requests, each flattened
/// and dispatched independently.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceChangeEventHook {
    pub hook: Hook,
    pub device_change_event: DeviceChangeEvent,
}
