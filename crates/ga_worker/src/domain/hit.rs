use crate::domain::error::{LookupError, SendError};
use async_trait::async_trait;
use serde::Deserialize;

/// One outbound analytics call: a single key/value fact plus the device
/// metadata shared by every hit of the same event. `version_id` is only
/// carried by the simple device event shape; the hook family conveys
/// versions through package hits instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsHit {
    pub tracking_id: String,
    pub user_agent: String,
    pub unit_id: String,
    pub version_id: Option<String>,
    pub key: String,
    pub value: String,
    pub ip_address: String,
}

/// User record returned by the user-lookup collaborator.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub ga_tracking_id: Option<String>,
}

/// Maps a user id to an analytics tracking id.
///
/// A remote error status is a `LookupError` and aborts the enclosing
/// simple-device-event dispatch; an existing user without a tracking id is
/// not an error.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user_by_id(&self, user_id: &str) -> Result<User, LookupError>;
}

/// Delivers one analytics hit to the collection endpoint.
///
/// Every `SendError` is recoverable at the call site: the dispatcher logs it
/// and moves on to the next hit.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait HitSender: Send + Sync {
    async fn send_hit(&self, hit: &AnalyticsHit) -> Result<(), SendError>;
}
