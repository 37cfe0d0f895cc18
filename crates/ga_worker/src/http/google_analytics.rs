use crate::domain::{AnalyticsHit, HitSender, SendError};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;

/// Measurement Protocol client for the analytics collection endpoint.
///
/// One hit maps to one `POST {base_url}/collect` with the event parameters
/// in the query string. No retries, no batching: hit delivery policy lives
/// in the dispatcher.
pub struct GoogleAnalyticsHttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl GoogleAnalyticsHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build analytics HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn collect_url(&self) -> String {
        format!("{}/collect", self.base_url)
    }
}

/// Measurement Protocol query parameters for one hit. The version custom
/// dimension (`pr1cd1`) is only present on the simple device event shape.
fn hit_params(hit: &AnalyticsHit) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("v", "1".to_string()),
        ("t", "event".to_string()),
        ("ec", hit.key.clone()),
        ("ea", hit.value.clone()),
        ("uid", hit.unit_id.clone()),
        ("cid", hit.unit_id.clone()),
        ("tid", hit.tracking_id.clone()),
        ("ua", hit.user_agent.clone()),
        ("qt", "0".to_string()),
        ("uip", hit.ip_address.clone()),
    ];
    if let Some(version_id) = &hit.version_id {
        params.push(("pr1cd1", version_id.clone()));
    }
    params
}

#[async_trait]
impl HitSender for GoogleAnalyticsHttpClient {
    async fn send_hit(&self, hit: &AnalyticsHit) -> Result<(), SendError> {
        let response = self
            .client
            .post(self.collect_url())
            .query(&hit_params(hit))
            .send()
            .await
            .map_err(|e| SendError(anyhow::Error::new(e).context("collection request failed")))?;

        response
            .error_for_status()
            .map_err(|e| SendError(anyhow::Error::new(e).context("collection endpoint rejected hit")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(version_id: Option<&str>) -> AnalyticsHit {
        AnalyticsHit {
            tracking_id: "UA-12345678-12".to_string(),
            user_agent: "sdk/1.2".to_string(),
            unit_id: "unit-123".to_string(),
            version_id: version_id.map(str::to_string),
            key: "battery.level".to_string(),
            value: "50".to_string(),
            ip_address: "192.0.2.7".to_string(),
        }
    }

    #[test]
    fn test_collect_url_trims_trailing_slash() {
        let client =
            GoogleAnalyticsHttpClient::new("http://ga.example.com/", Duration::from_secs(5))
                .unwrap();

        assert_eq!(client.collect_url(), "http://ga.example.com/collect");
    }

    #[test]
    fn test_hit_params_carry_event_and_metadata() {
        let params = hit_params(&hit(Some("v42")));

        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("v"), Some("1"));
        assert_eq!(get("t"), Some("event"));
        assert_eq!(get("ec"), Some("battery.level"));
        assert_eq!(get("ea"), Some("50"));
        assert_eq!(get("uid"), Some("unit-123"));
        assert_eq!(get("cid"), Some("unit-123"));
        assert_eq!(get("tid"), Some("UA-12345678-12"));
        assert_eq!(get("uip"), Some("192.0.2.7"));
        assert_eq!(get("pr1cd1"), Some("v42"));
    }

    #[test]
    fn test_hit_params_omit_version_dimension_when_absent() {
        let params = hit_params(&hit(None));

        assert!(params.iter().all(|(k, _)| *k != "pr1cd1"));
    }
}
