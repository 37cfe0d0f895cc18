use crate::domain::{LookupError, User, UserLookup};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;

/// HTTP client for the authorization service's user endpoint, used to map a
/// user id to an analytics tracking id.
pub struct AuthorizationServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl AuthorizationServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build authorization HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl UserLookup for AuthorizationServiceClient {
    async fn get_user_by_id(&self, user_id: &str) -> Result<User, LookupError> {
        let response = self
            .client
            .get(self.user_url(user_id))
            .send()
            .await
            .map_err(|e| LookupError(anyhow::Error::new(e).context("user lookup request failed")))?
            .error_for_status()
            .map_err(|e| {
                LookupError(anyhow::Error::new(e).context("authorization service returned an error status"))
            })?;

        let user = response
            .json::<User>()
            .await
            .map_err(|e| LookupError(anyhow::Error::new(e).context("invalid user response body")))?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_url_joins_base_and_id() {
        let client =
            AuthorizationServiceClient::new("http://auth.example.com/", Duration::from_secs(5))
                .unwrap();

        assert_eq!(
            client.user_url("user-456"),
            "http://auth.example.com/users/user-456"
        );
    }
}
