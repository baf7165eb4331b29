use log::debug;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the Nature Remo cloud API
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Unexpected status {0}: {1}")]
    UnexpectedStatus(u16, String),
}

/// Minimal client for the Nature Remo cloud API, bearer token auth.
pub struct RemoClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl RemoClient {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        return Ok(RemoClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        });
    }

    /// Fetch the raw appliances JSON. The response body is handed back
    /// untouched, the parsing lives with the extractor.
    pub async fn get_appliances(&self) -> Result<String, FetchError> {
        let url = format!("{}/appliances", self.base_url);
        debug!("Fetching {url}");

        let response = self.client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::UnexpectedStatus(status.as_u16(), body));
        }

        return Ok(response.text().await?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_get_appliances_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/appliances")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"smart_meter":{"echonetlite_properties":[]}}]"#)
            .create_async()
            .await;

        let client = RemoClient::new(&server.url(), "test-token").unwrap();
        let body = client.get_appliances().await.unwrap();
        assert!(body.contains("smart_meter"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_appliances_unauthorized() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/appliances")
            .with_status(401)
            .with_body(r#"{"code":401,"message":"Unauthorized"}"#)
            .create_async()
            .await;

        let client = RemoClient::new(&server.url(), "wrong-token").unwrap();
        let result = client.get_appliances().await;
        assert!(matches!(result, Err(FetchError::UnexpectedStatus(401, _))));
        mock.assert_async().await;
    }
}
