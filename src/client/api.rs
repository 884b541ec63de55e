use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::warn;
use crate::errors::{ClientError, ClientResult};
use crate::models::{
    Credentials, DataResponse, ErrorResponse, LoginResponse, MessageResponse, OvertimeData,
};

/// Thin wrapper over the four API endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, credentials: &Credentials) -> ClientResult<String> {
        let response = self
            .http
            .post(self.url("/api/register"))
            .json(credentials)
            .send()
            .await?;
        let body: MessageResponse = parse(response).await?;
        Ok(body.message)
    }

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(credentials)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn fetch_data(&self, token: &str) -> ClientResult<OvertimeData> {
        let response = self
            .http
            .get(self.url("/api/data"))
            .bearer_auth(token)
            .send()
            .await?;
        // The server stores any object verbatim, so decode what is usable.
        let body: DataResponse<serde_json::Value> = parse(response).await?;
        let (data, skipped) = OvertimeData::from_value_lossy(body.data);
        if skipped > 0 {
            warn!("ignored {skipped} malformed entries in remote data");
        }
        Ok(data)
    }

    pub async fn save_data(&self, token: &str, data: &OvertimeData) -> ClientResult<()> {
        let response = self
            .http
            .post(self.url("/api/data"))
            .bearer_auth(token)
            .json(data)
            .send()
            .await?;
        let _: MessageResponse = parse(response).await?;
        Ok(())
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    // Fall back to the status text when the body is not an API error.
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
    };
    Err(ClientError::Api { status: status.as_u16(), message })
}
