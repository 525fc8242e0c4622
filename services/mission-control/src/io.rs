//! HTTP client abstraction for testability

use async_trait::async_trait;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request with extra headers
    async fn get(&self, url: &str, headers: &[(String, String)]) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse>;

    /// Send a PATCH request with a JSON body
    async fn patch_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn send(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
        url: &str,
        headers: &[(String, String)],
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("{} {}", method, url);
        let request = headers
            .iter()
            .fold(request, |req, (name, value)| req.header(name, value));
        let response = request.send().await.map_err(|e| {
            crate::MissionControlError::Http(format!("{} {} failed: {}", method, url, e))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            crate::MissionControlError::Http(format!("Reading response body: {}", e))
        })?;

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> crate::Result<HttpResponse> {
        self.send("GET", self.client.get(url), url, headers).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse> {
        self.send("POST", self.client.post(url).json(body), url, headers)
            .await
    }

    async fn patch_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse> {
        self.send("PATCH", self.client.patch(url).json(body), url, headers)
            .await
    }
}
