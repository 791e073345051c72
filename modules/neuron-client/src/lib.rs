pub mod error;
pub mod types;

pub use error::{NeuronError, Result};
pub use types::{
    ContentRequest, ContentResponse, GetQueryRequest, NewQueryRequest, NewQueryResponse,
    Project, QueryResponse, QueryTermsWire, TermWire,
};

use serde::de::DeserializeOwned;
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://app.neuronwriter.com/neuron-api/0.5/writer";

pub struct NeuronClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NeuronClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client, e.g. one built with a request timeout.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NeuronError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Create a new query. The engine needs around a minute before results are ready.
    pub async fn new_query(&self, request: &NewQueryRequest) -> Result<NewQueryResponse> {
        tracing::info!(
            keyword = %request.keyword,
            engine = %request.engine,
            language = %request.language,
            "Creating Neuron query"
        );
        let resp: NewQueryResponse = self.post("/new-query", request).await?;
        tracing::info!(query_id = %resp.query, "Neuron query created");
        Ok(resp)
    }

    /// Fetch the current state of a query. Terms are present once status is `ready`.
    pub async fn get_query(&self, query_id: &str) -> Result<QueryResponse> {
        let body = GetQueryRequest {
            query: query_id.to_string(),
        };
        let resp: QueryResponse = self.post("/get-query", &body).await?;
        tracing::debug!(query_id, status = %resp.status, "Neuron query polled");
        Ok(resp)
    }

    /// Score content against a query without storing it.
    pub async fn evaluate_content(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let resp: ContentResponse = self.post("/evaluate-content", request).await?;
        check_content_status(&resp)?;
        tracing::debug!(query_id = %request.query, score = ?resp.content_score, "Content evaluated");
        Ok(resp)
    }

    /// Score content and store it as the query's current content.
    pub async fn import_content(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let resp: ContentResponse = self.post("/import-content", request).await?;
        check_content_status(&resp)?;
        tracing::debug!(query_id = %request.query, score = ?resp.content_score, "Content imported");
        Ok(resp)
    }

    /// List the projects visible to this API key.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.post("/list-projects", &serde_json::json!({})).await
    }
}

fn check_content_status(resp: &ContentResponse) -> Result<()> {
    if !resp.is_ok() {
        return Err(NeuronError::Rejected(
            resp.message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }
    if resp.content_score.is_none() {
        return Err(NeuronError::Parse("response has no content_score".to_string()));
    }
    Ok(())
}
