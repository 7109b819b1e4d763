//! HTTP client for the backend method endpoint.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::persistence::{Persistence, RemoteError};
use crate::activity::{ActivityItem, ActivityPatch};

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

impl From<header::InvalidHeaderValue> for RemoteError {
    fn from(err: header::InvalidHeaderValue) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// Calls `POST {base_url}/api/methods/{name}` with `{"params": [...]}`.
pub struct HttpPersistence {
    client: Client,
    base_url: String,
}

impl HttpPersistence {
    /// Creates a client with the given base URL and auth token.
    pub fn new(base_url: &str, token: &str) -> Result<Self, RemoteError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<reqwest::Response, RemoteError> {
        let url = format!("{}/api/methods/{}", self.base_url, method);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "params": params }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected { status, message });
        }
        Ok(resp)
    }

    async fn call_unit(&self, method: &str, params: Value) -> Result<(), RemoteError> {
        self.call(method, params).await.map(|_| ())
    }

    async fn call_json<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RemoteError> {
        let resp = self.call(method, params).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Persistence for HttpPersistence {
    async fn update_rules(&self, project_id: &str, story_id: &str, rules: &Value) -> Result<(), RemoteError> {
        self.call_unit("stories.updateRules", json!([project_id, story_id, rules]))
            .await
    }

    async fn delete_rules(&self, project_id: &str, story_id: &str) -> Result<(), RemoteError> {
        self.call_unit("stories.deleteRules", json!([project_id, story_id]))
            .await
    }

    async fn insert_examples(&self, model_id: &str, examples: &[ActivityItem]) -> Result<(), RemoteError> {
        self.call_unit("nlu.insertExamples", json!([model_id, examples]))
            .await
    }

    async fn upsert_activity(&self, model_id: &str, patches: &[ActivityPatch]) -> Result<(), RemoteError> {
        self.call_unit("activity.upsert", json!([model_id, patches]))
            .await
    }

    async fn delete_activity(&self, model_id: &str, ids: &[String]) -> Result<(), RemoteError> {
        self.call_unit("activity.delete", json!([model_id, ids]))
            .await
    }

    async fn reinterpret(
        &self,
        model_id: &str,
        lang: &str,
        items: &[ActivityItem],
    ) -> Result<Vec<ActivityItem>, RemoteError> {
        self.call_json("activity.reinterpret", json!([model_id, lang, items]))
            .await
    }
}
