use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::{ChatRequest, SuggestRequest, SuggestResponse, Turn};
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

#[cfg(test)]
pub trait MockSuggestProducer: Send + Sync {
    fn suggest(&self, request: &SuggestRequest) -> Result<Vec<String>>;
}

/// Client for the streaming chat endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: "http://localhost:3000/api/search".to_string(),
            api_key: None,
            mock_stream_producer: Some(producer),
        }
    }

    pub async fn create_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(request);
            }
        }

        let payload = serde_json::to_value(request)?;
        if debug_payload_enabled() {
            emit_debug_payload(&self.api_url, &payload);
        }

        let mut http_request = self
            .http
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(&payload);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("authorization", format!("Bearer {api_key}"));
        }

        let response = http_request
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &self.api_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &self.api_url))?;

        let request_url = self.api_url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_api_request_error(error, &request_url)));
        Ok(Box::pin(stream))
    }
}

/// Client for the follow-up question endpoint.
#[derive(Clone)]
pub struct SuggestClient {
    http: reqwest::Client,
    suggest_url: String,
    api_key: Option<String>,
    #[cfg(test)]
    mock_suggest_producer: Option<Arc<dyn MockSuggestProducer>>,
}

impl SuggestClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            suggest_url: config.suggest_url.clone(),
            api_key: config.api_key.clone(),
            #[cfg(test)]
            mock_suggest_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(producer: Arc<dyn MockSuggestProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            suggest_url: "http://localhost:3000/api/suggest".to_string(),
            api_key: None,
            mock_suggest_producer: Some(producer),
        }
    }

    /// Requests follow-up questions for a completed (user, assistant) pair.
    pub async fn suggest(&self, previous: &[Turn]) -> Result<Vec<String>> {
        let request = SuggestRequest {
            messages: previous.to_vec(),
        };

        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_suggest_producer {
                return producer.suggest(&request);
            }
        }

        let mut http_request = self
            .http
            .post(&self.suggest_url)
            .header("content-type", "application/json")
            .json(&request);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("authorization", format!("Bearer {api_key}"));
        }

        let response: SuggestResponse = http_request
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &self.suggest_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &self.suggest_url))?
            .json()
            .await
            .map_err(|error| map_api_request_error(error, &self.suggest_url))?;

        Ok(response.questions)
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local endpoint '{}': {}. Start your local server or update QUILL_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach endpoint '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!("endpoint '{}' returned HTTP {}: {}", request_url, status, error);
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
