//! Assistant Service Client
//!
//! [`LightspeedApi`] is the seam between the chat controller and the network.
//! [`LightspeedClient`] implements it over HTTP with reqwest; tests substitute
//! their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::{ConversationResponse, Model, ModelsResponse, QueryRequest, QueryResponse};
use crate::config::ApiConfig;
use crate::stream::{event_stream, StreamEvent};

/// Ordered events of one streaming response
pub type EventStream = BoxStream<'static, Result<StreamEvent, ApiError>>;

const MODELS_ENDPOINT: &str = "/v1/models";
const QUERY_ENDPOINT: &str = "/v1/query";
const STREAMING_QUERY_ENDPOINT: &str = "/v1/streaming_query";
const CONVERSATIONS_ENDPOINT: &str = "/v1/conversations";

/// Operations offered by the assistant service
#[async_trait]
pub trait LightspeedApi: Send + Sync {
    /// Base URL of the service (for diagnostics)
    fn base_url(&self) -> &str;

    /// Check whether the service is reachable
    async fn health_check(&self) -> bool;

    /// `GET /v1/models`
    async fn list_models(&self) -> Result<Vec<Model>, ApiError>;

    /// `POST /v1/query` (waits for the whole answer)
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError>;

    /// `POST /v1/streaming_query`
    ///
    /// Fails before returning if the service rejects the request; read
    /// errors later on arrive as an `Err` item of the stream.
    async fn streaming_query(&self, request: &QueryRequest) -> Result<EventStream, ApiError>;

    /// `GET /v1/conversations/{id}`
    async fn get_conversation(&self, conversation_id: &str)
        -> Result<ConversationResponse, ApiError>;

    /// `DELETE /v1/conversations/{id}`
    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError>;

    /// List models, degrading to the fallback model on any failure
    async fn load_models(&self) -> Vec<Model> {
        match self.list_models().await {
            Ok(models) => {
                tracing::info!(count = models.len(), "Loaded models");
                models
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch models, using fallback");
                vec![Model::fallback()]
            }
        }
    }
}

/// HTTP client for the assistant service
#[derive(Clone, Debug)]
pub struct LightspeedClient {
    /// Base URL without trailing slash
    base_url: String,
    /// Timeout for requests that return a complete body
    request_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl LightspeedClient {
    /// Create a client for the service at `base_url`
    ///
    /// `request_timeout` bounds the non-streaming calls. Streaming responses
    /// are only bounded by the connect timeout, since an answer may take
    /// arbitrarily long to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url,
            request_timeout,
            http_client,
        })
    }

    /// Create from `ApiConfig`
    ///
    /// # Errors
    ///
    /// See [`LightspeedClient::new`].
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// URL of one stored conversation
    ///
    /// The ID is pushed as a single, percent-encoded path segment, so `/`,
    /// `?` and `#` in it cannot change the endpoint.
    fn conversation_url(&self, conversation_id: &str) -> Result<reqwest::Url, ApiError> {
        let base = self.url(CONVERSATIONS_ENDPOINT);
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: base.clone(),
            reason,
        };

        if matches!(conversation_id, "" | "." | "..") {
            return Err(invalid(format!(
                "'{conversation_id}' is not a conversation ID"
            )));
        }

        let mut url = reqwest::Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot have a path".to_string()))?
            .push(conversation_id);
        Ok(url)
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

        tracing::debug!(endpoint, status = %response.status(), "Response received");

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let bytes = response.bytes().await.map_err(|source| ApiError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl LightspeedApi for LightspeedClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.url(MODELS_ENDPOINT))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn list_models(&self) -> Result<Vec<Model>, ApiError> {
        let request = self
            .http_client
            .get(self.url(MODELS_ENDPOINT))
            .timeout(self.request_timeout);

        let response = self.send(MODELS_ENDPOINT, request).await?;
        let body: ModelsResponse = Self::read_json(MODELS_ENDPOINT, response).await?;
        Ok(body.models)
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        tracing::info!(
            conversation_id = ?request.conversation_id,
            model = ?request.model,
            "Sending query"
        );

        let http_request = self
            .http_client
            .post(self.url(QUERY_ENDPOINT))
            .timeout(self.request_timeout)
            .json(request);

        let response = self.send(QUERY_ENDPOINT, http_request).await?;
        Self::read_json(QUERY_ENDPOINT, response).await
    }

    async fn streaming_query(&self, request: &QueryRequest) -> Result<EventStream, ApiError> {
        tracing::info!(
            conversation_id = ?request.conversation_id,
            model = ?request.model,
            attachments = request.attachments.as_ref().map_or(0, Vec::len),
            "Sending streaming query"
        );

        let http_request = self
            .http_client
            .post(self.url(STREAMING_QUERY_ENDPOINT))
            .json(request);

        let response = self.send(STREAMING_QUERY_ENDPOINT, http_request).await?;
        Ok(event_stream(response.bytes_stream()).boxed())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationResponse, ApiError> {
        let url = self.conversation_url(conversation_id)?;
        let endpoint = url.path().to_string();
        let request = self.http_client.get(url).timeout(self.request_timeout);

        let response = self.send(&endpoint, request).await?;
        Self::read_json(&endpoint, response).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        let url = self.conversation_url(conversation_id)?;
        let endpoint = url.path().to_string();
        let request = self.http_client.delete(url).timeout(self.request_timeout);

        self.send(&endpoint, request).await?;
        tracing::info!(conversation_id, "Conversation deleted");
        Ok(())
    }
}
