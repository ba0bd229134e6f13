//! Publishing prediction documents to the search index

use crate::error::{PipelineError, Result};
use crate::models::{IndexReceipt, PredictionRecord};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default index service endpoint
pub const DEFAULT_INDEX_ENDPOINT: &str = "http://localhost:9200";

/// Default index receiving prediction documents
pub const DEFAULT_INDEX_NAME: &str = "ml_predictions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for index service writers
#[async_trait]
pub trait PredictionSink: Send + Sync {
    /// Write one document to the named index
    async fn index_document(&self, index: &str, document: &PredictionRecord)
        -> Result<IndexReceipt>;
}

/// Minimal Elasticsearch document writer over HTTP
pub struct ElasticsearchClient {
    client: Client,
    base_url: Url,
}

impl ElasticsearchClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let base_url = Url::parse(endpoint).map_err(|e| {
            PipelineError::Config(format!("invalid index endpoint {:?}: {}", endpoint, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PipelineError::Config(format!(
                "index endpoint {:?} cannot be used as a base URL",
                endpoint
            )));
        }

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base_url
    }

    fn document_url(&self, index: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::Config("index endpoint cannot be a base".into()))?
            .pop_if_empty()
            .push(index)
            .push("_doc");
        Ok(url)
    }
}

#[async_trait]
impl PredictionSink for ElasticsearchClient {
    async fn index_document(
        &self,
        index: &str,
        document: &PredictionRecord,
    ) -> Result<IndexReceipt> {
        let url = self.document_url(index)?;
        debug!(url = %url, "Indexing prediction document");

        let response = self.client.post(url).json(document).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::IndexRejected { status, body });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_document_url() {
        let client = ElasticsearchClient::new("http://localhost:9200").unwrap();
        assert_eq!(
            client.document_url("ml_predictions").unwrap().as_str(),
            "http://localhost:9200/ml_predictions/_doc"
        );

        let client = ElasticsearchClient::new("http://search.internal:9200/es/").unwrap();
        assert_eq!(
            client.document_url("ml_predictions").unwrap().as_str(),
            "http://search.internal:9200/es/ml_predictions/_doc"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            ElasticsearchClient::new("not a url"),
            Err(PipelineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_index_document_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ml_predictions/_doc")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "attack_type": "brute_force",
                "confidence": 0.95
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"_index":"ml_predictions","_id":"abc123","result":"created"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ElasticsearchClient::new(&server.url()).unwrap();
        let receipt = client
            .index_document("ml_predictions", &PredictionRecord::smoke_test())
            .await
            .unwrap();

        assert_eq!(receipt.id, "abc123");
        assert_eq!(receipt.index, "ml_predictions");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_document() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ml_predictions/_doc")
            .with_status(400)
            .with_body("mapper_parsing_exception")
            .create_async()
            .await;

        let client = ElasticsearchClient::new(&server.url()).unwrap();
        let err = client
            .index_document("ml_predictions", &PredictionRecord::smoke_test())
            .await
            .unwrap_err();

        match err {
            PipelineError::IndexRejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("mapper_parsing_exception"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Port 9 (discard) is not expected to run an HTTP server
        let client = ElasticsearchClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .index_document("ml_predictions", &PredictionRecord::smoke_test())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::IndexTransport(_)));
    }
}
