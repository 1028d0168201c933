//! HTTP client wrapper for the persistence store.

use reqwest::{Client, Method};
use serde_json::json;

use crate::config::StoreConfig;
use crate::store::types::{
    ChunkRow, NewChunk, NewDocument, PrepRow, ScoredChunk, StoreError, Subject,
};

/// Lightweight HTTP client for scoped store operations.
pub struct StoreClient {
    client: Client,
    base_url: String,
    service_key: Option<String>,
}

impl StoreClient {
    /// Construct a new client from injected store settings.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("cramkit/0.1").build()?;
        let base_url = normalize_base_url(&config.base_url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_service_key = config
                .service_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized store HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            service_key: config.service_key,
        })
    }

    /// Persist a document row.
    pub async fn insert_document(&self, document: &NewDocument) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, "rest/v1/documents")
            .json(&json!([document]))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(document = %document.id, "Document inserted");
        })
        .await
    }

    /// Persist a chunk row together with its embedding.
    pub async fn insert_chunk(&self, chunk: &NewChunk) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, "rest/v1/chunks")
            .json(&json!([chunk]))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::trace!(document = %chunk.document_id, "Chunk inserted");
        })
        .await
    }

    /// Run the similarity-search RPC scoped to one subject.
    ///
    /// Results arrive ordered descending by similarity, already filtered to
    /// `threshold` and truncated to `count` by the store.
    pub async fn match_chunks(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        count: usize,
        subject_id: &str,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let body = json!({
            "query_embedding": query_embedding,
            "match_threshold": threshold,
            "match_count": count,
            "filter_subject_id": subject_id,
        });

        let response = self
            .request(Method::POST, "rest/v1/rpc/match_chunks")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(subject = subject_id, error = %error, "Similarity search failed");
            return Err(error);
        }

        Ok(response.json().await?)
    }

    /// Fetch one page of chunk rows for a subject.
    pub async fn chunk_page(
        &self,
        subject_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChunkRow>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/chunks")
            .query(&[
                ("select", "content".to_string()),
                ("subject_id", format!("eq.{subject_id}")),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(subject = subject_id, error = %error, "Chunk page fetch failed");
            return Err(error);
        }

        Ok(response.json().await?)
    }

    /// Fetch every chunk row for a subject using range pagination, stopping
    /// when a short page signals end of data.
    pub async fn fetch_chunks(
        &self,
        subject_id: &str,
        page_size: usize,
    ) -> Result<Vec<ChunkRow>, StoreError> {
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.chunk_page(subject_id, offset, page_size).await?;
            let received = page.len();
            all.extend(page);
            if received < page_size {
                break;
            }
            offset += page_size;
        }

        Ok(all)
    }

    /// Look up a subject by identifier.
    pub async fn subject_by_id(&self, id: &str) -> Result<Option<Subject>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/subjects")
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let mut rows: Vec<Subject> = self.read_rows(response).await?;
        Ok(rows.pop())
    }

    /// Fetch the most recently created subject, if any exists.
    pub async fn latest_subject(&self) -> Result<Option<Subject>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/subjects")
            .query(&[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let mut rows: Vec<Subject> = self.read_rows(response).await?;
        Ok(rows.pop())
    }

    /// Read the cached answer for a `(subject, unit)` pair, if one exists.
    pub async fn cached_prep(
        &self,
        subject_id: &str,
        unit: &str,
    ) -> Result<Option<String>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/preps")
            .query(&[
                ("select", "content".to_string()),
                ("subject_id", format!("eq.{subject_id}")),
                ("unit", format!("eq.{unit}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let mut rows: Vec<PrepRow> = self.read_rows(response).await?;
        Ok(rows.pop().map(|row| row.content))
    }

    /// Cache a fully generated unit answer under its `(subject, unit)` key.
    pub async fn save_prep(
        &self,
        subject_id: &str,
        unit: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let body = json!([{
            "subject_id": subject_id,
            "unit": unit,
            "content": content,
        }]);

        let response = self
            .request(Method::POST, "rest/v1/preps")
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(subject = subject_id, unit, "Unit prep cached");
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(key) = &self.service_key
            && !key.is_empty()
        {
            req = req
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }
        req
    }

    async fn read_rows<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<T>, StoreError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Store read failed");
            return Err(error);
        }
        Ok(response.json().await?)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Store request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use httpmock::{Method::GET, Method::POST, MockServer};

    fn client_for(server: &MockServer) -> StoreClient {
        StoreClient::new(StoreConfig {
            base_url: server.base_url(),
            service_key: Some("service-key".into()),
        })
        .expect("store client")
    }

    #[tokio::test]
    async fn match_chunks_sends_scoped_rpc_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/match_chunks")
                    .header("apikey", "service-key")
                    .json_body_partial(
                        r#"{"match_threshold":0.2,"match_count":10,"filter_subject_id":"subj-a"}"#,
                    );
                then.status(200).json_body(serde_json::json!([
                    { "content": "first", "similarity": 0.92 },
                    { "content": "second", "similarity": 0.71 }
                ]));
            })
            .await;

        let chunks = client_for(&server)
            .match_chunks(&[0.1, 0.2], 0.2, 10, "subj-a")
            .await
            .expect("similarity search");

        mock.assert();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "first");
        assert!(chunks[0].similarity > chunks[1].similarity);
    }

    #[tokio::test]
    async fn fetch_chunks_paginates_until_short_page() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/chunks")
                    .query_param("subject_id", "eq.subj-a")
                    .query_param("offset", "0")
                    .query_param("limit", "2");
                then.status(200).json_body(serde_json::json!([
                    { "content": "one" },
                    { "content": "two" }
                ]));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/chunks")
                    .query_param("offset", "2")
                    .query_param("limit", "2");
                then.status(200)
                    .json_body(serde_json::json!([{ "content": "three" }]));
            })
            .await;

        let rows = client_for(&server)
            .fetch_chunks("subj-a", 2)
            .await
            .expect("paginated fetch");

        first.assert();
        second.assert();
        let contents: Vec<_> = rows.into_iter().map(|row| row.content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn subject_by_id_returns_none_for_empty_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/subjects")
                    .query_param("id", "eq.missing");
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let subject = client_for(&server)
            .subject_by_id("missing")
            .await
            .expect("subject lookup");
        assert!(subject.is_none());
    }

    #[tokio::test]
    async fn latest_subject_orders_by_creation_time() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/subjects")
                    .query_param("order", "created_at.desc")
                    .query_param("limit", "1");
                then.status(200).json_body(serde_json::json!([
                    { "id": "subj-b", "name": "Databases", "created_at": "2025-06-01T10:00:00Z" }
                ]));
            })
            .await;

        let subject = client_for(&server)
            .latest_subject()
            .await
            .expect("latest subject")
            .expect("one subject");

        mock.assert();
        assert_eq!(subject.id, "subj-b");
    }

    #[tokio::test]
    async fn cached_prep_round_trips() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/preps")
                    .query_param("subject_id", "eq.subj-a")
                    .query_param("unit", "eq.Unit 1");
                then.status(200)
                    .json_body(serde_json::json!([{ "content": "cached summary" }]));
            })
            .await;

        let prep = client_for(&server)
            .cached_prep("subj-a", "Unit 1")
            .await
            .expect("prep lookup");
        assert_eq!(prep.as_deref(), Some("cached summary"));
    }

    #[tokio::test]
    async fn insert_failures_surface_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/documents");
                then.status(409).body("duplicate key");
            })
            .await;

        let document = NewDocument {
            id: "doc-1".into(),
            subject_id: "subj-a".into(),
            filename: "syllabus.pdf".into(),
            full_text: "text".into(),
        };
        let error = client_for(&server)
            .insert_document(&document)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::UnexpectedStatus { status, .. } if status.as_u16() == 409
        ));
    }
}
