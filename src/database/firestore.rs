// file: src/database/firestore.rs
// description: Cloud Firestore REST backend for vector records
// reference: https://firebase.google.com/docs/firestore/reference/rest

use super::{VectorStore, rank};
use crate::config::{FirestoreConfig, StorageBackend};
use crate::error::{PipelineError, Result};
use crate::extractor::FileKind;
use crate::models::{SearchResult, VectorRecord};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

const PAGE_SIZE: usize = 300;
const CONCURRENT_WRITES: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Value>,
    next_page_token: Option<String>,
}

pub struct FirestoreStore {
    client: Client,
    collection_url: Url,
    access_token: Option<String>,
}

impl FirestoreStore {
    pub fn from_config(config: &FirestoreConfig) -> Result<Self> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            PipelineError::Config("storage.firestore.project_id is not set".to_string())
        })?;

        let mut collection_url = Url::parse(config.base_url())
            .map_err(|e| PipelineError::Config(format!("Invalid Firestore base_url: {}", e)))?;
        collection_url
            .path_segments_mut()
            .map_err(|_| PipelineError::Config("Firestore base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "projects",
                project_id,
                "databases",
                "(default)",
                "documents",
                config.collection(),
            ]);

        Ok(Self {
            client: Client::new(),
            collection_url,
            access_token: config.access_token.clone(),
        })
    }

    fn document_url(&self, id: &str) -> Result<Url> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::Database("Invalid Firestore URL".to_string()))?
            .push(id);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| PipelineError::Database(format!("Firestore {} failed: {}", action, e)))
    }

    async fn check(response: Response, action: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(PipelineError::Database(format!(
            "Firestore {} failed with status {}: {}",
            action, status, error_text
        )))
    }

    async fn write(&self, record: &VectorRecord) -> Result<()> {
        let url = self.document_url(&record.id)?;
        let body = json!({ "fields": encode_fields(record) });
        let response = self
            .send(self.client.patch(url).json(&body), "write")
            .await?;
        Self::check(response, "write").await?;
        debug!("Stored Firestore document {}", record.id);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let response = self
            .send(self.client.delete(self.document_url(id)?), "delete")
            .await?;
        Self::check(response, "delete").await?;
        debug!("Deleted Firestore document {}", id);
        Ok(())
    }

    /// Every document in the collection, following page tokens.
    async fn list_documents(&self, mask: Option<&str>) -> Result<Vec<Value>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.collection_url.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &PAGE_SIZE.to_string());
                if let Some(field) = mask {
                    query.append_pair("mask.fieldPaths", field);
                }
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self.send(self.client.get(url), "list").await?;
            let page: ListResponse = Self::check(response, "list")
                .await?
                .json()
                .await
                .map_err(|e| PipelineError::Database(format!("Invalid Firestore list response: {}", e)))?;

            documents.extend(page.documents);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }
}

#[async_trait]
impl VectorStore for FirestoreStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Firestore
    }

    async fn init(&self) -> Result<()> {
        info!("Using Firestore collection {}", self.collection_url);
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        futures::stream::iter(records)
            .map(|record| self.write(record))
            .buffer_unordered(CONCURRENT_WRITES)
            .try_collect::<Vec<()>>()
            .await?;
        Ok(records.len())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let mut records = Vec::new();
        for document in self.list_documents(None).await? {
            match decode_document(&document) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping undecodable Firestore document: {}", e),
            }
        }
        Ok(rank(&records, query, limit))
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let response = self
            .send(self.client.get(self.document_url(id)?), "read")
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: Value = Self::check(response, "read")
            .await?
            .json()
            .await
            .map_err(|e| PipelineError::Database(format!("Invalid Firestore document: {}", e)))?;
        decode_document(&document).map(Some)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        // Firestore deletes succeed for missing documents too
        if self.get(id).await?.is_none() {
            return Ok(false);
        }
        self.remove(id).await?;
        Ok(true)
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<usize> {
        let mut removed = 0;
        for document in self.list_documents(Some("document_id")).await? {
            let Some(id) = document_id_from_name(&document) else {
                continue;
            };
            let owner = document["fields"]["document_id"]["stringValue"].as_str();
            if owner == Some(document_id) && id != document_id {
                self.remove(&id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.list_documents(Some("id")).await?.len())
    }

    async fn clear(&self) -> Result<()> {
        let documents = self.list_documents(Some("id")).await?;
        for document in &documents {
            let Some(id) = document_id_from_name(document) else {
                continue;
            };
            self.remove(&id).await?;
        }
        info!("Deleted {} Firestore documents", documents.len());
        Ok(())
    }
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn integer_value(value: i64) -> Value {
    // Firestore transports int64 as a decimal string
    json!({ "integerValue": value.to_string() })
}

pub fn encode_fields(record: &VectorRecord) -> Value {
    let vector: Vec<Value> = record
        .vector
        .iter()
        .map(|v| json!({ "doubleValue": f64::from(*v) }))
        .collect();

    json!({
        "id": string_value(&record.id),
        "document_id": string_value(&record.document_id),
        "file_name": string_value(&record.file_name),
        "kind": string_value(record.kind.extension()),
        "chunk_index": integer_value(record.chunk_index as i64),
        "text": string_value(&record.text),
        "vector": { "arrayValue": { "values": vector } },
        "content_hash": string_value(&record.content_hash),
        "created_at": integer_value(record.created_at),
    })
}

fn document_id_from_name(document: &Value) -> Option<String> {
    document["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .map(str::to_string)
}

fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name)
}

fn get_string(fields: &Map<String, Value>, name: &str) -> Option<String> {
    field(fields, name)?["stringValue"].as_str().map(str::to_string)
}

fn get_integer(fields: &Map<String, Value>, name: &str) -> Option<i64> {
    let value = field(fields, name)?;
    match &value["integerValue"] {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f32> {
    if let Some(d) = value["doubleValue"].as_f64() {
        return Some(d as f32);
    }
    match &value["integerValue"] {
        Value::String(s) => s.parse::<f64>().ok().map(|v| v as f32),
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        _ => None,
    }
}

pub fn decode_document(document: &Value) -> Result<VectorRecord> {
    let fields = document["fields"]
        .as_object()
        .ok_or_else(|| PipelineError::Database("Firestore document has no fields".to_string()))?;

    let id = get_string(fields, "id")
        .or_else(|| document_id_from_name(document))
        .ok_or_else(|| PipelineError::Database("Firestore document has no id".to_string()))?;

    let vector = match field(fields, "vector") {
        Some(value) => value["arrayValue"]["values"]
            .as_array()
            .map(|values| values.iter().filter_map(number).collect())
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let kind = match get_string(fields, "kind") {
        Some(kind) => serde_json::from_value::<FileKind>(Value::String(kind))?,
        None => FileKind::from_file_name(&get_string(fields, "file_name").unwrap_or_default())?,
    };

    let text = get_string(fields, "text").unwrap_or_default();
    let content_hash =
        get_string(fields, "content_hash").unwrap_or_else(|| VectorRecord::compute_hash(&text));

    Ok(VectorRecord {
        document_id: get_string(fields, "document_id").unwrap_or_else(|| id.clone()),
        file_name: get_string(fields, "file_name").unwrap_or_default(),
        kind,
        chunk_index: get_integer(fields, "chunk_index").unwrap_or(0).max(0) as u32,
        text,
        vector,
        content_hash,
        created_at: get_integer(fields, "created_at").unwrap_or(0),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::record;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COLLECTION_PATH: &str = "/v1/projects/demo/databases/(default)/documents/uploads";

    fn store_for(server: &MockServer) -> FirestoreStore {
        FirestoreStore::from_config(&FirestoreConfig {
            base_url: Some(format!("{}/v1", server.uri())),
            project_id: Some("demo".to_string()),
            collection: Some("uploads".to_string()),
            access_token: Some("token".to_string()),
        })
        .unwrap()
    }

    fn stored_document(id: &str, vector: &[f32]) -> Value {
        let record = record(id, vector.to_vec());
        json!({
            "name": format!("projects/demo/databases/(default)/documents/uploads/{}", id),
            "fields": encode_fields(&record),
        })
    }

    #[test]
    fn test_fields_round_trip() {
        let original = record("pdf_report_pdf", vec![0.25, -1.0]).with_chunk_index(3);
        let document = json!({ "fields": encode_fields(&original) });
        assert_eq!(document["fields"]["chunk_index"]["integerValue"], "3");

        let decoded = decode_document(&document).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_missing_project_is_config_error() {
        let result = FirestoreStore::from_config(&FirestoreConfig::default());
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_upsert_patches_document() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/excel_sales_xlsx", COLLECTION_PATH)))
            .and(header("authorization", "Bearer token"))
            .and(body_partial_json(json!({
                "fields": {"text": {"stringValue": "text of excel_sales_xlsx"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let written = store_for(&server)
            .upsert(&[record("excel_sales_xlsx", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/nope", COLLECTION_PATH)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(store_for(&server).get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [stored_document("east", &[1.0, 0.0])]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [stored_document("north", &[0.0, 1.0])],
                "nextPageToken": "next"
            })))
            .mount(&server)
            .await;

        let results = store_for(&server).search(&[1.0, 0.1], 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "north"]);
    }

    #[tokio::test]
    async fn test_delete_existing_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/pdf_report_pdf", COLLECTION_PATH)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(stored_document("pdf_report_pdf", &[1.0])),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/pdf_report_pdf", COLLECTION_PATH)))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(store_for(&server).delete("pdf_report_pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_document_sends_no_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/gone", COLLECTION_PATH)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(!store_for(&server).delete("gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_deletes_every_listed_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .and(query_param("mask.fieldPaths", "id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [stored_document("a", &[1.0]), stored_document("b", &[0.0])]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path_regex(r"/documents/uploads/(a|b)$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        store_for(&server).clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_chunks_skips_whole_document() {
        let server = MockServer::start().await;
        let listed = |id: &str, owner: &str| {
            json!({
                "name": format!("projects/demo/databases/(default)/documents/uploads/{}", id),
                "fields": { "document_id": { "stringValue": owner } },
            })
        };
        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .and(query_param("mask.fieldPaths", "document_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [
                    listed("doc", "doc"),
                    listed("doc#0", "doc"),
                    listed("doc#1", "doc"),
                    listed("other#0", "other"),
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path_regex(r"/documents/uploads/doc(%23|#)[01]$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        assert_eq!(store_for(&server).delete_chunks("doc").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_database_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let err = store_for(&server).count().await.unwrap_err();
        assert!(matches!(err, PipelineError::Database(ref msg) if msg.contains("403")));
    }
}
