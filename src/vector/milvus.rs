//! HTTP backend against the Milvus v2 REST contract
//!
//! Every operation is a JSON POST under `/v2/vectordb`. Responses share an
//! envelope of `{code, message, data}`; a non-zero code is a store-side
//! rejection, a non-2xx status or unparseable body is a transport failure.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::backend::{
    CollectionDescriptor, LoadState, SearchRequest, VectorBackend, VectorHit, INVERTED_INDEX_FIELDS,
    SCALAR_FIELDS,
};
use super::config::VectorDbConfig;
use super::error::{VectorError, VectorResult};
use crate::core::types::fields;

/// Response envelope shared by all store endpoints.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct HasCollectionData {
    has: bool,
}

#[derive(Debug, Deserialize)]
struct LoadStateData {
    #[serde(rename = "loadState")]
    load_state: String,
}

#[derive(Debug, Deserialize)]
struct InsertData {
    #[serde(rename = "insertIds", default)]
    insert_ids: Vec<Value>,
}

/// HTTP client for the store.
///
/// Holds one configured session (base URL, database name, credentials,
/// timeout); safe to share across concurrent callers.
pub struct MilvusHttpBackend {
    http: Client,
    base_url: String,
    db_name: String,
    /// `user:password` bearer token; None when auth is disabled
    token: Option<String>,
}

impl MilvusHttpBackend {
    /// Build a backend from connection settings.
    ///
    /// Does not talk to the store; connectivity is validated by the
    /// [`super::connector::Connector`].
    pub fn new(config: &VectorDbConfig) -> VectorResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorError::ConnectionFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let token = if config.user.is_empty() {
            None
        } else {
            Some(format!(
                "{}:{}",
                config.user,
                config.password.expose_secret()
            ))
        };

        Ok(Self {
            http,
            base_url: config.base_url(),
            db_name: config.db_name.clone(),
            token,
        })
    }

    /// POST a request and decode the data payload.
    async fn post<B, T>(&self, operation: &str, path: &str, body: &B) -> VectorResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope: ApiEnvelope<T> = self.post_envelope(operation, path, body).await?;
        match envelope.data {
            Some(data) => Ok(data),
            None => Err(VectorError::InvalidResponse {
                reason: format!("{operation}: response carried no data"),
            }),
        }
    }

    /// POST a request, accepting an empty data payload.
    async fn execute<B>(&self, operation: &str, path: &str, body: &B) -> VectorResult<()>
    where
        B: Serialize + ?Sized,
    {
        let _: ApiEnvelope<Value> = self.post_envelope(operation, path, body).await?;
        Ok(())
    }

    async fn post_envelope<B, T>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> VectorResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/v2/vectordb{}", self.base_url, path);
        debug!(operation, %url, "vector store request");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VectorError::RequestFailed {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VectorError::RequestFailed {
                operation: operation.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let envelope: ApiEnvelope<T> =
            response
                .json()
                .await
                .map_err(|e| VectorError::InvalidResponse {
                    reason: format!("{operation}: {e}"),
                })?;

        if envelope.code != 0 {
            return Err(VectorError::StoreError {
                operation: operation.to_string(),
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        Ok(envelope)
    }

    /// Schema document for collection creation.
    fn schema_json(descriptor: &CollectionDescriptor) -> Value {
        let mut field_docs = vec![
            json!({
                "fieldName": fields::ID,
                "dataType": "Int64",
                "isPrimary": true,
            }),
            json!({
                "fieldName": fields::EMBEDDING,
                "dataType": "FloatVector",
                "elementTypeParams": { "dim": descriptor.dimension.to_string() },
            }),
        ];
        for spec in SCALAR_FIELDS {
            let mut doc = json!({
                "fieldName": spec.name,
                "dataType": spec.data_type,
            });
            if let Some(max_length) = spec.max_length {
                doc["elementTypeParams"] = json!({ "max_length": max_length.to_string() });
            }
            field_docs.push(doc);
        }

        json!({
            "autoId": true,
            "enableDynamicField": true,
            "fields": field_docs,
        })
    }
}

#[async_trait]
impl VectorBackend for MilvusHttpBackend {
    async fn list_collections(&self) -> VectorResult<Vec<String>> {
        self.post(
            "list_collections",
            "/collections/list",
            &json!({ "dbName": self.db_name }),
        )
        .await
    }

    async fn has_collection(&self, name: &str) -> VectorResult<bool> {
        let data: HasCollectionData = self
            .post(
                "has_collection",
                "/collections/has",
                &json!({ "dbName": self.db_name, "collectionName": name }),
            )
            .await?;
        Ok(data.has)
    }

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> VectorResult<()> {
        self.execute(
            "create_collection",
            "/collections/create",
            &json!({
                "dbName": self.db_name,
                "collectionName": descriptor.name,
                "schema": Self::schema_json(descriptor),
                "params": { "consistencyLevel": "Strong" },
            }),
        )
        .await
    }

    async fn drop_collection(&self, name: &str) -> VectorResult<()> {
        self.execute(
            "drop_collection",
            "/collections/drop",
            &json!({ "dbName": self.db_name, "collectionName": name }),
        )
        .await
    }

    async fn load_collection(&self, name: &str) -> VectorResult<()> {
        self.execute(
            "load_collection",
            "/collections/load",
            &json!({ "dbName": self.db_name, "collectionName": name }),
        )
        .await
    }

    async fn load_state(&self, name: &str) -> VectorResult<LoadState> {
        let data: LoadStateData = self
            .post(
                "load_state",
                "/collections/get_load_state",
                &json!({ "dbName": self.db_name, "collectionName": name }),
            )
            .await?;
        let state = match data.load_state.as_str() {
            "LoadStateLoaded" => LoadState::Loaded,
            "LoadStateLoading" => LoadState::Loading,
            "LoadStateNotLoad" => LoadState::NotLoaded,
            "LoadStateNotExist" => LoadState::NotExist,
            other => {
                return Err(VectorError::InvalidResponse {
                    reason: format!("unknown load state: {other}"),
                })
            }
        };
        Ok(state)
    }

    async fn create_indexes(&self, descriptor: &CollectionDescriptor) -> VectorResult<()> {
        // Vector index first; the store builds it online since the
        // collection is already loaded.
        self.execute(
            "create_vector_index",
            "/indexes/create",
            &json!({
                "dbName": self.db_name,
                "collectionName": descriptor.name,
                "indexParams": [{
                    "fieldName": fields::EMBEDDING,
                    "indexName": format!("{}_hnsw", fields::EMBEDDING),
                    "metricType": descriptor.metric.as_str(),
                    "indexType": "HNSW",
                    "params": {
                        "M": descriptor.hnsw.m,
                        "efConstruction": descriptor.hnsw.ef_construction,
                    },
                }],
            }),
        )
        .await?;

        let scalar_params: Vec<Value> = INVERTED_INDEX_FIELDS
            .iter()
            .map(|field| {
                json!({
                    "fieldName": field,
                    "indexName": format!("{field}_inverted"),
                    "indexType": "INVERTED",
                })
            })
            .collect();
        self.execute(
            "create_scalar_indexes",
            "/indexes/create",
            &json!({
                "dbName": self.db_name,
                "collectionName": descriptor.name,
                "indexParams": scalar_params,
            }),
        )
        .await
    }

    async fn insert(
        &self,
        collection: &str,
        rows: Vec<serde_json::Map<String, Value>>,
    ) -> VectorResult<Vec<i64>> {
        let data: InsertData = self
            .post(
                "insert",
                "/entities/insert",
                &json!({
                    "dbName": self.db_name,
                    "collectionName": collection,
                    "data": rows,
                }),
            )
            .await?;

        // The store returns ids as numbers or numeric strings depending on
        // the primary key type.
        let ids = data
            .insert_ids
            .iter()
            .map(|value| match value {
                Value::Number(n) => n.as_i64().ok_or(()),
                Value::String(s) => s.parse::<i64>().map_err(|_| ()),
                _ => Err(()),
            })
            .collect::<Result<Vec<i64>, ()>>()
            .map_err(|_| VectorError::InvalidResponse {
                reason: "insert returned non-integer ids".to_string(),
            })?;
        Ok(ids)
    }

    async fn search(&self, request: SearchRequest) -> VectorResult<Vec<VectorHit>> {
        if request.vectors.is_empty() || request.vectors.iter().any(Vec::is_empty) {
            return Err(VectorError::EmptyQuery);
        }

        let mut body = json!({
            "dbName": self.db_name,
            "collectionName": request.collection,
            "data": request.vectors,
            "annsField": request.anns_field,
            "limit": request.limit,
            "outputFields": request.output_fields,
            "searchParams": {
                "metricType": request.metric.as_str(),
                "params": request.params,
            },
        });
        if let Some(filter) = &request.filter {
            body["filter"] = Value::from(filter.clone());
        }

        let rows: Vec<serde_json::Map<String, Value>> =
            self.post("search", "/entities/search", &body).await?;

        rows.into_iter().map(hit_from_row).collect()
    }

    async fn query(
        &self,
        collection: &str,
        filter: &str,
        output_fields: &[String],
    ) -> VectorResult<Vec<serde_json::Map<String, Value>>> {
        self.post(
            "query",
            "/entities/query",
            &json!({
                "dbName": self.db_name,
                "collectionName": collection,
                "filter": filter,
                "outputFields": output_fields,
            }),
        )
        .await
    }
}

/// Split a raw search row into id + distance + remaining output fields.
fn hit_from_row(mut row: serde_json::Map<String, Value>) -> VectorResult<VectorHit> {
    let id = row
        .remove(fields::ID)
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        })
        .ok_or_else(|| VectorError::InvalidResponse {
            reason: "search hit without an id".to_string(),
        })?;
    let distance = row
        .remove("distance")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| VectorError::InvalidResponse {
            reason: "search hit without a distance".to_string(),
        })? as f32;

    Ok(VectorHit {
        id,
        distance,
        fields: row,
    })
}
