//! Elasticsearch-backed document store.
//!
//! Documents are indexed with `_source = {file, <field>: number | [numbers]}`.
//! Ranking is pushed down as a `script_score` query whose Painless source is
//! generated by [`fusion::painless`], so the cluster applies the same fusion
//! rules as the embedded store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use descriptor::{DescriptorConfig, Document, Family, FieldValue};
use fusion::painless::{self, SCORE_OFFSET};
use fusion::QueryBundle;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::store::{DocumentStore, ScoredHit};
use crate::IndexError;

/// `_source` key holding the document id.
pub const FILE_FIELD: &str = "file";

/// Connection settings for an Elasticsearch index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Base URL, e.g. `http://localhost:9200`.
    pub url: String,
    pub index: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ElasticConfig {
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            index: index.into(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        Url::parse(&self.url)
            .map_err(|e| IndexError::InvalidConfig(format!("elastic url `{}`: {e}", self.url)))?;
        if self.index.trim().is_empty() {
            return Err(IndexError::InvalidConfig("elastic index name is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(IndexError::InvalidConfig("elastic timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// Build the `_source` object for a document.
pub fn document_to_source(doc: &Document) -> Value {
    let mut map = Map::new();
    map.insert(FILE_FIELD.into(), Value::String(doc.id.clone()));
    for (name, value) in &doc.fields {
        let json = match value {
            FieldValue::Scalar(v) => json!(v),
            FieldValue::Vector(v) => json!(v),
        };
        map.insert(name.clone(), json);
    }
    Value::Object(map)
}

/// Rebuild a document from `_source`. Numbers become scalars, numeric arrays
/// become vectors; anything else is ignored.
pub fn document_from_source(id: &str, source: &Value) -> Document {
    let mut doc = Document::new(id);
    let Some(map) = source.as_object() else {
        return doc;
    };
    for (name, value) in map {
        if name == FILE_FIELD {
            continue;
        }
        let field = match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Scalar),
            Value::Array(items) => items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .map(FieldValue::Vector),
            _ => None,
        };
        if let Some(field) = field {
            doc.fields.insert(name.clone(), field);
        }
    }
    doc
}

#[derive(Debug, Deserialize)]
pub struct MgetResponse {
    docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
struct MgetDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

/// Documents of an `_mget` response, in request order. Misses and hits
/// without `_source` become `None`.
pub fn docs_from_mget(response: MgetResponse) -> Vec<Option<Document>> {
    response
        .docs
        .into_iter()
        .map(|doc| match (doc.found, doc.source) {
            (true, Some(source)) => Some(document_from_source(&doc.id, &source)),
            _ => None,
        })
        .collect()
}

/// Hits of a `script_score` search in the order the cluster returned them,
/// with [`SCORE_OFFSET`] removed. The id is `_source.file`, or `_id` when
/// the source does not carry it.
pub fn hits_from_search(response: SearchResponse) -> Vec<ScoredHit> {
    response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let id = hit
                .source
                .as_ref()
                .and_then(|s| s.get(FILE_FIELD))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(hit.id);
            ScoredHit {
                id,
                score: hit.score.unwrap_or(SCORE_OFFSET) - SCORE_OFFSET,
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct CountResponse {
    count: usize,
}

/// [`DocumentStore`] over the Elasticsearch REST API.
pub struct ElasticStore {
    client: Client,
    base: Url,
    cfg: ElasticConfig,
    script: String,
}

impl ElasticStore {
    pub fn new(cfg: ElasticConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        let base = Url::parse(&cfg.url).map_err(IndexError::backend)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base,
            cfg,
            script: painless::script(),
        })
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.cfg
    }

    /// URL for `/{index}/{segments...}` with every segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, IndexError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IndexError::InvalidConfig(format!("`{}` cannot be a base url", self.cfg.url)))?
            .pop_if_empty()
            .push(&self.cfg.index)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.cfg.username {
            Some(user) => builder.basic_auth(user, self.cfg.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, IndexError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IndexError::Backend(format!("elasticsearch returned {status}: {body}")))
    }

    /// `script_score` search body for `query`.
    pub fn search_body(&self, query: &QueryBundle, top_n: usize) -> Value {
        json!({
            "size": top_n,
            "_source": [FILE_FIELD],
            "query": {
                "script_score": {
                    "query": { "match_all": {} },
                    "script": {
                        "source": self.script,
                        "params": painless::params(query),
                    }
                }
            }
        })
    }

    /// Index mapping: scalars as `double`, vectors as non-indexed
    /// `dense_vector` with the configured dimensions.
    pub fn mapping(cfg: &DescriptorConfig) -> Value {
        let mut properties = Map::new();
        properties.insert(FILE_FIELD.into(), json!({ "type": "keyword" }));
        for family in Family::ALL {
            for (name, len) in cfg.shape_of(family).fields {
                let prop = match len {
                    None => json!({ "type": "double" }),
                    Some(dims) => json!({ "type": "dense_vector", "dims": dims, "index": false }),
                };
                properties.insert(name.to_string(), prop);
            }
        }
        json!({ "mappings": { "properties": properties } })
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    fn name(&self) -> &'static str {
        "elastic"
    }

    async fn prepare(&self, cfg: &DescriptorConfig) -> Result<(), IndexError> {
        let url = self.endpoint(&[])?;
        let exists = self.request(Method::HEAD, url.clone()).send().await?;
        if exists.status() == StatusCode::OK {
            return Ok(());
        }
        self.send(self.request(Method::PUT, url).json(&Self::mapping(cfg)))
            .await?;
        info!(index = %self.cfg.index, "elastic_index_created");
        Ok(())
    }

    async fn put(&self, doc: &Document) -> Result<(), IndexError> {
        let url = self.endpoint(&["_doc", &doc.id])?;
        self.send(self.request(Method::PUT, url).json(&document_to_source(doc)))
            .await?;
        debug!(doc_id = %doc.id, "elastic_put");
        Ok(())
    }

    async fn multi_get(&self, ids: &[String]) -> Result<Vec<Option<Document>>, IndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&["_mget"])?;
        let response: MgetResponse = self
            .send(self.request(Method::POST, url).json(&json!({ "ids": ids })))
            .await?
            .json()
            .await?;
        Ok(docs_from_mget(response))
    }

    async fn score_all(
        &self,
        query: &QueryBundle,
        top_n: usize,
    ) -> Result<Vec<ScoredHit>, IndexError> {
        if top_n == 0 {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let url = self.endpoint(&["_search"])?;
        let response: SearchResponse = self
            .send(self.request(Method::POST, url).json(&self.search_body(query, top_n)))
            .await?
            .json()
            .await?;
        let hits = hits_from_search(response);
        info!(
            index = %self.cfg.index,
            returned = hits.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "elastic_score_all"
        );
        Ok(hits)
    }

    fn returns_sorted(&self) -> bool {
        true
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let url = self.endpoint(&["_count"])?;
        let response: CountResponse = self
            .send(self.request(Method::GET, url))
            .await?
            .json()
            .await?;
        Ok(response.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ElasticStore {
        ElasticStore::new(ElasticConfig::new("http://localhost:9200/", "images")).unwrap()
    }

    #[test]
    fn source_roundtrip_keeps_typing() {
        let doc = Document::new("a b.png")
            .with_field("r_mean", FieldValue::Scalar(10.5))
            .with_field("wavelet", FieldValue::Vector(vec![1.0, 2.5]));
        let source = document_to_source(&doc);
        assert_eq!(source[FILE_FIELD], "a b.png");
        assert_eq!(document_from_source("a b.png", &source), doc);
    }

    #[test]
    fn source_ignores_non_numeric_fields() {
        let source = json!({ "file": "x", "note": "hi", "mixed": [1, "a"], "ok": 3 });
        let doc = document_from_source("x", &source);
        assert_eq!(doc.fields.len(), 1);
        assert_eq!(doc.fields["ok"], FieldValue::Scalar(3.0));
    }

    #[test]
    fn endpoints_are_percent_encoded() {
        let url = store().endpoint(&["_doc", "cat #1.png"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/images/_doc/cat%20%231.png");
        assert_eq!(
            store().endpoint(&["_search"]).unwrap().as_str(),
            "http://localhost:9200/images/_search"
        );
    }

    #[test]
    fn search_body_carries_script_and_params() {
        let query = QueryBundle::new().with_field("wavelet", FieldValue::Vector(vec![1.0; 12]));
        let body = store().search_body(&query, 7);
        assert_eq!(body["size"], 7);
        let script = &body["query"]["script_score"]["script"];
        assert!(script["source"].as_str().unwrap().contains("params.containsKey('wavelet')"));
        assert_eq!(script["params"]["wavelet"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn mapping_uses_configured_dims() {
        let mapping = ElasticStore::mapping(&DescriptorConfig::default());
        let props = &mapping["mappings"]["properties"];
        assert_eq!(props["hog"]["dims"], 1176);
        assert_eq!(props["r_mean"]["type"], "double");
        assert_eq!(props["file"]["type"], "keyword");
    }

    #[test]
    fn search_hits_keep_cluster_order_and_drop_offset() {
        let response: SearchResponse = serde_json::from_value(json!({
            "took": 3,
            "hits": {
                "total": { "value": 3, "relation": "eq" },
                "hits": [
                    { "_index": "images", "_id": "id-red", "_score": 1.75, "_source": { "file": "red.png" } },
                    { "_index": "images", "_id": "blue.png", "_score": 1.25, "_source": {} },
                    { "_index": "images", "_id": "dark.png", "_score": 0.5 }
                ]
            }
        }))
        .unwrap();
        let hits = hits_from_search(response);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["red.png", "blue.png", "dark.png"]);
        assert!((hits[0].score - 0.75).abs() < 1e-12);
        assert!((hits[1].score - 0.25).abs() < 1e-12);
        assert!((hits[2].score + 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_search_yields_no_hits() {
        let response: SearchResponse =
            serde_json::from_value(json!({ "hits": { "hits": [] } })).unwrap();
        assert!(hits_from_search(response).is_empty());
    }

    #[test]
    fn mget_misses_become_none_in_request_order() {
        let response: MgetResponse = serde_json::from_value(json!({
            "docs": [
                { "_index": "images", "_id": "ghost.png", "found": false },
                {
                    "_index": "images", "_id": "red.png", "found": true,
                    "_source": { "file": "red.png", "r_mean": 200.0, "wavelet": [1.0, 2.0] }
                },
                { "_index": "images", "_id": "bare.png", "found": true }
            ]
        }))
        .unwrap();
        let docs = docs_from_mget(response);
        assert_eq!(docs.len(), 3);
        assert!(docs[0].is_none());
        let red = docs[1].as_ref().unwrap();
        assert_eq!(red.id, "red.png");
        assert_eq!(red.fields["r_mean"], FieldValue::Scalar(200.0));
        assert_eq!(red.fields["wavelet"], FieldValue::Vector(vec![1.0, 2.0]));
        assert!(docs[2].is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ElasticStore::new(ElasticConfig::new("not a url", "images")).is_err());
        assert!(ElasticStore::new(ElasticConfig::new("http://localhost:9200", " ")).is_err());
    }
}
