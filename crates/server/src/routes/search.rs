use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use matcher::{MatchRequest, QuerySource, RankedHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One ranked image as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Image URL: the configured prefix followed by the document id.
    pub file: String,
    #[serde(rename = "_score")]
    pub score: f64,
}

/// Relevance feedback request
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// Liked images, as returned by a previous search (prefixed or bare ids).
    pub file_keys: Vec<String>,

    /// Families to compare on; all when empty.
    #[serde(default)]
    pub feature_keys: Vec<String>,

    #[serde(default)]
    pub top_n: Option<usize>,
}

fn parse_feature_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_response(state: &ServerState, hits: Vec<RankedHit>) -> Vec<SearchHit> {
    hits.into_iter()
        .map(|hit| SearchHit {
            file: state.config.image_url(&hit.id),
            score: hit.score,
        })
        .collect()
}

/// `POST /upload`: rank stored images against an uploaded one.
///
/// Multipart parts: `image` (required), `feature_keys` (comma separated,
/// optional), `top_n` (optional).
pub async fn upload(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> ServerResult<Json<Vec<SearchHit>>> {
    let mut image: Option<Vec<u8>> = None;
    let mut feature_keys = Vec::new();
    let mut top_n = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(field.bytes().await?.to_vec()),
            "feature_keys" => feature_keys = parse_feature_keys(&field.text().await?),
            "top_n" => {
                let raw = field.text().await?;
                let parsed = raw.trim().parse::<usize>().map_err(|_| {
                    ServerError::BadRequest(format!("top_n must be a non-negative integer, got `{raw}`"))
                })?;
                top_n = Some(parsed);
            }
            _ => {}
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ServerError::BadRequest("No image uploaded".to_string()))?;

    let req = MatchRequest {
        source: QuerySource::Image(image),
        feature_keys,
        top_n,
    };
    let hits = state
        .matcher
        .match_request(&req)
        .await
        .map_err(ServerError::from_query)?;

    Ok(Json(to_response(&state, hits)))
}

/// `POST /feedback`: rank stored images against the average of liked ones.
///
/// Keys that match no stored image are ignored; when none match the
/// response is an empty array.
pub async fn feedback(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ServerResult<Json<Vec<SearchHit>>> {
    let Json(body) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let ids: Vec<String> = body
        .file_keys
        .iter()
        .map(|key| state.config.strip_image_url(key).to_string())
        .collect();

    let req = MatchRequest {
        source: QuerySource::Exemplars(ids),
        feature_keys: body.feature_keys,
        top_n: body.top_n,
    };
    let hits = state
        .matcher
        .match_request(&req)
        .await
        .map_err(ServerError::from_query)?;

    Ok(Json(to_response(&state, hits)))
}
