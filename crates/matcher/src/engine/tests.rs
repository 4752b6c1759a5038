use super::*;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use descriptor::{DescriptorError, Document, Family, FieldValue};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use index::EmbeddedStore;

use crate::metrics::{set_match_metrics, MatchMetrics};
use crate::types::QueryMode;

fn png_bytes(rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(32, 32, Rgb(rgb));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

fn mean_doc(id: &str, values: [f64; 4]) -> Document {
    Document::new(id)
        .with_field("r_mean", FieldValue::Scalar(values[0]))
        .with_field("g_mean", FieldValue::Scalar(values[1]))
        .with_field("b_mean", FieldValue::Scalar(values[2]))
        .with_field("i_mean", FieldValue::Scalar(values[3]))
}

fn mean_only() -> FamilySet {
    [Family::Mean].into_iter().collect()
}

/// Store with scripted hits and an artificial delay.
struct ScriptedStore {
    hits: Vec<ScoredHit>,
    delay: Duration,
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn put(&self, _doc: &Document) -> Result<(), IndexError> {
        Ok(())
    }

    async fn multi_get(&self, ids: &[String]) -> Result<Vec<Option<Document>>, IndexError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![None; ids.len()])
    }

    async fn score_all(
        &self,
        _query: &QueryBundle,
        _top_n: usize,
    ) -> Result<Vec<ScoredHit>, IndexError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.hits.clone())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.hits.len())
    }
}

fn scored(id: &str, score: f64) -> ScoredHit {
    ScoredHit {
        id: id.into(),
        score,
    }
}

async fn color_store(builder: &DocumentBuilder) -> Arc<dyn DocumentStore> {
    let store = EmbeddedStore::in_memory();
    for (id, rgb) in [
        ("red.png", [250, 10, 10]),
        ("blue.png", [10, 10, 250]),
        ("pink.png", [250, 140, 160]),
    ] {
        let doc = builder
            .build_from_bytes(id, &png_bytes(rgb), &FamilySet::all())
            .expect("build document");
        store.put(&doc).await.expect("put");
    }
    Arc::new(store)
}

#[tokio::test]
async fn red_query_ranks_red_first() -> Result<(), MatchError> {
    let cfg = DescriptorConfig::default();
    let store = color_store(&DocumentBuilder::new(cfg.clone())).await;
    let matcher = Matcher::new(store, cfg, MatchConfig::default())?;

    let req = MatchRequest::image(png_bytes([250, 10, 10]))
        .with_feature_keys(["mean"])
        .with_top_n(3);
    let hits = matcher.match_request(&req).await?;

    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["red.png", "pink.png", "blue.png"]);
    assert!((hits[0].score - 1.0).abs() < 1e-9);
    assert!(hits[2].score < hits[1].score);
    Ok(())
}

#[tokio::test]
async fn ranking_is_deterministic() -> Result<(), MatchError> {
    let cfg = DescriptorConfig::default();
    let store = color_store(&DocumentBuilder::new(cfg.clone())).await;
    let matcher = Matcher::new(store, cfg, MatchConfig::default())?;

    let req = MatchRequest::image(png_bytes([200, 60, 90]));
    let first = matcher.match_request(&req).await?;
    let second = matcher.match_request(&req).await?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    Ok(())
}

#[tokio::test]
async fn exemplar_bundle_is_component_wise_mean() -> Result<(), MatchError> {
    let store = EmbeddedStore::in_memory();
    store.put(&mean_doc("a", [2.0, 4.0, 6.0, 4.0])).await?;
    store.put(&mean_doc("b", [4.0, 8.0, 10.0, 6.0])).await?;
    let scorer = FeatureFusionScorer::new(Arc::new(store), DescriptorConfig::default());

    let ids = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
    let query = scorer.build_from_exemplars(&ids, &mean_only()).await?;
    let ExemplarQuery::Bundle(bundle) = query else {
        panic!("expected a bundle");
    };
    let fields = bundle.into_fields();
    assert_eq!(fields["r_mean"], FieldValue::Scalar(3.0));
    assert_eq!(fields["g_mean"], FieldValue::Scalar(6.0));
    assert_eq!(fields["b_mean"], FieldValue::Scalar(8.0));
    assert_eq!(fields["i_mean"], FieldValue::Scalar(5.0));
    Ok(())
}

#[tokio::test]
async fn duplicate_exemplars_count_once() -> Result<(), MatchError> {
    let store = EmbeddedStore::in_memory();
    store.put(&mean_doc("a", [2.0, 4.0, 6.0, 4.0])).await?;
    store.put(&mean_doc("b", [4.0, 8.0, 10.0, 6.0])).await?;
    let scorer = FeatureFusionScorer::new(Arc::new(store), DescriptorConfig::default());

    let once = vec!["a".to_string(), "b".to_string()];
    let repeated = vec!["a".to_string(), "a".to_string(), "a".to_string(), "b".to_string()];
    assert_eq!(
        scorer.build_from_exemplars(&once, &mean_only()).await?,
        scorer.build_from_exemplars(&repeated, &mean_only()).await?
    );
    Ok(())
}

#[tokio::test]
async fn unknown_exemplars_yield_empty_result() -> Result<(), MatchError> {
    let store: Arc<dyn DocumentStore> = Arc::new(EmbeddedStore::in_memory());
    let scorer = FeatureFusionScorer::new(store.clone(), DescriptorConfig::default());
    let ids = vec!["nope.png".to_string()];
    assert_eq!(
        scorer.build_from_exemplars(&ids, &FamilySet::all()).await?,
        ExemplarQuery::NoValidExemplars
    );
    assert_eq!(
        scorer.build_from_exemplars(&[], &FamilySet::all()).await?,
        ExemplarQuery::NoValidExemplars
    );

    let matcher = Matcher::new(store, DescriptorConfig::default(), MatchConfig::default())?;
    let hits = matcher
        .match_request(&MatchRequest::exemplars(["nope.png"]))
        .await?;
    assert!(hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn feedback_round_trip_prefers_liked_image() -> Result<(), MatchError> {
    let cfg = DescriptorConfig::default();
    let store = color_store(&DocumentBuilder::new(cfg.clone())).await;
    let matcher = Matcher::new(store, cfg, MatchConfig::default())?;

    let req = MatchRequest::exemplars(["blue.png"]).with_feature_keys(["mean", "hist"]);
    let hits = matcher.match_request(&req).await?;
    assert_eq!(hits[0].id, "blue.png");
    assert!((hits[0].score - 1.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn undecodable_image_is_a_descriptor_error() {
    let scorer = FeatureFusionScorer::new(
        Arc::new(EmbeddedStore::in_memory()),
        DescriptorConfig::default(),
    );
    let err = scorer
        .build_from_image(b"not an image", &FamilySet::all())
        .expect_err("garbage must not decode");
    assert!(matches!(err, MatchError::Descriptor(DescriptorError::Decode(_))));

    let err = scorer
        .build_from_image(&png_bytes([1, 2, 3]), &FamilySet::default())
        .expect_err("empty family set");
    assert!(matches!(err, MatchError::InvalidRequest(_)));
}

#[tokio::test]
async fn gateway_sorts_unsorted_stores() -> Result<(), MatchError> {
    let store = ScriptedStore {
        hits: vec![scored("b", 0.2), scored("c", 0.9), scored("a", 0.2), scored("d", 0.1)],
        delay: Duration::ZERO,
    };
    let gateway = SearchGateway::new(Arc::new(store), Duration::from_secs(5));
    let hits = gateway.rank(&QueryBundle::new(), 3).await?;
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);

    assert!(gateway.rank(&QueryBundle::new(), 0).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn slow_store_hits_deadline() {
    let store: Arc<dyn DocumentStore> = Arc::new(ScriptedStore {
        hits: vec![scored("a", 1.0)],
        delay: Duration::from_secs(5),
    });
    let gateway = SearchGateway::new(store.clone(), Duration::from_millis(20));
    let err = gateway
        .rank(&QueryBundle::new(), 10)
        .await
        .expect_err("deadline should expire");
    assert!(matches!(err, MatchError::DeadlineExceeded { deadline_ms: 20 }));

    let scorer = FeatureFusionScorer::new(store, DescriptorConfig::default())
        .with_deadline(Duration::from_millis(20));
    let ids = vec!["a".to_string()];
    let err = scorer
        .build_from_exemplars(&ids, &FamilySet::all())
        .await
        .expect_err("deadline should expire");
    assert!(matches!(err, MatchError::DeadlineExceeded { .. }));
}

#[test]
fn invalid_config_rejected_at_construction() {
    let store: Arc<dyn DocumentStore> = Arc::new(EmbeddedStore::in_memory());
    let err = Matcher::new(
        store,
        DescriptorConfig::default(),
        MatchConfig::default().with_deadline_ms(0),
    )
    .err()
    .expect("config should be invalid");
    assert!(matches!(err, MatchError::InvalidConfig(_)));
}

#[derive(Default)]
struct RecordingMetrics {
    events: RwLock<Vec<(QueryMode, usize)>>,
}

impl MatchMetrics for RecordingMetrics {
    fn record_match(&self, mode: &QueryMode, _latency: Duration, hit_count: usize) {
        self.events.write().unwrap().push((*mode, hit_count));
    }
}

#[tokio::test]
async fn metrics_recorder_captures_matches() -> Result<(), MatchError> {
    let metrics = Arc::new(RecordingMetrics::default());
    set_match_metrics(Some(metrics.clone()));

    let cfg = DescriptorConfig::default();
    let store = color_store(&DocumentBuilder::new(cfg.clone())).await;
    let matcher = Matcher::new(store, cfg, MatchConfig::default())?;
    let req = MatchRequest::exemplars(["red.png", "pink.png"]).with_top_n(2);
    let hits = matcher.match_request(&req).await?;
    assert_eq!(hits.len(), 2);

    let events = metrics.events.read().unwrap().clone();
    assert!(events.contains(&(QueryMode::Exemplar, 2)));

    set_match_metrics(None);
    Ok(())
}
