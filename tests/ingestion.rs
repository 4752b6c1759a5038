mod common;

use std::sync::Arc;

use async_trait::async_trait;
use cbir::{
    ingest_directory, list_images, CbirError, DescriptorConfig, Document, DocumentBuilder,
    DocumentStore, EmbeddedStore, FamilySet, IndexError, IngestOptions, IngestReport,
    QueryBundle, ScoredHit, StoreConfig,
};

fn builder() -> DocumentBuilder {
    DocumentBuilder::new(DescriptorConfig::default())
}

#[test]
fn listing_filters_and_sorts_by_filename() {
    let dir = common::fixture_dir();
    let names: Vec<String> = list_images(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["Tile.BMP", "blue.png", "corrupt.jpg", "pink.png", "red.png"]
    );
}

#[tokio::test]
async fn corrupt_files_are_skipped() {
    let dir = common::fixture_dir();
    let store = EmbeddedStore::in_memory();

    let report = ingest_directory(dir.path(), &builder(), &store, &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(
        report,
        IngestReport {
            considered: 5,
            indexed: 4,
            skipped: 1
        }
    );
    assert_eq!(store.count().await.unwrap(), 4);
    assert!(store.get("corrupt.jpg").unwrap().is_none());

    let tile = store.get("Tile.BMP").unwrap().expect("bmp indexed");
    assert_eq!(tile.families(), FamilySet::all());
}

#[tokio::test]
async fn start_offset_skips_leading_files() {
    let dir = common::fixture_dir();
    let store = EmbeddedStore::in_memory();
    let opts = IngestOptions {
        start_offset: 3,
        ..IngestOptions::default()
    };

    let report = ingest_directory(dir.path(), &builder(), &store, &opts)
        .await
        .unwrap();

    assert_eq!(report.considered, 2);
    assert_eq!(report.indexed, 2);
    let ids = vec!["pink.png".to_string(), "red.png".to_string(), "blue.png".to_string()];
    let got = store.multi_get(&ids).await.unwrap();
    assert!(got[0].is_some());
    assert!(got[1].is_some());
    assert!(got[2].is_none());

    let past_end = IngestOptions {
        start_offset: 50,
        ..IngestOptions::default()
    };
    let report = ingest_directory(dir.path(), &builder(), &store, &past_end)
        .await
        .unwrap();
    assert_eq!(report, IngestReport::default());
}

#[tokio::test]
async fn requested_families_only() {
    let dir = common::fixture_dir();
    let store = EmbeddedStore::in_memory();
    let opts = IngestOptions {
        start_offset: 0,
        families: FamilySet::from_keys(["mean", "wavelet"]).unwrap(),
    };
    ingest_directory(dir.path(), &builder(), &store, &opts)
        .await
        .unwrap();

    let red = store.get("red.png").unwrap().unwrap();
    assert_eq!(red.fields.len(), 5);
    assert!(red.fields.contains_key("wavelet"));
    assert!(!red.fields.contains_key("hog"));
}

#[tokio::test]
async fn reingest_overwrites_by_filename() {
    let dir = common::fixture_dir();
    let store = EmbeddedStore::in_memory();
    ingest_directory(dir.path(), &builder(), &store, &IngestOptions::default())
        .await
        .unwrap();
    common::write(
        dir.path(),
        "red.png",
        &common::solid([10, 250, 10]),
        image::ImageFormat::Png,
    );
    ingest_directory(dir.path(), &builder(), &store, &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 4);
    let red = store.get("red.png").unwrap().unwrap();
    let g = red.fields["g_mean"].as_scalar().unwrap();
    assert!(g > 200.0, "g_mean {g}");
}

#[tokio::test]
async fn missing_directory_is_an_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = EmbeddedStore::in_memory();
    let err = ingest_directory(
        &dir.path().join("nope"),
        &builder(),
        &store,
        &IngestOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CbirError::Io { .. }));
}

struct RejectingStore;

#[async_trait]
impl DocumentStore for RejectingStore {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    async fn put(&self, _doc: &Document) -> Result<(), IndexError> {
        Err(IndexError::Backend("connection refused".into()))
    }

    async fn multi_get(&self, ids: &[String]) -> Result<Vec<Option<Document>>, IndexError> {
        Ok(vec![None; ids.len()])
    }

    async fn score_all(
        &self,
        _query: &QueryBundle,
        _top_n: usize,
    ) -> Result<Vec<ScoredHit>, IndexError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(0)
    }
}

#[tokio::test]
async fn store_failure_aborts_the_run() {
    let dir = common::fixture_dir();
    let err = ingest_directory(
        dir.path(),
        &builder(),
        &RejectingStore,
        &IngestOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CbirError::Index(IndexError::Backend(_))));
}

#[tokio::test]
async fn redb_store_survives_reopen() {
    let dir = common::fixture_dir();
    let db_dir = tempfile::TempDir::new().unwrap();
    let cfg = StoreConfig::redb(db_dir.path().join("images.redb").to_string_lossy());

    {
        let store: Arc<dyn DocumentStore> = cfg.build().unwrap();
        ingest_directory(dir.path(), &builder(), store.as_ref(), &IngestOptions::default())
            .await
            .unwrap();
    }

    let reopened = cfg.build().unwrap();
    assert_eq!(reopened.count().await.unwrap(), 4);
    let got = reopened.multi_get(&["blue.png".to_string()]).await.unwrap();
    assert_eq!(got[0].as_ref().map(|d| d.id.as_str()), Some("blue.png"));
}
