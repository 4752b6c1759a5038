mod common;

use cbir::{
    ingest_directory, DescriptorConfig, DocumentBuilder, DocumentStore, EmbeddedStore, Family,
    FamilySet, FieldValue, IngestOptions, MatchConfig, MatchRequest, Matcher,
};
use image::ImageFormat;
use std::sync::Arc;

#[test]
fn same_bytes_same_document() {
    let bytes = common::encode(&common::textured(9), ImageFormat::Png);
    let sequential = DocumentBuilder::new(DescriptorConfig::default().with_parallel(false));
    let parallel = DocumentBuilder::new(DescriptorConfig::default().with_parallel(true));

    let a = sequential
        .build_from_bytes("t.png", &bytes, &FamilySet::all())
        .unwrap();
    let b = sequential
        .build_from_bytes("t.png", &bytes, &FamilySet::all())
        .unwrap();
    let c = parallel
        .build_from_bytes("t.png", &bytes, &FamilySet::all())
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn extracted_lengths_match_configured_shapes() {
    let cfg = DescriptorConfig::default();
    let bytes = common::encode(&common::textured(1), ImageFormat::Png);
    let doc = DocumentBuilder::new(cfg.clone())
        .build_from_bytes("t.png", &bytes, &FamilySet::all())
        .unwrap();

    for family in Family::ALL {
        for (name, len) in cfg.shape_of(family).fields {
            match (&doc.fields[name], len) {
                (FieldValue::Scalar(_), None) => {}
                (FieldValue::Vector(v), Some(len)) => assert_eq!(v.len(), len, "{name}"),
                (other, len) => panic!("{name}: {other:?} vs {len:?}"),
            }
        }
    }
    assert_eq!(doc.fields["hog"].vector_len(), Some(1176));
    assert_eq!(doc.fields["gist"].vector_len(), Some(1024));
    assert_eq!(doc.fields["dct"].vector_len(), Some(1280));
    assert_eq!(doc.fields["wavelet"].vector_len(), Some(12));
    assert_eq!(doc.fields["corners"].vector_len(), Some(1024));
    assert_eq!(doc.fields["contrast"].vector_len(), Some(4));
}

#[tokio::test]
async fn rankings_repeat_across_stores() {
    let dir = common::fixture_dir();
    let builder = DocumentBuilder::new(DescriptorConfig::default());
    let query = common::encode(&common::textured(4), ImageFormat::Png);

    let mut rankings = Vec::new();
    for _ in 0..2 {
        let store: Arc<dyn DocumentStore> = Arc::new(EmbeddedStore::in_memory());
        ingest_directory(dir.path(), &builder, store.as_ref(), &IngestOptions::default())
            .await
            .unwrap();
        let matcher =
            Matcher::new(store, DescriptorConfig::default(), MatchConfig::default()).unwrap();
        rankings.push(
            matcher
                .match_request(&MatchRequest::image(query.clone()))
                .await
                .unwrap(),
        );
    }
    assert_eq!(rankings[0], rankings[1]);
    assert_eq!(rankings[0].len(), 4);
}
