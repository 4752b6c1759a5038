//! Batch ingestion: describe every image of a directory and write it to the
//! configured store.
//!
//! Usage: `cbir-ingest [config.yaml] [image-dir]`. The directory argument
//! overrides `ingest.dir` from the config file.

use std::path::PathBuf;

use anyhow::Context;
use cbir::{ingest_directory, CbirConfig, DocumentBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .json()
        .init();

    let mut args = std::env::args().skip(1);
    let cfg = match args.next() {
        Some(path) => CbirConfig::from_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => CbirConfig::default(),
    };
    let dir: PathBuf = args
        .next()
        .or_else(|| cfg.ingest.dir.clone())
        .map(PathBuf::from)
        .context("no image directory given (argument or ingest.dir)")?;
    let opts = cfg.ingest.options()?;

    let store = cfg.store.build().context("building document store")?;
    store
        .prepare(&cfg.descriptor)
        .await
        .context("preparing document store")?;

    let builder = DocumentBuilder::new(cfg.descriptor.clone());
    let report = ingest_directory(&dir, &builder, store.as_ref(), &opts).await?;
    let total = store.count().await?;

    tracing::info!(
        considered = report.considered,
        indexed = report.indexed,
        skipped = report.skipped,
        store_total = total,
        "ingestion complete"
    );
    Ok(())
}
