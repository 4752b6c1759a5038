//! CBIR Server - HTTP API for content-based image retrieval
//!
//! Exposes the query side of the engine over HTTP:
//!
//! - **Upload search**: rank the store against an uploaded image
//! - **Relevance feedback**: rank the store against the average of images
//!   the user liked in an earlier result
//! - **Health**: liveness and readiness probes
//!
//! Configuration comes from `.env`, an optional `server.{toml,yaml,json}`
//! file and `CBIR_SERVER__*` environment variables. The descriptor, store
//! and search settings live in the pipeline YAML named by
//! `pipeline_config`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (store reachable)
//! - `GET /metadata` - Version, uptime and store backend
//! - `POST /upload` - multipart `image`, optional `feature_keys`, `top_n`
//! - `POST /feedback` - JSON `{"file_keys": [...], "feature_keys": [...], "top_n": 10}`
//!
//! Both search endpoints answer with `[{"file": "<prefix><id>", "_score": 0.93}, ...]`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
