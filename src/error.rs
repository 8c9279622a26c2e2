use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while building or verifying a pack.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A single source failed to load or regrid. The build logs this and
    /// carries on with the remaining sources.
    #[error("ingest failed for {path}: {reason}")]
    Ingest { path: PathBuf, reason: String },

    #[error("invalid cycle instant: {0}")]
    InvalidCycle(String),

    #[error("invalid shapefile: {0}")]
    InvalidShapefile(String),

    #[error("unsupported shape type {0} (only null and polygon records are handled)")]
    UnsupportedShape(i32),

    #[error("corrupt shapefile record {num}: {reason}")]
    CorruptRecord { num: i32, reason: String },

    #[error("signing key: {0}")]
    KeyLoad(String),

    #[error("no manifest.json in {0}")]
    MissingManifest(PathBuf),

    #[error("signature verification failed: {0}")]
    BadSignature(String),

    #[error("part {idx} ({name}): {reason}")]
    PartCorrupt {
        idx: usize,
        name: String,
        reason: String,
    },

    #[error("mask {kind}: {reason}")]
    BadMask { kind: String, reason: String },

    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("json error")]
    Json(#[from] serde_json::Error),
}
