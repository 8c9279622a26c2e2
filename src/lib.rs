#![doc = "SeaSight pack builder public API"]

pub mod cli;
pub mod commands;
mod compress;
mod error;
mod grid;
mod ingest;
mod manifest;
mod mask;
mod pack;
mod shapefile;
mod sign;

#[doc(inline)]
pub use error::Error;

#[doc(inline)]
pub use grid::Grid;

#[doc(inline)]
pub use ingest::{
    FlatGridSource, SourceData, SourceKind, SourceReader, ingest_source, regrid,
    write_flat_source,
};

#[doc(inline)]
pub use shapefile::{Polygon, Ring, read_polygons, read_polygons_from_path};

#[doc(inline)]
pub use mask::{
    dilate, rasterize, read_sidecar, synth_land, synth_restricted, synth_shallow, write_sidecar,
};

#[doc(inline)]
pub use compress::{compress, decompress, sha256_hex, DEFAULT_COMPRESSION_LEVEL};

#[doc(inline)]
pub use sign::{PackSigner, load_signing_key, verify_detached};

#[doc(inline)]
pub use manifest::{Manifest, PartInfo, Signing, canonical_json, normalize_cycle_iso};

#[doc(inline)]
pub use pack::{FieldStats, VerifyReport, write_pack, verify_pack};
