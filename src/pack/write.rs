//! Build-side pack persistence: compress every artifact, hash it, then
//! bind the set together with a signed manifest.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use log::info;
use ndarray::Array2;

use crate::compress::{compress, sha256_hex, DEFAULT_COMPRESSION_LEVEL};
use crate::error::Error;
use crate::grid::Grid;
use crate::manifest::{Manifest, PartInfo};
use crate::sign::PackSigner;

use super::{field_payload, mask_payload};

/// Write a complete pack directory: one `<field>.bin.zst` per field in
/// declared order, one `mask_<kind>.bin.zst` per mask, then a signed
/// pretty-printed `manifest.json`.
///
/// Output is deterministic: field order is the caller's, the compressor
/// level is fixed, and identical inputs produce byte-identical packs.
pub fn write_pack(
    out_dir: &Path,
    region: &str,
    cycle_iso: &str,
    grid: Grid,
    fields: &[(String, Array2<f32>)],
    masks: &[(&str, Array2<u8>)],
    signer: &PackSigner,
) -> Result<Manifest, Error> {
    ensure_dir_exists(out_dir)?;

    let mut parts = Vec::with_capacity(fields.len());
    for (idx, (name, values)) in fields.iter().enumerate() {
        let compressed = compress(&field_payload(values), DEFAULT_COMPRESSION_LEVEL)?;
        let sha256 = sha256_hex(&compressed);
        fs::write(out_dir.join(format!("{name}.bin.zst")), &compressed)?;
        info!("wrote {name}.bin.zst: {} bytes", compressed.len());
        parts.push(PartInfo { idx, bytes: compressed.len(), sha256 });
    }

    let mut mask_files = BTreeMap::new();
    for (kind, values) in masks {
        let filename = format!("mask_{kind}.bin.zst");
        let compressed = compress(&mask_payload(values), DEFAULT_COMPRESSION_LEVEL)?;
        fs::write(out_dir.join(&filename), &compressed)?;
        info!("wrote {filename}: {} bytes", compressed.len());
        mask_files.insert(kind.to_string(), filename);
    }

    let field_names = fields.iter().map(|(name, _)| name.clone()).collect();
    let mut manifest = Manifest::new(region, cycle_iso, grid, field_names, parts, mask_files);
    manifest.sign(signer)?;

    let mut f = File::create(out_dir.join("manifest.json"))?;
    serde_json::to_writer_pretty(&mut f, &manifest)?;
    Ok(manifest)
}

/// Create the directory if it doesn't exist; error if a non-directory
/// already occupies the path.
fn ensure_dir_exists(path: &Path) -> Result<(), Error> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("path exists but is not a directory: {}", path.display()),
            )));
        }
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
