//! Read-side pack verification, written against the on-disk format
//! rather than the writer: parse the manifest, check the signature over
//! the re-canonicalized JSON, re-hash every part, and sanity-check the
//! decompressed payloads.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::compress::{decompress, sha256_hex};
use crate::error::Error;
use crate::manifest::{signing_message_of, Manifest};
use crate::sign::{decode_signature, verify_detached};

/// Min/max/mean diagnostics for one decompressed field. Informational
/// only; never part of the pass/fail verdict.
#[derive(Debug, Clone)]
pub struct FieldStats {
    pub name: String,
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

/// Outcome of one verification run. `failures` holds one message per
/// failed check so callers can print the full damage report.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// True when a public key was supplied and the signature was checked
    /// against it; false means format-only mode.
    pub signature_checked: bool,
    pub signature_ok: bool,
    pub parts_ok: bool,
    pub masks_ok: bool,
    pub stats: Vec<FieldStats>,
    pub failures: Vec<String>,
}

impl VerifyReport {
    /// Overall verdict: signature, parts and masks all pass.
    pub fn passed(&self) -> bool {
        self.signature_ok && self.parts_ok && self.masks_ok
    }
}

/// Verify the pack in `dir`. Without a public key the signature is only
/// checked for well-formedness (base64, 64 bytes).
pub fn verify_pack(dir: &Path, public_key_b64: Option<&str>) -> Result<VerifyReport, Error> {
    let manifest_path = dir.join("manifest.json");
    if !manifest_path.exists() {
        return Err(Error::MissingManifest(dir.to_path_buf()));
    }
    let raw = fs::read_to_string(&manifest_path)?;
    // Both views of the same file: the typed manifest for structure, the
    // raw value for the canonical signing message.
    let value: Value = serde_json::from_str(&raw)?;
    let manifest: Manifest = serde_json::from_str(&raw)?;

    let mut report = VerifyReport::default();
    check_signature(&manifest, &value, public_key_b64, &mut report);
    check_parts(dir, &manifest, &mut report);
    check_masks(dir, &manifest, &mut report);
    collect_stats(dir, &manifest, &mut report);
    Ok(report)
}

fn check_signature(
    manifest: &Manifest,
    value: &Value,
    public_key_b64: Option<&str>,
    report: &mut VerifyReport,
) {
    let Some(signing) = &manifest.signing else {
        report.failures.push("manifest has no signing block".into());
        return;
    };
    if signing.alg != "ed25519" {
        report
            .failures
            .push(format!("unsupported signature algorithm {:?}", signing.alg));
        return;
    }

    match public_key_b64 {
        Some(pubkey) => {
            report.signature_checked = true;
            let msg = signing_message_of(value);
            match verify_detached(pubkey, &msg, &signing.sig_base64) {
                Ok(()) => report.signature_ok = true,
                Err(e) => report.failures.push(e.to_string()),
            }
        }
        None => match decode_signature(&signing.sig_base64) {
            Ok(_) => report.signature_ok = true,
            Err(e) => report.failures.push(e.to_string()),
        },
    }
}

fn check_parts(dir: &Path, manifest: &Manifest, report: &mut VerifyReport) {
    report.parts_ok = true;
    for part in &manifest.parts {
        let fail = |reason: String| Error::PartCorrupt {
            idx: part.idx,
            name: manifest
                .fields
                .get(part.idx)
                .cloned()
                .unwrap_or_default(),
            reason,
        };

        let Some(field) = manifest.fields.get(part.idx) else {
            report.parts_ok = false;
            report
                .failures
                .push(fail(format!("no field at index {}", part.idx)).to_string());
            continue;
        };
        let path = dir.join(format!("{field}.bin.zst"));
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                report.parts_ok = false;
                report.failures.push(fail(format!("unreadable: {e}")).to_string());
                continue;
            }
        };
        if bytes.len() != part.bytes {
            report.parts_ok = false;
            report.failures.push(
                fail(format!("size mismatch: {} != {}", bytes.len(), part.bytes)).to_string(),
            );
            continue;
        }
        let actual = sha256_hex(&bytes);
        if actual != part.sha256 {
            report.parts_ok = false;
            report.failures.push(fail("sha256 mismatch".into()).to_string());
        }
    }
}

fn check_masks(dir: &Path, manifest: &Manifest, report: &mut VerifyReport) {
    report.masks_ok = true;
    let expected_cells = manifest.grid.rows() * manifest.grid.cols();
    for (kind, filename) in &manifest.masks {
        let fail = |reason: String| Error::BadMask { kind: kind.clone(), reason };

        let result = fs::read(dir.join(filename))
            .map_err(|e| fail(format!("unreadable: {e}")))
            .and_then(|bytes| {
                decompress(&bytes).map_err(|e| fail(format!("decompression failed: {e}")))
            });
        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                report.masks_ok = false;
                report.failures.push(e.to_string());
                continue;
            }
        };
        if payload.len() != expected_cells {
            report.masks_ok = false;
            report.failures.push(
                fail(format!("{} cells, grid has {expected_cells}", payload.len())).to_string(),
            );
            continue;
        }
        if let Some(v) = payload.iter().find(|&&v| v > 1) {
            report.masks_ok = false;
            report
                .failures
                .push(fail(format!("cell value {v} outside {{0, 1}}")).to_string());
        }
    }
}

/// Decompress each field part and summarize the float payload. Purely
/// diagnostic; unreadable parts were already reported by the part check.
fn collect_stats(dir: &Path, manifest: &Manifest, report: &mut VerifyReport) {
    for part in &manifest.parts {
        let Some(field) = manifest.fields.get(part.idx) else { continue };
        let Ok(bytes) = fs::read(dir.join(format!("{field}.bin.zst"))) else { continue };
        let Ok(payload) = decompress(&bytes) else { continue };
        if payload.len() % 4 != 0 {
            continue;
        }
        let values: Vec<f32> = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .collect();
        if values.is_empty() {
            continue;
        }
        let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0f64);
        for &v in &values {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }
        report.stats.push(FieldStats {
            name: field.clone(),
            count: values.len(),
            min,
            max,
            mean: (sum / values.len() as f64) as f32,
        });
    }
}
