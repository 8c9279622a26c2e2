//! The pack manifest: schema, canonical signing form, and the attach /
//! strip / re-verify cycle.
//!
//! Two serializations exist on purpose. The on-disk `manifest.json` is
//! pretty-printed for human inspection and carries the `signing` block.
//! The signing message is the canonical form: the manifest WITHOUT
//! `signing`, serialized with lexicographically sorted object keys and
//! compact separators. Verifiers recompute the message from the parsed
//! on-disk JSON, so reordering or reformatting the file cannot change
//! what was signed.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Error;
use crate::grid::Grid;
use crate::sign::PackSigner;

pub const SCHEMA_VERSION: u32 = 1;

/// Size and content hash of one compressed field artifact, index-aligned
/// with the manifest `fields` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    pub idx: usize,
    pub bytes: usize,
    pub sha256: String,
}

/// The attached signature block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signing {
    pub alg: String,
    pub key_id: String,
    pub sig_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub region: String,
    pub cycle_iso: String,
    pub grid: Grid,
    pub times_iso: Vec<String>,
    pub fields: Vec<String>,
    pub parts: Vec<PartInfo>,
    pub masks: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<Signing>,
}

impl Manifest {
    /// Assemble an unsigned manifest. `times_iso` is the single cycle
    /// instant until multi-step packs exist.
    pub fn new(
        region: impl Into<String>,
        cycle_iso: impl Into<String>,
        grid: Grid,
        fields: Vec<String>,
        parts: Vec<PartInfo>,
        masks: BTreeMap<String, String>,
    ) -> Self {
        let cycle_iso = cycle_iso.into();
        Self {
            schema_version: SCHEMA_VERSION,
            region: region.into(),
            cycle_iso: cycle_iso.clone(),
            grid,
            times_iso: vec![cycle_iso],
            fields,
            parts,
            masks,
            signing: None,
        }
    }

    /// UTF-8 bytes of the canonical form with `signing` stripped — the
    /// exact message the signature covers.
    pub fn signing_message(&self) -> Result<Vec<u8>, Error> {
        let value = serde_json::to_value(self)?;
        Ok(signing_message_of(&value))
    }

    /// Sign the canonical form and attach the `signing` block.
    pub fn sign(&mut self, signer: &PackSigner) -> Result<(), Error> {
        self.signing = None;
        let msg = self.signing_message()?;
        self.signing = Some(Signing {
            alg: "ed25519".into(),
            key_id: signer.key_id().to_string(),
            sig_base64: signer.sign_base64(&msg),
        });
        Ok(())
    }
}

/// Canonical signing message of an already-parsed manifest value: strip
/// `signing`, canonicalize the rest.
pub fn signing_message_of(manifest: &Value) -> Vec<u8> {
    let mut stripped = manifest.clone();
    if let Value::Object(map) = &mut stripped {
        map.remove("signing");
    }
    canonical_json(&stripped).into_bytes()
}

/// Deterministic JSON: object keys sorted lexicographically at every
/// level, `,` and `:` separators with no whitespace. Kept independent of
/// any serializer defaults so the signing form can never drift.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Scalar serialization (incl. string escaping) delegates
                // to serde_json; only the structure is hand-written.
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Normalize a cycle instant to the canonical trailing-`Z` UTC form.
/// Zone-less timestamps are assumed UTC; explicit offsets are converted.
pub fn normalize_cycle_iso(cycle: &str) -> Result<String, Error> {
    let utc: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(cycle) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(cycle, "%Y-%m-%dT%H:%M:%S") {
        naive.and_utc()
    } else {
        return Err(Error::InvalidCycle(format!(
            "{cycle:?} is not an ISO-8601 instant"
        )));
    };
    Ok(utc.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
