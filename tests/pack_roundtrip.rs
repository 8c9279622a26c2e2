//! End-to-end pack scenarios: build a small wind-only pack into a temp
//! directory, then attack it the way a corrupted download would.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ndarray::Array2;
use tempfile::TempDir;

use seapack::{
    decompress, dilate, synth_land, synth_restricted, synth_shallow, verify_pack, write_pack,
    Grid, Manifest, PackSigner,
};

const SEED: [u8; 32] = [0u8; 32];

/// Reference NATL grid: 61 rows x 141 cols.
fn natl_grid() -> Grid {
    Grid::parse("30/60/-80/-10/0.5").unwrap()
}

/// Build the S1 pack: constant wind_u = 5.0, wind_v = 2.0, synthesized
/// masks with the one-cell coastal margin.
fn build_wind_pack(dir: &Path) -> (Manifest, PackSigner) {
    let grid = natl_grid();
    let shape = (grid.rows(), grid.cols());
    let fields = vec![
        ("wind_u".to_string(), Array2::from_elem(shape, 5.0f32)),
        ("wind_v".to_string(), Array2::from_elem(shape, 2.0f32)),
    ];
    let masks = vec![
        ("land", dilate(&synth_land(&grid), 1)),
        ("shallow", dilate(&synth_shallow(&grid, 20.0), 1)),
        ("restricted", dilate(&synth_restricted(&grid), 1)),
    ];
    let signer = PackSigner::from_seed(&SEED, "pack-key-1").unwrap();
    let manifest = write_pack(
        dir,
        "NATL_050",
        "2025-09-15T12:00:00Z",
        grid,
        &fields,
        &masks,
        &signer,
    )
    .unwrap();
    (manifest, signer)
}

#[test]
fn minimal_pack_layout_and_payloads() {
    let tmp = TempDir::new().unwrap();
    let (manifest, signer) = build_wind_pack(tmp.path());

    assert_eq!(manifest.fields, ["wind_u", "wind_v"]);
    assert_eq!(manifest.parts.len(), 2);
    assert_eq!(manifest.times_iso, ["2025-09-15T12:00:00Z"]);
    assert_eq!(
        manifest.masks.keys().collect::<Vec<_>>(),
        ["land", "restricted", "shallow"]
    );

    // Each field decompresses to 61 * 141 * 4 bytes of the constant.
    for (name, constant) in [("wind_u", 5.0f32), ("wind_v", 2.0f32)] {
        let compressed = fs::read(tmp.path().join(format!("{name}.bin.zst"))).unwrap();
        let payload = decompress(&compressed).unwrap();
        assert_eq!(payload.len(), 34_404);
        for chunk in payload.chunks_exact(4) {
            assert_eq!(f32::from_le_bytes(chunk.try_into().unwrap()), constant);
        }
    }

    // Part metadata matches what landed on disk.
    for part in &manifest.parts {
        let path = tmp.path().join(format!("{}.bin.zst", manifest.fields[part.idx]));
        assert_eq!(fs::metadata(&path).unwrap().len() as usize, part.bytes);
    }

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(report.passed(), "failures: {:?}", report.failures);
    assert!(report.signature_checked);
    let wind_u = report.stats.iter().find(|s| s.name == "wind_u").unwrap();
    assert_eq!((wind_u.min, wind_u.max, wind_u.mean), (5.0, 5.0, 5.0));
    assert_eq!(wind_u.count, 61 * 141);
}

#[test]
fn builds_are_deterministic() {
    let tmp_a = TempDir::new().unwrap();
    let tmp_b = TempDir::new().unwrap();
    build_wind_pack(tmp_a.path());
    build_wind_pack(tmp_b.path());
    for entry in fs::read_dir(tmp_a.path()).unwrap() {
        let name = entry.unwrap().file_name();
        assert_eq!(
            fs::read(tmp_a.path().join(&name)).unwrap(),
            fs::read(tmp_b.path().join(&name)).unwrap(),
            "{name:?} differs between identical builds"
        );
    }
}

#[test]
fn tampered_signature_fails_verification() {
    let tmp = TempDir::new().unwrap();
    let (_, signer) = build_wind_pack(tmp.path());

    let manifest_path = tmp.path().join("manifest.json");
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    let sig = value["signing"]["sig_base64"].as_str().unwrap();
    let mut chars: Vec<char> = sig.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    value["signing"]["sig_base64"] = serde_json::Value::String(chars.into_iter().collect());
    fs::write(&manifest_path, serde_json::to_string_pretty(&value).unwrap()).unwrap();

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(!report.signature_ok);
    assert!(!report.passed());
    assert!(report.failures.iter().any(|f| f.contains("signature")));
    // Parts and masks are untouched and still pass.
    assert!(report.parts_ok);
    assert!(report.masks_ok);
}

#[test]
fn tampered_manifest_field_fails_verification() {
    let tmp = TempDir::new().unwrap();
    let (_, signer) = build_wind_pack(tmp.path());

    let manifest_path = tmp.path().join("manifest.json");
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    value["region"] = serde_json::Value::String("NATL_051".into());
    fs::write(&manifest_path, serde_json::to_string_pretty(&value).unwrap()).unwrap();

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(!report.signature_ok);
}

#[test]
fn reordered_manifest_keys_still_verify() {
    let tmp = TempDir::new().unwrap();
    let (_, signer) = build_wind_pack(tmp.path());

    // Rewrite the manifest compact with top-level keys in reverse order;
    // the canonical signing form must be unaffected.
    let manifest_path = tmp.path().join("manifest.json");
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    let obj = value.as_object().unwrap();
    let members: Vec<String> = obj
        .keys()
        .rev()
        .map(|k| format!("{}:{}", serde_json::Value::String(k.clone()), obj[k]))
        .collect();
    fs::write(&manifest_path, format!("{{{}}}", members.join(","))).unwrap();

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(report.passed(), "failures: {:?}", report.failures);
}

#[test]
fn tampered_part_is_reported_by_index() {
    let tmp = TempDir::new().unwrap();
    let (_, signer) = build_wind_pack(tmp.path());

    let part_path = tmp.path().join("wind_u.bin.zst");
    let mut bytes = fs::read(&part_path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    fs::write(&part_path, &bytes).unwrap();

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(!report.parts_ok);
    assert!(!report.passed());
    assert!(report
        .failures
        .iter()
        .any(|f| f.contains("part 0") && f.contains("wind_u")));
    // The signature covers the manifest, not the part bytes.
    assert!(report.signature_ok);
}

#[test]
fn corrupt_mask_values_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let (_, signer) = build_wind_pack(tmp.path());

    let grid = natl_grid();
    let bogus = vec![2u8; grid.rows() * grid.cols()];
    let compressed = seapack::compress(&bogus, seapack::DEFAULT_COMPRESSION_LEVEL).unwrap();
    fs::write(tmp.path().join("mask_land.bin.zst"), compressed).unwrap();

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(!report.masks_ok);
    assert!(!report.passed());
    assert!(report.failures.iter().any(|f| f.contains("mask land")));
}

#[test]
fn zero_seed_signature_is_64_bytes_and_valid() {
    let tmp = TempDir::new().unwrap();
    let (manifest, signer) = build_wind_pack(tmp.path());

    let signing = manifest.signing.as_ref().unwrap();
    let sig = BASE64.decode(&signing.sig_base64).unwrap();
    assert_eq!(sig.len(), 64);
    assert_eq!(signing.alg, "ed25519");
    assert_eq!(signing.key_id, "pack-key-1");

    let report = verify_pack(tmp.path(), Some(&signer.public_key_base64())).unwrap();
    assert!(report.signature_ok);
}

#[test]
fn missing_manifest_is_a_hard_error() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        verify_pack(tmp.path(), None),
        Err(seapack::Error::MissingManifest(_))
    ));
}

#[test]
fn format_only_verification_without_public_key() {
    let tmp = TempDir::new().unwrap();
    build_wind_pack(tmp.path());
    let report = verify_pack(tmp.path(), None).unwrap();
    assert!(!report.signature_checked);
    assert!(report.passed());
}

#[test]
fn masks_is_never_more_than_the_known_kinds() {
    let tmp = TempDir::new().unwrap();
    let (manifest, _) = build_wind_pack(tmp.path());
    assert!(manifest
        .masks
        .keys()
        .all(|k| ["land", "shallow", "restricted"].contains(&k.as_str())));
}
