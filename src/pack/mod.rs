mod verify;
mod write;

use ndarray::Array2;

pub use verify::{verify_pack, FieldStats, VerifyReport};
pub use write::write_pack;

/// Row-major little-endian f32 payload of a field.
pub(crate) fn field_payload(values: &Array2<f32>) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for &v in values.iter() {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Row-major u8 payload of a mask.
pub(crate) fn mask_payload(values: &Array2<u8>) -> Vec<u8> {
    values.iter().copied().collect()
}
