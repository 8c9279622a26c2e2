//! A minimal little-endian gridded container used by tests and demo
//! builds. Real forecast feeds (GRIB, NetCDF) arrive through external
//! adapters implementing [`SourceReader`]; this one exists so the whole
//! pipeline can be driven from plain files with no scientific-format
//! dependencies.
//!
//! Layout: `SGRD` magic, u32 lat/lon/var counts, f64 latitude axis,
//! f64 longitude axis, then per variable a u32-length-prefixed UTF-8
//! name followed by the row-major f32 plane.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;

use crate::error::Error;

use super::{SourceData, SourceReader};

const MAGIC: &[u8; 4] = b"SGRD";

/// Keeps a corrupt header from asking for gigabytes of axis data.
const MAX_AXIS_LEN: u32 = 1 << 24;
const MAX_NAME_LEN: u32 = 256;

/// Reader half of the flat container.
#[derive(Debug, Default)]
pub struct FlatGridSource;

impl SourceReader for FlatGridSource {
    fn read(&self, path: &Path) -> Result<SourceData, Error> {
        read_flat_source(path).map_err(|e| match e {
            e @ Error::Ingest { .. } => e,
            other => Error::Ingest {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }
}

fn read_flat_source(path: &Path) -> Result<SourceData, Error> {
    let bad = |reason: String| Error::Ingest {
        path: path.to_path_buf(),
        reason,
    };
    let mut r = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(bad(format!("bad magic {magic:?}, expected {MAGIC:?}")));
    }

    let n_lats = read_u32(&mut r)?;
    let n_lons = read_u32(&mut r)?;
    let n_vars = read_u32(&mut r)?;
    if n_lats > MAX_AXIS_LEN || n_lons > MAX_AXIS_LEN {
        return Err(bad(format!("implausible axis lengths {n_lats}x{n_lons}")));
    }

    let lats = read_f64s(&mut r, n_lats as usize)?;
    let lons = read_f64s(&mut r, n_lons as usize)?;

    let mut vars = Vec::with_capacity(n_vars as usize);
    for _ in 0..n_vars {
        let name_len = read_u32(&mut r)?;
        if name_len > MAX_NAME_LEN {
            return Err(bad(format!("variable name length {name_len}")));
        }
        let mut name = vec![0u8; name_len as usize];
        r.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|_| bad("variable name is not UTF-8".into()))?;

        let mut plane = Vec::with_capacity(n_lats as usize * n_lons as usize);
        let mut b = [0u8; 4];
        for _ in 0..n_lats as usize * n_lons as usize {
            r.read_exact(&mut b)?;
            plane.push(f32::from_le_bytes(b));
        }
        let values = Array2::from_shape_vec((n_lats as usize, n_lons as usize), plane)
            .expect("shape matches the vec length by construction");
        vars.push((name, values));
    }

    SourceData::new(lats, lons, vars).map_err(|e| bad(e.to_string()))
}

/// Writer half, the exact inverse of [`FlatGridSource`].
pub fn write_flat_source(
    path: &Path,
    lats: &[f64],
    lons: &[f64],
    vars: &[(&str, Array2<f32>)],
) -> Result<(), Error> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(MAGIC)?;
    w.write_all(&(lats.len() as u32).to_le_bytes())?;
    w.write_all(&(lons.len() as u32).to_le_bytes())?;
    w.write_all(&(vars.len() as u32).to_le_bytes())?;
    for &v in lats.iter().chain(lons.iter()) {
        w.write_all(&v.to_le_bytes())?;
    }
    for (name, values) in vars {
        w.write_all(&(name.len() as u32).to_le_bytes())?;
        w.write_all(name.as_bytes())?;
        for &v in values.iter() {
            w.write_all(&v.to_le_bytes())?;
        }
    }
    w.flush()?;
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, Error> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_f64s<R: Read>(r: &mut R, n: usize) -> Result<Vec<f64>, Error> {
    let mut out = Vec::with_capacity(n);
    let mut b = [0u8; 8];
    for _ in 0..n {
        r.read_exact(&mut b)?;
        out.push(f64::from_le_bytes(b));
    }
    Ok(out)
}
