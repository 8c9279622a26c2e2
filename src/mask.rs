//! Safety-mask rasterization and synthesis.
//!
//! Masks are dense row-major `u8` rasters on the pack grid, one byte per
//! cell, 1 = unsafe (land / shallow / restricted). The land mask comes
//! from coastline polygons when a shapefile is available; the other two
//! are rule-based placeholders until real bathymetry and regulatory
//! sources are wired in.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;

use crate::error::Error;
use crate::grid::Grid;
use crate::shapefile::Polygon;

/// Burn coastline polygons into a land mask. For each polygon only the
/// grid window covering its bbox (padded one cell each way) is scanned,
/// and cells already set are not re-tested, so overlapping polygons cost
/// one point-in-polygon test per cell at most.
pub fn rasterize(polygons: &[Polygon], grid: &Grid) -> Array2<u8> {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut mask = Array2::<u8>::zeros((rows, cols));

    for poly in polygons {
        let (minx, miny, maxx, maxy) = poly.bbox;
        let r_start = (grid.row_of(miny) - 1).clamp(0, rows as i64 - 1) as usize;
        let r_end = (grid.row_of(maxy) + 1).clamp(0, rows as i64 - 1) as usize;
        let c_start = (grid.col_of(minx) - 1).clamp(0, cols as i64 - 1) as usize;
        let c_end = (grid.col_of(maxx) + 1).clamp(0, cols as i64 - 1) as usize;

        for r in r_start..=r_end {
            let lat = grid.lat_of(r);
            for c in c_start..=c_end {
                if mask[[r, c]] != 0 {
                    continue;
                }
                if poly.contains(grid.lon_of(c), lat) {
                    mask[[r, c]] = 1;
                }
            }
        }
    }
    mask
}

/// Placeholder land rules for builds without coastline data: polar caps
/// plus coarse continental boxes.
pub fn synth_land(grid: &Grid) -> Array2<u8> {
    let mut mask = Array2::<u8>::zeros((grid.rows(), grid.cols()));
    for (r, lat) in grid.lats().enumerate() {
        for (c, lon) in grid.lons().enumerate() {
            let land = lat > 60.0
                || lat < -60.0
                || (20.0 < lat && lat < 50.0 && -80.0 < lon && lon < -10.0)
                || (35.0 < lat && lat < 70.0 && -10.0 < lon && lon < 40.0)
                || (10.0 < lat && lat < 60.0 && 100.0 < lon && lon < 180.0);
            if land {
                mask[[r, c]] = 1;
            }
        }
    }
    mask
}

/// Placeholder shallow-water rules: a latitude-band depth model, cell set
/// when the modeled depth is under `depth_threshold` meters.
pub fn synth_shallow(grid: &Grid, depth_threshold: f64) -> Array2<u8> {
    let mut mask = Array2::<u8>::zeros((grid.rows(), grid.cols()));
    for (r, lat) in grid.lats().enumerate() {
        let depth = if lat.abs() < 10.0 {
            50.0
        } else if lat.abs() < 30.0 {
            30.0
        } else {
            15.0
        };
        if depth < depth_threshold {
            for c in 0..grid.cols() {
                mask[[r, c]] = 1;
            }
        }
    }
    mask
}

/// Placeholder restricted-area rules: a single demonstration zone.
pub fn synth_restricted(grid: &Grid) -> Array2<u8> {
    let mut mask = Array2::<u8>::zeros((grid.rows(), grid.cols()));
    for (r, lat) in grid.lats().enumerate() {
        for (c, lon) in grid.lons().enumerate() {
            if 25.0 < lat && lat < 30.0 && -80.0 < lon && lon < -75.0 {
                mask[[r, c]] = 1;
            }
        }
    }
    mask
}

/// 8-connected binary dilation with a 3x3 all-ones structuring element,
/// applied `iterations` times. Neighborhoods are clipped at the raster
/// edges. One iteration is the one-cell coastal safety margin.
pub fn dilate(mask: &Array2<u8>, iterations: usize) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    let mut current = mask.clone();
    for _ in 0..iterations {
        let mut next = Array2::<u8>::zeros((rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                let r_lo = r.saturating_sub(1);
                let r_hi = (r + 1).min(rows - 1);
                let c_lo = c.saturating_sub(1);
                let c_hi = (c + 1).min(cols - 1);
                'scan: for rr in r_lo..=r_hi {
                    for cc in c_lo..=c_hi {
                        if current[[rr, cc]] != 0 {
                            next[[r, c]] = 1;
                            break 'scan;
                        }
                    }
                }
            }
        }
        current = next;
    }
    current
}

/// Write the standalone land-mask sidecar: little-endian header of six
/// f64 (`lat0, lat1, lon0, lon1, dlat, dlon`), two u32 (`rows, cols`),
/// then `rows*cols` mask bytes, row-major.
pub fn write_sidecar(path: &Path, grid: &Grid, mask: &Array2<u8>) -> Result<(), Error> {
    let mut w = BufWriter::new(File::create(path)?);
    for v in [grid.lat0, grid.lat1, grid.lon0, grid.lon1, grid.d, grid.d] {
        w.write_all(&v.to_le_bytes())?;
    }
    w.write_all(&(mask.nrows() as u32).to_le_bytes())?;
    w.write_all(&(mask.ncols() as u32).to_le_bytes())?;
    for &v in mask.iter() {
        w.write_all(&[v])?;
    }
    w.flush()?;
    Ok(())
}

/// Read a sidecar back. The two step fields must agree since [`Grid`]
/// carries a single shared step.
pub fn read_sidecar(path: &Path) -> Result<(Grid, Array2<u8>), Error> {
    let mut r = BufReader::new(File::open(path)?);
    let mut f = [0u8; 8];
    let mut header = [0f64; 6];
    for v in header.iter_mut() {
        r.read_exact(&mut f)?;
        *v = f64::from_le_bytes(f);
    }
    let [lat0, lat1, lon0, lon1, dlat, dlon] = header;
    if dlat != dlon {
        return Err(Error::InvalidGrid(format!(
            "sidecar steps differ: dlat={dlat}, dlon={dlon}"
        )));
    }
    let grid = Grid::from_spec(lat0, lat1, lon0, lon1, dlat)?;

    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    let rows = u32::from_le_bytes(b) as usize;
    r.read_exact(&mut b)?;
    let cols = u32::from_le_bytes(b) as usize;
    if (rows, cols) != (grid.rows(), grid.cols()) {
        return Err(Error::InvalidGrid(format!(
            "sidecar claims {rows}x{cols}, grid derives {}x{}",
            grid.rows(),
            grid.cols()
        )));
    }

    let mut data = vec![0u8; rows * cols];
    r.read_exact(&mut data)?;
    let mask = Array2::from_shape_vec((rows, cols), data)
        .expect("shape matches the vec length by construction");
    Ok((grid, mask))
}
