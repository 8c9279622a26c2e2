//! Source ingestion: the adapter contract for gridded forecast files and
//! the bilinear regridding that puts every variable on the pack grid.
//!
//! Parsing of real forecast formats (GRIB, NetCDF) stays behind the
//! [`SourceReader`] seam; the build pipeline only sees [`SourceData`].

mod flat;

use std::path::Path;

use ndarray::Array2;

use crate::error::Error;
use crate::grid::Grid;

pub use flat::{FlatGridSource, write_flat_source};

/// The three source feeds a pack is built from. Each kind carries a fixed
/// variable-to-field renaming so downstream consumers always see the same
/// field names regardless of the upstream product's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Wind,
    Wave,
    Current,
}

impl SourceKind {
    /// `(source_variable, pack_field)` pairs, in pack field order.
    pub fn renames(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            SourceKind::Wind => &[("u", "wind_u"), ("v", "wind_v")],
            SourceKind::Wave => &[("hs", "wave_hs"), ("tp", "wave_tp"), ("dir", "wave_dir")],
            SourceKind::Current => &[("water_u", "cur_u"), ("water_v", "cur_v")],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Wind => "wind",
            SourceKind::Wave => "wave",
            SourceKind::Current => "current",
        }
    }
}

/// One time slice of a gridded source: labelled axes plus named 2-D
/// variables, latitude slow. Adapters handing over multi-step products
/// take the first time step.
#[derive(Debug, Clone)]
pub struct SourceData {
    lats: Vec<f64>,
    lons: Vec<f64>,
    vars: Vec<(String, Array2<f32>)>,
}

impl SourceData {
    /// Validates axes against variable shapes and normalizes a descending
    /// latitude axis by flipping it (and every variable) south-up.
    pub fn new(
        mut lats: Vec<f64>,
        lons: Vec<f64>,
        mut vars: Vec<(String, Array2<f32>)>,
    ) -> Result<Self, Error> {
        let bad = |reason: String| Error::Ingest { path: "<memory>".into(), reason };
        if lats.len() < 2 || lons.len() < 2 {
            return Err(bad("source axes need at least two points".into()));
        }
        for (name, values) in vars.iter() {
            if values.dim() != (lats.len(), lons.len()) {
                return Err(bad(format!(
                    "variable {name} has shape {:?}, axes are {}x{}",
                    values.dim(),
                    lats.len(),
                    lons.len()
                )));
            }
        }
        if lats.windows(2).all(|w| w[0] > w[1]) {
            lats.reverse();
            for (_, values) in vars.iter_mut() {
                *values = values.slice(ndarray::s![..;-1, ..]).to_owned();
            }
        }
        if !lats.windows(2).all(|w| w[0] < w[1]) {
            return Err(bad("latitude axis is not strictly monotonic".into()));
        }
        if !lons.windows(2).all(|w| w[0] < w[1]) {
            return Err(bad("longitude axis is not strictly ascending".into()));
        }
        Ok(Self { lats, lons, vars })
    }

    pub fn var(&self, name: &str) -> Option<&Array2<f32>> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values)
    }
}

/// Adapter seam for source file formats. Implementations parse one file
/// into a [`SourceData`] (first time step, 2-D variables).
pub trait SourceReader {
    fn read(&self, path: &Path) -> Result<SourceData, Error>;
}

/// Fractional position of `x` on an ascending axis, clamped to the axis
/// extent: returns `(i, t)` with the value bracketed by `axis[i]` and
/// `axis[i+1]` at fraction `t`. Queries outside the axis clamp to the
/// boundary, which makes regridding extrapolate the edge value.
fn axis_position(axis: &[f64], x: f64) -> (usize, f64) {
    let last = axis.len() - 1;
    if x <= axis[0] {
        return (0, 0.0);
    }
    if x >= axis[last] {
        return (last - 1, 1.0);
    }
    let i = axis.partition_point(|&a| a <= x) - 1;
    let i = i.min(last - 1);
    let t = (x - axis[i]) / (axis[i + 1] - axis[i]);
    (i, t)
}

/// Bilinear interpolation of one source variable onto the pack grid.
pub fn regrid(source: &SourceData, values: &Array2<f32>, grid: &Grid) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((grid.rows(), grid.cols()));

    // Precompute per-column lon positions; rows iterate the slow axis.
    let lon_pos: Vec<(usize, f64)> = grid
        .lons()
        .map(|lon| axis_position(&source.lons, lon))
        .collect();

    for (r, lat) in grid.lats().enumerate() {
        let (i, ty) = axis_position(&source.lats, lat);
        for (c, &(j, tx)) in lon_pos.iter().enumerate() {
            let v00 = values[[i, j]] as f64;
            let v01 = values[[i, j + 1]] as f64;
            let v10 = values[[i + 1, j]] as f64;
            let v11 = values[[i + 1, j + 1]] as f64;
            let top = v00 + (v01 - v00) * tx;
            let bot = v10 + (v11 - v10) * tx;
            out[[r, c]] = (top + (bot - top) * ty) as f32;
        }
    }
    out
}

/// Regrid and rename every variable of `kind`, in pack field order.
/// A missing variable fails the whole source; callers decide whether to
/// skip the source or abort the build.
pub fn ingest_source(
    kind: SourceKind,
    source: &SourceData,
    grid: &Grid,
) -> Result<Vec<(String, Array2<f32>)>, Error> {
    let mut fields = Vec::with_capacity(kind.renames().len());
    for &(var, field) in kind.renames() {
        let values = source.var(var).ok_or_else(|| Error::Ingest {
            path: "<memory>".into(),
            reason: format!("{} source has no variable {var:?}", kind.as_str()),
        })?;
        fields.push((field.to_string(), regrid(source, values, grid)));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    /// A plane `f(lat, lon) = 2*lat + lon` sampled on the given axes.
    fn plane(lats: &[f64], lons: &[f64]) -> Array2<f32> {
        Array2::from_shape_fn((lats.len(), lons.len()), |(i, j)| {
            (2.0 * lats[i] + lons[j]) as f32
        })
    }

    #[test]
    fn bilinear_reproduces_a_plane() {
        let lats = vec![0.0, 2.0, 4.0, 6.0];
        let lons = vec![10.0, 11.0, 14.0];
        let source =
            SourceData::new(lats.clone(), lons.clone(), vec![("u".into(), plane(&lats, &lons))])
                .unwrap();
        let grid = Grid::from_spec(1.0, 5.0, 10.5, 13.5, 0.5).unwrap();
        let out = regrid(&source, source.var("u").unwrap(), &grid);
        for (r, lat) in grid.lats().enumerate() {
            for (c, lon) in grid.lons().enumerate() {
                let expect = (2.0 * lat + lon) as f32;
                assert!((out[[r, c]] - expect).abs() < 1e-4, "({lat}, {lon})");
            }
        }
    }

    #[test]
    fn outside_queries_clamp_to_the_edge() {
        let lats = vec![0.0, 1.0];
        let lons = vec![0.0, 1.0];
        let source = SourceData::new(
            lats,
            lons,
            vec![("u".into(), arr2(&[[1.0f32, 2.0], [3.0, 4.0]]))],
        )
        .unwrap();
        // Grid entirely northeast of the source: every cell sees the
        // nearest corner value.
        let grid = Grid::from_spec(5.0, 6.0, 5.0, 6.0, 1.0).unwrap();
        let out = regrid(&source, source.var("u").unwrap(), &grid);
        assert!(out.iter().all(|&v| v == 4.0));
    }

    #[test]
    fn descending_latitudes_are_flipped() {
        let source = SourceData::new(
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![("u".into(), arr2(&[[10.0f32, 11.0], [20.0, 21.0]]))],
        )
        .unwrap();
        // Row 0 must now be the southern row (lat 0) that held 20/21.
        assert_eq!(source.var("u").unwrap()[[0, 0]], 20.0);
        assert_eq!(source.var("u").unwrap()[[1, 1]], 11.0);
    }

    #[test]
    fn ingest_renames_in_field_order() {
        let lats = vec![0.0, 1.0];
        let lons = vec![0.0, 1.0];
        let half = arr2(&[[0.5f32, 0.5], [0.5, 0.5]]);
        let source = SourceData::new(
            lats,
            lons,
            vec![("v".into(), half.clone()), ("u".into(), half)],
        )
        .unwrap();
        let grid = Grid::from_spec(0.0, 1.0, 0.0, 1.0, 1.0).unwrap();
        let fields = ingest_source(SourceKind::Wind, &source, &grid).unwrap();
        let names: Vec<_> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["wind_u", "wind_v"]);
    }

    #[test]
    fn missing_variable_is_an_ingest_error() {
        let source = SourceData::new(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![("hs".into(), arr2(&[[1.0f32, 1.0], [1.0, 1.0]]))],
        )
        .unwrap();
        let grid = Grid::from_spec(0.0, 1.0, 0.0, 1.0, 1.0).unwrap();
        let err = ingest_source(SourceKind::Wave, &source, &grid).unwrap_err();
        assert!(matches!(err, Error::Ingest { .. }));
    }
}
