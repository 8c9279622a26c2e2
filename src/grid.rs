use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Row and column counts may not exceed this (keeps indices within i32/u32
/// range on every consumer platform).
const MAX_AXIS_CELLS: i64 = 1 << 31;

/// A uniform latitude/longitude raster: bounds plus a single step `d`
/// shared by both axes. Cell `(r, c)` is centered on
/// `(lat0 + r*d, lon0 + c*d)` with latitude as the slow (row) axis.
///
/// Serialized verbatim as the `grid` object of the pack manifest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub lat0: f64,
    pub lat1: f64,
    pub lon0: f64,
    pub lon1: f64,
    pub d: f64,
}

impl Grid {
    /// Validate bounds and step, returning the grid value.
    pub fn from_spec(lat0: f64, lat1: f64, lon0: f64, lon1: f64, d: f64) -> Result<Self, Error> {
        let vals = [lat0, lat1, lon0, lon1, d];
        if vals.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidGrid("non-finite bound or step".into()));
        }
        if !(-90.0..=90.0).contains(&lat0) || !(-90.0..=90.0).contains(&lat1) {
            return Err(Error::InvalidGrid(format!(
                "latitude bounds {lat0}/{lat1} outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lon0) || !(-180.0..=180.0).contains(&lon1) {
            return Err(Error::InvalidGrid(format!(
                "longitude bounds {lon0}/{lon1} outside [-180, 180]"
            )));
        }
        if lat1 < lat0 || lon1 < lon0 {
            return Err(Error::InvalidGrid(format!(
                "inverted bounds {lat0}/{lat1}/{lon0}/{lon1}"
            )));
        }
        if d <= 0.0 {
            return Err(Error::InvalidGrid(format!("step {d} must be positive")));
        }
        let grid = Self { lat0, lat1, lon0, lon1, d };
        let (rows, cols) = (grid.axis_cells(lat0, lat1), grid.axis_cells(lon0, lon1));
        if rows >= MAX_AXIS_CELLS || cols >= MAX_AXIS_CELLS {
            return Err(Error::InvalidGrid(format!(
                "{rows}x{cols} cells exceeds the supported raster size"
            )));
        }
        Ok(grid)
    }

    /// Parse the CLI wire form `lat0/lat1/lon0/lon1/d`.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let parts = spec
            .split('/')
            .map(|s| s.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidGrid(format!("{spec:?}: {e}")))?;
        match parts[..] {
            [lat0, lat1, lon0, lon1, d] => Self::from_spec(lat0, lat1, lon0, lon1, d),
            _ => Err(Error::InvalidGrid(format!(
                "{spec:?}: expected five '/'-separated numbers"
            ))),
        }
    }

    fn axis_cells(&self, lo: f64, hi: f64) -> i64 {
        ((hi - lo) / self.d).round() as i64 + 1
    }

    /// Number of latitude rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.axis_cells(self.lat0, self.lat1) as usize
    }

    /// Number of longitude columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.axis_cells(self.lon0, self.lon1) as usize
    }

    /// Latitude of the center of row `r`.
    #[inline]
    pub fn lat_of(&self, r: usize) -> f64 {
        self.lat0 + r as f64 * self.d
    }

    /// Longitude of the center of column `c`.
    #[inline]
    pub fn lon_of(&self, c: usize) -> f64 {
        self.lon0 + c as f64 * self.d
    }

    /// Cell-center latitudes, south to north.
    pub fn lats(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows()).map(|r| self.lat_of(r))
    }

    /// Cell-center longitudes, west to east.
    pub fn lons(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.cols()).map(|c| self.lon_of(c))
    }

    /// Row containing `lat`. May be out of range; callers clamp.
    #[inline]
    pub fn row_of(&self, lat: f64) -> i64 {
        ((lat - self.lat0) / self.d).floor() as i64
    }

    /// Column containing `lon`. May be out of range; callers clamp.
    #[inline]
    pub fn col_of(&self, lon: f64) -> i64 {
        ((lon - self.lon0) / self.d).floor() as i64
    }
}
