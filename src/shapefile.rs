//! Minimal binary shapefile reader for polygon coastline data.
//!
//! Only the two record types that appear in coastline products are
//! handled: null shapes (skipped) and 2-D polygons. Measures and Z
//! coordinates are not supported.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use log::warn;

use crate::error::Error;

/// Magic file code at offset 0 of the 100-byte header, big-endian.
const FILE_CODE: i32 = 9994;

const SHAPE_NULL: i32 = 0;
const SHAPE_POLYGON: i32 = 5;

/// Keeps a horizontal ray-cast from dividing by zero on horizontal edges.
const RAY_EPS: f64 = 1e-15;

/// A closed ring of `(lon, lat)` points with its cached signed area.
#[derive(Debug, Clone)]
pub struct Ring {
    points: Vec<(f64, f64)>,
    area: f64,
}

impl Ring {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        let area = signed_area(&points);
        Self { points, area }
    }

    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    #[inline]
    pub fn signed_area(&self) -> f64 {
        self.area
    }

    /// Negative signed area; these rings are holes.
    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.area < 0.0
    }

    /// Horizontal east-facing ray cast. The closing edge (last -> first)
    /// is walked explicitly so callers need not duplicate the start point.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let pts = &self.points;
        let mut inside = false;
        for i in 0..pts.len() {
            let (x1, y1) = pts[i];
            let (x2, y2) = pts[(i + 1) % pts.len()];
            if (y1 > lat) != (y2 > lat) {
                let xint = (x2 - x1) * (lat - y1) / (y2 - y1 + RAY_EPS) + x1;
                if xint > lon {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// Shoelace sum over the ring, closing the loop from last back to first.
/// Positive for counter-clockwise winding.
pub fn signed_area(points: &[(f64, f64)]) -> f64 {
    let mut area = 0.0;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        area += x1 * y2 - x2 * y1;
    }
    0.5 * area
}

/// One outer ring plus zero or more holes, with the outer bbox cached
/// for cheap rejection during rasterization.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub outer: Ring,
    pub holes: Vec<Ring>,
    /// `(minx, miny, maxx, maxy)` of the outer ring, i.e. lon/lat extents.
    pub bbox: (f64, f64, f64, f64),
}

impl Polygon {
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        let (mut minx, mut miny) = (f64::INFINITY, f64::INFINITY);
        let (mut maxx, mut maxy) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in outer.points() {
            minx = minx.min(x);
            miny = miny.min(y);
            maxx = maxx.max(x);
            maxy = maxy.max(y);
        }
        Self { outer, holes, bbox: (minx, miny, maxx, maxy) }
    }

    /// True when `(lon, lat)` is inside the outer ring and in no hole.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let (minx, miny, maxx, maxy) = self.bbox;
        if lon < minx || lon > maxx || lat < miny || lat > maxy {
            return false;
        }
        if !self.outer.contains(lon, lat) {
            return false;
        }
        !self.holes.iter().any(|hole| hole.contains(lon, lat))
    }
}

/// Read all polygons from a shapefile on disk.
pub fn read_polygons_from_path(path: &Path) -> Result<Vec<Polygon>, Error> {
    let file = File::open(path)?;
    read_polygons(&mut BufReader::new(file))
}

/// Read all polygons from `.shp` bytes: the 100-byte header, then
/// big-endian record headers each followed by little-endian content.
pub fn read_polygons<R: Read>(reader: &mut R) -> Result<Vec<Polygon>, Error> {
    let mut header = [0u8; 100];
    reader
        .read_exact(&mut header)
        .map_err(|_| Error::InvalidShapefile("truncated 100-byte header".into()))?;
    let file_code = i32::from_be_bytes(header[0..4].try_into().unwrap());
    if file_code != FILE_CODE {
        return Err(Error::InvalidShapefile(format!(
            "file code {file_code}, expected {FILE_CODE}"
        )));
    }

    let mut polygons = Vec::new();
    loop {
        // 8-byte record header: record number and content length in
        // 16-bit words, both big-endian. Clean EOF here ends the file;
        // a partial header does not.
        let mut rec_header = [0u8; 8];
        let got = read_up_to(reader, &mut rec_header)?;
        if got == 0 {
            break;
        }
        if got < rec_header.len() {
            return Err(Error::InvalidShapefile(format!(
                "{got}-byte trailing fragment where a record header was expected"
            )));
        }
        let rec_num = i32::from_be_bytes(rec_header[0..4].try_into().unwrap());
        let content_words = i32::from_be_bytes(rec_header[4..8].try_into().unwrap());
        if content_words < 2 {
            return Err(Error::CorruptRecord {
                num: rec_num,
                reason: format!("content length {content_words} words"),
            });
        }

        let mut content = vec![0u8; content_words as usize * 2];
        reader.read_exact(&mut content).map_err(|_| Error::CorruptRecord {
            num: rec_num,
            reason: "unexpected EOF in record content".into(),
        })?;

        let shape_type = i32::from_le_bytes(content[0..4].try_into().unwrap());
        match shape_type {
            SHAPE_NULL => continue,
            SHAPE_POLYGON => parse_polygon_record(rec_num, &content, &mut polygons)?,
            other => return Err(Error::UnsupportedShape(other)),
        }
    }
    Ok(polygons)
}

/// Fill as much of `buf` as the reader has left, returning the count.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Polygon record content, little-endian: shape type, 4xf64 bbox,
/// i32 num_parts, i32 num_points, part start offsets, (x, y) pairs.
fn parse_polygon_record(
    rec_num: i32,
    content: &[u8],
    polygons: &mut Vec<Polygon>,
) -> Result<(), Error> {
    let corrupt = |reason: String| Error::CorruptRecord { num: rec_num, reason };

    // Shape type (4) + bbox (32) + num_parts (4) + num_points (4).
    if content.len() < 44 {
        return Err(corrupt(format!("polygon content too short ({} bytes)", content.len())));
    }
    let num_parts = i32::from_le_bytes(content[36..40].try_into().unwrap());
    let num_points = i32::from_le_bytes(content[40..44].try_into().unwrap());
    if num_parts < 0 || num_points < 0 {
        return Err(corrupt(format!("negative counts {num_parts}/{num_points}")));
    }
    let (num_parts, num_points) = (num_parts as usize, num_points as usize);

    let need = 44 + 4 * num_parts + 16 * num_points;
    if content.len() < need {
        return Err(corrupt(format!(
            "{} content bytes, need {need} for {num_parts} parts / {num_points} points",
            content.len()
        )));
    }

    let mut offset = 44;
    let mut part_starts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        let start = i32::from_le_bytes(content[offset..offset + 4].try_into().unwrap());
        if start < 0 || start as usize > num_points {
            return Err(corrupt(format!("part offset {start} out of range")));
        }
        part_starts.push(start as usize);
        offset += 4;
    }

    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let x = f64::from_le_bytes(content[offset..offset + 8].try_into().unwrap());
        let y = f64::from_le_bytes(content[offset + 8..offset + 16].try_into().unwrap());
        points.push((x, y));
        offset += 16;
    }

    // Split the point run at part offsets; rings need at least 4 points
    // (first == last) to enclose anything.
    let mut rings = Vec::with_capacity(num_parts);
    for (i, &start) in part_starts.iter().enumerate() {
        let end = part_starts.get(i + 1).copied().unwrap_or(num_points);
        if end < start {
            return Err(corrupt(format!("part offsets not monotonic at part {i}")));
        }
        let ring_points = &points[start..end];
        if ring_points.len() < 4 {
            warn!("record {rec_num}: dropping degenerate ring with {} points", ring_points.len());
            continue;
        }
        rings.push(Ring::new(ring_points.to_vec()));
    }

    // Group rings in file order: a counter-clockwise ring starts a new
    // polygon, clockwise rings are holes of the one currently open.
    let mut current_outer: Option<Ring> = None;
    let mut holes = Vec::new();
    for ring in rings {
        if ring.is_clockwise() {
            if current_outer.is_none() {
                warn!("record {rec_num}: hole ring before any outer ring, skipping");
                continue;
            }
            holes.push(ring);
        } else {
            if let Some(outer) = current_outer.take() {
                polygons.push(Polygon::new(outer, std::mem::take(&mut holes)));
            }
            current_outer = Some(ring);
        }
    }
    if let Some(outer) = current_outer {
        polygons.push(Polygon::new(outer, holes));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble `.shp` bytes for a list of polygon records, each record a
    /// list of rings given as point sequences.
    fn synth_shapefile(records: &[Vec<Vec<(f64, f64)>>]) -> Vec<u8> {
        let mut out = vec![0u8; 100];
        out[0..4].copy_from_slice(&FILE_CODE.to_be_bytes());
        for (i, rings) in records.iter().enumerate() {
            let num_points: usize = rings.iter().map(|r| r.len()).sum();
            let mut content = Vec::new();
            content.extend_from_slice(&SHAPE_POLYGON.to_le_bytes());
            for _ in 0..4 {
                content.extend_from_slice(&0f64.to_le_bytes()); // bbox, unused
            }
            content.extend_from_slice(&(rings.len() as i32).to_le_bytes());
            content.extend_from_slice(&(num_points as i32).to_le_bytes());
            let mut start = 0i32;
            for ring in rings.iter() {
                content.extend_from_slice(&start.to_le_bytes());
                start += ring.len() as i32;
            }
            for ring in rings.iter() {
                for &(x, y) in ring {
                    content.extend_from_slice(&x.to_le_bytes());
                    content.extend_from_slice(&y.to_le_bytes());
                }
            }
            assert_eq!(content.len() % 2, 0);
            out.extend_from_slice(&(i as i32 + 1).to_be_bytes());
            out.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
            out.extend_from_slice(&content);
        }
        out
    }

    /// Closed CCW square `(x0,y0)..(x1,y1)`.
    fn ccw_square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<(f64, f64)> {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]
    }

    fn cw_square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<(f64, f64)> {
        let mut pts = ccw_square(x0, y0, x1, y1);
        pts.reverse();
        pts
    }

    #[test]
    fn signed_area_flips_with_orientation() {
        let ccw = ccw_square(0.0, 0.0, 10.0, 10.0);
        let mut cw = ccw.clone();
        cw.reverse();
        assert_eq!(signed_area(&ccw), 100.0);
        assert_eq!(signed_area(&cw), -signed_area(&ccw));
    }

    #[test]
    fn point_in_polygon_with_hole() {
        let outer = Ring::new(ccw_square(0.0, 0.0, 10.0, 10.0));
        let hole = Ring::new(cw_square(3.0, 3.0, 7.0, 7.0));
        let poly = Polygon::new(outer, vec![hole]);
        assert!(!poly.contains(5.0, 5.0)); // inside the hole
        assert!(poly.contains(1.0, 1.0));
        assert!(!poly.contains(11.0, 5.0));
    }

    #[test]
    fn parses_synthetic_polygon_with_hole() {
        let bytes = synth_shapefile(&[vec![
            ccw_square(0.0, 0.0, 10.0, 10.0),
            cw_square(3.0, 3.0, 7.0, 7.0),
        ]]);
        let polys = read_polygons(&mut bytes.as_slice()).unwrap();
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].holes.len(), 1);
        assert_eq!(polys[0].bbox, (0.0, 0.0, 10.0, 10.0));
        assert!(!polys[0].contains(5.0, 5.0));
        assert!(polys[0].contains(1.0, 1.0));
    }

    #[test]
    fn two_outers_in_one_record_become_two_polygons() {
        let bytes = synth_shapefile(&[vec![
            ccw_square(0.0, 0.0, 1.0, 1.0),
            ccw_square(5.0, 5.0, 6.0, 6.0),
        ]]);
        let polys = read_polygons(&mut bytes.as_slice()).unwrap();
        assert_eq!(polys.len(), 2);
        assert!(polys[1].contains(5.5, 5.5));
    }

    #[test]
    fn rejects_bad_file_code() {
        let mut bytes = synth_shapefile(&[]);
        bytes[0..4].copy_from_slice(&1234i32.to_be_bytes());
        assert!(matches!(
            read_polygons(&mut bytes.as_slice()),
            Err(Error::InvalidShapefile(_))
        ));
    }

    #[test]
    fn rejects_unsupported_shape_type() {
        let mut bytes = synth_shapefile(&[vec![ccw_square(0.0, 0.0, 1.0, 1.0)]]);
        // Shape type lives at offset 108: header + record header.
        bytes[108..112].copy_from_slice(&3i32.to_le_bytes());
        assert!(matches!(
            read_polygons(&mut bytes.as_slice()),
            Err(Error::UnsupportedShape(3))
        ));
    }

    #[test]
    fn rejects_truncated_record() {
        let mut bytes = synth_shapefile(&[vec![ccw_square(0.0, 0.0, 1.0, 1.0)]]);
        bytes.truncate(bytes.len() - 8);
        assert!(matches!(
            read_polygons(&mut bytes.as_slice()),
            Err(Error::CorruptRecord { .. })
        ));
    }

    #[test]
    fn null_shapes_are_skipped() {
        let mut bytes = synth_shapefile(&[vec![ccw_square(0.0, 0.0, 1.0, 1.0)]]);
        // Null record: 8-byte header, 4 content bytes (shape type 0).
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&SHAPE_NULL.to_le_bytes());
        let polys = read_polygons(&mut bytes.as_slice()).unwrap();
        assert_eq!(polys.len(), 1);
    }
}
