//! Point-in-polygon lookup: coarse bbox scan, fine quadrant-walk winding
//! number test, border detection, safezone distance, and multi-polygon
//! result aggregation.

use std::fmt;

use crate::database::Database;
use crate::fixedpoint::{safezone_from_sqr_distance, to_fixed, LAT_SCALE, LON_SCALE};
use crate::strtab::decode_string;
use crate::varint::{decode_signed, decode_unsigned};

const MAX_VERTICES: u64 = 1_000_000;

/// Outcome of a single query.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub results: Vec<ZoneResult>,
    pub safezone_deg: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ZoneResult {
    pub result: LookupResult,
    pub meta_id: u32,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    NotInZone,
    InZone,
    InExcludedZone,
    OnBorderVertex,
    OnBorderSegment,
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupResult::NotInZone => "Not in zone",
            LookupResult::InZone => "In zone",
            LookupResult::InExcludedZone => "In excluded zone",
            LookupResult::OnBorderVertex => "Target point is border vertex",
            LookupResult::OnBorderSegment => "Target point is on border",
        };
        f.write_str(s)
    }
}

/// Internal per-polygon classification, before multi-polygon aggregation.
/// `Ignore` only ever appears as a bookkeeping value during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawResult {
    Ignore,
    NotInZone,
    InZone,
    InExcludedZone,
    OnBorderVertex,
    OnBorderSegment,
}

impl From<RawResult> for LookupResult {
    fn from(r: RawResult) -> Self {
        match r {
            RawResult::InZone => LookupResult::InZone,
            RawResult::InExcludedZone => LookupResult::InExcludedZone,
            RawResult::OnBorderVertex => LookupResult::OnBorderVertex,
            RawResult::OnBorderSegment => LookupResult::OnBorderSegment,
            RawResult::NotInZone | RawResult::Ignore => {
                unreachable!("NotInZone/Ignore never survive aggregation")
            }
        }
    }
}

struct RawHit {
    meta_id: u32,
    result: RawResult,
}

fn quadrant(point_lat: i64, point_lon: i64, lat_fp: i64, lon_fp: i64) -> u8 {
    if point_lat >= lat_fp {
        if point_lon >= lon_fp {
            0
        } else {
            1
        }
    } else if point_lon >= lon_fp {
        3
    } else {
        2
    }
}

fn point_in_box(xl: i64, x: i64, xr: i64, yl: i64, y: i64, yr: i64) -> bool {
    ((xl <= x && x <= xr) || (xr <= x && x <= xl)) && ((yl <= y && y <= yr) || (yr <= y && y <= yl))
}

/// Runs the point-in-polygon test against the polygon vertex stream starting
/// at absolute byte offset `polygon_index`. Returns `None` on a parse error
/// (truncated varint, or a vertex count over the sanity ceiling).
fn point_in_polygon(
    data: &[u8],
    mut polygon_index: u32,
    lat_fp: i64,
    lon_fp: i64,
    mut distance_sqr_min: Option<&mut u64>,
) -> Option<RawResult> {
    // Deliberate tie-break nudge, reproduced exactly: keeps border vertices
    // strictly inside for the comparison below.
    let lon_fp = lon_fp - 3;

    let mut cursor = &data[polygon_index as usize..];
    let num_vertices = decode_unsigned(&mut cursor).ok()?;
    if num_vertices > MAX_VERTICES {
        return None;
    }
    polygon_index = (data.len() - cursor.len()) as u32;

    let mut point_lat = 0i64;
    let mut point_lon = 0i64;
    let mut first_lat = 0i64;
    let mut first_lon = 0i64;
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;
    let mut prev_quadrant = 0u8;
    let mut winding: i64 = 0;

    let mut i = 0u64;
    while i <= num_vertices {
        if i < num_vertices {
            let mut cursor = &data[polygon_index as usize..];
            let diff_lat = decode_signed(&mut cursor).ok()?;
            let diff_lon = decode_signed(&mut cursor).ok()?;
            polygon_index = (data.len() - cursor.len()) as u32;

            point_lat += diff_lat;
            point_lon += diff_lon;
            if i == 0 {
                first_lat = point_lat;
                first_lon = point_lon;
            }
        } else {
            // Polygons should already be closed, but close explicitly anyway.
            point_lat = first_lat;
            point_lon = first_lon;
        }

        if point_lat == lat_fp && point_lon == lon_fp {
            if let Some(d) = distance_sqr_min.as_deref_mut() {
                *d = 0;
            }
            return Some(RawResult::OnBorderVertex);
        }

        let quad = quadrant(point_lat, point_lon, lat_fp, lon_fp);

        if i > 0 {
            let mut winding_need_compare = false;
            let line_is_straight = point_lon == prev_lon || point_lat == prev_lat;

            if quad == prev_quadrant {
                // no winding change
            } else if quad == (prev_quadrant + 1) % 4 {
                winding += 1;
            } else if (quad + 1) % 4 == prev_quadrant {
                winding -= 1;
            } else {
                winding_need_compare = true;
            }

            // Matches `ZDPointInPolygon`'s use of 32-bit `float`, not `double`,
            // for the diagonal-crossing line and closest-point math: a wider
            // mantissa here would shift the truncated intersect/closest-point
            // results at boundary cases and silently change the classification.
            let mut a = 0f32;
            let mut b = 0f32;
            if !line_is_straight && (distance_sqr_min.is_some() || winding_need_compare) {
                a = (point_lat - prev_lat) as f32 / (point_lon - prev_lon) as f32;
                b = point_lat as f32 - a * point_lon as f32;
            }

            if winding_need_compare {
                if line_is_straight {
                    if let Some(d) = distance_sqr_min.as_deref_mut() {
                        *d = 0;
                    }
                    return Some(RawResult::OnBorderSegment);
                }

                let intersect_lon = ((lat_fp as f32 - b) / a) as i64;
                if intersect_lon == lon_fp {
                    if let Some(d) = distance_sqr_min.as_deref_mut() {
                        *d = 0;
                    }
                    return Some(RawResult::OnBorderSegment);
                }

                let sign: i64 = if intersect_lon < lon_fp { 2 } else { -2 };
                if quad == 2 || quad == 3 {
                    winding += sign;
                } else {
                    winding -= sign;
                }
            }

            if let Some(d) = distance_sqr_min.as_deref_mut() {
                let (closest_lon, closest_lat): (f32, f32) = if !line_is_straight {
                    let closest_lon = (lon_fp as f32 + a * lat_fp as f32 - a * b) / (a * a + 1.0);
                    let closest_lat = (a * (lon_fp as f32 + a * lat_fp as f32) + b) / (a * a + 1.0);
                    (closest_lon, closest_lat)
                } else if point_lon == prev_lon {
                    (point_lon as f32, lat_fp as f32)
                } else {
                    (lon_fp as f32, point_lat as f32)
                };

                let closest_in_box = point_in_box(
                    point_lon,
                    closest_lon as i64,
                    prev_lon,
                    point_lat,
                    closest_lat as i64,
                    prev_lat,
                );

                let (d_lat, d_lon): (i64, i64) = if closest_in_box {
                    ((closest_lat - lat_fp as f32) as i64, (closest_lon - lon_fp as f32) as i64)
                } else {
                    (point_lat - lat_fp, point_lon - lon_fp)
                };

                // Longitude has half the real-world scale of latitude.
                let distance_sqr = (d_lat * d_lat + d_lon * d_lon * 4) as u64;
                if distance_sqr < *d {
                    *d = distance_sqr;
                }
            }
        }

        prev_quadrant = quad;
        prev_lat = point_lat;
        prev_lon = point_lon;
        i += 1;
    }

    Some(match winding {
        -4 => RawResult::InZone,
        4 => RawResult::InExcludedZone,
        0 => RawResult::NotInZone,
        _ => {
            if let Some(d) = distance_sqr_min {
                *d = 0;
            }
            RawResult::OnBorderSegment
        }
    })
}

impl Database {
    /// Looks up `(lat, lon)` and returns the zones containing it, plus an
    /// optional safezone distance in degrees.
    ///
    /// Non-finite or out-of-range coordinates return an empty outcome
    /// immediately without touching the mapping.
    pub fn lookup(&self, lat: f64, lon: f64, want_safezone: bool) -> LookupOutcome {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon)
        {
            return LookupOutcome { results: Vec::new(), safezone_deg: None };
        }

        let precision = self.precision();
        let lat_fp = to_fixed(lat, LAT_SCALE, precision);
        let lon_fp = to_fixed(lon, LON_SCALE, precision);

        let data = self.data();
        let mut distance_sqr_min: u64 = u64::MAX;

        let mut bbox_index = self.bbox_offset;
        let mut metadata_index: i64 = 0;
        let mut polygon_index: i64 = 0;

        let mut raw: Vec<RawHit> = Vec::new();
        let mut parse_error = false;

        'scan: while bbox_index < self.metadata_offset {
            let mut cursor = &data[bbox_index as usize..];
            let min_lat = match decode_signed(&mut cursor) {
                Ok(v) => v,
                Err(_) => break 'scan,
            };
            let min_lon = match decode_signed(&mut cursor) {
                Ok(v) => v,
                Err(_) => break 'scan,
            };
            let max_lat = match decode_signed(&mut cursor) {
                Ok(v) => v,
                Err(_) => break 'scan,
            };
            let max_lon = match decode_signed(&mut cursor) {
                Ok(v) => v,
                Err(_) => break 'scan,
            };
            let metadata_delta = match decode_signed(&mut cursor) {
                Ok(v) => v,
                Err(_) => break 'scan,
            };
            let polygon_delta = match decode_unsigned(&mut cursor) {
                Ok(v) => v as i64,
                Err(_) => break 'scan,
            };
            bbox_index = (data.len() - cursor.len()) as u32;

            metadata_index += metadata_delta;
            polygon_index += polygon_delta;

            if lat_fp >= min_lat {
                if lat_fp <= max_lat && lon_fp >= min_lon && lon_fp <= max_lon {
                    if self.metadata_offset as i64 + metadata_index >= self.data_offset as i64 {
                        continue;
                    }
                    if self.data_offset as i64 + polygon_index >= data.len() as i64 {
                        continue;
                    }

                    let poly_offset = (self.data_offset as i64 + polygon_index) as u32;
                    let safezone_slot = if want_safezone { Some(&mut distance_sqr_min) } else { None };
                    match point_in_polygon(data, poly_offset, lat_fp, lon_fp, safezone_slot) {
                        None => {
                            parse_error = true;
                            break 'scan;
                        }
                        Some(RawResult::NotInZone) => {}
                        Some(other) => raw.push(RawHit { meta_id: metadata_index as u32, result: other }),
                    }
                }
            } else {
                // The index is sorted ascending by minLat; nothing further can match.
                break 'scan;
            }
        }

        if parse_error {
            // A parse error discards everything collected in this scan.
            return LookupOutcome { results: Vec::new(), safezone_deg: None };
        }

        let aggregated = aggregate(raw);

        let mut results = Vec::with_capacity(aggregated.len());
        for (meta_id, result) in aggregated {
            let mut index = self.metadata_offset + meta_id;
            let mut fields = Vec::with_capacity(self.field_names().len());
            for name in self.field_names() {
                match decode_string(data, self.metadata_offset, &mut index) {
                    Ok(value) => fields.push((name.clone(), value)),
                    Err(_) => break,
                }
            }
            results.push(ZoneResult { result, meta_id, fields });
        }

        let safezone_deg = if want_safezone {
            Some(safezone_from_sqr_distance(distance_sqr_min, precision))
        } else {
            None
        };

        LookupOutcome { results, safezone_deg }
    }
}

/// Groups raw per-polygon hits by metadata offset: sums +1 for `InZone` and
/// -1 for `InExcludedZone` within a group, a border result overrides the
/// whole group, and a zero sum drops the group entirely.
fn aggregate(mut raw: Vec<RawHit>) -> Vec<(u32, LookupResult)> {
    let n = raw.len();
    let mut final_result = vec![RawResult::Ignore; n];

    for i in 0..n {
        if raw[i].result == RawResult::Ignore {
            continue;
        }

        let mut inside_sum: i32 = 0;
        let mut override_result: Option<RawResult> = None;

        for j in i..n {
            if raw[j].meta_id == raw[i].meta_id && raw[j].result != RawResult::Ignore {
                match raw[j].result {
                    RawResult::InZone => inside_sum += 1,
                    RawResult::InExcludedZone => inside_sum -= 1,
                    other => override_result = Some(other),
                }
                raw[j].result = RawResult::Ignore;
            }
        }

        final_result[i] = if let Some(r) = override_result {
            r
        } else if inside_sum != 0 {
            RawResult::InZone
        } else {
            RawResult::Ignore
        };
    }

    raw.iter()
        .zip(final_result)
        .filter(|(_, r)| *r != RawResult::Ignore)
        .map(|(hit, r)| (hit.meta_id, r.into()))
        .collect()
}
