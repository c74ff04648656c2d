//! Builds a tiny two-polygon timezone database by hand and exercises the
//! same end-to-end scenarios the on-disk format is meant to answer:
//! a point inside a zone, open ocean, near a pole, and malformed input.

use std::collections::HashMap;
use std::io::Write;

use plb::fixedpoint::{to_fixed, LAT_SCALE, LON_SCALE};
use plb::strtab::encode_string;
use plb::varint::{encode_signed, encode_unsigned};
use plb::{Database, LookupResult};

const PRECISION: u8 = 21;

struct FixturePolygon {
    points_deg: Vec<(f64, f64)>,
    fields: Vec<String>,
}

fn square_deg(center_lat: f64, center_lon: f64, half_extent: f64) -> Vec<(f64, f64)> {
    vec![
        (center_lat - half_extent, center_lon - half_extent),
        (center_lat - half_extent, center_lon + half_extent),
        (center_lat + half_extent, center_lon + half_extent),
        (center_lat + half_extent, center_lon - half_extent),
    ]
}

fn build_database(polygons: Vec<FixturePolygon>) -> Vec<u8> {
    let field_names = ["TimezoneIdPrefix", "TimezoneId", "CountryAlpha2", "CountryName"];

    let fixed_polys: Vec<(i64, i64, i64, i64, Vec<(i64, i64)>)> = polygons
        .iter()
        .map(|p| {
            let fp: Vec<(i64, i64)> = p
                .points_deg
                .iter()
                .map(|&(lat, lon)| (to_fixed(lat, LAT_SCALE, PRECISION), to_fixed(lon, LON_SCALE, PRECISION)))
                .collect();
            let min_lat = fp.iter().map(|p| p.0).min().unwrap();
            let max_lat = fp.iter().map(|p| p.0).max().unwrap();
            let min_lon = fp.iter().map(|p| p.1).min().unwrap();
            let max_lon = fp.iter().map(|p| p.1).max().unwrap();
            (min_lat, min_lon, max_lat, max_lon, fp)
        })
        .collect();

    // bbox index must be sorted ascending by minLat.
    let mut order: Vec<usize> = (0..fixed_polys.len()).collect();
    order.sort_by_key(|&i| fixed_polys[i].0);

    let mut data_section = Vec::new();
    let mut data_offsets = vec![0u64; fixed_polys.len()];
    for &i in &order {
        data_offsets[i] = data_section.len() as u64;
        let (_, _, _, _, points) = &fixed_polys[i];
        encode_unsigned(&mut data_section, points.len() as u64);
        let mut prev = (0i64, 0i64);
        for &(lat, lon) in points {
            encode_signed(&mut data_section, lat - prev.0);
            encode_signed(&mut data_section, lon - prev.1);
            prev = (lat, lon);
        }
    }

    let mut meta_section = Vec::new();
    let mut meta_offsets = vec![0u64; polygons.len()];
    let mut seen = HashMap::new();
    for (i, p) in polygons.iter().enumerate() {
        meta_offsets[i] = meta_section.len() as u64;
        for field in &p.fields {
            encode_string(&mut meta_section, &mut seen, field).unwrap();
        }
    }

    let mut bbox_section = Vec::new();
    let mut prev_meta = 0i64;
    let mut prev_data = 0i64;
    for &i in &order {
        let (min_lat, min_lon, max_lat, max_lon, _) = &fixed_polys[i];
        encode_signed(&mut bbox_section, *min_lat);
        encode_signed(&mut bbox_section, *min_lon);
        encode_signed(&mut bbox_section, *max_lat);
        encode_signed(&mut bbox_section, *max_lon);

        let meta_offset = meta_offsets[i] as i64;
        encode_signed(&mut bbox_section, meta_offset - prev_meta);
        prev_meta = meta_offset;

        let data_offset = data_offsets[i] as i64;
        encode_unsigned(&mut bbox_section, (data_offset - prev_data) as u64);
        prev_data = data_offset;
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"PLB");
    out.push(b'T');
    out.push(0); // version
    out.push(PRECISION);
    out.push(field_names.len() as u8);
    for name in field_names {
        encode_unsigned(&mut out, name.len() as u64);
        out.extend(name.bytes().map(|b| b ^ 0x80));
    }
    let notice = "test fixture";
    encode_unsigned(&mut out, notice.len() as u64);
    out.extend(notice.bytes().map(|b| b ^ 0x80));
    encode_unsigned(&mut out, bbox_section.len() as u64);
    encode_unsigned(&mut out, meta_section.len() as u64);
    encode_unsigned(&mut out, data_section.len() as u64);

    out.extend_from_slice(&bbox_section);
    out.extend_from_slice(&meta_section);
    out.extend_from_slice(&data_section);
    out
}

fn fixture() -> Vec<u8> {
    build_database(vec![
        FixturePolygon {
            points_deg: square_deg(50.8503, 4.3517, 0.5),
            fields: vec![
                "Europe/".to_string(),
                "Brussels".to_string(),
                "BE".to_string(),
                "Belgium".to_string(),
            ],
        },
        FixturePolygon {
            points_deg: square_deg(40.7128, -74.0060, 0.5),
            fields: vec![
                "America/".to_string(),
                "New_York".to_string(),
                "US".to_string(),
                "United States".to_string(),
            ],
        },
    ])
}

fn write_fixture(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file
}

#[test]
fn brussels_point_resolves_to_brussels_zone() {
    let file = write_fixture(&fixture());
    let db = Database::open(file.path()).unwrap();

    let outcome = db.lookup(50.8503, 4.3517, true);
    assert_eq!(outcome.results.len(), 1);
    let hit = &outcome.results[0];
    assert_eq!(hit.result, LookupResult::InZone);
    assert!(hit.fields.contains(&("TimezoneId".to_string(), "Brussels".to_string())));
    assert!(hit.fields.contains(&("CountryAlpha2".to_string(), "BE".to_string())));
    assert!(outcome.safezone_deg.unwrap() > 0.0);
}

#[test]
fn new_york_point_resolves_to_new_york_zone() {
    let file = write_fixture(&fixture());
    let db = Database::open(file.path()).unwrap();

    let outcome = db.lookup(40.7128, -74.0060, true);
    assert_eq!(outcome.results.len(), 1);
    let hit = &outcome.results[0];
    assert_eq!(hit.result, LookupResult::InZone);
    assert!(hit.fields.contains(&("CountryAlpha2".to_string(), "US".to_string())));
}

#[test]
fn open_ocean_point_has_no_zone() {
    let file = write_fixture(&fixture());
    let db = Database::open(file.path()).unwrap();

    let outcome = db.lookup(0.0, 0.0, true);
    assert!(outcome.results.is_empty());
}

#[test]
fn pole_query_does_not_crash_or_parse_error() {
    let file = write_fixture(&fixture());
    let db = Database::open(file.path()).unwrap();

    let outcome = db.lookup(90.0, 0.0, true);
    assert!(outcome.results.is_empty());
}

#[test]
fn nan_latitude_yields_empty_results_and_no_safezone() {
    let file = write_fixture(&fixture());
    let db = Database::open(file.path()).unwrap();

    let outcome = db.lookup(f64::NAN, 4.3517, true);
    assert!(outcome.results.is_empty());
    assert!(outcome.safezone_deg.is_none());
}

#[test]
fn truncated_file_fails_to_open() {
    let bytes = fixture();
    let truncated = &bytes[..bytes.len() - 5];
    let file = write_fixture(truncated);

    assert!(Database::open(file.path()).is_err());
}

#[test]
fn distinct_zones_do_not_bleed_into_each_other() {
    let file = write_fixture(&fixture());
    let db = Database::open(file.path()).unwrap();

    // A point between the two zones should land in neither.
    let outcome = db.lookup(45.0, -30.0, false);
    assert!(outcome.results.is_empty());
}
