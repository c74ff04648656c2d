use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};

mod tzdata;

use plb::fixedpoint::{to_fixed, LAT_SCALE, LON_SCALE};
use plb::strtab::encode_string;
use plb::varint::{encode_signed, encode_unsigned};

/// Consumes a Shapefile + DBF attribute pair and emits a PLB `.bin` database.
///
/// `plb-builder <tableType> <inputShapefileStem> <outputBinPath> <precisionBits> <noticeString>`
#[derive(Parser, Debug)]
#[command(name = "plb-builder", version)]
struct Args {
    /// Metadata schema: 'T' for timezone polygons, 'C' for country polygons.
    table_type: char,

    /// Shapefile stem (or `.shp` path) whose sibling `.dbf` carries attributes.
    input_shapefile_stem: PathBuf,

    /// Output `.bin` path.
    output_bin_path: PathBuf,

    /// Fixed-point precision, in bits per axis.
    precision_bits: u8,

    /// Notice string embedded in the header.
    notice: String,
}

/// Natural Earth countries table used only to resolve `CountryName` for
/// timezone (table type `T`) records. Missing is non-fatal: the builder
/// falls back to `tzdata::ALPHA2_NAME_OVERRIDES` alone.
const COUNTRY_REFERENCE_STEM: &str = "naturalearth/ne_10m_admin_0_countries_lakes";

struct BuilderPolygon {
    min_lat_fp: i64,
    min_lon_fp: i64,
    max_lat_fp: i64,
    max_lon_fp: i64,
    points: Vec<(i64, i64)>,
    metadata_index: usize,
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    if args.table_type != 'T' && args.table_type != 'C' {
        bail!("unknown table type '{}', expected 'C' or 'T'", args.table_type);
    }
    if args.precision_bits == 0 || args.precision_bits > 63 {
        bail!("precision must be between 1 and 63 bits, got {}", args.precision_bits);
    }

    let shp_path = resolve_shp_path(&args.input_shapefile_stem);
    info!("Opening shapefile {}", shp_path.display());

    let alpha2_to_name = if args.table_type == 'T' {
        load_country_name_table()
    } else {
        HashMap::new()
    };

    let mut reader = Reader::from_path(&shp_path)
        .with_context(|| format!("could not open shapefile {}", shp_path.display()))?;

    let mut metadata_records: Vec<Vec<String>> = Vec::new();
    let mut raw_shapes: Vec<(usize, Shape)> = Vec::new();

    for (index, shape_and_record) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = shape_and_record.context("failed to read shape/record pair")?;

        let fields = match args.table_type {
            'T' => build_timezone_record(&record, &alpha2_to_name),
            _ => build_country_record(&record),
        };
        metadata_records.push(fields);
        raw_shapes.push((index, shape));
    }

    info!("Read {} metadata records.", metadata_records.len());

    let field_names = field_names_for(args.table_type);

    let polygons: Vec<BuilderPolygon> = raw_shapes
        .into_par_iter()
        .flat_map(|(index, shape)| polygons_from_shape(shape, args.precision_bits, index))
        .collect();

    info!("Parsed {} polygons.", polygons.len());

    let mut polygons = polygons;
    polygons.sort_by(|a, b| a.min_lat_fp.cmp(&b.min_lat_fp));

    let mut data_section = Vec::new();
    let mut data_offsets = Vec::with_capacity(polygons.len());
    for polygon in &polygons {
        data_offsets.push(data_section.len() as u64);
        encode_polygon_vertices(&mut data_section, &polygon.points);
    }
    info!("Encoded data section into {} bytes.", data_section.len());

    let mut meta_section = Vec::new();
    let mut meta_record_offsets = Vec::with_capacity(metadata_records.len());
    let mut seen_strings: HashMap<String, u64> = HashMap::new();
    for record in &metadata_records {
        meta_record_offsets.push(meta_section.len() as u64);
        for field in record {
            encode_string(&mut meta_section, &mut seen_strings, field)
                .context("metadata string too long to encode")?;
        }
    }
    info!("Encoded metadata into {} bytes.", meta_section.len());

    let mut bbox_section = Vec::new();
    let mut prev_meta_offset: i64 = 0;
    let mut prev_data_offset: i64 = 0;
    for (i, polygon) in polygons.iter().enumerate() {
        encode_signed(&mut bbox_section, polygon.min_lat_fp);
        encode_signed(&mut bbox_section, polygon.min_lon_fp);
        encode_signed(&mut bbox_section, polygon.max_lat_fp);
        encode_signed(&mut bbox_section, polygon.max_lon_fp);

        let meta_offset = meta_record_offsets[polygon.metadata_index] as i64;
        encode_signed(&mut bbox_section, meta_offset - prev_meta_offset);
        prev_meta_offset = meta_offset;

        let data_offset = data_offsets[i] as i64;
        encode_unsigned(&mut bbox_section, (data_offset - prev_data_offset) as u64);
        prev_data_offset = data_offset;
    }
    info!("Encoded bounding box section into {} bytes.", bbox_section.len());

    let mut header = Vec::new();
    header.extend_from_slice(b"PLB");
    header.push(args.table_type as u8);
    header.push(0); // version
    header.push(args.precision_bits);
    header.push(field_names.len() as u8);
    for name in &field_names {
        write_inline_string(&mut header, name)?;
    }
    write_inline_string(&mut header, &args.notice)?;
    encode_unsigned(&mut header, bbox_section.len() as u64);
    encode_unsigned(&mut header, meta_section.len() as u64);
    encode_unsigned(&mut header, data_section.len() as u64);
    info!("Encoded header into {} bytes.", header.len());

    let mut out = header;
    out.extend_from_slice(&bbox_section);
    out.extend_from_slice(&meta_section);
    out.extend_from_slice(&data_section);

    std::fs::write(&args.output_bin_path, &out)
        .with_context(|| format!("could not write {}", args.output_bin_path.display()))?;

    info!(
        "Wrote {} ({} bytes, {} polygons, {} metadata records).",
        args.output_bin_path.display(),
        out.len(),
        polygons.len(),
        metadata_records.len()
    );

    Ok(())
}

fn field_names_for(table_type: char) -> Vec<&'static str> {
    if table_type == 'T' {
        vec!["TimezoneIdPrefix", "TimezoneId", "CountryAlpha2", "CountryName"]
    } else {
        vec!["Alpha2", "Alpha3", "Name"]
    }
}

fn resolve_shp_path(stem: &Path) -> PathBuf {
    if stem.extension().and_then(|e| e.to_str()) == Some("shp") {
        stem.to_path_buf()
    } else {
        stem.with_extension("shp")
    }
}

fn string_field<'a>(record: &'a shapefile::dbase::Record, name: &str) -> Option<&'a str> {
    match record.get(name) {
        Some(FieldValue::Character(Some(s))) => Some(s.trim()),
        _ => None,
    }
}

fn build_timezone_record(
    record: &shapefile::dbase::Record,
    alpha2_to_name: &HashMap<String, String>,
) -> Vec<String> {
    let mut fields = vec![String::new(), String::new(), String::new(), String::new()];

    let Some(tzid) = string_field(record, "tzid") else {
        warn!("record has no string 'tzid' field, leaving TimezoneId fields blank");
        return fields;
    };

    match tzid.find('/') {
        Some(pos) => {
            fields[0] = format!("{}/", &tzid[..pos]);
            fields[1] = tzid[pos + 1..].to_string();
        }
        None => fields[0] = tzid.to_string(),
    }

    match tzdata::country_alpha2_for_tzid(tzid) {
        Some(alpha2) => {
            fields[2] = alpha2.to_string();
            match alpha2_to_name.get(alpha2) {
                Some(name) => fields[3] = name.clone(),
                None => warn!("{alpha2} not found in alpha2ToName! ({tzid})"),
            }
        }
        None => warn!("{tzid} not found in zoneToAlpha2!"),
    }

    fields
}

fn build_country_record(record: &shapefile::dbase::Record) -> Vec<String> {
    let mut fields = vec![String::new(), String::new(), String::new()];

    if let Some(a2) = string_field(record, "ISO_A2").or_else(|| string_field(record, "WB_A2")) {
        if a2 != "-99" {
            fields[0] = a2.to_string();
        }
    }
    if let Some(a3) = string_field(record, "ISO_A3")
        .or_else(|| string_field(record, "WB_A3"))
        .or_else(|| string_field(record, "BRK_A3"))
    {
        if a3 != "-99" {
            fields[1] = a3.to_string();
        }
    }
    if let Some(name) = string_field(record, "NAME_LONG") {
        fields[2] = name.to_string();
    }

    fields
}

/// Loads the alpha2 -> country-name table from the Natural Earth countries
/// reference shapefile, then applies the territory overrides on top
/// (matching the original builder's unconditional overwrite).
fn load_country_name_table() -> HashMap<String, String> {
    let mut table = HashMap::new();

    let shp_path = resolve_shp_path(Path::new(COUNTRY_REFERENCE_STEM));
    match Reader::from_path(&shp_path) {
        Ok(mut reader) => {
            for shape_and_record in reader.iter_shapes_and_records() {
                let Ok((_, record)) = shape_and_record else { continue };
                let alpha2 = string_field(&record, "ISO_A2")
                    .or_else(|| string_field(&record, "WB_A2"))
                    .filter(|v| *v != "-99");
                let name = string_field(&record, "NAME_LONG");
                if let (Some(alpha2), Some(name)) = (alpha2, name) {
                    table.entry(alpha2.to_string()).or_insert_with(|| name.to_string());
                }
            }
        }
        Err(_) => {
            warn!(
                "country reference table {} not found; using override map only",
                shp_path.display()
            );
        }
    }

    for &(alpha2, name) in tzdata::ALPHA2_NAME_OVERRIDES {
        table.insert(alpha2.to_string(), name.to_string());
    }

    table
}

/// Shape types spec.md accepts: Polygon/PolygonZ/PolygonM and
/// Polyline/PolylineZ/PolylineM. Anything else is skipped with a warning.
/// Multi-part shapes split into one `BuilderPolygon` per part, all sharing
/// `metadata_index`.
fn polygons_from_shape(shape: Shape, precision: u8, metadata_index: usize) -> Vec<BuilderPolygon> {
    let rings: Vec<Vec<(f64, f64)>> = match shape {
        Shape::Polygon(p) => p.rings().iter().map(|r| r.points().iter().map(|pt| (pt.y, pt.x)).collect()).collect(),
        Shape::PolygonZ(p) => p.rings().iter().map(|r| r.points().iter().map(|pt| (pt.y, pt.x)).collect()).collect(),
        Shape::PolygonM(p) => p.rings().iter().map(|r| r.points().iter().map(|pt| (pt.y, pt.x)).collect()).collect(),
        Shape::Polyline(p) => p.parts().iter().map(|part| part.iter().map(|pt| (pt.y, pt.x)).collect()).collect(),
        Shape::PolylineZ(p) => p.parts().iter().map(|part| part.iter().map(|pt| (pt.y, pt.x)).collect()).collect(),
        Shape::PolylineM(p) => p.parts().iter().map(|part| part.iter().map(|pt| (pt.y, pt.x)).collect()).collect(),
        other => {
            warn!("Unsupported shape object ({other:?})");
            return Vec::new();
        }
    };

    rings
        .into_iter()
        .filter_map(|ring| build_polygon(ring, precision, metadata_index))
        .collect()
}

fn build_polygon(ring: Vec<(f64, f64)>, precision: u8, metadata_index: usize) -> Option<BuilderPolygon> {
    if ring.is_empty() {
        return Some(BuilderPolygon {
            min_lat_fp: 0,
            min_lon_fp: 0,
            max_lat_fp: 0,
            max_lon_fp: 0,
            points: Vec::new(),
            metadata_index,
        });
    }

    let mut points: Vec<(i64, i64)> = ring
        .iter()
        .map(|&(lat, lon)| (to_fixed(lat, LAT_SCALE, precision), to_fixed(lon, LON_SCALE, precision)))
        .collect();

    // The reader's ring is explicitly closed; the wire format closes
    // implicitly, so drop the redundant repeat of the first vertex.
    if points.len() > 1 && points[points.len() - 1] == points[0] {
        points.pop();
    }

    let mut min_lat_fp = i64::MAX;
    let mut min_lon_fp = i64::MAX;
    let mut max_lat_fp = i64::MIN;
    let mut max_lon_fp = i64::MIN;
    for &(lat_fp, lon_fp) in &points {
        min_lat_fp = min_lat_fp.min(lat_fp);
        min_lon_fp = min_lon_fp.min(lon_fp);
        max_lat_fp = max_lat_fp.max(lat_fp);
        max_lon_fp = max_lon_fp.max(lon_fp);
    }

    Some(BuilderPolygon {
        min_lat_fp,
        min_lon_fp,
        max_lat_fp,
        max_lon_fp,
        points,
        metadata_index,
    })
}

/// Encodes a polygon's vertex stream: vertex count, then the first point
/// absolute and every subsequent point coalesced against the previous
/// per-vertex delta (an exact-repeat run is flushed as a single pair;
/// zero-displacement vertices are skipped entirely).
fn encode_polygon_vertices(out: &mut Vec<u8>, points: &[(i64, i64)]) {
    if points.is_empty() {
        encode_unsigned(out, 0);
        return;
    }

    let mut emitted: Vec<(i64, i64)> = Vec::with_capacity(points.len());
    emitted.push(points[0]);

    let mut prev_delta: Option<(i64, i64)> = None;
    let mut acc = (0i64, 0i64);

    for window in points.windows(2) {
        let delta = (window[1].0 - window[0].0, window[1].1 - window[0].1);
        if delta == (0, 0) {
            continue;
        }
        if let Some(pd) = prev_delta {
            if pd != delta {
                emitted.push(acc);
                acc = (0, 0);
            }
        }
        acc.0 += delta.0;
        acc.1 += delta.1;
        prev_delta = Some(delta);
    }
    if acc != (0, 0) {
        emitted.push(acc);
    }

    encode_unsigned(out, emitted.len() as u64);
    for (dlat, dlon) in emitted {
        encode_signed(out, dlat);
        encode_signed(out, dlon);
    }
}

fn write_inline_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.len() >= 256 {
        bail!("string '{s}' is too long to encode inline (>= 256 bytes)");
    }
    encode_unsigned(out, s.len() as u64);
    out.extend(s.bytes().map(|b| b ^ 0x80));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_repeated_deltas() {
        // A straight line of equally-spaced points should coalesce to one
        // absolute point plus one flushed delta, not one pair per vertex.
        let points = vec![(0, 0), (1, 1), (2, 2), (3, 3)];
        let mut out = Vec::new();
        encode_polygon_vertices(&mut out, &points);

        let mut cursor = out.as_slice();
        let num_vertices = plb::varint::decode_unsigned(&mut cursor).unwrap();
        assert_eq!(num_vertices, 2);
    }

    #[test]
    fn skips_zero_displacement_vertices() {
        let points = vec![(0, 0), (0, 0), (5, 5)];
        let mut out = Vec::new();
        encode_polygon_vertices(&mut out, &points);

        let mut cursor = out.as_slice();
        let num_vertices = plb::varint::decode_unsigned(&mut cursor).unwrap();
        assert_eq!(num_vertices, 2);
    }

    #[test]
    fn empty_ring_emits_zero_vertex_count() {
        let mut out = Vec::new();
        encode_polygon_vertices(&mut out, &[]);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn timezone_record_splits_tzid_and_resolves_country() {
        use shapefile::dbase::{FieldValue, Record};

        let mut record = Record::default();
        record.insert("tzid".to_string(), FieldValue::Character(Some("Europe/Brussels".to_string())));

        let mut names = HashMap::new();
        names.insert("BE".to_string(), "Belgium".to_string());

        let fields = build_timezone_record(&record, &names);
        assert_eq!(fields[0], "Europe/");
        assert_eq!(fields[1], "Brussels");
        assert_eq!(fields[2], "BE");
        assert_eq!(fields[3], "Belgium");
    }

    #[test]
    fn country_record_rejects_sentinel_values() {
        use shapefile::dbase::{FieldValue, Record};

        let mut record = Record::default();
        record.insert("ISO_A2".to_string(), FieldValue::Character(Some("-99".to_string())));
        record.insert("NAME_LONG".to_string(), FieldValue::Character(Some("Somewhereistan".to_string())));

        let fields = build_country_record(&record);
        assert_eq!(fields[0], "");
        assert_eq!(fields[2], "Somewhereistan");
    }
}
