//! PLB: a compact, memory-mappable point-in-polygon zone database.
//!
//! A `.bin` file has four regions, back to back:
//!
//!   header   : magic "PLB", table type, version, precision, field names,
//!              notice string, and the three section sizes that follow.
//!   bbox     : one record per polygon — four absolute fixed-point bounds
//!              plus delta-encoded metadata/data offsets — sorted ascending
//!              by minLat so a scan can stop at the first out-of-range
//!              record.
//!   metadata : field-value strings, deduplicated with one-level
//!              back-references, one record per distinct zone.
//!   data     : one stream per polygon — a vertex count followed by
//!              delta-encoded (and builder-coalesced) `(lat, lon)` pairs in
//!              fixed point. The first vertex of each stream is absolute.
//!
//! All integers in the format are varints; there is no fixed-width layout
//! to get endianness-wrong. `Database::open` maps the file and parses only
//! the header eagerly — `lookup` walks the bbox index and any candidate
//! polygon's vertex stream straight out of the mapping, never materializing
//! a polygon's vertices into an owned buffer.
//!
//! Table type `'T'` (timezone) declares fields `TimezoneIdPrefix`,
//! `TimezoneId`, `CountryAlpha2`, `CountryName`. Table type `'C'` (country)
//! declares `Alpha2`, `Alpha3`, `Name`.

mod database;
mod error;
pub mod fixedpoint;
mod lookup;
pub mod strtab;
pub mod varint;

pub use database::{Database, MAGIC, VERSION};
pub use error::Error;
pub use lookup::{LookupOutcome, LookupResult, ZoneResult};
