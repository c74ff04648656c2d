//! Static lookup tables the builder needs but that, per the format spec,
//! are an external collaborator's data rather than this crate's concern:
//! IANA timezone identifier -> ISO 3166-1 alpha-2 country code, and the
//! small country-name override map for territories the Natural Earth
//! countries table leaves out.
//!
//! This table is a representative subset of the full IANA `zone1970.tab`
//! mapping, not exhaustive — good enough to resolve the common zones a
//! timezone shapefile will reference.

/// Returns the ISO 3166-1 alpha-2 country code most commonly associated
/// with `tzid`, if known.
pub fn country_alpha2_for_tzid(tzid: &str) -> Option<&'static str> {
    TZID_TO_ALPHA2
        .iter()
        .find(|&&(id, _)| id == tzid)
        .map(|&(_, alpha2)| alpha2)
}

/// Country-name overrides for alpha-2 codes missing `NAME_LONG`/`ISO_A2` in
/// the Natural Earth countries table, per `parseAlpha2ToName` in the
/// original builder.
pub const ALPHA2_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("GF", "French Guiana"),
    ("GP", "Guadeloupe"),
    ("BQ", "Bonaire"),
    ("MQ", "Martinique"),
    ("SJ", "Svalbard and Jan Mayen Islands"),
    ("NO", "Norway"),
    ("CX", "Christmas Island"),
    ("CC", "Cocos Islands"),
    ("YT", "Mayotte"),
    ("RE", "Réunion"),
    ("TK", "Tokelau"),
];

const TZID_TO_ALPHA2: &[(&str, &str)] = &[
    ("Africa/Abidjan", "CI"),
    ("Africa/Accra", "GH"),
    ("Africa/Addis_Ababa", "ET"),
    ("Africa/Algiers", "DZ"),
    ("Africa/Cairo", "EG"),
    ("Africa/Casablanca", "MA"),
    ("Africa/Johannesburg", "ZA"),
    ("Africa/Khartoum", "SD"),
    ("Africa/Lagos", "NG"),
    ("Africa/Nairobi", "KE"),
    ("Africa/Tripoli", "LY"),
    ("Africa/Tunis", "TN"),
    ("America/Anchorage", "US"),
    ("America/Argentina/Buenos_Aires", "AR"),
    ("America/Bogota", "CO"),
    ("America/Caracas", "VE"),
    ("America/Chicago", "US"),
    ("America/Denver", "US"),
    ("America/Halifax", "CA"),
    ("America/Havana", "CU"),
    ("America/Lima", "PE"),
    ("America/Los_Angeles", "US"),
    ("America/Mexico_City", "MX"),
    ("America/New_York", "US"),
    ("America/Noronha", "BR"),
    ("America/Santiago", "CL"),
    ("America/Sao_Paulo", "BR"),
    ("America/Toronto", "CA"),
    ("America/Vancouver", "CA"),
    ("Antarctica/McMurdo", "AQ"),
    ("Asia/Almaty", "KZ"),
    ("Asia/Baghdad", "IQ"),
    ("Asia/Bangkok", "TH"),
    ("Asia/Beirut", "LB"),
    ("Asia/Colombo", "LK"),
    ("Asia/Dhaka", "BD"),
    ("Asia/Dubai", "AE"),
    ("Asia/Hong_Kong", "HK"),
    ("Asia/Istanbul", "TR"),
    ("Asia/Jakarta", "ID"),
    ("Asia/Jerusalem", "IL"),
    ("Asia/Kabul", "AF"),
    ("Asia/Karachi", "PK"),
    ("Asia/Kathmandu", "NP"),
    ("Asia/Kolkata", "IN"),
    ("Asia/Kuala_Lumpur", "MY"),
    ("Asia/Manila", "PH"),
    ("Asia/Riyadh", "SA"),
    ("Asia/Seoul", "KR"),
    ("Asia/Shanghai", "CN"),
    ("Asia/Singapore", "SG"),
    ("Asia/Taipei", "TW"),
    ("Asia/Tehran", "IR"),
    ("Asia/Tokyo", "JP"),
    ("Asia/Yangon", "MM"),
    ("Atlantic/Reykjavik", "IS"),
    ("Australia/Brisbane", "AU"),
    ("Australia/Melbourne", "AU"),
    ("Australia/Perth", "AU"),
    ("Australia/Sydney", "AU"),
    ("Europe/Amsterdam", "NL"),
    ("Europe/Athens", "GR"),
    ("Europe/Belgrade", "RS"),
    ("Europe/Berlin", "DE"),
    ("Europe/Brussels", "BE"),
    ("Europe/Bucharest", "RO"),
    ("Europe/Budapest", "HU"),
    ("Europe/Copenhagen", "DK"),
    ("Europe/Dublin", "IE"),
    ("Europe/Helsinki", "FI"),
    ("Europe/Kyiv", "UA"),
    ("Europe/Lisbon", "PT"),
    ("Europe/London", "GB"),
    ("Europe/Madrid", "ES"),
    ("Europe/Moscow", "RU"),
    ("Europe/Oslo", "NO"),
    ("Europe/Paris", "FR"),
    ("Europe/Prague", "CZ"),
    ("Europe/Rome", "IT"),
    ("Europe/Sofia", "BG"),
    ("Europe/Stockholm", "SE"),
    ("Europe/Vienna", "AT"),
    ("Europe/Warsaw", "PL"),
    ("Europe/Zurich", "CH"),
    ("Pacific/Auckland", "NZ"),
    ("Pacific/Fiji", "FJ"),
    ("Pacific/Guam", "GU"),
    ("Pacific/Honolulu", "US"),
    ("Pacific/Tongatapu", "TO"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_zones() {
        assert_eq!(country_alpha2_for_tzid("Europe/Brussels"), Some("BE"));
        assert_eq!(country_alpha2_for_tzid("America/New_York"), Some("US"));
    }

    #[test]
    fn unknown_zone_is_none() {
        assert_eq!(country_alpha2_for_tzid("Nowhere/Nothing"), None);
    }
}
