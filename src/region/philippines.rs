//! Built-in Philippine region catalog.
//!
//! Codes match the `id` property of the bundled boundary dataset. Display names
//! are the spellings used by the case report sources, mixed case included.

pub const PHILIPPINE_REGIONS: &[(&str, &str)] = &[
    ("PH00", "NATIONAL CAPITAL REGION"),
    ("PH01", "Region I-ILOCOS REGION"),
    ("PH02", "Region II-CAGAYAN VALLEY"),
    ("PH03", "REGION III-CENTRAL LUZON"),
    ("PH05", "REGION V-BICOL REGION"),
    ("PH06", "REGION VI-WESTERN VISAYAS"),
    ("PH07", "REGION VII-CENTRAL VISAYAS"),
    ("PH08", "REGION VIII-EASTERN VISAYAS"),
    ("PH09", "REGION IX-ZAMBOANGA PENINSULA"),
    ("PH10", "REGION X-NORTHERN MINDANAO"),
    ("PH11", "REGION XI-DAVAO REGION"),
    ("PH12", "REGION XII-SOCCSKSARGEN"),
    ("PH13", "CARAGA"),
    ("PH14", "BARMM"),
    ("PH15", "CAR"),
    ("PH40", "REGION IV-A-CALABARZON"),
    ("PH41", "REGION IVB-MIMAROPA"),
];
