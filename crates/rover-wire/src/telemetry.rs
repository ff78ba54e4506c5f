//! Telemetry record codec
//!
//! Records are `;`-terminated `KEY:value` fields in fixed order:
//!
//! ```text
//! LAT:34.0522;LON:-118.2437;TEMP:25.0;
//! ```
//!
//! Decoding is best-effort and never fails. Each field is applied on its
//! own, so one bad segment never discards the rest of the record.

use std::fmt::Write;

use rover_core::{TelemetryField, TelemetryRecord};

/// Field terminator
pub const FIELD_TERMINATOR: char = ';';

/// Key/value separator
pub const KEY_SEPARATOR: char = ':';

/// Outcome of a decode, for diagnostics only
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Fields written into the record
    pub applied: u32,
    /// Well-formed segments with a key we do not know
    pub unknown: u32,
    /// Segments without a separator, or with an unusable number
    pub malformed: u32,
}

impl DecodeReport {
    /// True if nothing in the text was usable
    pub fn is_empty(&self) -> bool {
        self.applied == 0
    }

    /// True if some segment was skipped
    pub fn has_skipped(&self) -> bool {
        self.unknown > 0 || self.malformed > 0
    }
}

/// Encode a record as wire text
pub fn encode(record: &TelemetryRecord) -> String {
    let mut out = String::with_capacity(48);
    encode_into(record, &mut out);
    out
}

/// Append the wire text of a record to `out`
pub fn encode_into(record: &TelemetryRecord, out: &mut String) {
    for field in TelemetryField::ALL {
        out.push_str(field.key());
        out.push(KEY_SEPARATOR);
        write_value(out, record.get(field));
        out.push(FIELD_TERMINATOR);
    }
}

/// Plain decimal notation, always with a fractional part (`25.0`, not `25`).
fn write_value(out: &mut String, value: f64) {
    let start = out.len();
    // Writing to a String cannot fail
    let _ = write!(out, "{}", value);
    if value.is_finite() && !out[start..].contains('.') {
        out.push_str(".0");
    }
}

/// Decode wire text into a fresh record
///
/// Fields missing from `text` take their default values.
pub fn decode(text: &str) -> TelemetryRecord {
    let mut record = TelemetryRecord::default();
    decode_into(&mut record, text);
    record
}

/// Overlay wire text onto an existing record
///
/// Fields missing from `text` keep their prior value. Later occurrences of
/// a key win over earlier ones. Temperature is clamped into its valid range.
pub fn decode_into(record: &mut TelemetryRecord, text: &str) -> DecodeReport {
    let mut report = DecodeReport::default();

    for segment in text.split(FIELD_TERMINATOR) {
        let segment = trim_segment(segment);
        if segment.is_empty() {
            continue;
        }

        let Some((key, value)) = segment.split_once(KEY_SEPARATOR) else {
            tracing::trace!(segment, "telemetry segment without separator");
            report.malformed += 1;
            continue;
        };

        let Some(field) = TelemetryField::from_key(trim_segment(key)) else {
            report.unknown += 1;
            continue;
        };

        match trim_segment(value).parse::<f64>() {
            Ok(v) if v.is_finite() => {
                record.set(field, v);
                if field == TelemetryField::Temperature {
                    record.clamp_temperature();
                }
                report.applied += 1;
            }
            _ => {
                tracing::trace!(key = field.key(), value, "unusable telemetry value");
                report.malformed += 1;
            }
        }
    }

    report
}

/// Strip whitespace and NUL padding left over from a fixed-size receive buffer
fn trim_segment(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0')
}
