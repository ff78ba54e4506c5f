//! Telemetry record - the position/temperature tuple exchanged over the wire

/// Default latitude of a fresh record (degrees)
pub const DEFAULT_LATITUDE: f64 = 34.0522;
/// Default longitude of a fresh record (degrees)
pub const DEFAULT_LONGITUDE: f64 = -118.2437;
/// Default temperature of a fresh record
pub const DEFAULT_TEMPERATURE: f64 = 25.0;

/// Lower bound of the temperature scale
pub const TEMPERATURE_MIN: f64 = 0.0;
/// Upper bound of the temperature scale
pub const TEMPERATURE_MAX: f64 = 100.0;

/// Telemetry record
///
/// Always fully populated: there is no "absent" field. Decoding overlays
/// onto an existing record, so a missing key keeps the previous value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryRecord {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Temperature, arbitrary unit in [0, 100]
    pub temperature: f64,
}

impl TelemetryRecord {
    pub fn new(latitude: f64, longitude: f64, temperature: f64) -> Self {
        TelemetryRecord {
            latitude,
            longitude,
            temperature,
        }
    }

    /// Read a field by key
    #[inline]
    pub fn get(&self, field: TelemetryField) -> f64 {
        match field {
            TelemetryField::Latitude => self.latitude,
            TelemetryField::Longitude => self.longitude,
            TelemetryField::Temperature => self.temperature,
        }
    }

    /// Overwrite a field by key
    #[inline]
    pub fn set(&mut self, field: TelemetryField, value: f64) {
        match field {
            TelemetryField::Latitude => self.latitude = value,
            TelemetryField::Longitude => self.longitude = value,
            TelemetryField::Temperature => self.temperature = value,
        }
    }

    /// Clamp temperature into [TEMPERATURE_MIN, TEMPERATURE_MAX]
    pub fn clamp_temperature(&mut self) {
        self.temperature = self.temperature.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX);
    }

    /// Check that all fields are within tolerance of another record
    pub fn approx_eq(&self, other: &TelemetryRecord, tolerance: f64) -> bool {
        TelemetryField::ALL
            .iter()
            .all(|&f| (self.get(f) - other.get(f)).abs() <= tolerance)
    }
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        TelemetryRecord {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Record fields, in wire order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TelemetryField {
    Latitude,
    Longitude,
    Temperature,
}

impl TelemetryField {
    /// All fields in the fixed wire order (LAT, LON, TEMP)
    pub const ALL: [TelemetryField; 3] = [
        TelemetryField::Latitude,
        TelemetryField::Longitude,
        TelemetryField::Temperature,
    ];

    /// Wire key
    #[inline]
    pub fn key(self) -> &'static str {
        match self {
            TelemetryField::Latitude => "LAT",
            TelemetryField::Longitude => "LON",
            TelemetryField::Temperature => "TEMP",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "LAT" => Some(TelemetryField::Latitude),
            "LON" => Some(TelemetryField::Longitude),
            "TEMP" => Some(TelemetryField::Temperature),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let r = TelemetryRecord::default();
        assert_eq!(r.latitude, 34.0522);
        assert_eq!(r.longitude, -118.2437);
        assert_eq!(r.temperature, 25.0);
    }

    #[test]
    fn test_field_keys() {
        for field in TelemetryField::ALL {
            assert_eq!(TelemetryField::from_key(field.key()), Some(field));
        }
        assert_eq!(TelemetryField::from_key("lat"), None);
        assert_eq!(TelemetryField::from_key("ALT"), None);
    }

    #[test]
    fn test_get_set() {
        let mut r = TelemetryRecord::default();
        r.set(TelemetryField::Longitude, 1.5);
        assert_eq!(r.get(TelemetryField::Longitude), 1.5);
        assert_eq!(r.latitude, DEFAULT_LATITUDE);
    }

    #[test]
    fn test_clamp_temperature() {
        let mut r = TelemetryRecord::new(0.0, 0.0, 120.0);
        r.clamp_temperature();
        assert_eq!(r.temperature, TEMPERATURE_MAX);

        r.temperature = -3.0;
        r.clamp_temperature();
        assert_eq!(r.temperature, TEMPERATURE_MIN);
    }
}
