//! Telemetry store - latest record plus a first-write-wins origin

use parking_lot::RwLock;

use rover_core::TelemetryRecord;

/// Point-in-time copy of the store
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySnapshot {
    /// Latest record written by the session
    pub current: TelemetryRecord,
    /// First record of the session (defaults until `origin_set`)
    pub origin: TelemetryRecord,
    /// Whether `origin` has been captured
    pub origin_set: bool,
}

impl TelemetrySnapshot {
    /// Offset of the current position from the origin, as (Δlat, Δlon)
    ///
    /// Zero until the origin is captured.
    pub fn offset_from_origin(&self) -> (f64, f64) {
        if !self.origin_set {
            return (0.0, 0.0);
        }
        (
            self.current.latitude - self.origin.latitude,
            self.current.longitude - self.origin.longitude,
        )
    }
}

#[derive(Debug)]
struct StoreInner {
    current: TelemetryRecord,
    origin: TelemetryRecord,
    origin_set: bool,
    updates: u64,
}

impl Default for StoreInner {
    fn default() -> Self {
        StoreInner {
            current: TelemetryRecord::default(),
            origin: TelemetryRecord::default(),
            origin_set: false,
            updates: 0,
        }
    }
}

/// Shared telemetry store
///
/// INVARIANT: `origin_set` flips false→true at most once per session, and
/// `origin` never changes after that until `reset`.
///
/// Writers and readers only hold the lock for a copy; nothing awaits or
/// blocks while holding it.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    inner: RwLock<StoreInner>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        TelemetryStore::default()
    }

    /// Replace the current record; the first write of a session also
    /// captures the origin
    pub fn write(&self, record: TelemetryRecord) {
        let mut inner = self.inner.write();
        inner.current = record;
        inner.updates += 1;
        if !inner.origin_set {
            inner.origin = record;
            inner.origin_set = true;
            drop(inner);
            tracing::info!(
                lat = record.latitude,
                lon = record.longitude,
                "origin captured"
            );
        }
    }

    /// Consistent copy of current, origin and the origin flag
    pub fn read(&self) -> TelemetrySnapshot {
        let inner = self.inner.read();
        TelemetrySnapshot {
            current: inner.current,
            origin: inner.origin,
            origin_set: inner.origin_set,
        }
    }

    /// Copy of the current record only
    pub fn current(&self) -> TelemetryRecord {
        self.inner.read().current
    }

    /// Whether the origin has been captured this session
    pub fn origin_set(&self) -> bool {
        self.inner.read().origin_set
    }

    /// Number of writes since the last reset
    pub fn updates(&self) -> u64 {
        self.inner.read().updates
    }

    /// Return to the pre-session state, ready for a new origin
    pub fn reset(&self) {
        *self.inner.write() = StoreInner::default();
    }
}
