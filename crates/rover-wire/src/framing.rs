//! Record framing
//!
//! The reference wire has no record delimiter: each socket read is taken as
//! one record. `Framing::Line` adds a trailing `\n` to every telemetry
//! record so the receiver can reassemble records that TCP split or
//! coalesced. Both ends must agree on the framing.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};

use rover_core::TelemetryRecord;

use crate::encode_into;

/// Record terminator used by `Framing::Line`
pub const LINE_TERMINATOR: u8 = b'\n';

/// Upper bound on buffered bytes without a terminator
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

/// How telemetry records are delimited on the stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One read is one record (reference behavior)
    #[default]
    PerRead,
    /// Records end with `\n` and are reassembled across reads
    Line,
}

impl Framing {
    /// Encode a record with this framing applied
    pub fn encode_record(self, record: &TelemetryRecord) -> Vec<u8> {
        let mut text = String::with_capacity(49);
        encode_into(record, &mut text);
        if self == Framing::Line {
            text.push(LINE_TERMINATOR as char);
        }
        text.into_bytes()
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::PerRead => write!(f, "per-read"),
            Framing::Line => write!(f, "line"),
        }
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-read" | "per_read" => Ok(Framing::PerRead),
            "line" => Ok(Framing::Line),
            other => Err(format!("unknown framing '{}' (expected per-read or line)", other)),
        }
    }
}

/// Turns received chunks into record texts according to a `Framing`
#[derive(Debug)]
pub struct RecordAssembler {
    framing: Framing,
    pending: BytesMut,
    /// Bytes discarded because no terminator arrived in time
    discarded: usize,
}

impl RecordAssembler {
    pub fn new(framing: Framing) -> Self {
        RecordAssembler {
            framing,
            pending: BytesMut::new(),
            discarded: 0,
        }
    }

    /// Bytes buffered while waiting for a terminator
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Total bytes dropped by the overflow guard
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Feed one received chunk, returning every complete record text
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self.framing {
            Framing::PerRead => {
                if chunk.is_empty() {
                    Vec::new()
                } else {
                    vec![String::from_utf8_lossy(chunk).into_owned()]
                }
            }
            Framing::Line => self.push_lines(chunk),
        }
    }

    fn push_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == LINE_TERMINATOR) {
            let line = self.pending.split_to(pos + 1);
            let line = &line[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if !line.is_empty() {
                records.push(String::from_utf8_lossy(line).into_owned());
            }
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::debug!(
                bytes = self.pending.len(),
                "discarding unterminated record data"
            );
            self.discarded += self.pending.len();
            self.pending.advance(self.pending.len());
        }

        records
    }
}
