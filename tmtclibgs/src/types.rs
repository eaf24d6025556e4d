//! Type definitions shared between the front-end and the simulator

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Number of distinct application process identifiers (11 bits)
pub const APID_COUNT: usize = 1 << 11;

/// Modulus of the CCSDS packet sequence count (14 bits)
pub const SEQ_COUNT_MODULUS: u16 = 1 << 14;

/// Application process identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Apid(u16);

impl Apid {
    pub const MASK: u16 = 0x07FF;

    /// Build an apid, discarding anything above the low 11 bits
    pub fn new(raw: u16) -> Self {
        Self(raw & Self::MASK)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Slot index into per-apid arenas
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Apid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CCSDS packet sequence count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqCount(u16);

impl SeqCount {
    pub const MASK: u16 = 0x3FFF;

    /// Build a sequence count, discarding anything above the low 14 bits
    pub fn new(raw: u16) -> Self {
        Self(raw & Self::MASK)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// The count that follows this one, wrapping at 16384
    pub fn next(&self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }

    /// Whether `later` is exactly one step after this count
    pub fn is_followed_by(&self, later: SeqCount) -> bool {
        self.next() == later
    }
}

impl fmt::Display for SeqCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Packet generation time, in microseconds since the UNIX epoch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationTime(pub i64);

impl GenerationTime {
    /// Wall-clock time of the calling process
    pub fn now() -> Self {
        Self(Utc::now().timestamp_micros())
    }

    pub fn from_unix_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1000))
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

    pub fn as_unix_millis(&self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.0.div_euclid(1_000_000);
        let nanos = (self.0.rem_euclid(1_000_000) * 1000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

impl fmt::Display for GenerationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
            None => write!(f, "{}us", self.0),
        }
    }
}

/// 2025-01-01T00:00:00Z
pub const DEFAULT_MISSION_EPOCH_MS: i64 = 1_735_689_600_000;

/// Fixed reference instant that mission-elapsed times count from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionEpoch {
    unix_millis: i64,
}

impl MissionEpoch {
    pub fn from_unix_millis(unix_millis: i64) -> Self {
        Self { unix_millis }
    }

    /// Parse an RFC 3339 instant such as `2025-01-01T00:00:00Z`
    pub fn parse(text: &str) -> Result<Self, String> {
        let dt = DateTime::parse_from_rfc3339(text)
            .map_err(|e| format!("Invalid mission epoch '{}': {}", text, e))?;
        Ok(Self::from_unix_millis(dt.timestamp_millis()))
    }

    pub fn unix_millis(&self) -> i64 {
        self.unix_millis
    }

    /// Absolute time of an instant `delta_ms` milliseconds after the epoch
    pub fn after_millis(&self, delta_ms: u32) -> GenerationTime {
        GenerationTime::from_unix_millis(self.unix_millis + i64::from(delta_ms))
    }

    /// Milliseconds elapsed since the epoch, saturated to the u32 range
    pub fn elapsed_millis(&self, at: GenerationTime) -> u32 {
        let delta = at.as_unix_millis() - self.unix_millis;
        delta.clamp(0, i64::from(u32::MAX)) as u32
    }
}

impl Default for MissionEpoch {
    fn default() -> Self {
        Self::from_unix_millis(DEFAULT_MISSION_EPOCH_MS)
    }
}

/// Statistics for link operations
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    /// Time when statistics were collected
    pub timestamp: Option<GenerationTime>,
    /// Number of frames read from the source
    pub frames_received: u64,
    /// Number of frames dropped by the processor
    pub frames_dropped: u64,
    /// Number of frames handed to the sink
    pub frames_delivered: u64,
    /// Number of sequence count jumps observed
    pub seq_jumps: u64,
    /// Number of APIDs with continuity state
    pub apids_tracked: u64,
    /// Number of bytes received
    pub bytes_received: u64,
    /// Number of bytes sent
    pub bytes_sent: u64,
    /// Number of failed read operations
    pub reads_failed: u64,
    /// Number of failed write operations
    pub writes_failed: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self) -> Self {
        self.timestamp = Some(GenerationTime::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apid_masks_to_11_bits() {
        assert_eq!(Apid::new(0xFFFF).value(), 0x07FF);
        assert_eq!(Apid::new(100).index(), 100);
    }

    #[test]
    fn test_seq_count_wraps() {
        let last = SeqCount::new(16383);
        assert_eq!(last.next(), SeqCount::new(0));
        assert!(last.is_followed_by(SeqCount::new(0)));
        assert!(!SeqCount::new(5).is_followed_by(SeqCount::new(5)));
    }

    #[test]
    fn test_default_mission_epoch() {
        let epoch = MissionEpoch::parse("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(epoch, MissionEpoch::default());
        assert_eq!(epoch.after_millis(0), GenerationTime(DEFAULT_MISSION_EPOCH_MS * 1000));
    }

    #[test]
    fn test_mission_epoch_rejects_garbage() {
        assert!(MissionEpoch::parse("yesterday").is_err());
    }

    #[test]
    fn test_elapsed_millis_saturates() {
        let epoch = MissionEpoch::default();
        let before = GenerationTime::from_unix_millis(DEFAULT_MISSION_EPOCH_MS - 10);
        assert_eq!(epoch.elapsed_millis(before), 0);
        assert_eq!(epoch.elapsed_millis(epoch.after_millis(1500)), 1500);
    }

    #[test]
    fn test_generation_time_display() {
        let t = GenerationTime::from_unix_millis(DEFAULT_MISSION_EPOCH_MS);
        assert_eq!(t.to_string(), "2025-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_statistics_with_timestamp() {
        let stats = Statistics::new().with_timestamp();
        assert!(stats.timestamp.is_some());
    }
}
