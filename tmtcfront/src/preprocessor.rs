//! Telemetry packet preprocessing
//!
//! Every frame received on the telemetry link passes through a
//! `PacketPreprocessor` before it goes any further. Frames that are too
//! short are dropped with a `SHORT_PACKET` event; sequence count jumps raise
//! `SEQ_COUNT_JUMP` but the frame is still passed on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use tmtclibgs::{
    Apid, Event, EventSink, GenerationTime, HeaderWord, MissionEpoch, SeqCount, TmtcError,
    TmtcResult, PRIMARY_HEADER_LEN, SECONDARY_TIME_HEADER_LEN,
};

use crate::seq_tracker::{Classification, SequenceTracker};

/// A validated telemetry packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedPacket {
    /// Frame bytes exactly as received
    pub binary: Vec<u8>,
    /// When the packet was generated
    pub generation_time: GenerationTime,
    /// The whole header word, so APID and count together identify the packet
    pub sequence_identifier: u32,
}

impl PreprocessedPacket {
    pub fn apid(&self) -> Apid {
        HeaderWord(self.sequence_identifier).apid()
    }

    pub fn seq_count(&self) -> SeqCount {
        HeaderWord(self.sequence_identifier).seq_count()
    }
}

/// How a packet's generation time is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStrategy {
    /// Packets carry no time; use the receiver's wall clock
    WallClock,
    /// A 4-byte secondary header holds milliseconds since the mission epoch
    MissionElapsed(MissionEpoch),
}

impl TimestampStrategy {
    /// Shortest frame this strategy can read a time from
    pub fn min_frame_length(&self) -> usize {
        match self {
            TimestampStrategy::WallClock => PRIMARY_HEADER_LEN,
            TimestampStrategy::MissionElapsed(_) => PRIMARY_HEADER_LEN + SECONDARY_TIME_HEADER_LEN,
        }
    }

    fn generation_time(&self, frame: &[u8]) -> Option<GenerationTime> {
        match self {
            TimestampStrategy::WallClock => Some(GenerationTime::now()),
            TimestampStrategy::MissionElapsed(epoch) => {
                let field: [u8; 4] = frame
                    .get(PRIMARY_HEADER_LEN..PRIMARY_HEADER_LEN + SECONDARY_TIME_HEADER_LEN)?
                    .try_into()
                    .ok()?;
                Some(epoch.after_millis(u32::from_be_bytes(field)))
            }
        }
    }
}

/// Interface of every telemetry preprocessor
pub trait PacketPreprocessor: Send {
    /// Name used in events and logs
    fn name(&self) -> &str;

    /// Validate a frame. `None` means the frame was dropped; the reason has
    /// already been reported as an event.
    fn process(&self, frame: &[u8]) -> Option<PreprocessedPacket>;

    /// Number of sequence count jumps seen so far
    fn seq_jumps(&self) -> u64;

    /// Last sequence count accepted for `apid`, if any
    fn last_seq_count(&self, apid: Apid) -> Option<SeqCount>;

    /// Number of APIDs seen so far
    fn tracked_apids(&self) -> usize;
}

/// Preprocessor for CCSDS space packets
pub struct CcsdsPreprocessor {
    name: String,
    strategy: TimestampStrategy,
    min_frame_length: usize,
    tracker: SequenceTracker,
    events: Arc<dyn EventSink>,
    seq_jumps: AtomicU64,
}

impl CcsdsPreprocessor {
    pub fn new(name: impl Into<String>, strategy: TimestampStrategy, events: Arc<dyn EventSink>) -> Self {
        Self {
            name: name.into(),
            strategy,
            min_frame_length: strategy.min_frame_length(),
            tracker: SequenceTracker::new(),
            events,
            seq_jumps: AtomicU64::new(0),
        }
    }

    /// Require frames of at least `length` bytes. The minimum can be raised
    /// but never lowered below what the timestamp strategy needs.
    pub fn with_min_frame_length(mut self, length: usize) -> TmtcResult<Self> {
        let floor = self.strategy.min_frame_length();
        if length < floor {
            return Err(TmtcError::Config(format!(
                "{}: minimum frame length {} is below the {} bytes required",
                self.name, length, floor
            )));
        }
        self.min_frame_length = length;
        Ok(self)
    }

    pub fn min_frame_length(&self) -> usize {
        self.min_frame_length
    }

    pub fn strategy(&self) -> TimestampStrategy {
        self.strategy
    }
}

impl PacketPreprocessor for CcsdsPreprocessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, frame: &[u8]) -> Option<PreprocessedPacket> {
        if frame.len() < self.min_frame_length {
            self.events.send(
                &self.name,
                Event::ShortPacket {
                    observed: frame.len(),
                    required: self.min_frame_length,
                },
            );
            return None;
        }

        let word = HeaderWord::read(frame)?;
        let apid = word.apid();
        let seq = word.seq_count();

        if let Classification::Discontinuous { previous } = self.tracker.observe(apid, seq) {
            self.seq_jumps.fetch_add(1, Ordering::Relaxed);
            self.events.send(
                &self.name,
                Event::SeqCountJump {
                    apid,
                    old_seq: previous,
                    new_seq: seq,
                },
            );
        }

        let expects_secondary = matches!(self.strategy, TimestampStrategy::MissionElapsed(_));
        if word.has_secondary_header() != expects_secondary {
            debug!(
                "{}: APID {} secondary header flag is {}, link expects {}",
                self.name,
                apid,
                word.has_secondary_header(),
                expects_secondary
            );
        }

        let generation_time = self.strategy.generation_time(frame)?;
        debug!("{}: APID {} count {} generated {}", self.name, apid, seq, generation_time);

        Some(PreprocessedPacket {
            binary: frame.to_vec(),
            generation_time,
            sequence_identifier: word.0,
        })
    }

    fn seq_jumps(&self) -> u64 {
        self.seq_jumps.load(Ordering::Relaxed)
    }

    fn last_seq_count(&self, apid: Apid) -> Option<SeqCount> {
        self.tracker.last(apid)
    }

    fn tracked_apids(&self) -> usize {
        self.tracker.tracked_apids()
    }
}
