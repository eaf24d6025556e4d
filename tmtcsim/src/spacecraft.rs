//! Simulated spacecraft packet generation for tmtcsim

use rand::Rng;
use tmtclibgs::{Apid, GenerationTime, MissionEpoch, PacketType, PrimaryHeader, SeqCount};

/// Housekeeping telemetry source
pub struct TmGenerator {
    apid: Apid,
    seq: SeqCount,
    time_tagged: bool,
    epoch: MissionEpoch,
    payload_len: usize,
    gap_every: Option<u32>,
    generated: u32,
}

impl TmGenerator {
    pub fn new(apid: Apid, time_tagged: bool, payload_len: usize) -> Self {
        Self {
            apid,
            seq: SeqCount::new(0),
            time_tagged,
            epoch: MissionEpoch::default(),
            payload_len,
            gap_every: None,
            generated: 0,
        }
    }

    /// Skip one sequence count after every `n` packets, to exercise the
    /// ground side's continuity check
    pub fn with_gap_every(mut self, n: u32) -> Self {
        self.gap_every = if n == 0 { None } else { Some(n) };
        self
    }

    /// Build the next packet, stamped with `now` when time tagging is on
    pub fn next_packet<R: Rng>(&mut self, rng: &mut R, now: GenerationTime) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + self.payload_len);
        if self.time_tagged {
            data.extend_from_slice(&self.epoch.elapsed_millis(now).to_be_bytes());
        }
        data.extend((0..self.payload_len).map(|_| rng.gen::<u8>()));

        let header = PrimaryHeader::telemetry(self.apid, self.seq, self.time_tagged, data.len());
        let mut packet = header.encode().to_vec();
        packet.extend_from_slice(&data);

        self.generated += 1;
        self.seq = self.seq.next();
        if let Some(n) = self.gap_every {
            if self.generated % n == 0 {
                self.seq = self.seq.next();
            }
        }
        packet
    }
}

/// One-line summary of a received command for the log
pub fn describe_command(bytes: &[u8]) -> String {
    match PrimaryHeader::decode(bytes) {
        Some(header) => {
            let kind = match header.packet_type {
                PacketType::Telecommand => "TC",
                PacketType::Telemetry => "TM?",
            };
            let consistent = usize::from(header.data_length) + 7 == bytes.len();
            format!(
                "{} APID {} count {} length field {} ({} bytes{})",
                kind,
                header.apid,
                header.seq_count,
                header.data_length,
                bytes.len(),
                if consistent { "" } else { ", length mismatch" }
            )
        }
        None => format!("short command ({} bytes)", bytes.len()),
    }
}
