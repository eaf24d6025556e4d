//! Endpoint traits for the front-end links
//!
//! A link reads frames from a `FrameSource` and hands its output either to a
//! `FrameSink` (commands, raw bytes) or a `PacketSink` (preprocessed
//! telemetry). Sources return `Ok(None)` when nothing arrived within their
//! poll interval so the link can check whether it was asked to stop.
//!
//! Channel endpoints are used to wire links inside one process.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use log::info;
use tmtclibgs::{TmtcError, TmtcResult};

use crate::preprocessor::PreprocessedPacket;

/// Trait for endpoints that produce frames
pub trait FrameSource: Send {
    /// Receive one frame into `buf`. Returns `Ok(None)` on timeout. A frame
    /// longer than `buf` fills it completely, so callers size `buf` one byte
    /// past the longest frame they accept and treat a full buffer as
    /// oversized.
    fn recv_frame(&mut self, buf: &mut [u8]) -> TmtcResult<Option<usize>>;
}

/// Trait for endpoints that consume frames
pub trait FrameSink: Send {
    /// Send one frame, returning the number of bytes written
    fn send_frame(&mut self, frame: &[u8]) -> TmtcResult<usize>;
}

/// Trait for consumers of preprocessed telemetry
pub trait PacketSink: Send {
    fn deliver(&mut self, packet: PreprocessedPacket) -> TmtcResult<()>;
}

/// Frame source fed through an in-process channel
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    poll_interval: Duration,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Vec<u8>>, poll_interval: Duration) -> Self {
        Self { rx, poll_interval }
    }

    /// A source together with the sender that feeds it
    pub fn pair(poll_interval: Duration) -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx, poll_interval))
    }
}

impl FrameSource for ChannelSource {
    fn recv_frame(&mut self, buf: &mut [u8]) -> TmtcResult<Option<usize>> {
        match self.rx.recv_timeout(self.poll_interval) {
            Ok(frame) => {
                // Same as a datagram socket: the excess is discarded
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                Ok(Some(n))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TmtcError::Channel("source disconnected".to_string()))
            }
        }
    }
}

impl FrameSink for Sender<Vec<u8>> {
    fn send_frame(&mut self, frame: &[u8]) -> TmtcResult<usize> {
        self.send(frame.to_vec())
            .map_err(|_| TmtcError::Channel("sink disconnected".to_string()))?;
        Ok(frame.len())
    }
}

impl PacketSink for Sender<PreprocessedPacket> {
    fn deliver(&mut self, packet: PreprocessedPacket) -> TmtcResult<()> {
        self.send(packet)
            .map_err(|_| TmtcError::Channel("sink disconnected".to_string()))
    }
}

/// Packet sink that only logs what it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPacketSink;

impl PacketSink for LogPacketSink {
    fn deliver(&mut self, packet: PreprocessedPacket) -> TmtcResult<()> {
        info!(
            "TM APID {} count {} generated {} ({} bytes)",
            packet.apid(),
            packet.seq_count(),
            packet.generation_time,
            packet.binary.len()
        );
        Ok(())
    }
}
