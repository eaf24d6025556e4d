//! Link implementation for the front-end
//!
//! A link moves frames in one direction through a processor. Each link owns
//! one thread, so the frames of a link are always processed in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use serde::Serialize;
use tmtclibgs::{CommandId, PreparedCommand, Statistics, TmtcError, TmtcResult, MAX_PACKET_LEN};

use crate::config::constants::LINK_BUFFER_SIZE;
use crate::endpoint::{FrameSink, FrameSource, PacketSink};
use crate::postprocessor::CommandPostprocessor;
use crate::preprocessor::PacketPreprocessor;

/// Direction of data flow in a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkDirection {
    /// Spacecraft to ground
    Telemetry,
    /// Ground to spacecraft
    Command,
}

/// Link thread state
pub struct Link {
    name: String,
    direction: LinkDirection,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<TmtcResult<Statistics>>>,
}

impl Link {
    fn spawn<F>(name: &str, direction: LinkDirection, body: F) -> TmtcResult<Self>
    where
        F: FnOnce(&AtomicBool) -> TmtcResult<Statistics> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let result = body(&thread_running);
            thread_running.store(false, Ordering::SeqCst);
            result
        })?;

        info!("Link {} started ({:?})", name, direction);
        Ok(Self {
            name: name.to_string(),
            direction,
            running,
            thread_handle: Some(handle),
        })
    }

    /// Start a telemetry link: frames from `source` are preprocessed and the
    /// surviving packets go to `sink`
    pub fn start_telemetry(
        name: &str,
        mut source: Box<dyn FrameSource>,
        preprocessor: Box<dyn PacketPreprocessor>,
        mut sink: Box<dyn PacketSink>,
    ) -> TmtcResult<Self> {
        let link_name = name.to_string();
        Self::spawn(name, LinkDirection::Telemetry, move |running| {
            let mut stats = Statistics::new();
            let mut buffer = vec![0u8; LINK_BUFFER_SIZE];

            while running.load(Ordering::SeqCst) {
                let n = match source.recv_frame(&mut buffer) {
                    Ok(Some(n)) => n,
                    Ok(None) => continue,
                    Err(TmtcError::Channel(msg)) => {
                        info!("Link {}: {}", link_name, msg);
                        break;
                    }
                    Err(e) => {
                        warn!("Link {} read error: {}", link_name, e);
                        stats.reads_failed += 1;
                        continue;
                    }
                };
                stats.frames_received += 1;
                stats.bytes_received += n as u64;

                if n > MAX_PACKET_LEN {
                    warn!("Link {} dropped a frame longer than {} bytes", link_name, MAX_PACKET_LEN);
                    stats.frames_dropped += 1;
                    continue;
                }

                let packet = match preprocessor.process(&buffer[..n]) {
                    Some(packet) => packet,
                    None => {
                        stats.frames_dropped += 1;
                        continue;
                    }
                };

                let len = packet.binary.len() as u64;
                match sink.deliver(packet) {
                    Ok(()) => {
                        stats.frames_delivered += 1;
                        stats.bytes_sent += len;
                    }
                    Err(e) => {
                        warn!("Link {} delivery error: {}", link_name, e);
                        stats.writes_failed += 1;
                    }
                }
            }

            stats.seq_jumps = preprocessor.seq_jumps();
            stats.apids_tracked = preprocessor.tracked_apids() as u64;
            Ok(stats.with_timestamp())
        })
    }

    /// Start a command link: every frame from `source` is one assembled
    /// command, postprocessed and written to `sink`. A fatal postprocessing
    /// error stops the link; any other drops just that command. Oversized
    /// frames reach the postprocessor as they are, so it rejects them.
    pub fn start_command(
        name: &str,
        mut source: Box<dyn FrameSource>,
        postprocessor: Box<dyn CommandPostprocessor>,
        mut sink: Box<dyn FrameSink>,
    ) -> TmtcResult<Self> {
        let link_name = name.to_string();
        Self::spawn(name, LinkDirection::Command, move |running| {
            let mut stats = Statistics::new();
            let mut buffer = vec![0u8; LINK_BUFFER_SIZE];
            let mut next_command = 1u32;

            while running.load(Ordering::SeqCst) {
                let n = match source.recv_frame(&mut buffer) {
                    Ok(Some(n)) => n,
                    Ok(None) => continue,
                    Err(TmtcError::Channel(msg)) => {
                        info!("Link {}: {}", link_name, msg);
                        break;
                    }
                    Err(e) => {
                        warn!("Link {} read error: {}", link_name, e);
                        stats.reads_failed += 1;
                        continue;
                    }
                };
                stats.frames_received += 1;
                stats.bytes_received += n as u64;

                let command_id = CommandId::new(link_name.as_str(), next_command);
                next_command = next_command.wrapping_add(1);

                let binary = match postprocessor.process(PreparedCommand::new(command_id, buffer[..n].to_vec())) {
                    Ok(binary) => binary,
                    Err(e) if e.is_fatal() => {
                        error!("Link {} stopping, {} rejected command: {}", link_name, postprocessor.name(), e);
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("Link {} dropped command: {}", link_name, e);
                        stats.frames_dropped += 1;
                        continue;
                    }
                };

                match sink.send_frame(&binary) {
                    Ok(written) => {
                        debug!("Link {} sent {} bytes", link_name, written);
                        stats.frames_delivered += 1;
                        stats.bytes_sent += written as u64;
                    }
                    Err(e) => {
                        warn!("Link {} write error: {}", link_name, e);
                        stats.writes_failed += 1;
                    }
                }
            }

            Ok(stats.with_timestamp())
        })
    }

    /// Wait for the link thread to finish on its own, e.g. once its source
    /// is closed
    pub fn wait(&mut self) -> TmtcResult<Statistics> {
        match self.thread_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| TmtcError::link(format!("{} thread panicked", self.name)))?,
            None => Ok(Statistics::new()),
        }
    }

    /// Stop the link thread
    pub fn stop(&mut self) -> TmtcResult<Statistics> {
        self.running.store(false, Ordering::SeqCst);
        let result = self.wait();
        info!("Link {} stopped", self.name);
        result
    }

    /// Check if the link is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> LinkDirection {
        self.direction
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            let _ = self.stop();
        }
    }
}
