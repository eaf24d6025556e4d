//! TMTC Spacecraft Simulator (tmtcsim)
//!
//! Plays the spacecraft end of the front-end's links:
//!
//! | Link | Direction      | Address         | Content                          |
//! |------|----------------|-----------------|----------------------------------|
//! | TM   | sim -> ground  | 127.0.0.1:10015 | APID 100 housekeeping, 1 per sec |
//! | TC   | ground -> sim  | 127.0.0.1:10025 | commands, logged on receipt      |
//!
//! Usage: `tmtcsim [time-tagged|primary] [gap-every]`

mod spacecraft;

use std::env;
use std::net::UdpSocket;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use spacecraft::{describe_command, TmGenerator};
use tmtclibgs::{Apid, GenerationTime, TmtcError, TmtcResult};

const TM_DEST_ADDR: &str = "127.0.0.1:10015";
const TC_LISTEN_ADDR: &str = "127.0.0.1:10025";
const HOUSEKEEPING_APID: u16 = 100;
const HOUSEKEEPING_PAYLOAD_LEN: usize = 16;
const TM_INTERVAL: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn send_telemetry(mut generator: TmGenerator, running: Arc<AtomicBool>) -> TmtcResult<()> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let mut rng = rand::thread_rng();
    let mut sent = 0u64;

    while running.load(Ordering::SeqCst) {
        let packet = generator.next_packet(&mut rng, GenerationTime::now());
        match socket.send_to(&packet, TM_DEST_ADDR) {
            Ok(n) => {
                sent += 1;
                debug!("Sent TM packet {} ({} bytes)", sent, n);
            }
            Err(e) => warn!("TM send error: {}", e),
        }
        thread::sleep(TM_INTERVAL);
    }

    info!("Telemetry stopped after {} packets", sent);
    Ok(())
}

fn receive_commands(running: Arc<AtomicBool>) -> TmtcResult<()> {
    let socket = UdpSocket::bind(TC_LISTEN_ADDR)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    let mut buffer = vec![0u8; 65536];
    let mut received = 0u64;

    info!("Listening for commands on UDP {}", TC_LISTEN_ADDR);
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buffer) {
            Ok((n, from)) => {
                received += 1;
                info!("Received from {}: {}", from, describe_command(&buffer[..n]));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(TmtcError::Io(e)),
        }
    }

    info!("Command receiver stopped after {} commands", received);
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let time_tagged = match env::args().nth(1).as_deref() {
        None | Some("time-tagged") => true,
        Some("primary") => false,
        Some(other) => {
            error!("Unknown packet format {}, expected time-tagged or primary", other);
            process::exit(2);
        }
    };
    let gap_every = match env::args().nth(2).map(|s| s.parse::<u32>()) {
        None => 0,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            error!("Invalid gap interval: {}", e);
            process::exit(2);
        }
    };

    info!(
        "TMTCSim starting up, {} telemetry to {}",
        if time_tagged { "time-tagged" } else { "primary-header-only" },
        TM_DEST_ADDR
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        error!("Cannot install signal handler: {}", e);
        process::exit(1);
    }

    let generator = TmGenerator::new(Apid::new(HOUSEKEEPING_APID), time_tagged, HOUSEKEEPING_PAYLOAD_LEN)
        .with_gap_every(gap_every);

    let tm_running = running.clone();
    let tm_handle = thread::spawn(move || send_telemetry(generator, tm_running));
    let tc_running = running.clone();
    let tc_handle = thread::spawn(move || receive_commands(tc_running));

    // Either thread ending on its own takes the other one down with it
    while running.load(Ordering::SeqCst) && !tm_handle.is_finished() && !tc_handle.is_finished() {
        thread::sleep(POLL_INTERVAL);
    }
    running.store(false, Ordering::SeqCst);

    let mut failed = false;
    for (name, handle) in [("telemetry", tm_handle), ("command", tc_handle)] {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{} thread error: {}", name, e);
                failed = true;
            }
            Err(_) => {
                error!("{} thread panicked", name);
                failed = true;
            }
        }
    }

    info!("TMTCSim shutdown complete");
    if failed {
        process::exit(1);
    }
}
