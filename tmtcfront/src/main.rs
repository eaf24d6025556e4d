//! TMTC front-end main entry point
//!
//! Starts the telemetry and command links described by the configuration
//! file and runs until interrupted.

use std::env;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{error, info};
use tmtcfront_lib::{
    constants::{DEFAULT_CONFIG_PATH, LINK_POLL_INTERVAL},
    load_config, Link, LogPacketSink, PacketSink, ProcessorRegistry, UdpEndpoint,
};
use tmtclibgs::{
    CommandHistorySink, EventSink, LogCommandHistory, LogEventSink, Statistics, TmtcError,
    TmtcResult,
};

fn report(link: &Link, result: &TmtcResult<Statistics>) {
    match result {
        Ok(stats) => match serde_json::to_string(stats) {
            Ok(json) => info!("Link {} statistics: {}", link.name(), json),
            Err(e) => error!("Link {} statistics unavailable: {}", link.name(), e),
        },
        Err(e) => error!("Link {} failed: {}", link.name(), e),
    }
}

fn run(config_path: &str) -> TmtcResult<()> {
    let (tm_config, tc_config) = load_config(config_path)?;
    info!("TM link {} on {}", tm_config.name, tm_config.listen_addr);
    info!("TC link {} from {} to {}", tc_config.name, tc_config.ingress_addr, tc_config.dest_addr);

    let registry = ProcessorRegistry::with_defaults();
    let events: Arc<dyn EventSink> = Arc::new(LogEventSink);
    let history: Arc<dyn CommandHistorySink> = Arc::new(LogCommandHistory);

    let preprocessor = registry.build_preprocessor(&tm_config.preprocessor, events)?;
    let postprocessor = registry.build_postprocessor(&tc_config.postprocessor, history)?;

    let tm_source = UdpEndpoint::bind(tm_config.listen_addr, LINK_POLL_INTERVAL)?;
    let tm_sink: Box<dyn PacketSink> = match tm_config.forward_addr {
        Some(addr) => Box::new(UdpEndpoint::sender(addr)?),
        None => Box::new(LogPacketSink),
    };
    let tc_source = UdpEndpoint::bind(tc_config.ingress_addr, LINK_POLL_INTERVAL)?;
    let tc_sink = UdpEndpoint::sender(tc_config.dest_addr)?;

    let mut tm_link = Link::start_telemetry(&tm_config.name, Box::new(tm_source), preprocessor, tm_sink)?;
    let mut tc_link = Link::start_command(&tc_config.name, Box::new(tc_source), postprocessor, Box::new(tc_sink))?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| TmtcError::link(format!("Cannot install signal handler: {}", e)))?;

    info!("TMTC front-end running, press Ctrl-C to stop");
    while running.load(Ordering::SeqCst) && tm_link.is_running() && tc_link.is_running() {
        thread::sleep(LINK_POLL_INTERVAL);
    }

    info!("Shutting down links");
    let tm_result = tm_link.stop();
    report(&tm_link, &tm_result);
    let tc_result = tc_link.stop();
    report(&tc_link, &tc_result);

    tm_result?;
    tc_result?;
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    info!("TMTC front-end starting, configuration from {}", config_path);

    if let Err(e) = run(&config_path) {
        error!("{}", e);
        process::exit(1);
    }

    info!("TMTC front-end shutdown complete");
}
