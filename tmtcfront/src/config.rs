//! Configuration loading for the front-end

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tmtclibgs::{FrontEndConfigJson, TcLinkConfig, TmLinkConfig, TmtcError, TmtcResult};

/// Load the link configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> TmtcResult<(TmLinkConfig, TcLinkConfig)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: FrontEndConfigJson = serde_json::from_reader(reader)?;

    let tm_config = config.tm_link.to_tm_link_config()
        .map_err(TmtcError::Config)?;

    let tc_config = config.tc_link.to_tc_link_config()
        .map_err(TmtcError::Config)?;

    Ok((tm_config, tc_config))
}

/// Configuration constants
pub mod constants {
    use std::time::Duration;

    use tmtclibgs::MAX_PACKET_LEN;

    /// Configuration file used when none is given on the command line
    pub const DEFAULT_CONFIG_PATH: &str = "tmtcfront.json";

    /// How long a link waits on its source before checking for a stop request
    pub const LINK_POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Per-link frame buffer. One byte more than the longest CCSDS packet,
    /// so a frame that fills it is known to be oversized.
    pub const LINK_BUFFER_SIZE: usize = MAX_PACKET_LEN + 1;

    /// Kernel receive buffer requested for UDP sockets
    pub const UDP_RECV_BUFFER_SIZE: usize = 1 << 20;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tmtclibgs::MissionEpoch;

    #[test]
    fn test_load_config() {
        let config_json = r#"{
            "version": "1.0",
            "description": "Test config",
            "tm_link": {
                "name": "udp-in",
                "address": "127.0.0.1",
                "port": 10015,
                "preprocessor": "ccsds-time-tagged",
                "mission_epoch": "2024-01-01T00:00:00Z",
                "min_frame_length": 12,
                "forward_address": "127.0.0.1",
                "forward_port": 10016
            },
            "tc_link": {
                "name": "udp-out",
                "ingress_address": "127.0.0.1",
                "ingress_port": 10024,
                "address": "127.0.0.1",
                "port": 10025,
                "postprocessor": "ccsds-seqcount"
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_json.as_bytes()).unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_ok());

        let (tm_config, tc_config) = result.unwrap();
        assert_eq!(tm_config.listen_addr.port(), 10015);
        assert_eq!(tm_config.preprocessor.min_frame_length, Some(12));
        assert_eq!(
            tm_config.preprocessor.mission_epoch,
            MissionEpoch::parse("2024-01-01T00:00:00Z").unwrap()
        );
        assert_eq!(tm_config.forward_addr.map(|a| a.port()), Some(10016));
        assert_eq!(tc_config.dest_addr.port(), 10025);
    }

    #[test]
    fn test_load_config_bad_epoch() {
        let config_json = r#"{
            "version": "1.0",
            "description": "Bad epoch",
            "tm_link": {
                "name": "udp-in",
                "address": "127.0.0.1",
                "port": 10015,
                "preprocessor": "ccsds-time-tagged",
                "mission_epoch": "soon"
            },
            "tc_link": {
                "name": "udp-out",
                "ingress_address": "127.0.0.1",
                "ingress_port": 10024,
                "address": "127.0.0.1",
                "port": 10025,
                "postprocessor": "ccsds-seqcount"
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_json.as_bytes()).unwrap();

        assert!(matches!(load_config(temp_file.path()), Err(TmtcError::Config(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(matches!(load_config("/nonexistent/tmtcfront.json"), Err(TmtcError::Io(_))));
    }
}
