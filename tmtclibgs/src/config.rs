//! Configuration file format for the front-end
//!
//! The file is JSON. Each `*Json` struct mirrors the file; `to_*_config()`
//! validates it into the typed configuration the processes run from.

use std::net::{SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

use crate::types::MissionEpoch;

/// Front-end configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontEndConfigJson {
    pub version: String,
    pub description: String,
    pub tm_link: TmLinkConfigJson,
    pub tc_link: TcLinkConfigJson,
}

/// JSON representation of the telemetry link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmLinkConfigJson {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub preprocessor: String,
    #[serde(default)]
    pub mission_epoch: Option<String>,
    #[serde(default)]
    pub min_frame_length: Option<usize>,
    #[serde(default)]
    pub forward_address: Option<String>,
    #[serde(default)]
    pub forward_port: Option<u16>,
}

/// JSON representation of the command link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcLinkConfigJson {
    pub name: String,
    pub ingress_address: String,
    pub ingress_port: u16,
    pub address: String,
    pub port: u16,
    pub postprocessor: String,
}

/// Settings handed to a processor factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Registered processor name
    pub name: String,
    /// Link the processor serves; events and logs are tagged with it
    pub link: String,
    /// Epoch for mission-elapsed time stamps
    pub mission_epoch: MissionEpoch,
    /// Minimum frame length, when raised above the processor's own minimum
    pub min_frame_length: Option<usize>,
}

impl ProcessorConfig {
    /// Settings for processor `name` serving `link`, all else defaulted
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            mission_epoch: MissionEpoch::default(),
            min_frame_length: None,
        }
    }

    /// Settings for a processor not tied to a configured link
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }
}

/// Telemetry link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmLinkConfig {
    pub name: String,
    pub listen_addr: SocketAddr,
    pub preprocessor: ProcessorConfig,
    pub forward_addr: Option<SocketAddr>,
}

/// Command link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcLinkConfig {
    pub name: String,
    pub ingress_addr: SocketAddr,
    pub dest_addr: SocketAddr,
    pub postprocessor: ProcessorConfig,
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr, String> {
    (address, port)
        .to_socket_addrs()
        .map_err(|e| format!("Invalid address {}:{}: {}", address, port, e))?
        .next()
        .ok_or_else(|| format!("Address {}:{} did not resolve", address, port))
}

impl TmLinkConfigJson {
    pub fn to_tm_link_config(&self) -> Result<TmLinkConfig, String> {
        let mission_epoch = match self.mission_epoch.as_deref() {
            Some(text) => MissionEpoch::parse(text)?,
            None => MissionEpoch::default(),
        };

        let forward_addr = match (self.forward_address.as_deref(), self.forward_port) {
            (Some(address), Some(port)) => Some(resolve(address, port)?),
            (None, None) => None,
            _ => return Err("forward_address and forward_port must be given together".to_string()),
        };

        Ok(TmLinkConfig {
            name: self.name.clone(),
            listen_addr: resolve(&self.address, self.port)?,
            preprocessor: ProcessorConfig {
                mission_epoch,
                min_frame_length: self.min_frame_length,
                ..ProcessorConfig::new(&self.preprocessor, &self.name)
            },
            forward_addr,
        })
    }
}

impl TcLinkConfigJson {
    pub fn to_tc_link_config(&self) -> Result<TcLinkConfig, String> {
        Ok(TcLinkConfig {
            name: self.name.clone(),
            ingress_addr: resolve(&self.ingress_address, self.ingress_port)?,
            dest_addr: resolve(&self.address, self.port)?,
            postprocessor: ProcessorConfig::new(&self.postprocessor, &self.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_MISSION_EPOCH_MS;

    fn tm_json() -> TmLinkConfigJson {
        TmLinkConfigJson {
            name: "udp-in".to_string(),
            address: "127.0.0.1".to_string(),
            port: 10015,
            preprocessor: "ccsds-time-tagged".to_string(),
            mission_epoch: None,
            min_frame_length: None,
            forward_address: None,
            forward_port: None,
        }
    }

    #[test]
    fn test_tm_link_defaults() {
        let config = tm_json().to_tm_link_config().unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:10015".parse().unwrap());
        assert_eq!(config.preprocessor.mission_epoch.unix_millis(), DEFAULT_MISSION_EPOCH_MS);
        assert_eq!(config.forward_addr, None);
        assert_eq!(config.preprocessor.name, "ccsds-time-tagged");
        assert_eq!(config.preprocessor.link, "udp-in");
    }

    #[test]
    fn test_tm_link_half_forward_rejected() {
        let mut json = tm_json();
        json.forward_port = Some(10016);
        assert!(json.to_tm_link_config().is_err());
    }

    #[test]
    fn test_tm_link_bad_epoch_rejected() {
        let mut json = tm_json();
        json.mission_epoch = Some("not a date".to_string());
        assert!(json.to_tm_link_config().is_err());
    }

    #[test]
    fn test_tc_link_config() {
        let json = TcLinkConfigJson {
            name: "udp-out".to_string(),
            ingress_address: "127.0.0.1".to_string(),
            ingress_port: 10024,
            address: "127.0.0.1".to_string(),
            port: 10025,
            postprocessor: "ccsds-seqcount".to_string(),
        };
        let config = json.to_tc_link_config().unwrap();
        assert_eq!(config.dest_addr.port(), 10025);
        assert_eq!(config.postprocessor.name, "ccsds-seqcount");
        assert_eq!(config.postprocessor.link, "udp-out");
    }
}
