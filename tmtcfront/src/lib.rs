//! TMTC Front-End - CCSDS Telemetry Preprocessor and Command Postprocessor
//!
//! The front-end sits between a ground link and mission control. Inbound
//! telemetry frames are validated, checked for sequence continuity and
//! time stamped; outbound commands get their length field and sequence
//! count patched before transmission.

pub mod config;
pub mod endpoint;
pub mod endpoint_network;
pub mod link;
pub mod postprocessor;
pub mod preprocessor;
pub mod registry;
pub mod seq_filler;
pub mod seq_tracker;

pub use config::*;
pub use endpoint::*;
pub use endpoint_network::*;
pub use link::*;
pub use postprocessor::*;
pub use preprocessor::*;
pub use registry::*;
pub use seq_filler::*;
pub use seq_tracker::*;
