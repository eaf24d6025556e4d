//! TMTC Ground/Space Library (tmtclibgs)
//!
//! This library contains definitions shared between the front-end process
//! (tmtcfront) and the spacecraft simulator (tmtcsim): the CCSDS primary
//! header layout, the collaborator interfaces for events and command
//! history, and the configuration file format.

pub mod types;
pub mod header;
pub mod events;
pub mod cmdhistory;
pub mod config;
pub mod error;

pub use types::*;
pub use header::*;
pub use events::*;
pub use cmdhistory::*;
pub use config::*;
pub use error::*;
