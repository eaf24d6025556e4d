//! Command identity and command history records

use std::fmt;
use std::sync::Mutex;

use log::info;
use serde::{Deserialize, Serialize};

/// Attribute name under which the final command binary is recorded
pub const CNAME_BINARY: &str = "binary";

/// Attribute name under which the assigned CCSDS sequence count is recorded
pub const CNAME_CCSDS_SEQCOUNT: &str = "ccsds-seqcount";

/// Unique identifier of a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CommandId {
    /// Who submitted the command
    pub origin: String,
    /// Submission counter, unique per origin
    pub sequence_number: u32,
}

impl CommandId {
    pub fn new(origin: impl Into<String>, sequence_number: u32) -> Self {
        Self {
            origin: origin.into(),
            sequence_number,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.sequence_number)
    }
}

/// A command ready for transmission, prior to postprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub command_id: CommandId,
    pub binary: Vec<u8>,
}

impl PreparedCommand {
    pub fn new(command_id: CommandId, binary: Vec<u8>) -> Self {
        Self { command_id, binary }
    }
}

/// Value of a command history attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttributeValue {
    U32(u32),
    Binary(Vec<u8>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::U32(v) => write!(f, "{}", v),
            AttributeValue::Binary(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

/// A single command history fact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandHistoryRecord {
    pub command_id: CommandId,
    pub name: String,
    pub value: AttributeValue,
}

/// Receiver of command history facts
pub trait CommandHistorySink: Send + Sync {
    fn publish(&self, command_id: &CommandId, name: &str, value: AttributeValue);
}

/// Command history that writes every record to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCommandHistory;

impl CommandHistorySink for LogCommandHistory {
    fn publish(&self, command_id: &CommandId, name: &str, value: AttributeValue) {
        info!("Command {} {} = {}", command_id, name, value);
    }
}

/// Command history that keeps every record in memory
#[derive(Debug, Default)]
pub struct CollectingCommandHistory {
    records: Mutex<Vec<CommandHistoryRecord>>,
}

impl CollectingCommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CommandHistoryRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Most recent value recorded for a command attribute
    pub fn latest(&self, command_id: &CommandId, name: &str) -> Option<AttributeValue> {
        self.records()
            .into_iter()
            .rev()
            .find(|r| &r.command_id == command_id && r.name == name)
            .map(|r| r.value)
    }
}

impl CommandHistorySink for CollectingCommandHistory {
    fn publish(&self, command_id: &CommandId, name: &str, value: AttributeValue) {
        if let Ok(mut records) = self.records.lock() {
            records.push(CommandHistoryRecord {
                command_id: command_id.clone(),
                name: name.to_string(),
                value,
            });
        }
    }
}
