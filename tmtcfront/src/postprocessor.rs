//! Command postprocessing
//!
//! The last step before a command leaves for the spacecraft. The length
//! field and sequence count are patched in place, and the patched binary is
//! what command history records.

use std::sync::Arc;

use log::debug;
use tmtclibgs::{
    data_length_for, AttributeValue, CommandHistorySink, PreparedCommand, TmtcError, TmtcResult,
    CNAME_BINARY, CNAME_CCSDS_SEQCOUNT, DATA_LENGTH_BIAS, DATA_LENGTH_OFFSET, MAX_PACKET_LEN,
};

use crate::seq_filler::SeqCountFiller;

/// Interface of every command postprocessor
pub trait CommandPostprocessor: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Produce the binary to transmit. An error means the command itself is
    /// malformed; the link must not keep sending.
    fn process(&self, command: PreparedCommand) -> TmtcResult<Vec<u8>>;
}

/// Postprocessor for CCSDS telecommand packets
pub struct CcsdsPostprocessor {
    name: String,
    filler: SeqCountFiller,
    history: Arc<dyn CommandHistorySink>,
}

impl CcsdsPostprocessor {
    pub fn new(name: impl Into<String>, history: Arc<dyn CommandHistorySink>) -> Self {
        Self {
            name: name.into(),
            filler: SeqCountFiller::new(),
            history,
        }
    }
}

fn patch_data_length(binary: &mut [u8]) -> TmtcResult<()> {
    let length = binary.len();
    let data_length = data_length_for(length).ok_or(if length < DATA_LENGTH_BIAS {
        TmtcError::BufferTooShortForPatch {
            length,
            required: DATA_LENGTH_BIAS,
        }
    } else {
        TmtcError::BufferTooLongForPatch {
            length,
            maximum: MAX_PACKET_LEN,
        }
    })?;
    binary[DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + 2].copy_from_slice(&data_length.to_be_bytes());
    Ok(())
}

impl CommandPostprocessor for CcsdsPostprocessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, command: PreparedCommand) -> TmtcResult<Vec<u8>> {
        let PreparedCommand { command_id, mut binary } = command;

        patch_data_length(&mut binary)?;
        let seq = self.filler.fill(&mut binary)?;
        debug!("{}: command {} assigned count {}", self.name, command_id, seq);

        self.history.publish(
            &command_id,
            CNAME_CCSDS_SEQCOUNT,
            AttributeValue::U32(u32::from(seq.value())),
        );
        self.history
            .publish(&command_id, CNAME_BINARY, AttributeValue::Binary(binary.clone()));

        Ok(binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmtclibgs::{read_data_length, CollectingCommandHistory, CommandId, HeaderWord};

    fn postprocessor(history: &Arc<CollectingCommandHistory>) -> CcsdsPostprocessor {
        CcsdsPostprocessor::new("udp-out", history.clone())
    }

    fn command(seq: u32, len: usize) -> PreparedCommand {
        let mut binary = vec![0u8; len];
        binary[..4].copy_from_slice(&[0x18, 0x65, 0xC0, 0x00]);
        PreparedCommand::new(CommandId::new("ops", seq), binary)
    }

    #[test]
    fn test_length_patch_and_audit_records() {
        let history = Arc::new(CollectingCommandHistory::new());
        let post = postprocessor(&history);
        let binary = post.process(command(1, 20)).unwrap();

        assert_eq!(binary.len(), 20);
        assert_eq!(&binary[4..6], &13u16.to_be_bytes());
        assert_eq!(read_data_length(&binary), Some(13));

        let records = history.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.command_id == CommandId::new("ops", 1)));
        assert_eq!(records[0].name, CNAME_CCSDS_SEQCOUNT);
        assert_eq!(records[0].value, AttributeValue::U32(0));
        assert_eq!(records[1].name, CNAME_BINARY);
        assert_eq!(records[1].value, AttributeValue::Binary(binary));
    }

    #[test]
    fn test_sequence_advances_per_apid() {
        let history = Arc::new(CollectingCommandHistory::new());
        let post = postprocessor(&history);
        post.process(command(1, 8)).unwrap();
        let binary = post.process(command(2, 8)).unwrap();
        let word = HeaderWord::read(&binary).unwrap();
        assert_eq!(word.apid().value(), 0x065);
        assert_eq!(word.seq_count().value(), 1);
        assert_eq!(word.sequence_flags(), 0b11);
        assert_eq!(
            history.latest(&CommandId::new("ops", 2), CNAME_CCSDS_SEQCOUNT),
            Some(AttributeValue::U32(1))
        );
    }

    #[test]
    fn test_recorded_binary_is_patched() {
        let history = Arc::new(CollectingCommandHistory::new());
        let post = postprocessor(&history);
        let mut cmd = command(7, 12);
        cmd.binary[4] = 0xFF;
        cmd.binary[5] = 0xFF;
        let binary = post.process(cmd).unwrap();
        assert_eq!(
            history.latest(&CommandId::new("ops", 7), CNAME_BINARY),
            Some(AttributeValue::Binary(binary.clone()))
        );
        assert_eq!(read_data_length(&binary), Some(5));
    }

    #[test]
    fn test_short_buffer_is_fatal() {
        let history = Arc::new(CollectingCommandHistory::new());
        let post = postprocessor(&history);
        let err = post.process(command(1, 6)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, TmtcError::BufferTooShortForPatch { length: 6, required: 7 }));
        assert!(history.records().is_empty());
    }

    #[test]
    fn test_oversized_buffer_is_fatal() {
        let history = Arc::new(CollectingCommandHistory::new());
        let post = postprocessor(&history);
        let err = post.process(command(1, MAX_PACKET_LEN + 1)).unwrap_err();
        assert!(matches!(err, TmtcError::BufferTooLongForPatch { .. }));
    }
}
