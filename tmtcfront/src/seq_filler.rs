//! Sequence count assignment for outbound commands

use std::sync::atomic::{AtomicU16, Ordering};

use tmtclibgs::{Apid, HeaderWord, SeqCount, TmtcError, TmtcResult, APID_COUNT};

/// Hands out consecutive sequence counts per APID and writes them into
/// command headers. The first count for every APID is 0.
pub struct SeqCountFiller {
    next: Box<[AtomicU16]>,
}

impl SeqCountFiller {
    pub fn new() -> Self {
        Self {
            next: (0..APID_COUNT).map(|_| AtomicU16::new(0)).collect(),
        }
    }

    /// Take the next count for `apid`
    pub fn next_count(&self, apid: Apid) -> SeqCount {
        // 2^16 is a multiple of 2^14, so wrapping at u16 keeps the 14-bit sequence intact
        SeqCount::new(self.next[apid.index()].fetch_add(1, Ordering::Relaxed))
    }

    /// Assign the next count for the APID found in `binary` and write it into
    /// the low 14 bits of the header word. All other header bits are kept.
    pub fn fill(&self, binary: &mut [u8]) -> TmtcResult<SeqCount> {
        let length = binary.len();
        let too_short = move || TmtcError::BufferTooShortForPatch { length, required: 4 };
        let word = HeaderWord::read(binary).ok_or_else(too_short)?;
        let seq = self.next_count(word.apid());
        word.with_seq_count(seq).write(binary).ok_or_else(too_short)?;
        Ok(seq)
    }
}

impl Default for SeqCountFiller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_start_at_zero_per_apid() {
        let filler = SeqCountFiller::new();
        assert_eq!(filler.next_count(Apid::new(1)).value(), 0);
        assert_eq!(filler.next_count(Apid::new(1)).value(), 1);
        assert_eq!(filler.next_count(Apid::new(2)).value(), 0);
    }

    #[test]
    fn test_counts_wrap_at_16384() {
        let filler = SeqCountFiller::new();
        let apid = Apid::new(9);
        for expected in 0..16384u16 {
            assert_eq!(filler.next_count(apid).value(), expected);
        }
        assert_eq!(filler.next_count(apid).value(), 0);
    }

    #[test]
    fn test_fill_preserves_flags_and_apid() {
        let filler = SeqCountFiller::new();
        // TC, secondary header, APID 0x123, sequence flags 3, stale count 0x1555
        let mut binary = vec![0x19, 0x23, 0xD5, 0x55, 0x00, 0x00, 0xAA];
        assert_eq!(filler.fill(&mut binary).unwrap().value(), 0);
        assert_eq!(&binary[..4], &[0x19, 0x23, 0xC0, 0x00]);
        assert_eq!(filler.fill(&mut binary).unwrap().value(), 1);
        assert_eq!(&binary[..4], &[0x19, 0x23, 0xC0, 0x01]);
        assert_eq!(binary[6], 0xAA);
    }

    #[test]
    fn test_fill_rejects_short_buffer() {
        let filler = SeqCountFiller::new();
        let mut binary = vec![0x18, 0x01];
        assert!(matches!(
            filler.fill(&mut binary),
            Err(TmtcError::BufferTooShortForPatch { length: 2, .. })
        ));
    }
}
