//! Incremental frame reassembly.
//!
//! The serial transport delivers arbitrary chunks: a frame may arrive
//! split across reads, two frames may arrive concatenated, and line noise
//! may precede either. The assembler buffers chunks, locates the magic
//! marker, and slices out whole frames using the declared length byte.
//!
//! A declared length outside `[MIN_FRAME_LEN, MAX_FRAME_LEN]` cannot be a
//! real frame; the marker is discarded and scanning resumes at the next
//! candidate.

use latchlink_proto::{MAGIC, MAX_FRAME_LEN, MIN_FRAME_LEN};

const LENGTH_OFFSET: usize = MAGIC.len();

/// Reassembles length-delimited frames from a raw byte stream.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
}

impl FrameAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard any buffered bytes.
    ///
    /// Called when the port is reopened; bytes from the previous session
    /// must not leak into the next.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append a chunk and return every complete frame now available.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find_magic(&self.buf) else {
                // Nothing resembling a frame; keep only a possible magic
                // prefix at the tail.
                let keep_from = self.buf.len().saturating_sub(MAGIC.len() - 1);
                self.buf.drain(..keep_from);
                break;
            };

            if start > 0 {
                self.buf.drain(..start);
            }

            if self.buf.len() <= LENGTH_OFFSET {
                break;
            }

            let declared = self.buf[LENGTH_OFFSET] as usize;
            if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&declared) {
                // Not a frame start after all; skip this marker byte and
                // rescan.
                self.buf.drain(..1);
                continue;
            }

            if self.buf.len() < declared {
                break;
            }

            frames.push(self.buf.drain(..declared).collect());
        }
        frames
    }
}

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(MAGIC.len()).position(|window| window == MAGIC)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use latchlink_proto::{Command, CommandFrame, LockStatus, RESPONSE_FRAME_LEN, ResponseFrame};
    use proptest::prelude::*;

    use super::*;

    fn response_bytes() -> Vec<u8> {
        ResponseFrame {
            board: 0x01,
            command: Command::Status.to_byte(),
            status: 0x00,
            channel: 0x01,
            lock_status: LockStatus::Locked.to_byte(),
        }
        .encode()
        .to_vec()
    }

    #[test]
    fn whole_frame_in_one_chunk() {
        let mut assembler = FrameAssembler::new();
        let wire = response_bytes();
        assert_eq!(assembler.push(&wire), vec![wire]);
    }

    #[test]
    fn frame_split_byte_by_byte() {
        let mut assembler = FrameAssembler::new();
        let wire = response_bytes();
        for &byte in &wire[..wire.len() - 1] {
            assert!(assembler.push(&[byte]).is_empty());
        }
        assert_eq!(assembler.push(&wire[wire.len() - 1..]), vec![wire]);
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut assembler = FrameAssembler::new();
        let first = response_bytes();
        let second = CommandFrame::new(Command::Unlock, 0x01, 0x01).encode().to_vec();
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second);
        assert_eq!(assembler.push(&chunk), vec![first, second]);
    }

    #[test]
    fn garbage_before_frame_is_skipped() {
        let mut assembler = FrameAssembler::new();
        let wire = response_bytes();
        let mut chunk = vec![0x00, 0xFF, 0x57, 0x12];
        chunk.extend_from_slice(&wire);
        assert_eq!(assembler.push(&chunk), vec![wire]);
    }

    #[test]
    fn magic_split_across_chunks() {
        let mut assembler = FrameAssembler::new();
        let wire = response_bytes();
        assert!(assembler.push(&wire[..2]).is_empty());
        assert_eq!(assembler.push(&wire[2..]), vec![wire]);
    }

    #[test]
    fn bogus_length_resynchronizes() {
        let mut assembler = FrameAssembler::new();
        let mut chunk = MAGIC.to_vec();
        chunk.push(0xFF); // impossible length
        let wire = response_bytes();
        chunk.extend_from_slice(&wire);
        assert_eq!(assembler.push(&chunk), vec![wire]);
    }

    #[test]
    fn clear_discards_partial_frame() {
        let mut assembler = FrameAssembler::new();
        let wire = response_bytes();
        assert!(assembler.push(&wire[..6]).is_empty());
        assembler.clear();
        assert!(assembler.push(&wire[6..]).is_empty());
    }

    proptest! {
        // However the stream is cut into reads, the same frames come out
        // in the same order.
        #[test]
        fn random_chunking_reassembles_every_frame(
            frames in prop::collection::vec((any::<u8>(), any::<u8>(), 0u8..2), 1..5),
            chunk_sizes in prop::collection::vec(1usize..7, 1..40),
        ) {
            let stream: Vec<u8> = frames
                .iter()
                .flat_map(|&(board, channel, lock_status)| {
                    ResponseFrame {
                        board,
                        command: Command::Status.to_byte(),
                        status: 0x00,
                        channel,
                        lock_status,
                    }
                    .encode()
                })
                .collect();

            let mut assembler = FrameAssembler::new();
            let mut yielded = Vec::new();
            let mut sizes = chunk_sizes.iter().cycle();
            let mut offset = 0;
            while offset < stream.len() {
                let take = (*sizes.next().unwrap()).min(stream.len() - offset);
                yielded.extend(assembler.push(&stream[offset..offset + take]));
                offset += take;
            }

            let expected: Vec<Vec<u8>> =
                stream.chunks(RESPONSE_FRAME_LEN).map(<[u8]>::to_vec).collect();
            prop_assert_eq!(yielded, expected);
        }
    }
}
