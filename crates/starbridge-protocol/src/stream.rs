//! C3: byte-accumulating reassembler that locates the magic prefix,
//! resynchronizes on corruption, and yields complete framed packets.
//!
//! Bytes accumulate into a `BytesMut`; a frame is extracted with
//! `split_to` once a complete packet has arrived, and partial data is
//! left in place for the next `push`.

use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

use crate::constants::{HEADER_LEN, MAGIC, MAX_PACKET_SIZE};
use crate::error::ProtocolError;
use crate::header::Header;

/// One fully reassembled frame: its header plus the raw payload bytes
/// (everything after the 24-byte header, including the leading
/// packet-type tag already parsed into the header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Vec<u8>,
}

/// A framing-level failure severe enough to require closing the
/// connection (§4.3 "Failure modes"), with the byte offset in the
/// stream it was detected at for logging (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingError {
    pub error: ProtocolError,
    pub offset: u64,
}

pub struct StreamParser {
    buf: BytesMut,
    /// Total bytes ever pushed, for offset reporting in `FramingError`.
    consumed_before_buf: u64,
    /// Packets larger than this are a fatal framing error, even if they'd
    /// otherwise parse cleanly. Defaults to `constants::MAX_PACKET_SIZE`
    /// but overridable per connection (§4.6 "Configuration").
    max_packet_size: u32,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self::with_max_packet_size(MAX_PACKET_SIZE)
    }

    pub fn with_max_packet_size(max_packet_size: u32) -> Self {
        Self {
            buf: BytesMut::new(),
            consumed_before_buf: 0,
            max_packet_size,
        }
    }

    /// Appends newly-received bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered, awaiting a complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drains every complete frame currently available. Returns `Err` and
    /// stops draining on the first unrecoverable framing error (oversized
    /// or impossible length); the caller must close the connection at
    /// that point. Byte-level resync (§4.3 step 2) happens transparently
    /// and never surfaces as an error.
    pub fn drain(&mut self) -> Result<Vec<Frame>, FramingError> {
        let mut frames = Vec::new();
        loop {
            if self.buf.len() < 8 {
                return Ok(frames);
            }

            // Step 2: resync one byte at a time while the leading 4 bytes
            // aren't the magic prefix. Bounded: each iteration either
            // advances the magic check or drops exactly one byte.
            while self.buf.len() >= 4 {
                let maybe_magic = u32::from_le_bytes(self.buf[..4].try_into().unwrap());
                if maybe_magic == MAGIC {
                    break;
                }
                trace!(offset = self.consumed_before_buf, "resyncing: dropping one byte");
                self.buf.advance(1);
                self.consumed_before_buf += 1;
            }

            if self.buf.len() < HEADER_LEN {
                return Ok(frames);
            }

            // BadMagic can't occur here (the resync loop above guarantees
            // the leading 4 bytes are the magic prefix); any other parse
            // failure (impossible/oversized/mismatched length) is a fatal
            // framing error per §4.3.
            let header = match Header::parse(&self.buf[..HEADER_LEN]) {
                Ok(h) => h,
                Err(e) => {
                    warn!(offset = self.consumed_before_buf, error = %e, "fatal framing error");
                    return Err(FramingError {
                        error: e,
                        offset: self.consumed_before_buf,
                    });
                }
            };

            if header.total > self.max_packet_size {
                warn!(offset = self.consumed_before_buf, total = header.total, "fatal framing error");
                return Err(FramingError {
                    error: ProtocolError::PacketTooLarge { total: header.total },
                    offset: self.consumed_before_buf,
                });
            }

            let total = header.total as usize;
            if self.buf.len() < total {
                return Ok(frames);
            }

            debug_assert!(total <= self.max_packet_size as usize);
            let mut frame_bytes = self.buf.split_to(total);
            frame_bytes.advance(HEADER_LEN);
            self.consumed_before_buf += total as u64;

            frames.push(Frame {
                header,
                payload: frame_bytes.to_vec(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PacketType;

    fn sample_packet(payload: &[u8]) -> Vec<u8> {
        let mut bytes =
            crate::header::Header::write(0x01, PacketType::ServerHeartbeat as u32, payload.len());
        bytes.extend_from_slice(payload);
        bytes.to_vec()
    }

    #[test]
    fn one_byte_at_a_time_matches_single_chunk() {
        let a = sample_packet(b"one");
        let b = sample_packet(b"two-longer");
        let mut all = a.clone();
        all.extend_from_slice(&b);

        let mut whole = StreamParser::new();
        whole.push(&all);
        let whole_frames = whole.drain().unwrap();

        let mut byte_at_a_time = StreamParser::new();
        let mut incremental_frames = Vec::new();
        for byte in &all {
            byte_at_a_time.push(&[*byte]);
            incremental_frames.extend(byte_at_a_time.drain().unwrap());
        }

        assert_eq!(whole_frames, incremental_frames);
        assert_eq!(whole_frames.len(), 2);
        assert_eq!(whole_frames[0].payload, b"one");
        assert_eq!(whole_frames[1].payload, b"two-longer");
    }

    #[test]
    fn single_garbage_byte_loses_at_most_one_packet() {
        let a = sample_packet(b"alpha");
        let b = sample_packet(b"beta");
        let mut stream = Vec::new();
        stream.push(0xFFu8); // one garbage byte before the first valid packet
        stream.extend_from_slice(&a);
        stream.extend_from_slice(&b);

        let mut parser = StreamParser::new();
        parser.push(&stream);
        let frames = parser.drain().unwrap();

        // The garbage byte doesn't corrupt `a` here because the resync
        // loop drops leading non-magic bytes before re-checking; `a`
        // begins right after the single garbage byte so it survives, and
        // `b` is unaffected either way.
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload, b"alpha");
        assert_eq!(frames[1].payload, b"beta");
    }

    #[test]
    fn corruption_inside_a_packet_loses_only_that_packet() {
        let mut a = sample_packet(b"alpha");
        let b = sample_packet(b"beta");
        // Corrupt a's magic bytes so the whole packet is unrecoverable as
        // a unit; the parser must resync byte-by-byte until it finds b's
        // magic prefix, losing only `a`.
        a[0] ^= 0xFF;
        a[1] ^= 0xFF;
        let mut stream = a;
        stream.extend_from_slice(&b);

        let mut parser = StreamParser::new();
        parser.push(&stream);
        let frames = parser.drain().unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"beta");
    }

    #[test]
    fn buffer_never_exceeds_max_packet_size_plus_one() {
        use crate::constants::MAX_PACKET_SIZE;
        // A header claiming an oversized total is a fatal error, and the
        // parser must not have grown its buffer past the guard in the
        // process of detecting it.
        let mut bytes = crate::header::Header::write(0x01, 1, 0);
        bytes[4..8].copy_from_slice(&(MAX_PACKET_SIZE + 1).to_le_bytes());
        bytes[16..20].copy_from_slice(&(MAX_PACKET_SIZE + 1 - 20).to_le_bytes());

        let mut parser = StreamParser::new();
        parser.push(&bytes);
        let result = parser.drain();
        assert!(result.is_err());
        assert!(parser.buffered_len() <= MAX_PACKET_SIZE as usize + 1);
    }

    #[test]
    fn a_configured_limit_below_the_packet_is_rejected() {
        let bytes = sample_packet(b"twenty bytes of payload");
        let mut parser = StreamParser::with_max_packet_size(HEADER_LEN as u32 + 4);
        parser.push(&bytes);
        let result = parser.drain();
        assert!(matches!(
            result,
            Err(FramingError { error: ProtocolError::PacketTooLarge { .. }, .. })
        ));
    }

    #[test]
    fn partial_packet_is_held_until_complete() {
        let full = sample_packet(b"complete");
        let mut parser = StreamParser::new();
        parser.push(&full[..full.len() - 1]);
        assert!(parser.drain().unwrap().is_empty());
        parser.push(&full[full.len() - 1..]);
        let frames = parser.drain().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"complete");
    }
}
