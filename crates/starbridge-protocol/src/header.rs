//! C2: the 24-byte packet header.
//!
//! Layout (little-endian, all fields 32-bit): magic, total length
//! (including this header), origin tag, reserved zero word, remaining
//! bytes (`total - 20`, i.e. packet-type tag + payload), packet-type tag.

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::{HEADER_LEN, MAGIC, MAX_PACKET_SIZE};
use crate::error::ProtocolError;

/// Parsed 24-byte header. `total` includes the header itself;
/// `remaining` is redundant (`total - 20`) and checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub total: u32,
    pub origin: u32,
    pub remaining: u32,
    pub packet_type: u32,
}

impl Header {
    /// Writes a 24-byte header for a payload of `payload_len` bytes with
    /// the given origin (`0x01` server, `0x02` client) and type tag.
    pub fn write(origin: u32, packet_type: u32, payload_len: usize) -> BytesMut {
        let total = (HEADER_LEN + payload_len) as u32;
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        buf.put_u32_le(MAGIC);
        buf.put_u32_le(total);
        buf.put_u32_le(origin);
        buf.put_u32_le(0); // reserved, always zero
        buf.put_u32_le(total - 20);
        buf.put_u32_le(packet_type);
        buf
    }

    /// Parses a header from the front of `buf`. Assumes `buf.len() >=
    /// HEADER_LEN`; callers (the stream parser) check this first.
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        debug_assert!(buf.len() >= HEADER_LEN);
        let mut r = buf;
        let magic = r.get_u32_le();
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic {
                expected: MAGIC,
                found: magic,
            });
        }
        let total = r.get_u32_le();
        let origin = r.get_u32_le();
        let _reserved = r.get_u32_le();
        let remaining = r.get_u32_le();
        let packet_type = r.get_u32_le();

        if total < HEADER_LEN as u32 {
            return Err(ProtocolError::ImpossibleLength { total });
        }
        if total > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge { total });
        }
        if remaining != total - 20 {
            return Err(ProtocolError::LengthMismatch { total, remaining });
        }

        Ok(Header {
            total,
            origin,
            remaining,
            packet_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_invariants_hold() {
        let payload = b"hello";
        let bytes = Header::write(0x01, 42, payload.len());
        assert_eq!(bytes.len(), HEADER_LEN);
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.total, (HEADER_LEN + payload.len()) as u32);
        assert_eq!(header.remaining, header.total - 20);
        assert_eq!(header.packet_type, 42);
        assert_eq!(header.origin, 0x01);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = Header::write(0x01, 1, 0);
        bytes[0] ^= 0xFF;
        assert!(matches!(
            Header::parse(&bytes),
            Err(ProtocolError::BadMagic { .. })
        ));
    }

    #[test]
    fn oversized_total_is_rejected() {
        let mut bytes = Header::write(0x01, 1, 0);
        bytes[4..8].copy_from_slice(&(MAX_PACKET_SIZE + 1).to_le_bytes());
        bytes[16..20].copy_from_slice(&(MAX_PACKET_SIZE + 1 - 20).to_le_bytes());
        assert!(matches!(
            Header::parse(&bytes),
            Err(ProtocolError::PacketTooLarge { .. })
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut bytes = Header::write(0x01, 1, 10);
        // Corrupt just the remaining-bytes field.
        bytes[16..20].copy_from_slice(&999u32.to_le_bytes());
        assert!(matches!(
            Header::parse(&bytes),
            Err(ProtocolError::LengthMismatch { .. })
        ));
    }
}
