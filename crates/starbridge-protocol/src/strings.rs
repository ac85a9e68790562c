//! UTF-16LE length-prefixed strings (§4.2 "Strings").
//!
//! Wire shape: a 32-bit char count *including* a trailing null
//! terminator, followed by that many UTF-16LE code units.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;

/// Writes `s` as a null-terminated UTF-16LE string with its length prefix.
pub fn write_string(buf: &mut BytesMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    buf.put_u32_le((units.len() + 1) as u32);
    for unit in units {
        buf.put_u16_le(unit);
    }
    buf.put_u16_le(0); // null terminator
}

/// Number of bytes `write_string` would emit for `s`.
pub fn written_len(s: &str) -> usize {
    4 + (s.encode_utf16().count() + 1) * 2
}

/// Reads a length-prefixed UTF-16LE string, dropping the trailing null.
/// Advances `r` past the consumed bytes.
pub fn read_string(r: &mut &[u8]) -> Result<String, ProtocolError> {
    if r.len() < 4 {
        return Err(ProtocolError::Truncated {
            needed: 4 - r.len(),
        });
    }
    let char_count = r.get_u32_le() as usize;
    let byte_len = char_count * 2;
    if r.len() < byte_len {
        return Err(ProtocolError::Truncated {
            needed: byte_len - r.len(),
        });
    }
    let mut units = Vec::with_capacity(char_count.saturating_sub(1));
    for i in 0..char_count {
        let unit = u16::from_le_bytes([r[i * 2], r[i * 2 + 1]]);
        // Drop the trailing null terminator (the last unit), not embedded
        // nulls elsewhere in the string.
        if i + 1 < char_count {
            units.push(unit);
        }
    }
    r.advance(byte_len);
    String::from_utf16(&units).map_err(|_| ProtocolError::MalformedString)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(s: &str) {
        let mut buf = BytesMut::new();
        write_string(&mut buf, s);
        assert_eq!(buf.len(), written_len(s));
        let mut r = &buf[..];
        let out = read_string(&mut r).unwrap();
        assert_eq!(out, s);
        assert!(r.is_empty());
    }

    #[test]
    fn ascii_round_trips() {
        round_trip("Kirk");
    }

    #[test]
    fn empty_string_round_trips() {
        round_trip("");
    }

    #[test]
    fn bmp_and_surrogate_pairs_round_trip() {
        round_trip("caf\u{e9} \u{1F680} bridge"); // e-acute + rocket emoji (surrogate pair)
    }

    #[test]
    fn embedded_null_survives() {
        round_trip("a\u{0}b");
    }

    #[test]
    fn truncated_prefix_is_an_error() {
        let mut r: &[u8] = &[1, 0, 0]; // only 3 bytes, need 4
        assert!(matches!(
            read_string(&mut r),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(5); // claims 5 chars
        buf.put_u16_le(b'h' as u16);
        let mut r = &buf[..];
        assert!(matches!(
            read_string(&mut r),
            Err(ProtocolError::Truncated { .. })
        ));
    }
}
