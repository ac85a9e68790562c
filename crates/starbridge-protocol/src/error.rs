use thiserror::Error;

/// Decode-side failures. Encode paths are infallible by construction: a
/// well-formed in-memory record always produces a well-formed frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("bad magic: expected {expected:#010x}, got {found:#010x}")]
    BadMagic { expected: u32, found: u32 },
    #[error("header total length {total} is impossible (< header length)")]
    ImpossibleLength { total: u32 },
    #[error("packet of {total} bytes exceeds MAX_PACKET_SIZE")]
    PacketTooLarge { total: u32 },
    #[error("remaining-bytes field {remaining} disagrees with total length {total}")]
    LengthMismatch { total: u32, remaining: u32 },
    #[error("unknown object-type tag {0:#04x}")]
    UnknownObjectType(u8),
    #[error("unknown command subtype {0}")]
    UnknownCommandSubtype(u32),
    #[error("truncated payload: needed {needed} more byte(s)")]
    Truncated { needed: usize },
    #[error("malformed UTF-16 string")]
    MalformedString,
}
