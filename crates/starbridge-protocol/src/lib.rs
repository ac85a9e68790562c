//! Wire protocol layer (C1–C3): packet framing, the tagged bitfield
//! entity-update encoding, and the stream reassembly/resynchronization
//! parser described in spec §3–§4.2.

pub mod command_codec;
pub mod constants;
pub mod entity_codec;
pub mod error;
pub mod header;
pub mod stream;
pub mod strings;

pub use command_codec::{parse_client_command, write_client_command, ClientCommand, CommandSubtype};
pub use constants::*;
pub use entity_codec::{read_entity_batch, read_entity_update, write_entity_batch, write_entity_update,
    EntityUpdate, PrimType, Property, PropertyValue};
pub use error::ProtocolError;
pub use header::Header;
pub use stream::{Frame, FramingError, StreamParser};
