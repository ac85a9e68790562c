//! Client command parsing (§4.2 `parseClientCommand`, §4.7 command table).
//!
//! The payload of the single client `ClientCommand` packet type begins
//! with a 32-bit subtype tag, dispatched here to a per-subtype parser.
//! This module only does wire decoding: range clamping and precondition
//! checks belong to the session server (§4.7's validator).

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandSubtype {
    SetShip = 0,
    SetConsole = 1,
    Ready = 2,
    Heartbeat = 3,
    SetImpulse = 4,
    SetWarp = 5,
    SetSteering = 6,
    ClimbDive = 7,
    ToggleReverse = 8,
    RequestDock = 9,
    SetTarget = 10,
    FireTube = 11,
    LoadTube = 12,
    UnloadTube = 13,
    ToggleAutoBeams = 14,
    ToggleShields = 15,
    SetBeamFrequency = 16,
    SetEnergy = 17,
    SetCoolant = 18,
    ScanTarget = 19,
    SelectTarget = 20,
    SetRedAlert = 21,
    SetMainScreen = 22,
    SendComms = 23,
}

impl CommandSubtype {
    fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::SetShip,
            1 => Self::SetConsole,
            2 => Self::Ready,
            3 => Self::Heartbeat,
            4 => Self::SetImpulse,
            5 => Self::SetWarp,
            6 => Self::SetSteering,
            7 => Self::ClimbDive,
            8 => Self::ToggleReverse,
            9 => Self::RequestDock,
            10 => Self::SetTarget,
            11 => Self::FireTube,
            12 => Self::LoadTube,
            13 => Self::UnloadTube,
            14 => Self::ToggleAutoBeams,
            15 => Self::ToggleShields,
            16 => Self::SetBeamFrequency,
            17 => Self::SetEnergy,
            18 => Self::SetCoolant,
            19 => Self::ScanTarget,
            20 => Self::SelectTarget,
            21 => Self::SetRedAlert,
            22 => Self::SetMainScreen,
            23 => Self::SendComms,
            _ => return None,
        })
    }
}

/// One fully decoded client command, with its raw (unclamped) parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    SetShip { ship_index: u8 },
    SetConsole { console_type: u8 },
    Ready,
    Heartbeat,
    SetImpulse { value: f32 },
    SetWarp { value: i32 },
    SetSteering { value: f32 },
    ClimbDive { value: f32 },
    ToggleReverse,
    RequestDock,
    SetTarget { target_id: i32 },
    FireTube { tube_index: u8 },
    LoadTube { tube_index: u8, ordnance_type: u8 },
    UnloadTube { tube_index: u8 },
    ToggleAutoBeams,
    ToggleShields,
    SetBeamFrequency { value: u8 },
    SetEnergy { system_index: u8, value: f32 },
    SetCoolant { system_index: u8, units: u8 },
    ScanTarget { target_id: i32 },
    SelectTarget { target_id: i32 },
    SetRedAlert { active: bool },
    SetMainScreen { view: u8 },
    SendComms { target_id: i32 },
}

/// Parses a client command packet payload (leading subtype + parameters).
pub fn parse_client_command(payload: &[u8]) -> Result<ClientCommand, ProtocolError> {
    let mut r = payload;
    if r.len() < 4 {
        return Err(ProtocolError::Truncated { needed: 4 - r.len() });
    }
    let subtype_tag = r.get_u32_le();
    let subtype =
        CommandSubtype::from_u32(subtype_tag).ok_or(ProtocolError::UnknownCommandSubtype(subtype_tag))?;

    let need = |r: &[u8], n: usize| -> Result<(), ProtocolError> {
        if r.len() < n {
            Err(ProtocolError::Truncated { needed: n - r.len() })
        } else {
            Ok(())
        }
    };

    Ok(match subtype {
        CommandSubtype::SetShip => {
            need(r, 1)?;
            ClientCommand::SetShip { ship_index: r.get_u8() }
        }
        CommandSubtype::SetConsole => {
            need(r, 1)?;
            ClientCommand::SetConsole { console_type: r.get_u8() }
        }
        CommandSubtype::Ready => ClientCommand::Ready,
        CommandSubtype::Heartbeat => ClientCommand::Heartbeat,
        CommandSubtype::SetImpulse => {
            need(r, 4)?;
            ClientCommand::SetImpulse { value: r.get_f32_le() }
        }
        CommandSubtype::SetWarp => {
            need(r, 4)?;
            ClientCommand::SetWarp { value: r.get_i32_le() }
        }
        CommandSubtype::SetSteering => {
            need(r, 4)?;
            ClientCommand::SetSteering { value: r.get_f32_le() }
        }
        CommandSubtype::ClimbDive => {
            need(r, 4)?;
            ClientCommand::ClimbDive { value: r.get_f32_le() }
        }
        CommandSubtype::ToggleReverse => ClientCommand::ToggleReverse,
        CommandSubtype::RequestDock => ClientCommand::RequestDock,
        CommandSubtype::SetTarget => {
            need(r, 4)?;
            ClientCommand::SetTarget { target_id: r.get_i32_le() }
        }
        CommandSubtype::FireTube => {
            need(r, 1)?;
            ClientCommand::FireTube { tube_index: r.get_u8() }
        }
        CommandSubtype::LoadTube => {
            need(r, 2)?;
            let tube_index = r.get_u8();
            let ordnance_type = r.get_u8();
            ClientCommand::LoadTube { tube_index, ordnance_type }
        }
        CommandSubtype::UnloadTube => {
            need(r, 1)?;
            ClientCommand::UnloadTube { tube_index: r.get_u8() }
        }
        CommandSubtype::ToggleAutoBeams => ClientCommand::ToggleAutoBeams,
        CommandSubtype::ToggleShields => ClientCommand::ToggleShields,
        CommandSubtype::SetBeamFrequency => {
            need(r, 1)?;
            ClientCommand::SetBeamFrequency { value: r.get_u8() }
        }
        CommandSubtype::SetEnergy => {
            need(r, 5)?;
            let system_index = r.get_u8();
            let value = r.get_f32_le();
            ClientCommand::SetEnergy { system_index, value }
        }
        CommandSubtype::SetCoolant => {
            need(r, 2)?;
            let system_index = r.get_u8();
            let units = r.get_u8();
            ClientCommand::SetCoolant { system_index, units }
        }
        CommandSubtype::ScanTarget => {
            need(r, 4)?;
            ClientCommand::ScanTarget { target_id: r.get_i32_le() }
        }
        CommandSubtype::SelectTarget => {
            need(r, 4)?;
            ClientCommand::SelectTarget { target_id: r.get_i32_le() }
        }
        CommandSubtype::SetRedAlert => {
            need(r, 1)?;
            ClientCommand::SetRedAlert { active: r.get_u8() != 0 }
        }
        CommandSubtype::SetMainScreen => {
            need(r, 1)?;
            ClientCommand::SetMainScreen { view: r.get_u8() }
        }
        CommandSubtype::SendComms => {
            need(r, 4)?;
            ClientCommand::SendComms { target_id: r.get_i32_le() }
        }
    })
}

/// Encodes a client command payload (leading subtype + parameters). Used
/// by tests and any TCP-side test client; real clients are out of scope.
pub fn write_client_command(cmd: &ClientCommand) -> BytesMut {
    let mut buf = BytesMut::new();
    let (subtype, write_params): (CommandSubtype, fn(&mut BytesMut, &ClientCommand)) = match cmd {
        ClientCommand::SetShip { .. } => (CommandSubtype::SetShip, |b, c| {
            if let ClientCommand::SetShip { ship_index } = c {
                b.put_u8(*ship_index);
            }
        }),
        ClientCommand::SetConsole { .. } => (CommandSubtype::SetConsole, |b, c| {
            if let ClientCommand::SetConsole { console_type } = c {
                b.put_u8(*console_type);
            }
        }),
        ClientCommand::Ready => (CommandSubtype::Ready, |_, _| {}),
        ClientCommand::Heartbeat => (CommandSubtype::Heartbeat, |_, _| {}),
        ClientCommand::SetImpulse { .. } => (CommandSubtype::SetImpulse, |b, c| {
            if let ClientCommand::SetImpulse { value } = c {
                b.put_f32_le(*value);
            }
        }),
        ClientCommand::SetWarp { .. } => (CommandSubtype::SetWarp, |b, c| {
            if let ClientCommand::SetWarp { value } = c {
                b.put_i32_le(*value);
            }
        }),
        ClientCommand::SetSteering { .. } => (CommandSubtype::SetSteering, |b, c| {
            if let ClientCommand::SetSteering { value } = c {
                b.put_f32_le(*value);
            }
        }),
        ClientCommand::ClimbDive { .. } => (CommandSubtype::ClimbDive, |b, c| {
            if let ClientCommand::ClimbDive { value } = c {
                b.put_f32_le(*value);
            }
        }),
        ClientCommand::ToggleReverse => (CommandSubtype::ToggleReverse, |_, _| {}),
        ClientCommand::RequestDock => (CommandSubtype::RequestDock, |_, _| {}),
        ClientCommand::SetTarget { .. } => (CommandSubtype::SetTarget, |b, c| {
            if let ClientCommand::SetTarget { target_id } = c {
                b.put_i32_le(*target_id);
            }
        }),
        ClientCommand::FireTube { .. } => (CommandSubtype::FireTube, |b, c| {
            if let ClientCommand::FireTube { tube_index } = c {
                b.put_u8(*tube_index);
            }
        }),
        ClientCommand::LoadTube { .. } => (CommandSubtype::LoadTube, |b, c| {
            if let ClientCommand::LoadTube { tube_index, ordnance_type } = c {
                b.put_u8(*tube_index);
                b.put_u8(*ordnance_type);
            }
        }),
        ClientCommand::UnloadTube { .. } => (CommandSubtype::UnloadTube, |b, c| {
            if let ClientCommand::UnloadTube { tube_index } = c {
                b.put_u8(*tube_index);
            }
        }),
        ClientCommand::ToggleAutoBeams => (CommandSubtype::ToggleAutoBeams, |_, _| {}),
        ClientCommand::ToggleShields => (CommandSubtype::ToggleShields, |_, _| {}),
        ClientCommand::SetBeamFrequency { .. } => (CommandSubtype::SetBeamFrequency, |b, c| {
            if let ClientCommand::SetBeamFrequency { value } = c {
                b.put_u8(*value);
            }
        }),
        ClientCommand::SetEnergy { .. } => (CommandSubtype::SetEnergy, |b, c| {
            if let ClientCommand::SetEnergy { system_index, value } = c {
                b.put_u8(*system_index);
                b.put_f32_le(*value);
            }
        }),
        ClientCommand::SetCoolant { .. } => (CommandSubtype::SetCoolant, |b, c| {
            if let ClientCommand::SetCoolant { system_index, units } = c {
                b.put_u8(*system_index);
                b.put_u8(*units);
            }
        }),
        ClientCommand::ScanTarget { .. } => (CommandSubtype::ScanTarget, |b, c| {
            if let ClientCommand::ScanTarget { target_id } = c {
                b.put_i32_le(*target_id);
            }
        }),
        ClientCommand::SelectTarget { .. } => (CommandSubtype::SelectTarget, |b, c| {
            if let ClientCommand::SelectTarget { target_id } = c {
                b.put_i32_le(*target_id);
            }
        }),
        ClientCommand::SetRedAlert { .. } => (CommandSubtype::SetRedAlert, |b, c| {
            if let ClientCommand::SetRedAlert { active } = c {
                b.put_u8(u8::from(*active));
            }
        }),
        ClientCommand::SetMainScreen { .. } => (CommandSubtype::SetMainScreen, |b, c| {
            if let ClientCommand::SetMainScreen { view } = c {
                b.put_u8(*view);
            }
        }),
        ClientCommand::SendComms { .. } => (CommandSubtype::SendComms, |b, c| {
            if let ClientCommand::SendComms { target_id } = c {
                b.put_i32_le(*target_id);
            }
        }),
    };
    buf.put_u32_le(subtype as u32);
    write_params(&mut buf, cmd);
    buf
}
