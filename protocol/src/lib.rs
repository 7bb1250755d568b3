use std::io::{Cursor, Read, Write};

use anyhow::bail;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

pub mod client_opcode {
    pub const AUTH: u8 = 1;
    pub const INFECTION: u8 = 2;
    pub const DISCONNECTION: u8 = 3;
}

pub mod server_opcode {
    pub const RESULT_INFECTION: u8 = 1;
    pub const MAXIMUM_INFECTION: u8 = 2;
    pub const NETWORK_SIZE_ANNOUNCEMENT: u8 = 6;
}

/// Infection codes travel as exactly this many raw bytes, whatever their
/// logical length.
pub const CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPacket {
    Auth { player_id: u16 },
    Infection { code: [u8; CODE_LEN] },
    Disconnection,
}

impl ClientPacket {
    /// Tries to pull one complete frame off the front of the input buffer.
    /// Returns the number of consumed bytes together with the decode result,
    /// or None when the buffer does not yet hold a full frame.
    pub fn dequeue_and_decode(input_buffer: &[u8]) -> Option<(usize, anyhow::Result<ClientPacket>)> {
        let opcode = *input_buffer.first()?;
        let payload_len = match opcode {
            client_opcode::AUTH => 2,
            client_opcode::INFECTION => CODE_LEN,
            client_opcode::DISCONNECTION => 0,
            opcode => return Some((1, Err(anyhow::anyhow!("unsupported client opcode: {opcode}")))),
        };
        let end = 1 + payload_len;
        if input_buffer.len() < end {
            return None;
        }
        Some((end, Self::decode(&input_buffer[..end])))
    }

    pub fn decode(frame: &[u8]) -> anyhow::Result<ClientPacket> {
        let mut rdr = Cursor::new(frame);
        let opcode = rdr.read_u8()?;

        let packet = match opcode {
            client_opcode::AUTH => {
                let player_id = rdr.read_u16::<BigEndian>()?;
                ClientPacket::Auth { player_id }
            }
            client_opcode::INFECTION => {
                let mut code = [0u8; CODE_LEN];
                rdr.read_exact(&mut code)?;
                ClientPacket::Infection { code }
            }
            client_opcode::DISCONNECTION => ClientPacket::Disconnection,
            opcode => {
                bail!("unsupported client opcode: {opcode}");
            }
        };

        Ok(packet)
    }

    pub fn pack(&self, wtr: &mut impl Write) {
        match self {
            ClientPacket::Auth { player_id } => {
                wtr.write_u8(client_opcode::AUTH).unwrap();
                wtr.write_u16::<BigEndian>(*player_id).unwrap();
            }
            ClientPacket::Infection { code } => {
                wtr.write_u8(client_opcode::INFECTION).unwrap();
                wtr.write_all(code).unwrap();
            }
            ClientPacket::Disconnection => {
                wtr.write_u8(client_opcode::DISCONNECTION).unwrap();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPacket {
    ResultInfection { prior_score: u32, success: bool },
    MaximumInfection { prior_score: u32 },
    NetworkSizeAnnouncement { network_size: u32 },
}

impl ServerPacket {
    pub fn dequeue_and_decode(input_buffer: &[u8]) -> Option<(usize, anyhow::Result<ServerPacket>)> {
        let opcode = *input_buffer.first()?;
        let payload_len = match opcode {
            server_opcode::RESULT_INFECTION => 8,
            server_opcode::MAXIMUM_INFECTION => 4,
            server_opcode::NETWORK_SIZE_ANNOUNCEMENT => 4,
            opcode => return Some((1, Err(anyhow::anyhow!("unsupported server opcode: {opcode}")))),
        };
        let end = 1 + payload_len;
        if input_buffer.len() < end {
            return None;
        }
        Some((end, Self::decode(&input_buffer[..end])))
    }

    pub fn decode(frame: &[u8]) -> anyhow::Result<ServerPacket> {
        let mut rdr = Cursor::new(frame);
        let opcode = rdr.read_u8()?;

        let packet = match opcode {
            server_opcode::RESULT_INFECTION => {
                let prior_score = rdr.read_u32::<BigEndian>()?;
                let success = rdr.read_u32::<BigEndian>()? != 0;
                ServerPacket::ResultInfection { prior_score, success }
            }
            server_opcode::MAXIMUM_INFECTION => {
                let prior_score = rdr.read_u32::<BigEndian>()?;
                ServerPacket::MaximumInfection { prior_score }
            }
            server_opcode::NETWORK_SIZE_ANNOUNCEMENT => {
                let network_size = rdr.read_u32::<BigEndian>()?;
                ServerPacket::NetworkSizeAnnouncement { network_size }
            }
            opcode => {
                bail!("unsupported server opcode: {opcode}");
            }
        };

        Ok(packet)
    }

    pub fn pack(&self, wtr: &mut impl Write) {
        match self {
            ServerPacket::ResultInfection { prior_score, success } => {
                wtr.write_u8(server_opcode::RESULT_INFECTION).unwrap();
                wtr.write_u32::<BigEndian>(*prior_score).unwrap();
                wtr.write_u32::<BigEndian>(u32::from(*success)).unwrap();
            }
            ServerPacket::MaximumInfection { prior_score } => {
                wtr.write_u8(server_opcode::MAXIMUM_INFECTION).unwrap();
                wtr.write_u32::<BigEndian>(*prior_score).unwrap();
            }
            ServerPacket::NetworkSizeAnnouncement { network_size } => {
                wtr.write_u8(server_opcode::NETWORK_SIZE_ANNOUNCEMENT).unwrap();
                wtr.write_u32::<BigEndian>(*network_size).unwrap();
            }
        }
    }
}

/// Turns a raw code payload into the string the game evaluates. Padding
/// bytes and invalid UTF-8 must never take the evaluator down, so the
/// conversion is lossy and both NUL and whitespace padding are stripped.
pub fn code_to_string(code: &[u8; CODE_LEN]) -> String {
    String::from_utf8_lossy(code)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Sender-side convention: codes shorter than the frame are padded with
/// spaces, longer ones are cut at the frame boundary.
pub fn code_from_str(code: &str) -> [u8; CODE_LEN] {
    let mut frame = [b' '; CODE_LEN];
    let bytes = code.as_bytes();
    let len = bytes.len().min(CODE_LEN);
    frame[..len].copy_from_slice(&bytes[..len]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_wire_layout() {
        let mut buffer = Vec::new();
        ClientPacket::Auth { player_id: 0x0201 }.pack(&mut buffer);
        assert_eq!(buffer, vec![1, 2, 1]);
    }

    #[test]
    fn infection_wire_layout() {
        let mut buffer = Vec::new();
        ClientPacket::Infection { code: *b"GUGCAUGC" }.pack(&mut buffer);
        assert_eq!(buffer[0], 2);
        assert_eq!(&buffer[1..], b"GUGCAUGC");
    }

    #[test]
    fn disconnection_wire_layout() {
        let mut buffer = Vec::new();
        ClientPacket::Disconnection.pack(&mut buffer);
        assert_eq!(buffer, vec![3]);
    }

    #[test]
    fn client_packets_round_trip() {
        let packets = [
            ClientPacket::Auth { player_id: 42 },
            ClientPacket::Infection { code: *b"GUGCAUGC" },
            ClientPacket::Infection { code: *b"GUG    \0" },
            ClientPacket::Disconnection,
        ];

        for packet in packets {
            let mut buffer = Vec::new();
            packet.pack(&mut buffer);
            let (consumed, decoded) = ClientPacket::dequeue_and_decode(&buffer).unwrap();
            assert_eq!(consumed, buffer.len());
            assert_eq!(decoded.unwrap(), packet);
        }
    }

    #[test]
    fn result_infection_wire_layout() {
        let mut buffer = Vec::new();
        ServerPacket::ResultInfection { prior_score: 7, success: true }.pack(&mut buffer);
        assert_eq!(buffer, vec![1, 0, 0, 0, 7, 0, 0, 0, 1]);
    }

    #[test]
    fn maximum_infection_wire_layout() {
        let mut buffer = Vec::new();
        ServerPacket::MaximumInfection { prior_score: 4 }.pack(&mut buffer);
        assert_eq!(buffer, vec![2, 0, 0, 0, 4]);
    }

    #[test]
    fn network_size_announcement_wire_layout() {
        let mut buffer = Vec::new();
        ServerPacket::NetworkSizeAnnouncement { network_size: 2000 }.pack(&mut buffer);
        assert_eq!(buffer, vec![6, 0, 0, 0x07, 0xd0]);
    }

    #[test]
    fn server_packets_round_trip() {
        let packets = [
            ServerPacket::ResultInfection { prior_score: 3, success: false },
            ServerPacket::MaximumInfection { prior_score: 2000 },
            ServerPacket::NetworkSizeAnnouncement { network_size: 1 },
        ];

        for packet in packets {
            let mut buffer = Vec::new();
            packet.pack(&mut buffer);
            let (consumed, decoded) = ServerPacket::dequeue_and_decode(&buffer).unwrap();
            assert_eq!(consumed, buffer.len());
            assert_eq!(decoded.unwrap(), packet);
        }
    }

    #[test]
    fn partial_frames_are_not_dequeued() {
        assert!(ClientPacket::dequeue_and_decode(&[]).is_none());
        assert!(ClientPacket::dequeue_and_decode(&[client_opcode::AUTH]).is_none());
        assert!(ClientPacket::dequeue_and_decode(&[client_opcode::AUTH, 0]).is_none());
        assert!(ClientPacket::dequeue_and_decode(&[client_opcode::INFECTION, b'G', b'U']).is_none());
        assert!(ServerPacket::dequeue_and_decode(&[server_opcode::RESULT_INFECTION, 0, 0]).is_none());
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let (_, decoded) = ClientPacket::dequeue_and_decode(&[99]).unwrap();
        assert!(decoded.is_err());

        let (_, decoded) = ServerPacket::dequeue_and_decode(&[0, 1, 2, 3, 4]).unwrap();
        assert!(decoded.is_err());
    }

    #[test]
    fn frames_dequeue_in_sequence() {
        let mut buffer = Vec::new();
        ClientPacket::Auth { player_id: 9 }.pack(&mut buffer);
        ClientPacket::Infection { code: *b"CCCCGCCC" }.pack(&mut buffer);
        ClientPacket::Disconnection.pack(&mut buffer);

        let mut packets = Vec::new();
        let mut rest = buffer.as_slice();
        while let Some((consumed, decoded)) = ClientPacket::dequeue_and_decode(rest) {
            packets.push(decoded.unwrap());
            rest = &rest[consumed..];
        }

        assert_eq!(
            packets,
            vec![
                ClientPacket::Auth { player_id: 9 },
                ClientPacket::Infection { code: *b"CCCCGCCC" },
                ClientPacket::Disconnection,
            ]
        );
        assert!(rest.is_empty());
    }

    #[test]
    fn code_conversion_trims_padding() {
        assert_eq!(code_to_string(b"GUGCAUGC"), "GUGCAUGC");
        assert_eq!(code_to_string(b"GUG     "), "GUG");
        assert_eq!(code_to_string(b"GUG\0\0\0\0\0"), "GUG");
        // invalid utf-8 degrades, it never panics
        let _ = code_to_string(&[0xff, 0xfe, b'G', b'U', b'G', b'C', b'A', b'U']);
    }

    #[test]
    fn code_padding_round_trip() {
        assert_eq!(&code_from_str("GUGCAUGC"), b"GUGCAUGC");
        assert_eq!(&code_from_str("GUG"), b"GUG     ");
        assert_eq!(code_to_string(&code_from_str("GUG")), "GUG");
    }
}
