//! Packet types exchanged between clients and the host.
//!
//! Transports that need bytes use [`encode_packet`] / [`decode_packet`]:
//! postcard bodies prefixed with a protocol version byte.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, ParticipantId};

/// Current wire-protocol version. Prepended to every encoded packet.
pub const PROTOCOL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Send categories
// ---------------------------------------------------------------------------

/// Reliability class a packet is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SendCategory {
    /// Delivered in order, retransmitted until acknowledged. Player input
    /// travels this way so the host never loses a command.
    #[default]
    ReliableSequenced,
    /// Newer packets supersede older ones; losses are not retransmitted.
    /// Used for high-frequency gameplay state.
    UnreliableSequenced,
}

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Every packet the session core sends or awaits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Packet {
    /// Session parameters request (client, empty) and reply (host).
    MapChange(MapChange),
    /// Client readiness announcement.
    PlayerIntroduction(PlayerIntroduction),
    /// Per-tick player input.
    UserCmd(UserCmd),
}

/// Routing tag identifying a packet type without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// [`Packet::MapChange`].
    MapChange,
    /// [`Packet::PlayerIntroduction`].
    PlayerIntroduction,
    /// [`Packet::UserCmd`].
    UserCmd,
}

impl Packet {
    /// Extract the routing tag without consuming the packet.
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::MapChange(_) => PacketKind::MapChange,
            Packet::PlayerIntroduction(_) => PacketKind::PlayerIntroduction,
            Packet::UserCmd(_) => PacketKind::UserCmd,
        }
    }

    /// Reliability class this packet should be sent with.
    pub fn send_category(&self) -> SendCategory {
        match self {
            Packet::UserCmd(cmd) => cmd.send_category,
            Packet::MapChange(_) | Packet::PlayerIntroduction(_) => {
                SendCategory::ReliableSequenced
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Session parameters. A client broadcasts an empty one as a request; the
/// host answers with the assigned index, map and gamemode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MapChange {
    /// Index the host assigned to the receiving client.
    pub client_index: ParticipantId,
    /// Map to load.
    pub map_name: String,
    /// Gamemode to load.
    pub gamemode: String,
}

/// Stage of the join handshake a [`PlayerIntroduction`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinStep {
    /// Client has loaded everything and enters the game.
    #[default]
    Introduce,
}

/// Sent by a client once its map and gamemode are loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerIntroduction {
    /// Handshake stage.
    pub step: JoinStep,
}

/// One tick of player input.
///
/// `origin`, `velocity` and `base_velocity` are authoritative fields: the
/// prediction path and the host write the simulated result into them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserCmd {
    /// Client-side command sequence number.
    pub number: u32,
    /// Participant that issued the command.
    pub client_index: ParticipantId,
    /// Pressed button bitmask.
    pub buttons: u32,
    /// Forward/side/up movement input.
    pub move_input: Vec3,
    /// View angles (pitch, yaw, roll) in degrees.
    pub angles: Vec3,
    /// Simulated origin after the command ran.
    pub origin: Vec3,
    /// Simulated velocity after the command ran.
    pub velocity: Vec3,
    /// Velocity inherited from whatever the player stands on.
    pub base_velocity: Vec3,
    /// Entity under the player's crosshair, [`EntityId::NONE`] for nothing.
    pub hovered_entity: EntityId,
    /// Reliability class for this command.
    pub send_category: SendCategory,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding a packet.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The payload was empty (no version byte).
    #[error("empty payload, no version byte")]
    EmptyPayload,

    /// The version byte does not match [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Postcard encoding or decoding failed.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Encode a [`Packet`] into a versioned binary payload.
///
/// Wire format: `[version: u8] [postcard-encoded Packet]`
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, PacketError> {
    let body = postcard::to_allocvec(packet)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a versioned binary payload into a [`Packet`].
pub fn decode_packet(data: &[u8]) -> Result<Packet, PacketError> {
    let Some((&version, body)) = data.split_first() else {
        return Err(PacketError::EmptyPayload);
    };
    if version != PROTOCOL_VERSION {
        return Err(PacketError::UnsupportedVersion(version));
    }
    Ok(postcard::from_bytes(body)?)
}
