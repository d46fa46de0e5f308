//! Packet-level networking: ids, packet types, the transport channel seam,
//! connection status notifications, and typed packet waits.

pub mod channel;
pub mod ids;
pub mod inbox;
pub mod messages;

pub use channel::{ConnectionStatus, DisconnectReason, PacketChannel, StatusChange};
pub use ids::{EntityId, ParticipantId};
pub use inbox::{InboxSender, PacketInbox};
pub use messages::{
    JoinStep, MapChange, Packet, PacketError, PacketKind, PlayerIntroduction, SendCategory,
    UserCmd, decode_packet, encode_packet,
};
