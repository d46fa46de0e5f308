//! The transport seam and connection status notifications.
//!
//! [`PacketChannel`] is implemented by the socket layer. The session core only
//! needs connect, send-to-one, broadcast, a timed wait for a packet kind and a
//! way to kick everybody. Status changes are published through a [`watch`]
//! channel so any number of consumers can react without polling.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

use crate::ids::ParticipantId;
use crate::messages::{Packet, PacketKind};

/// Connection lifecycle state of the local socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Attempting to establish a connection.
    Connecting,
    /// Connection established and approved.
    Connected,
    /// Connection lost, refused, or intentionally closed.
    Disconnected,
}

/// A status transition plus the optional reason string the remote attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// New status.
    pub status: ConnectionStatus,
    /// Reason given by the remote end, if any.
    pub reason: Option<String>,
}

impl Default for StatusChange {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            reason: None,
        }
    }
}

impl StatusChange {
    /// A disconnect carrying `reason`'s wire string.
    pub fn disconnected(reason: DisconnectReason) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            reason: Some(reason.to_string()),
        }
    }

    /// Returns `true` if this is a disconnect carrying exactly `reason`.
    pub fn is_disconnect_with(&self, reason: DisconnectReason) -> bool {
        self.status == ConnectionStatus::Disconnected
            && self.reason.as_deref() == Some(reason.as_str())
    }
}

/// Well-known disconnect reasons attached to kick notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The host is switching maps; clients should reconnect.
    MapChange,
    /// The host shut the session down.
    ServerShutdown,
    /// The wrong password was supplied.
    BadPassword,
    /// The session is full.
    ServerFull,
    /// Kicked by an operator.
    Kicked,
}

impl DisconnectReason {
    /// Wire string for this reason.
    pub fn as_str(self) -> &'static str {
        match self {
            DisconnectReason::MapChange => "MapChange",
            DisconnectReason::ServerShutdown => "ServerShutdown",
            DisconnectReason::BadPassword => "BadPassword",
            DisconnectReason::ServerFull => "ServerFull",
            DisconnectReason::Kicked => "Kicked",
        }
    }

    /// Parse a wire string. Matching is exact.
    pub fn parse(reason: &str) -> Option<Self> {
        [
            DisconnectReason::MapChange,
            DisconnectReason::ServerShutdown,
            DisconnectReason::BadPassword,
            DisconnectReason::ServerFull,
            DisconnectReason::Kicked,
        ]
        .into_iter()
        .find(|r| r.as_str() == reason)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport used by the session core.
///
/// Implementations are driven from the simulation thread; the futures they
/// return need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait PacketChannel {
    /// Connect to a host. Resolves once the connection is approved or refused.
    async fn connect(&self, address: &str, port: u16, password: Option<&str>) -> ConnectionStatus;

    /// Send a packet to one participant.
    fn send_to(&self, participant: ParticipantId, packet: Packet);

    /// Send a packet to everyone on the other end (the host, for a client).
    fn broadcast(&self, packet: Packet);

    /// Wait for the next packet of `kind`, giving up after `timeout`.
    async fn wait_for(&self, kind: PacketKind, timeout: Duration) -> Option<Packet>;

    /// Disconnect every connected participant, attaching `reason`.
    fn disconnect_all(&self, reason: DisconnectReason);

    /// Subscribe to local connection status changes.
    fn status(&self) -> watch::Receiver<StatusChange>;
}
