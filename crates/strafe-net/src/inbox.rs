//! Typed packet inbox with timed waits.
//!
//! The transport pushes decoded packets through an [`InboxSender`] (which can
//! live on the socket thread). The simulation side awaits specific packet
//! kinds with [`PacketInbox::wait_for`]; packets of other kinds that arrive
//! meanwhile are stashed for later waits or [`PacketInbox::drain`].

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use crate::messages::{Packet, PacketKind};

/// Maximum packets kept aside while waiting for a different kind.
pub const MAX_STASHED_PACKETS: usize = 256;

/// Sending half handed to the transport.
pub type InboxSender = mpsc::UnboundedSender<Packet>;

struct InboxState {
    rx: mpsc::UnboundedReceiver<Packet>,
    stash: VecDeque<Packet>,
}

impl InboxState {
    fn stash(&mut self, packet: Packet) {
        if self.stash.len() >= MAX_STASHED_PACKETS {
            if let Some(dropped) = self.stash.pop_front() {
                tracing::warn!("Inbox stash full, dropping {:?} packet", dropped.kind());
            }
        }
        self.stash.push_back(packet);
    }

    fn take_stashed(&mut self, kind: PacketKind) -> Option<Packet> {
        let pos = self.stash.iter().position(|p| p.kind() == kind)?;
        self.stash.remove(pos)
    }
}

/// Receiving half of the inbox.
pub struct PacketInbox {
    state: Mutex<InboxState>,
}

impl PacketInbox {
    /// Create a connected sender/inbox pair.
    pub fn channel() -> (InboxSender, PacketInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inbox = PacketInbox {
            state: Mutex::new(InboxState {
                rx,
                stash: VecDeque::new(),
            }),
        };
        (tx, inbox)
    }

    /// Wait for the next packet of `kind`.
    ///
    /// Returns `None` if `timeout` elapses first or every sender is gone.
    pub async fn wait_for(&self, kind: PacketKind, timeout: Duration) -> Option<Packet> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(packet) = state.take_stashed(kind) {
            return Some(packet);
        }

        let wait = async {
            while let Some(packet) = state.rx.recv().await {
                if packet.kind() == kind {
                    return Some(packet);
                }
                state.stash(packet);
            }
            None
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(packet) => packet,
            Err(_) => {
                tracing::debug!("Timed out after {timeout:?} waiting for {kind:?}");
                None
            }
        }
    }

    /// Take every packet received so far, stashed ones first, in arrival order.
    pub async fn drain(&self) -> Vec<Packet> {
        let mut state = self.state.lock().await;
        let mut packets: Vec<Packet> = state.stash.drain(..).collect();
        while let Ok(packet) = state.rx.try_recv() {
            packets.push(packet);
        }
        packets
    }
}
