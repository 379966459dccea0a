use std::sync::Arc;

use async_trait::async_trait;
use chorus_core::{
    ConnectionId, RoomId, RoomStore, SessionDescription, SessionEvent, Signal, Tap,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::Collab;

/// Notices a transport delivers about itself: local candidates, connectivity
/// changes and the arrival of media.
pub type TransportNotices = UnboundedReceiver<SessionEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Negotiation failed: {0}")]
    Negotiation(String),
    #[error("Transport is closed")]
    Closed,
}

/// A peer-to-peer media transport, as provided by the runtime.
///
/// Descriptions and candidates are opaque, nothing here interprets them.
#[async_trait]
pub trait PeerTransport
where
    Self: 'static + Send + Sync,
{
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    /// Applies a remote offer and returns the local answer.
    async fn accept_offer(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, TransportError>;

    async fn accept_answer(&self, answer: SessionDescription) -> Result<(), TransportError>;

    async fn add_candidate(&self, candidate: Value) -> Result<(), TransportError>;

    async fn close(&self);
}

/// Creates transports for new sessions.
pub trait TransportFactory
where
    Self: 'static + Send + Sync,
{
    type Transport: PeerTransport;

    /// Creates a transport to `peer`.
    ///
    /// * `outbound` - The mixed stream to send, on the host side only.
    fn create(
        &self,
        peer: ConnectionId,
        outbound: Option<Tap>,
    ) -> Result<(Self::Transport, TransportNotices), TransportError>;
}

/// Sends signals to another member of a room.
pub trait SignalSender
where
    Self: 'static + Send + Sync,
{
    fn send_signal(&self, room_id: &str, target: ConnectionId, signal: Signal);
}

/// A signal on its way out, for clients that forward them over their own channel.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundSignal {
    pub room_id: RoomId,
    pub target: ConnectionId,
    pub signal: Signal,
}

impl SignalSender for UnboundedSender<OutboundSignal> {
    fn send_signal(&self, room_id: &str, target: ConnectionId, signal: Signal) {
        let _ = self.send(OutboundSignal {
            room_id: room_id.to_string(),
            target,
            signal,
        });
    }
}

/// Relays signals through an in-process control plane, as `connection_id`.
pub struct CollabSignals<S> {
    pub collab: Arc<Collab<S>>,
    pub connection_id: ConnectionId,
}

impl<S> SignalSender for CollabSignals<S>
where
    S: RoomStore,
{
    fn send_signal(&self, room_id: &str, target: ConnectionId, signal: Signal) {
        self.collab
            .rooms
            .relay(room_id, self.connection_id, target, signal.to_payload());
    }
}
