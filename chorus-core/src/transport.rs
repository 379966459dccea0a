use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConnectionId, Id};

pub type TransportSessionId = Id<TransportSession>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    Offer,
    Answer,
}

/// An offer or answer. The `sdp` body is never looked into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: DescriptionKind,
    pub sdp: String,
}

/// A signaling message exchanged between host and listener, shaped like the
/// browser's own description and candidate objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Description(SessionDescription),
    Candidate { candidate: Value },
}

/// Which end of the session this side is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// The host, which creates the offer.
    Offerer,
    /// A listener, which answers it.
    Answerer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Offering,
    /// The answer is known. On a listener this means "awaiting first media".
    AnsweredPending,
    Connected,
    /// Terminal.
    Closed,
}

/// Connectivity as reported by the transport library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A signal relayed from the other side.
    SignalReceived(Signal),
    /// The local transport produced a connectivity candidate.
    CandidateReady(Value),
    ConnectionStateChanged(ConnectionState),
    /// The first inbound media arrived.
    MediaReceived,
}

/// What the owner of a session has to do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Noop,
    /// Complete the session with the remote answer.
    ApplyAnswer(SessionDescription),
    /// Answer the remote offer and relay the answer back.
    AnswerOffer(SessionDescription),
    ApplyCandidate(Value),
    RelayCandidate(Value),
    /// Tear the transport down.
    Close,
}

/// One negotiated media path between the host and one listener.
#[derive(Debug)]
pub struct TransportSession {
    pub id: TransportSessionId,
    pub peer: ConnectionId,
    role: SessionRole,
    state: SessionState,
}

impl Signal {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::Description(SessionDescription {
            kind: DescriptionKind::Offer,
            sdp: sdp.into(),
        })
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::Description(SessionDescription {
            kind: DescriptionKind::Answer,
            sdp: sdp.into(),
        })
    }

    /// Reads a relayed payload, returning `None` if it isn't a signal.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }

    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<SessionDescription> for Signal {
    fn from(description: SessionDescription) -> Self {
        Self::Description(description)
    }
}

impl ConnectionState {
    /// Returns true if the session can never carry media again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed | Self::Closed)
    }
}

impl TransportSession {
    /// A session created by the host, which is about to send an offer.
    pub fn offering(peer: ConnectionId) -> Self {
        Self::new(peer, SessionRole::Offerer)
    }

    /// A session created by a listener, waiting for the host's offer.
    pub fn answering(peer: ConnectionId) -> Self {
        Self::new(peer, SessionRole::Answerer)
    }

    fn new(peer: ConnectionId, role: SessionRole) -> Self {
        Self {
            id: TransportSessionId::new(),
            peer,
            role,
            state: SessionState::Offering,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Closes the session, returning false if it was already closed.
    pub fn close(&mut self) -> bool {
        let was_open = !self.is_closed();
        self.state = SessionState::Closed;

        was_open
    }

    /// Advances the state machine.
    pub fn handle(&mut self, event: SessionEvent) -> SessionAction {
        use SessionEvent::*;
        use SessionState::*;

        if self.is_closed() {
            return SessionAction::Noop;
        }

        match event {
            SignalReceived(Signal::Description(description)) => {
                match (self.role, description.kind, self.state) {
                    (SessionRole::Offerer, DescriptionKind::Answer, Offering) => {
                        self.state = AnsweredPending;
                        SessionAction::ApplyAnswer(description)
                    }
                    (SessionRole::Answerer, DescriptionKind::Offer, Offering) => {
                        self.state = AnsweredPending;
                        SessionAction::AnswerOffer(description)
                    }
                    (role, kind, state) => {
                        debug!(
                            "Session {} ignored {:?} as {:?} in {:?}",
                            self.id, kind, role, state
                        );
                        SessionAction::Noop
                    }
                }
            }
            SignalReceived(Signal::Candidate { candidate }) => {
                SessionAction::ApplyCandidate(candidate)
            }
            CandidateReady(candidate) => SessionAction::RelayCandidate(candidate),
            ConnectionStateChanged(state) if state.is_terminal() => {
                self.state = Closed;
                SessionAction::Close
            }
            ConnectionStateChanged(ConnectionState::Connected) | MediaReceived => {
                if self.state == AnsweredPending {
                    self.state = Connected;
                }

                SessionAction::Noop
            }
            ConnectionStateChanged(_) => SessionAction::Noop,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_signal_matches_browser_shapes() {
        let offer = Signal::from_payload(&json!({ "type": "offer", "sdp": "v=0" }));
        let candidate = Signal::from_payload(&json!({ "candidate": { "candidate": "a=1" } }));

        assert_eq!(offer, Some(Signal::offer("v=0")));
        assert!(matches!(candidate, Some(Signal::Candidate { .. })));
        assert_eq!(Signal::from_payload(&json!({ "hello": 1 })), None);
        assert_eq!(
            Signal::answer("v=0").to_payload(),
            json!({ "type": "answer", "sdp": "v=0" })
        );
    }

    #[test]
    fn test_offerer_lifecycle() {
        let mut session = TransportSession::offering(ConnectionId::new());
        assert_eq!(session.state(), SessionState::Offering);

        let action = session.handle(SessionEvent::SignalReceived(Signal::answer("v=0")));
        assert!(matches!(action, SessionAction::ApplyAnswer(_)));
        assert_eq!(session.state(), SessionState::AnsweredPending);

        session.handle(SessionEvent::ConnectionStateChanged(
            ConnectionState::Connected,
        ));
        assert_eq!(session.state(), SessionState::Connected);

        let action = session.handle(SessionEvent::ConnectionStateChanged(
            ConnectionState::Disconnected,
        ));
        assert_eq!(action, SessionAction::Close);
        assert!(session.is_closed());
    }

    #[test]
    fn test_answerer_waits_for_media() {
        let mut session = TransportSession::answering(ConnectionId::new());

        // An answer makes no sense on this side
        let action = session.handle(SessionEvent::SignalReceived(Signal::answer("v=0")));
        assert_eq!(action, SessionAction::Noop);

        let action = session.handle(SessionEvent::SignalReceived(Signal::offer("v=0")));
        assert!(matches!(action, SessionAction::AnswerOffer(_)));
        assert_eq!(session.state(), SessionState::AnsweredPending);

        session.handle(SessionEvent::MediaReceived);
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut session = TransportSession::offering(ConnectionId::new());

        assert!(session.close());
        assert!(!session.close());

        let events = [
            SessionEvent::SignalReceived(Signal::answer("v=0")),
            SessionEvent::CandidateReady(json!({})),
            SessionEvent::ConnectionStateChanged(ConnectionState::Connected),
            SessionEvent::MediaReceived,
        ];

        for event in events {
            assert_eq!(session.handle(event), SessionAction::Noop);
            assert!(session.is_closed());
        }
    }

    #[test]
    fn test_candidates_pass_through() {
        let mut session = TransportSession::offering(ConnectionId::new());
        let candidate = json!({ "candidate": "a=1", "sdpMid": "0" });

        assert_eq!(
            session.handle(SessionEvent::CandidateReady(candidate.clone())),
            SessionAction::RelayCandidate(candidate.clone())
        );
        assert_eq!(
            session.handle(SessionEvent::SignalReceived(Signal::Candidate {
                candidate: candidate.clone()
            })),
            SessionAction::ApplyCandidate(candidate)
        );
        assert_eq!(session.state(), SessionState::Offering);
    }
}
