use std::sync::Arc;

use chorus_core::{
    ChorusError, RoomId, SessionAction, SessionEvent, SessionRole, SessionState, Signal,
    TransportSession, TransportSessionId,
};
use crossbeam::atomic::AtomicCell;
use log::{debug, info, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::{PeerTransport, SignalSender, TransportError, TransportNotices};

/// The orchestrator's end of a running session.
pub(crate) struct SessionHandle {
    pub id: TransportSessionId,
    inbox: UnboundedSender<Signal>,
    state: Arc<AtomicCell<SessionState>>,
}

/// Owns a [TransportSession] and its transport, and carries out what the
/// state machine asks for. Runs in its own task until the session closes.
pub(crate) struct SessionDriver<T, S> {
    room_id: RoomId,
    session: TransportSession,
    transport: T,
    signals: Arc<S>,
    state: Arc<AtomicCell<SessionState>>,
}

impl SessionHandle {
    /// Hands a relayed signal to the session. Returns false if it already ended.
    pub fn deliver(&self, signal: Signal) -> bool {
        self.inbox.send(signal).is_ok()
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }
}

impl<T, S> SessionDriver<T, S>
where
    T: PeerTransport,
    S: SignalSender,
{
    /// Creates a driver and the handle to reach it. Dropping the handle ends the session.
    pub fn new(
        room_id: &str,
        session: TransportSession,
        transport: T,
        signals: Arc<S>,
    ) -> (Self, SessionHandle, UnboundedReceiver<Signal>) {
        let (inbox, inbox_receiver) = unbounded_channel();
        let state = Arc::new(AtomicCell::new(session.state()));

        let handle = SessionHandle {
            id: session.id,
            inbox,
            state: state.clone(),
        };

        let driver = Self {
            room_id: room_id.to_string(),
            session,
            transport,
            signals,
            state,
        };

        (driver, handle, inbox_receiver)
    }

    /// Drives the session until it closes, calling `observe` after every event.
    ///
    /// The transport is always closed before this returns.
    pub async fn run<F>(
        mut self,
        mut inbox: UnboundedReceiver<Signal>,
        mut notices: TransportNotices,
        mut observe: F,
    ) where
        F: FnMut(&SessionEvent, SessionState) + Send,
    {
        let mut open = true;

        if self.session.role() == SessionRole::Offerer {
            if let Err(error) = self.offer().await {
                self.fail(error);
                open = false;
            }
        }

        while open {
            let event = tokio::select! {
                signal = inbox.recv() => match signal {
                    Some(signal) => SessionEvent::SignalReceived(signal),
                    None => break,
                },
                notice = notices.recv() => match notice {
                    Some(notice) => notice,
                    None => break,
                },
            };

            let action = self.session.handle(event.clone());
            self.state.store(self.session.state());

            observe(&event, self.session.state());

            if let Err(error) = self.perform(action).await {
                self.fail(error);
                break;
            }

            open = !self.session.is_closed();
        }

        self.shutdown().await;
    }

    async fn offer(&self) -> Result<(), TransportError> {
        let offer = self.transport.create_offer().await?;
        self.signals
            .send_signal(&self.room_id, self.session.peer, offer.into());

        Ok(())
    }

    async fn perform(&self, action: SessionAction) -> Result<(), TransportError> {
        let peer = self.session.peer;

        match action {
            SessionAction::Noop | SessionAction::Close => {}
            SessionAction::ApplyAnswer(answer) => self.transport.accept_answer(answer).await?,
            SessionAction::AnswerOffer(offer) => {
                let answer = self.transport.accept_offer(offer).await?;
                self.signals.send_signal(&self.room_id, peer, answer.into());
            }
            SessionAction::ApplyCandidate(candidate) => {
                // A bad candidate only loses one path, the session may still connect
                if let Err(error) = self.transport.add_candidate(candidate).await {
                    debug!("Session {} ignored a candidate: {}", self.session.id, error);
                }
            }
            SessionAction::RelayCandidate(candidate) => {
                self.signals
                    .send_signal(&self.room_id, peer, Signal::Candidate { candidate });
            }
        }

        Ok(())
    }

    fn fail(&self, error: TransportError) {
        let error = ChorusError::TransportNegotiationFailed {
            peer: self.session.peer,
            reason: error.to_string(),
        };

        warn!("Session {} in room {}: {}", self.session.id, self.room_id, error);
    }

    async fn shutdown(&mut self) {
        self.session.close();
        self.state.store(SessionState::Closed);
        self.transport.close().await;

        info!(
            "Session {} with {} in room {} closed",
            self.session.id, self.session.peer, self.room_id
        );
    }
}
