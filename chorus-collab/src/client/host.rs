use std::sync::{Arc, Weak};

use chorus_core::{ConnectionId, Mixer, RoomId, SessionState, Signal, TransportSession};
use dashmap::DashMap;
use log::{debug, info, warn};
use serde_json::Value;

use super::{SessionDriver, SessionHandle, SignalSender, TransportFactory};
use crate::CollabEvent;

/// Fans the host's mixed output out to one transport session per listener.
///
/// Sessions follow room membership: a joining listener gets a fresh session
/// and an offer, a leaving one has its session closed and removed.
pub struct HostOrchestrator<F, S> {
    /// A weak reference is required so finished sessions can remove themselves.
    me: Weak<Self>,
    room_id: RoomId,
    factory: F,
    signals: Arc<S>,
    mixer: Arc<Mixer>,
    sessions: DashMap<ConnectionId, SessionHandle>,
}

impl<F, S> HostOrchestrator<F, S>
where
    F: TransportFactory,
    S: SignalSender,
{
    pub fn new(room_id: &str, factory: F, signals: S, mixer: Arc<Mixer>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            room_id: room_id.to_string(),
            factory,
            signals: Arc::new(signals),
            mixer,
            sessions: Default::default(),
        })
    }

    /// Reacts to an event received on the host's control channel.
    pub fn handle_event(&self, event: &CollabEvent) {
        match event {
            CollabEvent::ListenerJoined {
                room_id,
                listener_id,
            } if *room_id == self.room_id => self.on_listener_joined(*listener_id),
            CollabEvent::ListenerLeft {
                room_id,
                listener_id,
            } if *room_id == self.room_id => {
                self.on_listener_left(*listener_id);
            }
            CollabEvent::Signal {
                room_id,
                from,
                payload,
            } if *room_id == self.room_id => self.on_signal(*from, payload),
            CollabEvent::RoomClosed { room_id } if *room_id == self.room_id => self.close_all(),
            _ => {}
        }
    }

    /// Opens a session to a listener and sends it an offer.
    ///
    /// A session left over from an earlier join is replaced.
    pub fn on_listener_joined(&self, listener_id: ConnectionId) {
        let (transport, notices) = match self
            .factory
            .create(listener_id, Some(self.mixer.subscribe()))
        {
            Ok(created) => created,
            Err(error) => {
                warn!("Could not create a transport for {}: {}", listener_id, error);
                return;
            }
        };

        let session = TransportSession::offering(listener_id);
        let session_id = session.id;

        let (driver, handle, inbox) =
            SessionDriver::new(&self.room_id, session, transport, self.signals.clone());

        if self.sessions.insert(listener_id, handle).is_some() {
            debug!("Replaced the session with {}", listener_id);
        }

        info!("Opening session {} with {}", session_id, listener_id);

        let me = self.me.clone();

        tokio::spawn(async move {
            driver.run(inbox, notices, |_, _| {}).await;

            if let Some(me) = me.upgrade() {
                me.sessions
                    .remove_if(&listener_id, |_, handle| handle.id == session_id);
            }
        });
    }

    /// Closes and removes the session of a listener. Returns false if it had none.
    pub fn on_listener_left(&self, listener_id: ConnectionId) -> bool {
        // Dropping the handle closes the session's inbox, which ends it
        self.sessions.remove(&listener_id).is_some()
    }

    /// Routes a relayed signal to the session of its sender.
    pub fn on_signal(&self, from: ConnectionId, payload: &Value) {
        let Some(signal) = Signal::from_payload(payload) else {
            debug!("Ignored a malformed signal from {}", from);
            return;
        };

        let delivered = self
            .sessions
            .get(&from)
            .map(|handle| handle.deliver(signal))
            .unwrap_or(false);

        if !delivered {
            debug!("Ignored a signal from {}, which has no open session", from);
        }
    }

    /// Closes every session.
    pub fn close_all(&self) {
        self.sessions.clear();
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_state(&self, listener_id: ConnectionId) -> Option<SessionState> {
        self.sessions.get(&listener_id).map(|h| h.state())
    }

    pub fn listeners(&self) -> Vec<ConnectionId> {
        self.sessions.iter().map(|s| *s.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use chorus_core::{ConnectionState, DescriptionKind, SessionDescription, SessionEvent};
    use serde_json::json;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

    use super::*;
    use crate::client::testing::{eventually, within, FakeFactory};
    use crate::OutboundSignal;

    type Host = Arc<HostOrchestrator<FakeFactory, UnboundedSender<OutboundSignal>>>;

    fn host(factory: &FakeFactory) -> (Host, UnboundedReceiver<OutboundSignal>, Arc<Mixer>) {
        let (signals, outbound) = unbounded_channel();
        let mixer = Arc::new(Mixer::default());
        let host = HostOrchestrator::new("ABC123", factory.clone(), signals, mixer.clone());

        (host, outbound, mixer)
    }

    fn joined(listener_id: ConnectionId) -> CollabEvent {
        CollabEvent::ListenerJoined {
            room_id: "ABC123".into(),
            listener_id,
        }
    }

    #[tokio::test]
    async fn test_one_session_per_listener() {
        let factory = FakeFactory::default();
        let (host, mut outbound, mixer) = host(&factory);

        let first = ConnectionId::new();
        let second = ConnectionId::new();

        host.handle_event(&joined(first));
        host.handle_event(&joined(second));

        let mut offered = vec![];

        for _ in 0..2 {
            let signal = within(outbound.recv()).await.unwrap();

            assert_eq!(signal.room_id, "ABC123");
            assert!(matches!(
                signal.signal,
                Signal::Description(SessionDescription {
                    kind: DescriptionKind::Offer,
                    ..
                })
            ));

            offered.push(signal.target);
        }

        offered.sort_by_key(|c| c.value());
        assert_eq!(offered, vec![first, second]);
        assert_eq!(host.session_count(), 2);
        assert_eq!(mixer.output().subscriber_count(), 2);

        // Events for other rooms are not ours
        host.handle_event(&CollabEvent::ListenerJoined {
            room_id: "XYZ789".into(),
            listener_id: ConnectionId::new(),
        });

        assert_eq!(factory.count(), 2);
    }

    #[tokio::test]
    async fn test_answer_and_candidates_reach_the_right_session() {
        let factory = FakeFactory::default();
        let (host, mut outbound, _) = host(&factory);

        let listener = ConnectionId::new();
        host.on_listener_joined(listener);
        within(outbound.recv()).await.unwrap();

        let (log, notices) = factory.transport_for(listener).unwrap();

        host.on_signal(listener, &Signal::answer("answer").to_payload());
        host.on_signal(listener, &json!({ "candidate": { "candidate": "a=1" } }));
        host.on_signal(listener, &json!({ "nonsense": true }));

        eventually(|| host.session_state(listener) == Some(SessionState::AnsweredPending)).await;
        eventually(|| log.candidates.lock().len() == 1).await;
        assert_eq!(log.answers_applied.lock()[0].sdp, "answer");

        notices
            .send(SessionEvent::CandidateReady(json!({ "candidate": "b=2" })))
            .unwrap();

        let relayed = within(outbound.recv()).await.unwrap();
        assert_eq!(relayed.target, listener);
        assert_eq!(
            relayed.signal,
            Signal::Candidate {
                candidate: json!({ "candidate": "b=2" })
            }
        );

        notices
            .send(SessionEvent::ConnectionStateChanged(ConnectionState::Connected))
            .unwrap();

        eventually(|| host.session_state(listener) == Some(SessionState::Connected)).await;
    }

    #[tokio::test]
    async fn test_departure_closes_only_that_session() {
        let factory = FakeFactory::default();
        let (host, mut outbound, mixer) = host(&factory);

        let leaving = ConnectionId::new();
        let staying = ConnectionId::new();

        host.on_listener_joined(leaving);
        host.on_listener_joined(staying);
        within(outbound.recv()).await.unwrap();
        within(outbound.recv()).await.unwrap();

        let (leaving_log, _) = factory.transport_for(leaving).unwrap();
        let (staying_log, _) = factory.transport_for(staying).unwrap();

        host.handle_event(&CollabEvent::ListenerLeft {
            room_id: "ABC123".into(),
            listener_id: leaving,
        });

        eventually(|| leaving_log.closed.load()).await;
        eventually(|| {
            mixer.output().push(mixer.mix(&[0.; 4], &[]));
            mixer.output().subscriber_count() == 1
        })
        .await;

        assert!(!staying_log.closed.load());
        assert_eq!(host.listeners(), vec![staying]);
        assert!(!host.on_listener_left(leaving));
    }

    #[tokio::test]
    async fn test_failed_transport_removes_its_session() {
        let factory = FakeFactory::default();
        let (host, mut outbound, _) = host(&factory);

        let listener = ConnectionId::new();
        host.on_listener_joined(listener);
        within(outbound.recv()).await.unwrap();

        let (log, notices) = factory.transport_for(listener).unwrap();

        notices
            .send(SessionEvent::ConnectionStateChanged(ConnectionState::Failed))
            .unwrap();

        eventually(|| host.session_count() == 0).await;
        assert!(log.closed.load());
    }

    #[tokio::test]
    async fn test_rejoin_replaces_the_session() {
        let factory = FakeFactory::default();
        let (host, mut outbound, _) = host(&factory);

        let listener = ConnectionId::new();

        host.on_listener_joined(listener);
        within(outbound.recv()).await.unwrap();
        let (old_log, _) = factory.transport_for(listener).unwrap();

        host.on_listener_joined(listener);
        within(outbound.recv()).await.unwrap();
        let (new_log, _) = factory.transport_for(listener).unwrap();

        eventually(|| old_log.closed.load()).await;

        // The old session finishing must not take the new one with it
        assert_eq!(host.session_count(), 1);
        assert!(!new_log.closed.load());
        assert_eq!(host.session_state(listener), Some(SessionState::Offering));
    }

    #[tokio::test]
    async fn test_failed_offer_ends_the_session() {
        let factory = FakeFactory {
            fail_offers: true,
            ..Default::default()
        };
        let (host, mut outbound, _) = host(&factory);

        host.on_listener_joined(ConnectionId::new());

        eventually(|| host.session_count() == 0).await;
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_closed_closes_everything() {
        let factory = FakeFactory::default();
        let (host, mut outbound, _) = host(&factory);

        let listener = ConnectionId::new();
        host.on_listener_joined(listener);
        within(outbound.recv()).await.unwrap();

        let (log, _) = factory.transport_for(listener).unwrap();

        host.handle_event(&CollabEvent::RoomClosed {
            room_id: "ABC123".into(),
        });

        assert_eq!(host.session_count(), 0);
        eventually(|| log.closed.load()).await;
    }
}
