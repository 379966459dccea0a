use std::sync::{Arc, Weak};

use chorus_core::{ConnectionId, Role, RoomId, SessionEvent, SessionState, Signal, TransportSession};
use crossbeam::atomic::AtomicCell;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::Value;

use super::{MediaOutput, SessionDriver, SessionHandle, SignalSender, TransportFactory};
use crate::CollabEvent;

/// Whether a listener can hear the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaReadiness {
    /// There is no session.
    #[default]
    Unavailable,
    /// The answer was sent and no media has arrived yet.
    Awaiting,
    /// Media is available, but the runtime refused to start it without a user gesture.
    Blocked,
    Playing,
}

/// Keeps at most one inbound session to the host, created when the host's
/// first signal arrives.
pub struct ListenerOrchestrator<F, S, O> {
    me: Weak<Self>,
    room_id: RoomId,
    /// The only connection a session is accepted from, as announced in `room-joined`.
    host_id: ConnectionId,
    factory: F,
    signals: Arc<S>,
    output: Arc<O>,
    session: Mutex<Option<SessionHandle>>,
    readiness: Arc<AtomicCell<MediaReadiness>>,
}

impl<F, S, O> ListenerOrchestrator<F, S, O>
where
    F: TransportFactory,
    S: SignalSender,
    O: MediaOutput,
{
    pub fn new(room_id: &str, host_id: ConnectionId, factory: F, signals: S, output: O) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            room_id: room_id.to_string(),
            host_id,
            factory,
            signals: Arc::new(signals),
            output: Arc::new(output),
            session: Default::default(),
            readiness: Default::default(),
        })
    }

    /// Builds the orchestrator for the room a listener just joined.
    /// Returns `None` for anything but a listener's `room-joined` with a host.
    pub fn from_joined(event: &CollabEvent, factory: F, signals: S, output: O) -> Option<Arc<Self>> {
        match event {
            CollabEvent::RoomJoined {
                room_id,
                role: Role::Listener,
                state,
                ..
            } => Some(Self::new(room_id, state.host?, factory, signals, output)),
            _ => None,
        }
    }

    /// Reacts to an event received on the listener's control channel.
    pub fn handle_event(&self, event: &CollabEvent) {
        match event {
            CollabEvent::Signal {
                room_id,
                from,
                payload,
            } if *room_id == self.room_id => self.on_signal(*from, payload),
            CollabEvent::RoomClosed { room_id } if *room_id == self.room_id => self.close(),
            _ => {}
        }
    }

    /// Routes a relayed signal from the host to the session, creating it if there is none.
    pub fn on_signal(&self, from: ConnectionId, payload: &Value) {
        if from != self.host_id {
            debug!("Ignored a signal from {}, who is not the host", from);
            return;
        }

        let Some(signal) = Signal::from_payload(payload) else {
            debug!("Ignored a malformed signal from {}", from);
            return;
        };

        let mut slot = self.session.lock();

        match &*slot {
            Some(handle) if !handle.is_closed() => {
                if !handle.deliver(signal) {
                    debug!("Ignored a signal for a finished session");
                }
            }
            _ => {
                if let Some(handle) = self.open() {
                    handle.deliver(signal);
                    *slot = Some(handle);
                }
            }
        }
    }

    /// Retries starting playback after it was blocked, e.g. on a user gesture.
    pub fn resume(&self) -> MediaReadiness {
        if self.readiness.load() == MediaReadiness::Blocked {
            self.readiness.store(start(&*self.output));
        }

        self.readiness.load()
    }

    /// Closes the session, if any.
    pub fn close(&self) {
        if self.session.lock().take().is_some() {
            self.readiness.store(MediaReadiness::Unavailable);
        }
    }

    pub fn readiness(&self) -> MediaReadiness {
        self.readiness.load()
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.session.lock().as_ref().map(|h| h.state())
    }

    fn open(&self) -> Option<SessionHandle> {
        let host_id = self.host_id;
        let (transport, notices) = match self.factory.create(host_id, None) {
            Ok(created) => created,
            Err(error) => {
                warn!("Could not create a transport for {}: {}", host_id, error);
                return None;
            }
        };

        let session = TransportSession::answering(host_id);
        let session_id = session.id;

        let (driver, handle, inbox) =
            SessionDriver::new(&self.room_id, session, transport, self.signals.clone());

        info!("Opening session {} with host {}", session_id, host_id);

        let me = self.me.clone();
        let readiness = self.readiness.clone();
        let output = self.output.clone();

        tokio::spawn(async move {
            driver
                .run(inbox, notices, |event, state| {
                    if state == SessionState::AnsweredPending {
                        let _ = readiness
                            .compare_exchange(MediaReadiness::Unavailable, MediaReadiness::Awaiting);
                    }

                    if *event == SessionEvent::MediaReceived
                        && readiness.load() == MediaReadiness::Awaiting
                    {
                        readiness.store(start(&*output));
                    }
                })
                .await;

            if let Some(me) = me.upgrade() {
                let mut slot = me.session.lock();

                if slot.as_ref().map(|h| h.id) == Some(session_id) {
                    *slot = None;
                    me.readiness.store(MediaReadiness::Unavailable);
                }
            }
        });

        Some(handle)
    }
}

fn start<O>(output: &O) -> MediaReadiness
where
    O: MediaOutput + ?Sized,
{
    match output.start() {
        Ok(()) => MediaReadiness::Playing,
        Err(error) => {
            info!("{}", error);
            MediaReadiness::Blocked
        }
    }
}

#[cfg(test)]
mod tests {
    use chorus_core::{DescriptionKind, SessionDescription};
    use serde_json::json;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

    use super::*;
    use crate::client::testing::{eventually, within, FakeFactory, FakeOutput};
    use crate::OutboundSignal;

    type Listener =
        Arc<ListenerOrchestrator<FakeFactory, UnboundedSender<OutboundSignal>, Arc<FakeOutput>>>;

    fn listener(
        host: ConnectionId,
        factory: &FakeFactory,
        output: &Arc<FakeOutput>,
    ) -> (Listener, UnboundedReceiver<OutboundSignal>) {
        let (signals, outbound) = unbounded_channel();
        let listener =
            ListenerOrchestrator::new("ABC123", host, factory.clone(), signals, output.clone());

        (listener, outbound)
    }

    fn offer_from(from: ConnectionId) -> CollabEvent {
        CollabEvent::Signal {
            room_id: "ABC123".into(),
            from,
            payload: Signal::offer("offer").to_payload(),
        }
    }

    #[tokio::test]
    async fn test_answers_the_first_offer() {
        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        let host = ConnectionId::new();
        let (listener, mut outbound) = listener(host, &factory, &output);

        assert_eq!(listener.session_state(), None);
        listener.handle_event(&offer_from(host));

        let answer = within(outbound.recv()).await.unwrap();

        assert_eq!(answer.target, host);
        assert_eq!(
            answer.signal,
            Signal::Description(SessionDescription {
                kind: DescriptionKind::Answer,
                sdp: "answer".into()
            })
        );

        let (log, _) = factory.transport_for(host).unwrap();
        assert_eq!(log.offers_applied.lock()[0].sdp, "offer");

        eventually(|| listener.readiness() == MediaReadiness::Awaiting).await;

        // Nobody but the host reaches the session
        listener.on_signal(ConnectionId::new(), &Signal::offer("intruder").to_payload());
        assert_eq!(factory.count(), 1);

        listener.on_signal(host, &json!({ "candidate": { "candidate": "a=1" } }));
        eventually(|| log.candidates.lock().len() == 1).await;
    }

    #[tokio::test]
    async fn test_signals_from_other_members_never_open_a_session() {
        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        let host = ConnectionId::new();
        let (listener, mut outbound) = listener(host, &factory, &output);

        listener.handle_event(&offer_from(ConnectionId::new()));

        assert_eq!(factory.count(), 0);
        assert_eq!(listener.session_state(), None);
        assert!(outbound.try_recv().is_err());

        listener.handle_event(&offer_from(host));

        let answer = within(outbound.recv()).await.unwrap();
        assert_eq!(answer.target, host);
        assert_eq!(factory.count(), 1);
        assert!(factory.transport_for(host).is_some());
    }

    #[tokio::test]
    async fn test_built_from_room_joined() {
        let host = ConnectionId::new();
        let mut room = chorus_core::Room::new("ABC123".into(), None, 1_000);
        room.set_host(host, 1_000);

        let joined = |role| CollabEvent::RoomJoined {
            room_id: "ABC123".into(),
            role,
            state: room.snapshot(),
            sync_mode: chorus_core::SyncMode::Relay,
            server_time: 1_000,
        };

        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        let (signals, mut outbound) = unbounded_channel();

        let as_host = ListenerOrchestrator::from_joined(
            &joined(Role::Host),
            factory.clone(),
            signals.clone(),
            output.clone(),
        );
        assert!(as_host.is_none());

        let listener =
            ListenerOrchestrator::from_joined(&joined(Role::Listener), factory.clone(), signals, output)
                .unwrap();

        listener.handle_event(&offer_from(host));
        assert_eq!(within(outbound.recv()).await.unwrap().target, host);
    }

    #[tokio::test]
    async fn test_media_starts_playback() {
        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        let host = ConnectionId::new();
        let (listener, mut outbound) = listener(host, &factory, &output);
        listener.handle_event(&offer_from(host));
        within(outbound.recv()).await.unwrap();

        let (_, notices) = factory.transport_for(host).unwrap();
        notices.send(SessionEvent::MediaReceived).unwrap();

        eventually(|| listener.readiness() == MediaReadiness::Playing).await;
        assert_eq!(listener.session_state(), Some(SessionState::Connected));
        assert_eq!(output.starts.load(), 1);
    }

    #[tokio::test]
    async fn test_blocked_playback_can_be_resumed() {
        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        output.blocked.store(true);

        let host = ConnectionId::new();
        let (listener, mut outbound) = listener(host, &factory, &output);
        listener.handle_event(&offer_from(host));
        within(outbound.recv()).await.unwrap();

        let (_, notices) = factory.transport_for(host).unwrap();
        notices.send(SessionEvent::MediaReceived).unwrap();

        eventually(|| listener.readiness() == MediaReadiness::Blocked).await;
        assert_eq!(listener.resume(), MediaReadiness::Blocked);

        output.blocked.store(false);

        assert_eq!(listener.resume(), MediaReadiness::Playing);
        assert_eq!(listener.resume(), MediaReadiness::Playing);
        assert_eq!(output.starts.load(), 3);
    }

    #[tokio::test]
    async fn test_room_closed_ends_the_session() {
        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        let host = ConnectionId::new();
        let (listener, mut outbound) = listener(host, &factory, &output);
        listener.handle_event(&offer_from(host));
        within(outbound.recv()).await.unwrap();

        let (log, _) = factory.transport_for(host).unwrap();

        listener.handle_event(&CollabEvent::RoomClosed {
            room_id: "ABC123".into(),
        });

        assert_eq!(listener.readiness(), MediaReadiness::Unavailable);
        assert_eq!(listener.session_state(), None);
        eventually(|| log.closed.load()).await;
    }

    #[tokio::test]
    async fn test_a_new_offer_after_failure_opens_a_new_session() {
        let factory = FakeFactory::default();
        let output = Arc::new(FakeOutput::default());
        let host = ConnectionId::new();
        let (listener, mut outbound) = listener(host, &factory, &output);
        listener.handle_event(&offer_from(host));
        within(outbound.recv()).await.unwrap();

        let (_, notices) = factory.transport_for(host).unwrap();
        notices
            .send(SessionEvent::ConnectionStateChanged(
                chorus_core::ConnectionState::Failed,
            ))
            .unwrap();

        eventually(|| listener.session_state().is_none()).await;
        assert_eq!(listener.readiness(), MediaReadiness::Unavailable);

        listener.handle_event(&offer_from(host));
        within(outbound.recv()).await.unwrap();

        assert_eq!(factory.count(), 2);
    }
}
