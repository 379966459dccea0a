use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use chorus_core::{
    ConnectionId, DescriptionKind, SessionDescription, SessionEvent, Tap,
};
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use super::{
    LocalPlayer, MediaOutput, PeerTransport, PlaybackBlocked, TransportError, TransportFactory,
    TransportNotices,
};

/// What a [FakeTransport] was asked to do.
#[derive(Debug, Default)]
pub struct TransportLog {
    pub answers_applied: Mutex<Vec<SessionDescription>>,
    pub offers_applied: Mutex<Vec<SessionDescription>>,
    pub candidates: Mutex<Vec<Value>>,
    pub closed: AtomicCell<bool>,
}

pub struct FakeTransport {
    log: Arc<TransportLog>,
    fail_offers: bool,
    /// Held until the transport is dropped, like a real outbound track
    _outbound: Option<Tap>,
}

/// A created transport, as seen from the test.
pub struct CreatedTransport {
    pub peer: ConnectionId,
    pub log: Arc<TransportLog>,
    pub notices: UnboundedSender<SessionEvent>,
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub created: Arc<Mutex<Vec<CreatedTransport>>>,
    pub fail_offers: bool,
}

impl FakeFactory {
    pub fn transport_for(&self, peer: ConnectionId) -> Option<(Arc<TransportLog>, UnboundedSender<SessionEvent>)> {
        self.created
            .lock()
            .iter()
            .rev()
            .find(|c| c.peer == peer)
            .map(|c| (c.log.clone(), c.notices.clone()))
    }

    pub fn count(&self) -> usize {
        self.created.lock().len()
    }
}

impl TransportFactory for FakeFactory {
    type Transport = FakeTransport;

    fn create(
        &self,
        peer: ConnectionId,
        outbound: Option<Tap>,
    ) -> Result<(Self::Transport, TransportNotices), TransportError> {
        let (notices, receiver) = unbounded_channel();
        let log = Arc::new(TransportLog::default());

        self.created.lock().push(CreatedTransport {
            peer,
            log: log.clone(),
            notices,
        });

        let transport = FakeTransport {
            log,
            fail_offers: self.fail_offers,
            _outbound: outbound,
        };

        Ok((transport, receiver))
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        if self.fail_offers {
            return Err(TransportError::Negotiation("no codecs in common".into()));
        }

        Ok(SessionDescription {
            kind: DescriptionKind::Offer,
            sdp: "offer".into(),
        })
    }

    async fn accept_offer(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, TransportError> {
        self.log.offers_applied.lock().push(offer);

        Ok(SessionDescription {
            kind: DescriptionKind::Answer,
            sdp: "answer".into(),
        })
    }

    async fn accept_answer(&self, answer: SessionDescription) -> Result<(), TransportError> {
        self.log.answers_applied.lock().push(answer);
        Ok(())
    }

    async fn add_candidate(&self, candidate: Value) -> Result<(), TransportError> {
        if candidate.is_null() {
            return Err(TransportError::Negotiation("empty candidate".into()));
        }

        self.log.candidates.lock().push(candidate);
        Ok(())
    }

    async fn close(&self) {
        self.log.closed.store(true);
    }
}

/// Refuses to start until `blocked` is cleared.
#[derive(Default)]
pub struct FakeOutput {
    pub blocked: AtomicCell<bool>,
    pub starts: AtomicCell<usize>,
}

impl MediaOutput for Arc<FakeOutput> {
    fn start(&self) -> Result<(), PlaybackBlocked> {
        self.starts.fetch_add(1);

        if self.blocked.load() {
            Err(PlaybackBlocked)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub track_ref: Option<String>,
    pub position_seconds: f64,
    pub playing: bool,
    pub loads: usize,
    pub seeks: usize,
}

#[derive(Default)]
pub struct FakePlayer {
    pub state: Mutex<PlayerState>,
}

impl FakePlayer {
    pub fn playing(track_ref: &str, position_seconds: f64) -> Self {
        Self {
            state: Mutex::new(PlayerState {
                track_ref: Some(track_ref.to_string()),
                position_seconds,
                playing: true,
                ..Default::default()
            }),
        }
    }

    pub fn snapshot(&self) -> PlayerState {
        self.state.lock().clone()
    }
}

impl LocalPlayer for FakePlayer {
    fn track_ref(&self) -> Option<String> {
        self.state.lock().track_ref.clone()
    }

    fn position_seconds(&self) -> f64 {
        self.state.lock().position_seconds
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn load(&self, track_ref: &str, position_seconds: f64) {
        let mut state = self.state.lock();
        state.track_ref = Some(track_ref.to_string());
        state.position_seconds = position_seconds;
        state.loads += 1;
    }

    fn seek(&self, position_seconds: f64) {
        let mut state = self.state.lock();
        state.position_seconds = position_seconds;
        state.seeks += 1;
    }

    fn set_playing(&self, playing: bool) {
        self.state.lock().playing = playing;
    }
}

/// Polls `check` until it passes, giving spawned tasks a chance to run.
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }

        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("Condition was never met");
}

/// Runs a future with a generous timeout.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("Timed out")
}
