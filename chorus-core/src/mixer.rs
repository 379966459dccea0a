use std::sync::Arc;

use crossbeam::{
    atomic::AtomicCell,
    channel::{unbounded, Receiver, Sender, TryRecvError},
};
use log::debug;
use parking_lot::Mutex;

use crate::{volume_to_gain, Config, Id, Sample};

pub type TapId = Id<Tap>;

/// A block of mixed samples, shared between every subscriber.
pub type Frame = Arc<[Sample]>;

/// Sums the program bus and the voice bus into a single outbound stream.
///
/// Gains can be changed from any thread while mixing is in progress. A change
/// applies to the next block that is mixed.
pub struct Mixer {
    music_gain: AtomicCell<f32>,
    voice_level: AtomicCell<f32>,
    talking: AtomicCell<bool>,
    output: MixedOutput,
}

/// The mixed output, fanned out to any number of [Tap]s.
#[derive(Default)]
pub struct MixedOutput {
    subscribers: Mutex<Vec<(TapId, Sender<Frame>)>>,
}

/// Receives every block pushed to a [MixedOutput] after it subscribed.
pub struct Tap {
    pub id: TapId,
    receiver: Receiver<Frame>,
}

impl Mixer {
    pub fn new(config: &Config) -> Self {
        Self {
            music_gain: AtomicCell::new(config.music_gain()),
            voice_level: AtomicCell::new(config.voice_gain()),
            talking: AtomicCell::new(false),
            output: Default::default(),
        }
    }

    pub fn music_gain(&self) -> f32 {
        self.music_gain.load()
    }

    /// The gain the voice bus is mixed at right now.
    pub fn voice_gain(&self) -> f32 {
        if self.talking.load() {
            self.voice_level.load()
        } else {
            0.
        }
    }

    pub fn is_talking(&self) -> bool {
        self.talking.load()
    }

    /// Sets the program bus volume, from 0 to 100. Returns true if it changed.
    pub fn set_music_volume(&self, volume: u8) -> bool {
        self.music_gain.swap(volume_to_gain(volume)) != volume_to_gain(volume)
    }

    /// Sets the voice bus volume used while talking. Returns true if it changed.
    pub fn set_voice_volume(&self, volume: u8) -> bool {
        self.voice_level.swap(volume_to_gain(volume)) != volume_to_gain(volume)
    }

    /// Opens or closes the voice bus. Returns true if it changed.
    pub fn set_talking(&self, talking: bool) -> bool {
        let changed = self.talking.swap(talking) != talking;

        if changed {
            debug!("Voice bus {}", if talking { "opened" } else { "closed" });
        }

        changed
    }

    /// Mixes one block and pushes it to every subscriber.
    ///
    /// The output is as long as the program block. Voice samples past its end
    /// are dropped, missing ones count as silence.
    pub fn mix(&self, program: &[Sample], voice: &[Sample]) -> Frame {
        let music_gain = self.music_gain();
        let voice_gain = self.voice_gain();

        let mut mixed: Vec<Sample> = program.iter().map(|s| s * music_gain).collect();

        // A closed voice bus must not contribute at all, not even rounding noise
        if voice_gain != 0. {
            for (out, sample) in mixed.iter_mut().zip(voice) {
                *out += sample * voice_gain;
            }
        }

        let frame: Frame = mixed.into();
        self.output.push(frame.clone());

        frame
    }

    pub fn output(&self) -> &MixedOutput {
        &self.output
    }

    /// Shorthand for subscribing to the output.
    pub fn subscribe(&self) -> Tap {
        self.output.subscribe()
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl MixedOutput {
    pub fn subscribe(&self) -> Tap {
        let (sender, receiver) = unbounded();
        let id = TapId::new();

        self.subscribers.lock().push((id, sender));

        Tap { id, receiver }
    }

    /// Sends a block to every live tap, forgetting the ones that were dropped.
    pub fn push(&self, frame: Frame) {
        let mut subscribers = self.subscribers.lock();

        subscribers.retain(|(id, sender)| {
            let alive = sender.send(frame.clone()).is_ok();

            if !alive {
                debug!("Dropped mixer tap {}", id);
            }

            alive
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Tap {
    /// Returns the next block, if one is waiting.
    pub fn try_next(&self) -> Option<Frame> {
        match self.receiver.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the next block arrives, or the output is gone.
    pub fn next(&self) -> Option<Frame> {
        self.receiver.recv().ok()
    }

    /// Drains every waiting block.
    pub fn drain(&self) -> Vec<Frame> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_voice_bus_is_silent() {
        let mixer = Mixer::default();
        mixer.set_music_volume(100);

        let program = [0.1, -0.2, 0.3];
        let voice = [0.9, 0.9, 0.9];

        assert_eq!(mixer.voice_gain(), 0.);
        assert_eq!(&*mixer.mix(&program, &voice), &program);
    }

    #[test]
    fn test_voice_is_mixed_while_talking() {
        let mixer = Mixer::default();
        mixer.set_music_volume(50);
        mixer.set_voice_volume(100);
        mixer.set_talking(true);

        let mixed = mixer.mix(&[0.5, 0.5], &[0.25]);

        assert_eq!(&*mixed, &[0.5, 0.25]);
    }

    #[test]
    fn test_voice_drops_to_silence_when_talking_stops() {
        let mixer = Mixer::default();
        mixer.set_music_volume(100);
        mixer.set_voice_volume(100);

        let program = [0.1, -0.2, 0.3];
        let voice = [0.4, 0.4, 0.4];

        mixer.set_talking(true);
        assert_eq!(mixer.voice_gain(), 1.);
        assert_ne!(&*mixer.mix(&program, &voice), &program);

        mixer.set_talking(false);
        assert_eq!(mixer.voice_gain(), 0.);

        let mixed = mixer.mix(&program, &voice);
        let bits = |samples: &[f32]| samples.iter().map(|s| s.to_bits()).collect::<Vec<_>>();

        assert_eq!(bits(&mixed), bits(&program));
    }

    #[test]
    fn test_gain_updates_are_idempotent() {
        let mixer = Mixer::default();

        assert!(!mixer.set_music_volume(80));
        assert!(mixer.set_music_volume(30));
        assert!(!mixer.set_music_volume(30));
        assert!(mixer.set_talking(true));
        assert!(!mixer.set_talking(true));
        assert!((mixer.voice_gain() - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_output_fans_out_and_forgets_dropped_taps() {
        let mixer = Mixer::default();
        let monitor = mixer.subscribe();
        let session = mixer.subscribe();

        mixer.mix(&[1.], &[]);
        assert_eq!(monitor.drain().len(), 1);
        assert_eq!(session.try_next().as_deref(), Some(&[0.8][..]));

        drop(session);
        mixer.mix(&[1.], &[]);

        assert_eq!(mixer.output().subscriber_count(), 1);
        assert!(monitor.try_next().is_some());
    }
}
