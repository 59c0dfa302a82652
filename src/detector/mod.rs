//! Streaming detectors.
//!
//! Each detector owns one session at a time. A session registers a sample sink
//! with its source, runs its classifier on a Tokio task and reports through an
//! [`EventStream`]. Every stream ends with exactly one terminal message:
//! [`DetectorMessage::Failed`] with a typed error, or
//! [`DetectorMessage::Stopped`] when the owner stopped the detector.
//!
//! ```text
//! platform callback ──▶ SampleSink ──▶ [task: Classifier] ──▶ EventStream
//!                          ▲                                     │
//!                    Registration (dropped on stop)        Event | Failed | Stopped
//! ```

pub mod location;
pub mod rotation;
pub mod shake;

use crate::core::Classifier;
use crate::error::{DetectorError, SourceError};
use crate::source::{lock, sample_channel, Registration, SensorKind, SensorSample, SensorSource};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub use location::LocationChangeDetector;
pub use rotation::RotationDetector;
pub use shake::ShakeDetector;

/// Capacity of each detector's outgoing event channel.
const EVENT_BUFFER: usize = 64;

/// A message on a detector's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorMessage<E> {
    /// A classified event
    Event(E),
    /// The detector failed; no further messages follow
    Failed(DetectorError),
    /// The owner stopped the detector; no further messages follow
    Stopped,
}

impl<E> DetectorMessage<E> {
    /// Whether this message ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DetectorMessage::Event(_))
    }
}

/// Receiving end of a detector session.
#[derive(Debug)]
pub struct EventStream<E> {
    receiver: mpsc::Receiver<DetectorMessage<E>>,
    finished: bool,
}

impl<E> EventStream<E> {
    fn new(receiver: mpsc::Receiver<DetectorMessage<E>>) -> Self {
        Self {
            receiver,
            finished: false,
        }
    }

    /// A stream that fails straight away.
    fn failed(error: DetectorError) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        let _ = sender.try_send(DetectorMessage::Failed(error));
        Self::new(receiver)
    }

    /// Wait for the next message. Returns `None` once the terminal message
    /// has been delivered.
    pub async fn next(&mut self) -> Option<DetectorMessage<E>> {
        if self.finished {
            return None;
        }

        let message = match self.receiver.recv().await {
            Some(message) => message,
            // The session task went away without saying why
            None => DetectorMessage::Failed(DetectorError::Unknown),
        };
        if message.is_terminal() {
            self.finished = true;
        }
        Some(message)
    }

    /// Whether the terminal message has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn event_channel<E>() -> (mpsc::Sender<DetectorMessage<E>>, EventStream<E>) {
    let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
    (sender, EventStream::new(receiver))
}

#[derive(Default)]
struct SlotState {
    registration: Option<Registration>,
    closed: bool,
}

/// Holds a session's source registration so that stopping can release it
/// synchronously, even while the session task is still running.
#[derive(Clone, Default)]
struct RegistrationSlot {
    state: Arc<Mutex<SlotState>>,
}

impl RegistrationSlot {
    /// Keep `registration` until the slot is closed. If it already is, the
    /// registration is released immediately and false is returned.
    fn install(&self, registration: Registration) -> bool {
        let mut state = lock(&self.state);
        if state.closed {
            drop(state);
            registration.release();
            return false;
        }
        state.registration = Some(registration);
        true
    }

    /// Release the registration. Later installs are refused.
    fn close(&self) {
        let registration = {
            let mut state = lock(&self.state);
            state.closed = true;
            state.registration.take()
        };
        drop(registration);
    }

    fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

/// Handle to a running session, owned by the detector.
struct Session {
    stop: Option<oneshot::Sender<()>>,
    slot: RegistrationSlot,
    task: JoinHandle<()>,
}

impl Session {
    /// Unregister from the source, then ask the task to end the stream.
    fn stop(mut self) {
        self.slot.close();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Feed samples through `classifier` until stopped or the source goes away,
/// then send the terminal message.
async fn pump<T, C>(
    mut samples: mpsc::Receiver<T>,
    mut stop: oneshot::Receiver<()>,
    events: mpsc::Sender<DetectorMessage<C::Event>>,
    slot: RegistrationSlot,
    mut classifier: C,
    label: &'static str,
) where
    T: Send + 'static,
    C: Classifier<T>,
{
    let end = loop {
        tokio::select! {
            biased;
            _ = &mut stop => break DetectorMessage::Stopped,
            sample = samples.recv() => match sample {
                Some(sample) => {
                    if let Some(event) = classifier.classify(&sample) {
                        tracing::debug!("{} detector emitted {:?}", label, event);
                        if events.send(DetectorMessage::Event(event)).await.is_err() {
                            // Nobody is listening any more
                            slot.close();
                            return;
                        }
                    }
                }
                None if slot.is_closed() => break DetectorMessage::Stopped,
                None => {
                    tracing::warn!("{} sample source closed unexpectedly", label);
                    break DetectorMessage::Failed(DetectorError::Unknown);
                }
            },
        }
    };

    slot.close();
    if let DetectorMessage::Stopped = end {
        tracing::info!("{} detector stopped", label);
    }
    let _ = events.send(end).await;
}

/// Register with a motion sensor and start classifying its samples.
fn start_sensor_session<C>(
    source: &Arc<dyn SensorSource>,
    kind: SensorKind,
    sample_buffer: usize,
    classifier: C,
    label: &'static str,
) -> (Option<Session>, EventStream<C::Event>)
where
    C: Classifier<SensorSample>,
{
    if !source.is_available(kind) {
        tracing::warn!("{} detector cannot start: no {}", label, kind);
        let error = DetectorError::from(SourceError::SensorUnavailable(kind));
        return (None, EventStream::failed(error));
    }

    let (sink, samples) = sample_channel(sample_buffer);
    let registration = match source.register(kind, sink) {
        Ok(registration) => registration,
        Err(e) => {
            tracing::warn!("{} detector cannot register: {}", label, e);
            return (None, EventStream::failed(e.into()));
        }
    };

    let slot = RegistrationSlot::default();
    slot.install(registration);

    let (events, stream) = event_channel();
    let (stop, stop_signal) = oneshot::channel();
    let task = tokio::spawn(pump(
        samples,
        stop_signal,
        events,
        slot.clone(),
        classifier,
        label,
    ));
    tracing::info!("{} detector started", label);

    let session = Session {
        stop: Some(stop),
        slot,
        task,
    };
    (Some(session), stream)
}
